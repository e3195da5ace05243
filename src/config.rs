use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration, deserialized from a TOML file once at startup
/// and handed to the rest of the process through [`crate::AppState`].
#[derive(Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub jwt: Jwt,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub bootstrap: Bootstrap,
}

impl Config {
    /// Read and parse the configuration file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        use anyhow::Context;

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {path}"))
    }
}

#[derive(Deserialize, Clone)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

impl Server {
    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Token signing material and lifetimes.
///
/// The refresh secret is optional; when unset the codec falls back to
/// the access secret and finally to a hardcoded default, which is only
/// acceptable for local development.
#[derive(Deserialize, Clone)]
pub struct Jwt {
    pub secret: String,
    pub refresh_secret: Option<String>,
    pub ttl_hours: i64,
}

impl Default for Jwt {
    fn default() -> Self {
        Self {
            secret: "insecure-test-secret".to_string(),
            refresh_secret: None,
            ttl_hours: 24,
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct Storage {
    /// Root directory for user snapshots and uploaded attachments.
    /// `None` keeps everything in memory (tests).
    pub data_dir: Option<PathBuf>,
    pub max_attachment_bytes: usize,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            data_dir: None,
            max_attachment_bytes: 50_000_000,
        }
    }
}

/// Optional administrator account created at startup when absent, so a
/// fresh deployment has a way in.
#[derive(Deserialize, Default, Clone)]
pub struct Bootstrap {
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}
