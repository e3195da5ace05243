use chrono::Utc;
use stars_shared::account::role;
use std::sync::Arc;
use uuid::Uuid;

use stars_backend::account::User;
use stars_backend::auth::{hash_password, token::TokenCodec};
use stars_backend::config::Config;
use stars_backend::store::memory::{MemDetailStore, MemIdentityStore, MemReferenceStore};
use stars_backend::store::IdentityStore;
use stars_backend::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let config = Config::load("./data/config.toml")?;
    let state = Arc::new(build_state(config).await?);

    let addr = state.config.server.addr()?;
    tracing::info!("listening on {addr}");

    axum::Server::bind(&addr)
        .serve(router(state).into_make_service())
        .await?;

    Ok(())
}

/// Wire the stores and token codec together, creating the configured
/// administrator account on first start so a fresh deployment has a
/// way in.
async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let identity = Arc::new(MemIdentityStore::load(config.storage.data_dir.clone()));

    if let (Some(username), Some(password)) = (
        &config.bootstrap.admin_username,
        &config.bootstrap.admin_password,
    ) {
        if identity.user_by_username(username).await?.is_none() {
            let admin_role = identity
                .role_named(role::ADMIN)
                .ok_or_else(|| anyhow::anyhow!("admin role missing from identity store"))?;
            let now = Utc::now();
            identity
                .create_user(User {
                    id: Uuid::new_v4(),
                    username: username.clone(),
                    full_name: "Administrator".to_string(),
                    password_sha: hash_password(password),
                    role_id: admin_role.id,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                })
                .await?;
            tracing::info!("bootstrapped administrator account '{username}'");
        }
    }

    Ok(AppState {
        tokens: TokenCodec::new(&config.jwt),
        identity,
        references: Arc::new(MemReferenceStore::new()),
        details: Arc::new(MemDetailStore::new()),
        config,
    })
}
