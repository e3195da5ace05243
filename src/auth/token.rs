//! Issues and validates the two token kinds.
//!
//! Access tokens carry the full claims set (user, role, permissions);
//! refresh tokens carry only the user id and live longer. Both are
//! HS256-signed; validation fails closed on any signature or expiry
//! problem.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Principal;
use crate::{config, Error};

const ISSUER: &str = "achievement-reporting-system";

/// Refresh tokens always live 7 days.
const REFRESH_TTL_HOURS: i64 = 7 * 24;

/// Last-resort refresh secret, for when neither secret is configured.
const DEFAULT_REFRESH_SECRET: &str = "default_refresh_secret";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessClaims {
    user_id: Uuid,
    role_id: Uuid,
    role_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    permissions: Vec<String>,
    exp: i64,
    iat: i64,
    iss: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshClaims {
    user_id: String,
    exp: i64,
    iss: String,
}

pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
}

impl TokenCodec {
    pub fn new(cfg: &config::Jwt) -> Self {
        let refresh_secret = match &cfg.refresh_secret {
            Some(secret) => secret.clone(),
            None if !cfg.secret.is_empty() => {
                tracing::warn!("refresh secret unset, reusing the access token secret");
                cfg.secret.clone()
            }
            None => {
                tracing::warn!("no token secret configured, using the built-in refresh default");
                DEFAULT_REFRESH_SECRET.to_string()
            }
        };

        Self {
            access_encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl: Duration::hours(cfg.ttl_hours),
        }
    }

    pub fn issue_access_token(&self, principal: &Principal) -> Result<String, Error> {
        let now = Utc::now();
        let claims = AccessClaims {
            user_id: principal.user_id,
            role_id: principal.role_id,
            role_name: principal.role_name.clone(),
            permissions: principal.permissions.clone(),
            exp: (now + self.access_ttl).timestamp(),
            iat: now.timestamp(),
            iss: ISSUER.to_string(),
        };
        Ok(encode(&Header::default(), &claims, &self.access_encoding)?)
    }

    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, Error> {
        let claims = RefreshClaims {
            user_id: user_id.to_string(),
            exp: (Utc::now() + Duration::hours(REFRESH_TTL_HOURS)).timestamp(),
            iss: ISSUER.to_string(),
        };
        Ok(encode(&Header::default(), &claims, &self.refresh_encoding)?)
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Principal, Error> {
        let data = decode::<AccessClaims>(
            token,
            &self.access_decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| Error::InvalidToken)?;

        Ok(Principal {
            user_id: data.claims.user_id,
            role_id: data.claims.role_id,
            role_name: data.claims.role_name,
            permissions: data.claims.permissions,
        })
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<Uuid, Error> {
        let data = decode::<RefreshClaims>(
            token,
            &self.refresh_decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| Error::InvalidToken)?;

        data.claims
            .user_id
            .parse()
            .map_err(|_| Error::InvalidToken)
    }
}
