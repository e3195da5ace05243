pub mod gate;
pub mod handle;
pub mod token;

use axum::http::request::Parts;
use sha256::digest;
use std::sync::Arc;
use uuid::Uuid;

use crate::{AppState, Error};

/// The authenticated actor: identity, role and the permission set that
/// was embedded in the access token at issue time.
///
/// A principal is derived from a validated token, never persisted.
/// Permission changes made after issue do not show up here until the
/// token is refreshed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role_id: Uuid,
    pub role_name: String,
    pub permissions: Vec<String>,
}

/// The authentication gate: extracting a [`Principal`] validates the
/// bearer token and fails the request with `401` before the handler
/// runs. Role and permission gates build on the extracted value.
#[axum::async_trait]
impl axum::extract::FromRequestParts<Arc<AppState>> for Principal {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = gate::bearer_token(&parts.headers)?;
        state.tokens.validate_access_token(token)
    }
}

/// Hash a plaintext password for storage.
pub fn hash_password(plain: &str) -> String {
    digest(plain)
}

/// Check a plaintext password against a stored hash.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    digest(plain) == stored
}
