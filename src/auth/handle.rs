//! Authentication endpoints.

use axum::extract::State;
use axum::Json;
use stars_shared::account::handle::{
    LoginRequest, LoginResponse, MessageResponse, RefreshRequest, RefreshResponse,
};
use stars_shared::account::UserProfile;
use std::sync::Arc;

use super::Principal;
use crate::{AppState, Error, JsonBody};

/// Authenticate by username and password.
///
/// Url: `POST /api/v1/auth/login`
///
/// Response: `200` with both tokens and the user's public profile.
/// The permission set embedded in the access token is the one read
/// here; later role changes only take effect on refresh.
pub async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, Error> {
    let user = state
        .identity
        .user_by_username(&req.username)
        .await?
        .ok_or(Error::BadCredentials)?;

    if !super::verify_password(&req.password, &user.password_sha) {
        return Err(Error::BadCredentials);
    }
    if !user.is_active {
        return Err(Error::AccountInactive);
    }

    let role = state
        .identity
        .role_by_id(user.role_id)
        .await?
        .ok_or_else(|| Error::Storage(format!("role {} missing", user.role_id)))?;
    let permissions = state.identity.permissions_for_role(user.role_id).await?;

    let principal = Principal {
        user_id: user.id,
        role_id: user.role_id,
        role_name: role.name.clone(),
        permissions: permissions.clone(),
    };

    Ok(Json(LoginResponse {
        access_token: state.tokens.issue_access_token(&principal)?,
        refresh_token: state.tokens.issue_refresh_token(user.id)?,
        user: UserProfile {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: role.name,
            permissions,
        },
    }))
}

/// Trade a refresh token for a fresh access token.
///
/// Url: `POST /api/v1/auth/refresh`
///
/// Role and permissions are re-read from the identity store, so this is
/// the path on which permission changes become visible.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> Result<Json<RefreshResponse>, Error> {
    let user_id = state.tokens.validate_refresh_token(&req.refresh_token)?;

    let user = state
        .identity
        .user_by_id(user_id)
        .await?
        .ok_or(Error::NotFound("user"))?;
    let role = state
        .identity
        .role_by_id(user.role_id)
        .await?
        .ok_or_else(|| Error::Storage(format!("role {} missing", user.role_id)))?;
    let permissions = state.identity.permissions_for_role(user.role_id).await?;

    let principal = Principal {
        user_id: user.id,
        role_id: user.role_id,
        role_name: role.name,
        permissions,
    };

    Ok(Json(RefreshResponse {
        access_token: state.tokens.issue_access_token(&principal)?,
    }))
}

/// Url: `POST /api/v1/auth/logout`
///
/// Tokens are stateless, so there is nothing to revoke server-side;
/// clients drop their copies.
pub async fn logout(_principal: Principal) -> Json<MessageResponse> {
    Json(MessageResponse::new("logout successful"))
}

/// Url: `GET /api/v1/auth/profile`
pub async fn profile(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<UserProfile>, Error> {
    let user = state
        .identity
        .user_by_id(principal.user_id)
        .await?
        .ok_or(Error::NotFound("user"))?;
    let role = state
        .identity
        .role_by_id(user.role_id)
        .await?
        .ok_or_else(|| Error::Storage(format!("role {} missing", user.role_id)))?;
    let permissions = state.identity.permissions_for_role(user.role_id).await?;

    Ok(Json(UserProfile {
        id: user.id,
        username: user.username,
        full_name: user.full_name,
        role: role.name,
        permissions,
    }))
}
