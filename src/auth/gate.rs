//! The authorization gates, applied per route in a fixed order:
//! authentication (the [`Principal`](super::Principal) extractor), then
//! role, then permission. Each check is side-effect-free and
//! short-circuits the request through the crate error type.

use axum::http::{header, HeaderMap};

use super::Principal;
use crate::Error;

/// Pull the token out of the `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, Error> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(Error::MissingToken)?
        .to_str()
        .map_err(|_| Error::InvalidTokenFormat)?;

    let parts: Vec<&str> = value.split(' ').collect();
    if parts.len() != 2 || parts[0] != "Bearer" || parts[1].is_empty() {
        return Err(Error::InvalidTokenFormat);
    }
    Ok(parts[1])
}

/// The role gate. Role names compare case-insensitively.
pub fn require_role(principal: &Principal, allowed: &[&str]) -> Result<(), Error> {
    if principal.role_name.is_empty() {
        return Err(Error::RoleMissing);
    }
    if allowed
        .iter()
        .any(|role| principal.role_name.eq_ignore_ascii_case(role))
    {
        Ok(())
    } else {
        Err(Error::RoleNotAllowed)
    }
}

/// The permission gate. Permission strings compare exactly,
/// case included.
pub fn require_permission(principal: &Principal, needed: &str) -> Result<(), Error> {
    if principal.permissions.is_empty() {
        return Err(Error::NoPermissions);
    }
    if has_permission(principal, needed) {
        Ok(())
    } else {
        Err(Error::PermissionDenied(needed.to_string()))
    }
}

/// Pure membership query for handlers that branch on a permission
/// instead of denying outright.
pub fn has_permission(principal: &Principal, needed: &str) -> bool {
    principal.permissions.iter().any(|p| p == needed)
}
