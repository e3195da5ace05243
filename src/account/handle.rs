//! User management and the student/lecturer directory.
//!
//! User CRUD is admin territory with a self-access exception on the
//! single-user read/update/delete routes. Profiles themselves
//! (students, lecturers) are reference data resolved from the identity
//! store.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use stars_shared::account::handle::{
    AssignRoleRequest, CreateUserRequest, MessageResponse, UpdateAdvisorRequest,
    UpdateUserRequest,
};
use stars_shared::account::{perm, role, LecturerInfo, StudentInfo, UserProfile};
use stars_shared::achievement::AchievementDetail;
use std::sync::Arc;
use uuid::Uuid;

use super::User;
use crate::auth::{gate, hash_password, Principal};
use crate::{AppState, Error, JsonBody};

fn parse_user_id(raw: &str) -> Result<Uuid, Error> {
    raw.parse()
        .map_err(|_| Error::Validation("invalid user id".to_string()))
}

/// Admins pass; everyone else only reaches their own account.
fn require_admin_or_self(principal: &Principal, target: Uuid) -> Result<(), Error> {
    if principal.role_name.eq_ignore_ascii_case(role::ADMIN) || principal.user_id == target {
        Ok(())
    } else {
        Err(Error::Forbidden("you may only access your own account"))
    }
}

async fn profile_of(state: &AppState, user: &User) -> Result<UserProfile, Error> {
    let role = state
        .identity
        .role_by_id(user.role_id)
        .await?
        .ok_or_else(|| Error::Storage(format!("role {} missing", user.role_id)))?;
    Ok(UserProfile {
        id: user.id,
        username: user.username.clone(),
        full_name: user.full_name.clone(),
        role: role.name,
        permissions: role.permissions,
    })
}

/// Url: `GET /api/v1/users`
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<UserProfile>>, Error> {
    gate::require_role(&principal, &[role::ADMIN])?;

    let users = state.identity.all_users().await?;
    let mut profiles = Vec::with_capacity(users.len());
    for user in &users {
        profiles.push(profile_of(&state, user).await?);
    }
    Ok(Json(profiles))
}

/// Url: `GET /api/v1/users/:id`
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, Error> {
    let id = parse_user_id(&id)?;
    require_admin_or_self(&principal, id)?;

    let user = state
        .identity
        .user_by_id(id)
        .await?
        .ok_or(Error::NotFound("user"))?;
    Ok(Json(profile_of(&state, &user).await?))
}

/// Url: `POST /api/v1/users`
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), Error> {
    gate::require_role(&principal, &[role::ADMIN])?;

    if req.username.is_empty() || req.password.is_empty() {
        return Err(Error::Validation(
            "username and password are required".to_string(),
        ));
    }
    if state
        .identity
        .user_by_username(&req.username)
        .await?
        .is_some()
    {
        return Err(Error::Validation("username already taken".to_string()));
    }
    if state.identity.role_by_id(req.role_id).await?.is_none() {
        return Err(Error::Validation("unknown role id".to_string()));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        username: req.username,
        full_name: req.full_name,
        password_sha: hash_password(&req.password),
        role_id: req.role_id,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    state.identity.create_user(user.clone()).await?;

    Ok((StatusCode::CREATED, Json(profile_of(&state, &user).await?)))
}

/// Url: `PUT /api/v1/users/:id`
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserProfile>, Error> {
    let id = parse_user_id(&id)?;
    require_admin_or_self(&principal, id)?;

    let mut user = state
        .identity
        .user_by_id(id)
        .await?
        .ok_or(Error::NotFound("user"))?;

    if let Some(username) = req.username.filter(|u| !u.is_empty()) {
        user.username = username;
    }
    if let Some(full_name) = req.full_name {
        user.full_name = full_name;
    }
    if let Some(password) = req.password.filter(|p| !p.is_empty()) {
        user.password_sha = hash_password(&password);
    }
    user.updated_at = Utc::now();

    state.identity.update_user(user.clone()).await?;
    Ok(Json(profile_of(&state, &user).await?))
}

/// Url: `DELETE /api/v1/users/:id`
///
/// Soft delete: the account is deactivated, not removed.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, Error> {
    let id = parse_user_id(&id)?;
    require_admin_or_self(&principal, id)?;

    state
        .identity
        .user_by_id(id)
        .await?
        .ok_or(Error::NotFound("user"))?;
    state.identity.deactivate_user(id).await?;

    Ok(Json(MessageResponse::new("user deactivated")))
}

/// Url: `PUT /api/v1/users/:id/role`
pub async fn assign_role(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<AssignRoleRequest>,
) -> Result<Json<MessageResponse>, Error> {
    gate::require_role(&principal, &[role::ADMIN])?;
    let id = parse_user_id(&id)?;

    state
        .identity
        .user_by_id(id)
        .await?
        .ok_or(Error::NotFound("user"))?;
    if state.identity.role_by_id(req.role_id).await?.is_none() {
        return Err(Error::Validation("unknown role id".to_string()));
    }

    state.identity.assign_role(id, req.role_id).await?;
    Ok(Json(MessageResponse::new("role assigned")))
}

/// Url: `GET /api/v1/students`
pub async fn list_students(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
) -> Result<Json<Vec<StudentInfo>>, Error> {
    let students = state.identity.all_students().await?;
    Ok(Json(students.iter().map(|s| s.info()).collect()))
}

/// Url: `GET /api/v1/students/:id`
pub async fn get_student(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<StudentInfo>, Error> {
    let id: Uuid = id
        .parse()
        .map_err(|_| Error::Validation("invalid student id".to_string()))?;
    let student = state
        .identity
        .student_by_id(id)
        .await?
        .ok_or(Error::NotFound("student"))?;
    Ok(Json(student.info()))
}

/// Url: `GET /api/v1/students/:id/achievements`
///
/// The raw detail documents of one student, straight from the document
/// store.
pub async fn student_achievements(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Vec<AchievementDetail>>, Error> {
    let id: Uuid = id
        .parse()
        .map_err(|_| Error::Validation("invalid student id".to_string()))?;
    Ok(Json(state.details.by_student(id).await?))
}

/// Url: `PUT /api/v1/students/:id/advisor`
pub async fn update_advisor(
    State(state): State<Arc<AppState>>,
    _principal: Principal,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateAdvisorRequest>,
) -> Result<Json<MessageResponse>, Error> {
    let id: Uuid = id
        .parse()
        .map_err(|_| Error::Validation("invalid student id".to_string()))?;
    state.identity.update_advisor(id, req.lecturer_id).await?;
    Ok(Json(MessageResponse::new("advisor updated")))
}

/// Url: `GET /api/v1/lecturers`
pub async fn list_lecturers(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<Vec<LecturerInfo>>, Error> {
    gate::require_permission(&principal, perm::MANAGE_LECTURERS)?;
    let lecturers = state.identity.all_lecturers().await?;
    Ok(Json(lecturers.iter().map(|l| l.info()).collect()))
}

/// Url: `GET /api/v1/lecturers/:id/advisees`
pub async fn lecturer_advisees(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Vec<StudentInfo>>, Error> {
    gate::require_permission(&principal, perm::MANAGE_STUDENTS)?;
    let id: Uuid = id
        .parse()
        .map_err(|_| Error::Validation("invalid lecturer id".to_string()))?;
    let advisees = state.identity.advisees(id).await?;
    Ok(Json(advisees.iter().map(|s| s.info()).collect()))
}
