//! Achievement endpoints: the workflow state machine
//! (draft -> submitted -> verified/rejected) plus scoped listing.
//!
//! Every state change re-reads the reference, checks ownership or the
//! reviewer role, then performs exactly one conditional write through
//! the reference store; a write that loses a race reports the same
//! wrong-state error as a stale request.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use stars_shared::account::handle::MessageResponse;
use stars_shared::account::{perm, role};
use stars_shared::achievement::handle::{
    AchievementDetailResponse, AchievementSummary, CreatedResponse, HistoryEntry, ListQuery,
    Paginated, PaginationMeta, RejectRequest, UploadQuery, UploadResponse,
};
use stars_shared::achievement::{
    AchievementContent, AchievementDetail, Attachment, Status,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::visibility::{self, Scope};
use super::AchievementReference;
use crate::account::Student;
use crate::auth::{gate, Principal};
use crate::store::{ReferenceFilter, SortOrder};
use crate::{AppState, Error, JsonBody};

fn parse_id(raw: &str) -> Result<Uuid, Error> {
    raw.parse()
        .map_err(|_| Error::Validation("invalid achievement id".to_string()))
}

/// Resolve the caller to a student profile, or 404.
async fn caller_student(state: &AppState, principal: &Principal) -> Result<Student, Error> {
    state
        .identity
        .student_by_user(principal.user_id)
        .await?
        .ok_or(Error::NotFound("student profile"))
}

/// Fetch a live reference, or 404.
async fn reference_by_id(state: &AppState, id: Uuid) -> Result<AchievementReference, Error> {
    state
        .references
        .by_id(id)
        .await?
        .ok_or(Error::NotFound("achievement"))
}

/// Create a draft achievement.
///
/// Url: `POST /api/v1/achievements`
///
/// The detail document is written first; only once that succeeds is the
/// reference row created. A failed reference write triggers a
/// best-effort delete of the orphaned document — the two stores share
/// no transaction, so this compensation is all the consistency there is.
pub async fn create_achievement(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    JsonBody(content): JsonBody<AchievementContent>,
) -> Result<(StatusCode, Json<CreatedResponse>), Error> {
    gate::require_role(&principal, &[role::STUDENT])?;
    gate::require_permission(&principal, perm::ACHIEVEMENT_CREATE)?;

    let student = caller_student(&state, &principal).await?;

    let now = Utc::now();
    let detail_id = state
        .details
        .insert(AchievementDetail {
            student_id: student.id,
            content,
            attachments: Vec::new(),
            created_at: now,
            updated_at: now,
        })
        .await?;

    let reference = AchievementReference::new_draft(student.id, detail_id.clone());
    let (id, status) = (reference.id, reference.status);

    if let Err(err) = state.references.insert(reference).await {
        if let Err(cleanup) = state.details.delete(&detail_id).await {
            tracing::error!(
                "failed to delete orphaned detail document {detail_id}: {cleanup}"
            );
        }
        return Err(err);
    }

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Achievement created successfully".to_string(),
            id,
            status,
        }),
    ))
}

/// List achievements visible to the caller.
///
/// Url: `GET /api/v1/achievements?page=_&limit=_&status=_&sort=_`
///
/// Students see their own, advisors their advisees' (submitted and
/// verified unless an explicit status filter says otherwise), admins
/// everything. Each reference is joined with its detail document;
/// references whose document has gone missing are dropped from the
/// page and logged.
pub async fn list_achievements(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> Result<Json<Paginated<AchievementSummary>>, Error> {
    gate::require_permission(&principal, perm::ACHIEVEMENT_READ)?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * limit;

    let explicit_status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            Status::from_str(raw)
                .map_err(|_| Error::Validation(format!("unknown status filter '{raw}'")))?,
        ),
        None => None,
    };

    let mut filter = ReferenceFilter {
        statuses: match explicit_status {
            Some(status) => vec![status],
            None => visibility::default_statuses(&principal),
        },
        ..ReferenceFilter::default()
    };

    match visibility::listing_scope(&principal, state.identity.as_ref()).await? {
        Scope::All => {}
        Scope::Own(student_id) => filter.student_id = Some(student_id),
        Scope::Advisees(ids) => {
            if ids.is_empty() {
                return Ok(Json(empty_page(page, limit)));
            }
            filter.student_ids = Some(ids);
        }
    }

    let sort = SortOrder::parse(query.sort.as_deref());
    let (references, total) = state.references.list(&filter, limit, offset, sort).await?;

    if references.is_empty() {
        return Ok(Json(empty_page(page, limit)));
    }

    let ids: Vec<String> = references.iter().map(|r| r.detail_id.clone()).collect();
    let mut details: HashMap<String, AchievementDetail> =
        state.details.by_ids(&ids).await?.into_iter().collect();

    let mut data = Vec::with_capacity(references.len());
    for reference in references {
        match details.remove(&reference.detail_id) {
            Some(detail) => data.push(AchievementSummary {
                id: reference.id,
                student_id: reference.student_id,
                status: reference.status,
                title: detail.content.title,
                achievement_type: detail.content.achievement_type,
                points: detail.content.points,
                submitted_at: reference.submitted_at,
                created_at: reference.created_at,
            }),
            None => tracing::warn!(
                "reference {} points at missing detail document {}, dropped from listing",
                reference.id,
                reference.detail_id
            ),
        }
    }

    Ok(Json(Paginated {
        data,
        meta: PaginationMeta {
            current_page: page,
            total_page: (total + limit - 1) / limit,
            total_data: total,
            limit,
        },
    }))
}

fn empty_page(page: i64, limit: i64) -> Paginated<AchievementSummary> {
    Paginated {
        data: Vec::new(),
        meta: PaginationMeta {
            current_page: page,
            total_page: 0,
            total_data: 0,
            limit,
        },
    }
}

/// Fetch one achievement with its full detail document.
///
/// Url: `GET /api/v1/achievements/:id`
pub async fn achievement_detail(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<AchievementDetailResponse>, Error> {
    gate::require_permission(&principal, perm::ACHIEVEMENT_READ)?;
    let id = parse_id(&id)?;

    let reference = reference_by_id(&state, id).await?;
    visibility::check_detail_access(&principal, &reference, state.identity.as_ref()).await?;

    let detail = state
        .details
        .by_id(&reference.detail_id)
        .await?
        .ok_or_else(|| {
            Error::Storage(format!(
                "detail document {} missing for reference {}",
                reference.detail_id, reference.id
            ))
        })?;

    Ok(Json(AchievementDetailResponse {
        id: reference.id,
        status: reference.status,
        rejection_note: reference.rejection_note,
        details: detail,
        created_at: reference.created_at,
    }))
}

/// Derived status history of one achievement.
///
/// Url: `GET /api/v1/achievements/:id/history`
pub async fn achievement_history(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryEntry>>, Error> {
    gate::require_permission(&principal, perm::ACHIEVEMENT_READ)?;
    let id = parse_id(&id)?;

    let reference = reference_by_id(&state, id).await?;
    visibility::check_detail_access(&principal, &reference, state.identity.as_ref()).await?;

    Ok(Json(reference.history()))
}

/// Replace the content of a draft.
///
/// Url: `PUT /api/v1/achievements/:id`
pub async fn update_achievement(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
    JsonBody(content): JsonBody<AchievementContent>,
) -> Result<Json<MessageResponse>, Error> {
    gate::require_role(&principal, &[role::STUDENT])?;
    gate::require_permission(&principal, perm::ACHIEVEMENT_UPDATE)?;
    let id = parse_id(&id)?;

    let student = caller_student(&state, &principal).await?;
    let reference = reference_by_id(&state, id).await?;

    if reference.student_id != student.id {
        return Err(Error::Forbidden("you do not own this achievement"));
    }
    if reference.status != Status::Draft {
        return Err(Error::DraftOnly("updated"));
    }

    state
        .details
        .update_content(&reference.detail_id, content)
        .await?;

    Ok(Json(MessageResponse::new("Achievement updated successfully")))
}

/// Delete a draft.
///
/// Url: `DELETE /api/v1/achievements/:id`
///
/// The reference is marked deleted first; the detail document delete is
/// best-effort and never rolls the reference back.
pub async fn delete_achievement(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, Error> {
    gate::require_role(&principal, &[role::STUDENT])?;
    gate::require_permission(&principal, perm::ACHIEVEMENT_DELETE)?;
    let id = parse_id(&id)?;

    let student = caller_student(&state, &principal).await?;
    let reference = reference_by_id(&state, id).await?;

    if reference.student_id != student.id {
        return Err(Error::Forbidden("you do not own this achievement"));
    }

    if !state.references.mark_deleted(id).await? {
        return Err(Error::DraftOnly("deleted"));
    }

    if let Err(err) = state.details.delete(&reference.detail_id).await {
        tracing::error!(
            "failed to delete detail document {} of deleted reference {}: {err}",
            reference.detail_id,
            reference.id
        );
    }

    Ok(Json(MessageResponse::new("Achievement deleted successfully")))
}

/// Submit a draft for verification.
///
/// Url: `POST /api/v1/achievements/:id/submit`
pub async fn submit_achievement(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, Error> {
    gate::require_role(&principal, &[role::STUDENT])?;
    gate::require_permission(&principal, perm::ACHIEVEMENT_UPDATE)?;
    let id = parse_id(&id)?;

    let student = caller_student(&state, &principal).await?;
    let reference = reference_by_id(&state, id).await?;

    if reference.student_id != student.id {
        return Err(Error::Forbidden("you do not own this achievement"));
    }

    if !state.references.submit(id, Utc::now()).await? {
        return Err(Error::DraftOnly("submitted"));
    }

    Ok(Json(MessageResponse::new(
        "Achievement submitted for verification",
    )))
}

/// Attach a file to a draft.
///
/// Url: `POST /api/v1/achievements/:id/attachments?filename=_`
///
/// Request body: the raw file bytes; the content type is taken from the
/// `Content-Type` header. The bytes land under the data directory, the
/// metadata lands in the detail document.
pub async fn upload_attachment(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, Error> {
    gate::require_role(&principal, &[role::STUDENT])?;
    gate::require_permission(&principal, perm::ACHIEVEMENT_UPDATE)?;
    let id = parse_id(&id)?;

    let student = caller_student(&state, &principal).await?;
    let reference = reference_by_id(&state, id).await?;

    if reference.student_id != student.id {
        return Err(Error::Forbidden("you do not own this achievement"));
    }
    if reference.status != Status::Draft {
        return Err(Error::DraftOnly("updated"));
    }
    if body.len() > state.config.storage.max_attachment_bytes {
        return Err(Error::PayloadTooLarge);
    }

    let file_name = query
        .filename
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "attachment".to_string());
    let stored_name = match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!("{}.{ext}", Uuid::new_v4()),
        _ => Uuid::new_v4().to_string(),
    };

    if let Some(dir) = &state.config.storage.data_dir {
        let uploads = dir.join("uploads");
        tokio::fs::create_dir_all(&uploads)
            .await
            .map_err(|err| Error::Storage(format!("failed to save attachment: {err}")))?;
        tokio::fs::write(uploads.join(&stored_name), &body)
            .await
            .map_err(|err| Error::Storage(format!("failed to save attachment: {err}")))?;
    }

    let attachment = Attachment {
        file_name,
        file_url: format!("/uploads/{stored_name}"),
        file_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref())
            .to_string(),
        uploaded_at: Utc::now(),
    };

    state
        .details
        .push_attachment(&reference.detail_id, attachment.clone())
        .await?;

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        attachment,
    }))
}

/// Verify a submitted achievement.
///
/// Url: `POST /api/v1/achievements/:id/verify`
///
/// Any caller resolving to a lecturer profile may verify; the advisee
/// link is deliberately not checked here.
pub async fn verify_achievement(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, Error> {
    gate::require_role(&principal, &[role::LECTURER])?;
    gate::require_permission(&principal, perm::ACHIEVEMENT_VERIFY)?;
    let id = parse_id(&id)?;

    state
        .identity
        .lecturer_by_user(principal.user_id)
        .await?
        .ok_or(Error::Forbidden("user is not a lecturer"))?;

    reference_by_id(&state, id).await?;

    if !state
        .references
        .review(id, Status::Verified, principal.user_id, Utc::now(), None)
        .await?
    {
        return Err(Error::SubmittedOnly("verified"));
    }

    Ok(Json(MessageResponse::new("Achievement verified")))
}

/// Reject a submitted achievement with a mandatory note.
///
/// Url: `POST /api/v1/achievements/:id/reject`
pub async fn reject_achievement(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<RejectRequest>,
) -> Result<Json<MessageResponse>, Error> {
    gate::require_role(&principal, &[role::LECTURER])?;
    gate::require_permission(&principal, perm::ACHIEVEMENT_VERIFY)?;
    let id = parse_id(&id)?;

    state
        .identity
        .lecturer_by_user(principal.user_id)
        .await?
        .ok_or(Error::Forbidden("user is not a lecturer"))?;

    if req.note.trim().is_empty() {
        return Err(Error::NoteRequired);
    }

    reference_by_id(&state, id).await?;

    if !state
        .references
        .review(
            id,
            Status::Rejected,
            principal.user_id,
            Utc::now(),
            Some(req.note),
        )
        .await?
    {
        return Err(Error::SubmittedOnly("rejected"));
    }

    Ok(Json(MessageResponse::new("Achievement rejected")))
}
