//! Read-only statistics reports.
//!
//! Aggregation happens inside the document store; the results are then
//! enriched with names and programs resolved from the relational side.
//! A top student with no relational record keeps empty name fields
//! rather than being dropped.

use axum::extract::{Path, State};
use axum::Json;
use stars_shared::report::{GlobalStatistics, StudentStatistics};
use std::sync::Arc;
use uuid::Uuid;

use super::check_report_access;
use crate::auth::Principal;
use crate::{AppState, Error};

/// Url: `GET /api/v1/reports/statistics`
pub async fn global_statistics(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> Result<Json<GlobalStatistics>, Error> {
    check_report_access(&principal)?;

    let mut stats = state.details.global_statistics().await?;

    let ids: Vec<Uuid> = stats
        .points_distribution
        .iter()
        .map(|top| top.student_id)
        .collect();
    let students = state.identity.students_by_ids(&ids).await?;

    for top in &mut stats.points_distribution {
        if let Some(student) = students.iter().find(|s| s.id == top.student_id) {
            top.name = student.full_name.clone();
            top.program_study = student.program_study.clone();
        }
    }

    Ok(Json(stats))
}

/// Url: `GET /api/v1/reports/student/:id`
pub async fn student_report(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<StudentStatistics>, Error> {
    check_report_access(&principal)?;

    let id: Uuid = id
        .parse()
        .map_err(|_| Error::Validation("invalid student id".to_string()))?;

    let mut stats = state.details.student_statistics(id).await?;
    if let Some(student) = state.identity.student_by_id(id).await? {
        stats.student_name = student.full_name;
    }

    Ok(Json(stats))
}
