//! Storage collaborators, one trait per backing store.
//!
//! The workflow engine and handlers depend only on these traits; the
//! concrete adapters live in [`memory`]. Splitting reference and detail
//! stores mirrors the physical split: references live in the relational
//! store and are authoritative for workflow state, details live in the
//! document store and are authoritative for content. There is no
//! transaction spanning the two.

pub mod memory;

use axum::async_trait;
use chrono::{DateTime, Utc};
use stars_shared::achievement::{AchievementContent, AchievementDetail, Attachment, Status};
use stars_shared::report::{GlobalStatistics, StudentStatistics};
use uuid::Uuid;

use crate::account::{Lecturer, Role, Student, User};
use crate::achievement::AchievementReference;
use crate::Error;

/// Listing filter for achievement references. An empty `statuses`
/// vector matches every live status; the deleted marker never matches.
#[derive(Clone, Debug, Default)]
pub struct ReferenceFilter {
    pub student_id: Option<Uuid>,
    /// `Some` scopes to the given owners; an empty vector matches
    /// nothing at all.
    pub student_ids: Option<Vec<Uuid>>,
    pub statuses: Vec<Status>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    CreatedAtDesc,
    CreatedAtAsc,
}

impl SortOrder {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("created_at_asc") => SortOrder::CreatedAtAsc,
            _ => SortOrder::CreatedAtDesc,
        }
    }
}

/// The identity and role collaborator: users, roles with their
/// permission sets, and the student/lecturer profiles hanging off
/// user accounts.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, Error>;
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, Error>;
    async fn all_users(&self) -> Result<Vec<User>, Error>;
    async fn create_user(&self, user: User) -> Result<(), Error>;
    async fn update_user(&self, user: User) -> Result<(), Error>;
    /// Soft delete: the user stays on record but can no longer log in.
    async fn deactivate_user(&self, id: Uuid) -> Result<(), Error>;
    async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), Error>;

    async fn role_by_id(&self, id: Uuid) -> Result<Option<Role>, Error>;
    async fn permissions_for_role(&self, role_id: Uuid) -> Result<Vec<String>, Error>;

    async fn student_by_user(&self, user_id: Uuid) -> Result<Option<Student>, Error>;
    async fn student_by_id(&self, id: Uuid) -> Result<Option<Student>, Error>;
    async fn students_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Student>, Error>;
    async fn all_students(&self) -> Result<Vec<Student>, Error>;
    async fn update_advisor(&self, student_id: Uuid, lecturer_id: Uuid) -> Result<(), Error>;

    async fn lecturer_by_user(&self, user_id: Uuid) -> Result<Option<Lecturer>, Error>;
    async fn all_lecturers(&self) -> Result<Vec<Lecturer>, Error>;
    async fn advisees(&self, lecturer_id: Uuid) -> Result<Vec<Student>, Error>;
}

/// The relational store of achievement references.
///
/// The state-changing operations are conditional updates: they succeed
/// only when the reference is still in the expected source state, and
/// report `false` otherwise. That check-and-write happens under the
/// store's own record lock, which is what resolves double-submit races.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn insert(&self, reference: AchievementReference) -> Result<(), Error>;
    /// Deleted references are invisible here.
    async fn by_id(&self, id: Uuid) -> Result<Option<AchievementReference>, Error>;
    /// Returns one page plus the total match count.
    async fn list(
        &self,
        filter: &ReferenceFilter,
        limit: i64,
        offset: i64,
        sort: SortOrder,
    ) -> Result<(Vec<AchievementReference>, i64), Error>;

    /// draft -> submitted, stamping `submitted_at`.
    async fn submit(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, Error>;
    /// submitted -> verified or rejected, stamping the reviewer.
    async fn review(
        &self,
        id: Uuid,
        to: Status,
        by: Uuid,
        at: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<bool, Error>;
    /// draft -> the deleted marker; the record stops resolving anywhere.
    async fn mark_deleted(&self, id: Uuid) -> Result<bool, Error>;
}

/// The document store of achievement details and the read-only
/// aggregates computed over it.
#[async_trait]
pub trait DetailStore: Send + Sync {
    /// Returns the generated document id.
    async fn insert(&self, detail: AchievementDetail) -> Result<String, Error>;
    async fn by_id(&self, id: &str) -> Result<Option<AchievementDetail>, Error>;
    /// Returns `(id, document)` pairs for every id that resolves;
    /// missing ids are simply absent from the result.
    async fn by_ids(&self, ids: &[String]) -> Result<Vec<(String, AchievementDetail)>, Error>;
    async fn by_student(&self, student_id: Uuid) -> Result<Vec<AchievementDetail>, Error>;
    /// Replace the content fields, leaving attachments alone.
    async fn update_content(&self, id: &str, content: AchievementContent) -> Result<(), Error>;
    async fn push_attachment(&self, id: &str, attachment: Attachment) -> Result<(), Error>;
    /// Deleting an absent document is not an error.
    async fn delete(&self, id: &str) -> Result<(), Error>;

    async fn global_statistics(&self) -> Result<GlobalStatistics, Error>;
    async fn student_statistics(&self, student_id: Uuid) -> Result<StudentStatistics, Error>;
}
