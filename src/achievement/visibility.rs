//! Computes which achievement references a caller may list or fetch.
//!
//! Students see their own records, advisors see their advisees'
//! non-draft records, admins see everything.

use stars_shared::account::role;
use stars_shared::achievement::Status;
use uuid::Uuid;

use super::AchievementReference;
use crate::auth::Principal;
use crate::store::IdentityStore;
use crate::Error;

/// Listing scope for a caller.
pub enum Scope {
    /// Unrestricted (admins).
    All,
    /// Only references owned by this student.
    Own(Uuid),
    /// Only references owned by one of these advisees. May be empty,
    /// in which case nothing is visible.
    Advisees(Vec<Uuid>),
}

/// Resolve the caller's listing scope.
///
/// A lecturer without a profile, or without advisees, simply sees an
/// empty listing; a student without a profile is a 404, since the
/// student role implies one should exist.
pub async fn listing_scope(
    principal: &Principal,
    identity: &dyn IdentityStore,
) -> Result<Scope, Error> {
    if principal.role_name.eq_ignore_ascii_case(role::STUDENT) {
        let student = identity
            .student_by_user(principal.user_id)
            .await?
            .ok_or(Error::NotFound("student profile"))?;
        return Ok(Scope::Own(student.id));
    }

    if principal.role_name.eq_ignore_ascii_case(role::LECTURER) {
        let advisees = match identity.lecturer_by_user(principal.user_id).await? {
            Some(lecturer) => identity.advisees(lecturer.id).await?,
            None => Vec::new(),
        };
        return Ok(Scope::Advisees(
            advisees.into_iter().map(|student| student.id).collect(),
        ));
    }

    Ok(Scope::All)
}

/// Statuses a listing falls back to when the caller gives no explicit
/// filter. Advisors are scoped down to work that concerns them; drafts
/// stay out unless asked for.
pub fn default_statuses(principal: &Principal) -> Vec<Status> {
    if principal.role_name.eq_ignore_ascii_case(role::LECTURER) {
        vec![Status::Submitted, Status::Verified]
    } else {
        Vec::new()
    }
}

/// Whether the caller may fetch this reference directly (detail and
/// history endpoints).
///
/// Advisors are denied on drafts outright, even for their own advisees;
/// an explicit listing filter cannot be used to reach a draft this way.
pub async fn check_detail_access(
    principal: &Principal,
    reference: &AchievementReference,
    identity: &dyn IdentityStore,
) -> Result<(), Error> {
    if principal.role_name.eq_ignore_ascii_case(role::STUDENT) {
        let student = identity
            .student_by_user(principal.user_id)
            .await?
            .ok_or(Error::Storage("student profile missing for caller".to_string()))?;
        if reference.student_id != student.id {
            return Err(Error::Forbidden("you cannot view this achievement"));
        }
        return Ok(());
    }

    if principal.role_name.eq_ignore_ascii_case(role::LECTURER) {
        let lecturer = identity
            .lecturer_by_user(principal.user_id)
            .await?
            .ok_or(Error::Forbidden("lecturer profile not found"))?;
        let advisees = identity.advisees(lecturer.id).await?;
        if !advisees
            .iter()
            .any(|student| student.id == reference.student_id)
        {
            return Err(Error::Forbidden("this student is not your advisee"));
        }
        if reference.status == Status::Draft {
            return Err(Error::Forbidden(
                "you cannot view draft achievements of your advisees",
            ));
        }
        return Ok(());
    }

    Ok(())
}
