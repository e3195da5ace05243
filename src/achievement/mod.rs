pub mod handle;
pub mod visibility;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stars_shared::achievement::handle::HistoryEntry;
use stars_shared::achievement::Status;
use uuid::Uuid;

/// The relational record tracking an achievement through the workflow.
///
/// The reference is authoritative for workflow state; the document it
/// points at (via `detail_id`) is authoritative for content. Invariants:
/// `submitted_at` is set iff the status has reached submitted or later,
/// `verified_at`/`verified_by` are set iff the status is verified or
/// rejected, and `rejection_note` is set iff the status is rejected.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AchievementReference {
    pub id: Uuid,
    pub student_id: Uuid,
    /// Key of the detail document in the document store.
    pub detail_id: String,
    pub status: Status,
    pub submitted_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub rejection_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AchievementReference {
    /// A fresh draft owned by `student_id`, pointing at an already
    /// written detail document.
    pub fn new_draft(student_id: Uuid, detail_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            student_id,
            detail_id,
            status: Status::Draft,
            submitted_at: None,
            verified_at: None,
            verified_by: None,
            rejection_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Derive the audit trail from the reference's own timestamps.
    /// Nothing is persisted for this; the entries are a pure projection.
    pub fn history(&self) -> Vec<HistoryEntry> {
        let mut entries = vec![HistoryEntry {
            status: "created".to_string(),
            timestamp: self.created_at,
            by: None,
            note: Some("Achievement draft created".to_string()),
        }];

        if let Some(at) = self.submitted_at {
            entries.push(HistoryEntry {
                status: "submitted".to_string(),
                timestamp: at,
                by: None,
                note: Some("Submitted for verification".to_string()),
            });
        }

        if let Some(at) = self.verified_at {
            let action = if self.status == Status::Rejected {
                "rejected"
            } else {
                "verified"
            };
            entries.push(HistoryEntry {
                status: action.to_string(),
                timestamp: at,
                by: self.verified_by,
                note: self.rejection_note.clone().filter(|note| !note.is_empty()),
            });
        }

        entries
    }
}
