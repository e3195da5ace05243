pub mod handle;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Workflow state of an achievement reference.
///
/// `Deleted` is a soft-delete marker; references carrying it never
/// appear in listings or lookups and the variant never crosses the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Submitted,
    Verified,
    Rejected,
    Deleted,
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Status::Draft => "draft",
            Status::Submitted => "submitted",
            Status::Verified => "verified",
            Status::Rejected => "rejected",
            Status::Deleted => "deleted",
        })
    }
}

impl FromStr for Status {
    type Err = ();

    /// Parses the statuses accepted as a listing filter.
    /// The deleted marker is intentionally not parseable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Status::Draft),
            "submitted" => Ok(Status::Submitted),
            "verified" => Ok(Status::Verified),
            "rejected" => Ok(Status::Rejected),
            _ => Err(()),
        }
    }
}

/// The free-form content of an achievement, stored in the document store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementContent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub achievement_type: String,
    #[serde(default)]
    pub details: CompetitionDetails,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub points: i32,
}

/// Nested competition metadata; every field is optional in practice,
/// absent ones default to empty/zero.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionDetails {
    #[serde(default)]
    pub competition_name: String,
    #[serde(default)]
    pub competition_level: String,
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub medal_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub organizer: String,
    #[serde(default)]
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<DateTime<Utc>>,
}

/// A stored file attached to an achievement.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// The whole detail document as kept in the document store. Workflow
/// state never lives here; the relational reference is authoritative
/// for that.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDetail {
    pub student_id: uuid::Uuid,
    #[serde(flatten)]
    pub content: AchievementContent,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
