pub mod handle;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role names known to the system.
///
/// Role checks are case-insensitive, so these are canonical spellings
/// rather than the only accepted ones.
pub mod role {
    pub const STUDENT: &str = "student";
    pub const LECTURER: &str = "lecturer";
    pub const ADMIN: &str = "admin";
}

/// Fine-grained `resource:action` permission strings.
///
/// Unlike role names these are matched case-sensitively.
pub mod perm {
    pub const ACHIEVEMENT_CREATE: &str = "achievement:create";
    pub const ACHIEVEMENT_READ: &str = "achievement:read";
    pub const ACHIEVEMENT_UPDATE: &str = "achievement:update";
    pub const ACHIEVEMENT_DELETE: &str = "achievement:delete";
    pub const ACHIEVEMENT_VERIFY: &str = "achievement:verify";
    pub const REPORT_STUDENTS: &str = "report:students";
    pub const MANAGE_STUDENTS: &str = "manage:students";
    pub const MANAGE_LECTURERS: &str = "manage:lecturers";
}

/// Public view of a user, returned by login, profile and user management.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub role: String,
    pub permissions: Vec<String>,
}

/// Public view of a student profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    pub id: Uuid,
    pub student_number: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub full_name: String,
    pub program_study: String,
    pub academic_year: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisor_id: Option<Uuid>,
}

/// Public view of a lecturer profile.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LecturerInfo {
    pub id: Uuid,
    pub lecturer_number: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub full_name: String,
    pub department: String,
}
