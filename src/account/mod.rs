pub mod handle;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stars_shared::account::{LecturerInfo, StudentInfo};
use uuid::Uuid;

/// A login account, the relational side of an identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    /// sha256 digest of the password.
    pub password_sha: String,
    pub role_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A role together with its flat `resource:action` permission set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
}

/// A student profile linked to a user account, optionally linked to an
/// advising lecturer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub user_id: Uuid,
    pub student_number: String,
    pub program_study: String,
    pub academic_year: String,
    pub advisor_id: Option<Uuid>,
    /// Denormalized from the user record on read.
    #[serde(default)]
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

impl Student {
    pub fn info(&self) -> StudentInfo {
        StudentInfo {
            id: self.id,
            student_number: self.student_number.clone(),
            full_name: self.full_name.clone(),
            program_study: self.program_study.clone(),
            academic_year: self.academic_year.clone(),
            advisor_id: self.advisor_id,
        }
    }
}

/// A lecturer profile linked to a user account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lecturer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lecturer_number: String,
    pub department: String,
    #[serde(default)]
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

impl Lecturer {
    pub fn info(&self) -> LecturerInfo {
        LecturerInfo {
            id: self.id,
            lecturer_number: self.lecturer_number.clone(),
            full_name: self.full_name.clone(),
            department: self.department.clone(),
        }
    }
}
