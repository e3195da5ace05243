//! In-memory store adapters.
//!
//! Each adapter implements one store trait over a [`DashMap`]. The
//! identity store optionally snapshots user records as TOML files under
//! the configured data directory and reads them back at startup;
//! snapshot failures are logged, never surfaced. References and details
//! are held in memory only.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use stars_shared::account::{perm, role};
use stars_shared::achievement::{AchievementContent, AchievementDetail, Attachment, Status};
use stars_shared::report::{GlobalStatistics, StudentStatistics, TopStudent};
use std::collections::HashMap;
use std::path::PathBuf;
use uuid::Uuid;

use super::{IdentityStore, ReferenceFilter, SortOrder};
use crate::account::{Lecturer, Role, Student, User};
use crate::achievement::AchievementReference;
use crate::Error;

pub struct MemIdentityStore {
    users: DashMap<Uuid, User>,
    roles: DashMap<Uuid, Role>,
    students: DashMap<Uuid, Student>,
    lecturers: DashMap<Uuid, Lecturer>,
    data_dir: Option<PathBuf>,
}

impl MemIdentityStore {
    /// An empty store with the built-in roles and no persistence.
    pub fn new() -> Self {
        Self::load(None)
    }

    /// A store persisting user snapshots under `data_dir`, reading any
    /// existing snapshots back in.
    pub fn load(data_dir: Option<PathBuf>) -> Self {
        let this = Self {
            users: DashMap::new(),
            roles: DashMap::new(),
            students: DashMap::new(),
            lecturers: DashMap::new(),
            data_dir,
        };
        this.seed_roles();
        this.load_users();
        this
    }

    fn seed_roles(&self) {
        let seeds: [(&str, &str, &[&str]); 3] = [
            (
                role::STUDENT,
                "Submits achievements and manages own drafts",
                &[
                    perm::ACHIEVEMENT_CREATE,
                    perm::ACHIEVEMENT_READ,
                    perm::ACHIEVEMENT_UPDATE,
                    perm::ACHIEVEMENT_DELETE,
                ],
            ),
            (
                role::LECTURER,
                "Reviews achievements submitted by advisees",
                &[
                    perm::ACHIEVEMENT_READ,
                    perm::ACHIEVEMENT_VERIFY,
                    perm::MANAGE_STUDENTS,
                ],
            ),
            (
                role::ADMIN,
                "Manages users and reads reports",
                &[
                    perm::ACHIEVEMENT_READ,
                    perm::REPORT_STUDENTS,
                    perm::MANAGE_STUDENTS,
                    perm::MANAGE_LECTURERS,
                ],
            ),
        ];

        for (name, description, permissions) in seeds {
            let role = Role {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: description.to_string(),
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
            };
            self.roles.insert(role.id, role);
        }
    }

    /// Look a role up by its canonical name. Used for bootstrap and
    /// test seeding; request paths resolve roles by id.
    pub fn role_named(&self, name: &str) -> Option<Role> {
        self.roles
            .iter()
            .find(|entry| entry.value().name == name)
            .map(|entry| entry.value().clone())
    }

    pub fn add_student(&self, student: Student) {
        self.students.insert(student.id, student);
    }

    pub fn add_lecturer(&self, lecturer: Lecturer) {
        self.lecturers.insert(lecturer.id, lecturer);
    }

    /// Denormalize the owning user's name onto a profile.
    fn fill_student_name(&self, mut student: Student) -> Student {
        student.full_name = self
            .users
            .get(&student.user_id)
            .map(|user| user.full_name.clone())
            .unwrap_or_default();
        student
    }

    fn fill_lecturer_name(&self, mut lecturer: Lecturer) -> Lecturer {
        lecturer.full_name = self
            .users
            .get(&lecturer.user_id)
            .map(|user| user.full_name.clone())
            .unwrap_or_default();
        lecturer
    }

    fn users_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join("users"))
    }

    fn save_user(&self, user: &User) {
        let Some(dir) = self.users_dir() else {
            return;
        };
        let result = std::fs::create_dir_all(&dir).and_then(|_| {
            let body = toml::to_string(user)
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
            std::fs::write(dir.join(format!("{}.toml", user.id)), body)
        });
        if let Err(err) = result {
            tracing::error!("error while saving user {}: {err}", user.id);
        }
    }

    fn load_users(&self) {
        let Some(dir) = self.users_dir() else {
            return;
        };
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return;
        };
        for entry in entries.flatten() {
            match std::fs::read_to_string(entry.path())
                .map_err(|err| err.to_string())
                .and_then(|raw| toml::from_str::<User>(&raw).map_err(|err| err.to_string()))
            {
                Ok(user) => {
                    self.users.insert(user.id, user);
                }
                Err(err) => {
                    tracing::warn!("skipping unreadable user snapshot {:?}: {err}", entry.path())
                }
            }
        }
    }
}

impl Default for MemIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[axum::async_trait]
impl IdentityStore for MemIdentityStore {
    async fn user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().username == username)
            .map(|entry| entry.value().clone()))
    }

    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, Error> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn all_users(&self) -> Result<Vec<User>, Error> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }

    async fn create_user(&self, user: User) -> Result<(), Error> {
        self.save_user(&user);
        self.users.insert(user.id, user);
        Ok(())
    }

    async fn update_user(&self, user: User) -> Result<(), Error> {
        self.save_user(&user);
        self.users.insert(user.id, user);
        Ok(())
    }

    async fn deactivate_user(&self, id: Uuid) -> Result<(), Error> {
        if let Some(mut user) = self.users.get_mut(&id) {
            user.is_active = false;
            user.updated_at = Utc::now();
            let snapshot = user.clone();
            drop(user);
            self.save_user(&snapshot);
        }
        Ok(())
    }

    async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), Error> {
        if let Some(mut user) = self.users.get_mut(&user_id) {
            user.role_id = role_id;
            user.updated_at = Utc::now();
            let snapshot = user.clone();
            drop(user);
            self.save_user(&snapshot);
        }
        Ok(())
    }

    async fn role_by_id(&self, id: Uuid) -> Result<Option<Role>, Error> {
        Ok(self.roles.get(&id).map(|entry| entry.value().clone()))
    }

    async fn permissions_for_role(&self, role_id: Uuid) -> Result<Vec<String>, Error> {
        Ok(self
            .roles
            .get(&role_id)
            .map(|entry| entry.value().permissions.clone())
            .unwrap_or_default())
    }

    async fn student_by_user(&self, user_id: Uuid) -> Result<Option<Student>, Error> {
        Ok(self
            .students
            .iter()
            .find(|entry| entry.value().user_id == user_id)
            .map(|entry| self.fill_student_name(entry.value().clone())))
    }

    async fn student_by_id(&self, id: Uuid) -> Result<Option<Student>, Error> {
        Ok(self
            .students
            .get(&id)
            .map(|entry| self.fill_student_name(entry.value().clone())))
    }

    async fn students_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Student>, Error> {
        Ok(ids
            .iter()
            .filter_map(|id| self.students.get(id))
            .map(|entry| self.fill_student_name(entry.value().clone()))
            .collect())
    }

    async fn all_students(&self) -> Result<Vec<Student>, Error> {
        let mut students: Vec<Student> = self
            .students
            .iter()
            .map(|entry| self.fill_student_name(entry.value().clone()))
            .collect();
        students.sort_by_key(|student| student.created_at);
        Ok(students)
    }

    async fn update_advisor(&self, student_id: Uuid, lecturer_id: Uuid) -> Result<(), Error> {
        match self.students.get_mut(&student_id) {
            Some(mut student) => {
                student.advisor_id = Some(lecturer_id);
                Ok(())
            }
            None => Err(Error::NotFound("student")),
        }
    }

    async fn lecturer_by_user(&self, user_id: Uuid) -> Result<Option<Lecturer>, Error> {
        Ok(self
            .lecturers
            .iter()
            .find(|entry| entry.value().user_id == user_id)
            .map(|entry| self.fill_lecturer_name(entry.value().clone())))
    }

    async fn all_lecturers(&self) -> Result<Vec<Lecturer>, Error> {
        let mut lecturers: Vec<Lecturer> = self
            .lecturers
            .iter()
            .map(|entry| self.fill_lecturer_name(entry.value().clone()))
            .collect();
        lecturers.sort_by_key(|lecturer| lecturer.created_at);
        Ok(lecturers)
    }

    async fn advisees(&self, lecturer_id: Uuid) -> Result<Vec<Student>, Error> {
        Ok(self
            .students
            .iter()
            .filter(|entry| entry.value().advisor_id == Some(lecturer_id))
            .map(|entry| self.fill_student_name(entry.value().clone()))
            .collect())
    }
}

#[derive(Default)]
pub struct MemReferenceStore {
    references: DashMap<Uuid, AchievementReference>,
}

impl MemReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(reference: &AchievementReference, filter: &ReferenceFilter) -> bool {
    if reference.status == Status::Deleted {
        return false;
    }
    if let Some(student_id) = filter.student_id {
        if reference.student_id != student_id {
            return false;
        }
    }
    if let Some(student_ids) = &filter.student_ids {
        if !student_ids.contains(&reference.student_id) {
            return false;
        }
    }
    if !filter.statuses.is_empty() && !filter.statuses.contains(&reference.status) {
        return false;
    }
    true
}

#[axum::async_trait]
impl super::ReferenceStore for MemReferenceStore {
    async fn insert(&self, reference: AchievementReference) -> Result<(), Error> {
        self.references.insert(reference.id, reference);
        Ok(())
    }

    async fn by_id(&self, id: Uuid) -> Result<Option<AchievementReference>, Error> {
        Ok(self
            .references
            .get(&id)
            .filter(|entry| entry.value().status != Status::Deleted)
            .map(|entry| entry.value().clone()))
    }

    async fn list(
        &self,
        filter: &ReferenceFilter,
        limit: i64,
        offset: i64,
        sort: SortOrder,
    ) -> Result<(Vec<AchievementReference>, i64), Error> {
        let mut hits: Vec<AchievementReference> = self
            .references
            .iter()
            .filter(|entry| matches(entry.value(), filter))
            .map(|entry| entry.value().clone())
            .collect();

        match sort {
            SortOrder::CreatedAtAsc => hits.sort_by_key(|r| r.created_at),
            SortOrder::CreatedAtDesc => {
                hits.sort_by_key(|r| std::cmp::Reverse(r.created_at))
            }
        }

        let total = hits.len() as i64;
        let page = hits
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn submit(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, Error> {
        match self.references.get_mut(&id) {
            Some(mut reference) if reference.status == Status::Draft => {
                reference.status = Status::Submitted;
                reference.submitted_at = Some(at);
                reference.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn review(
        &self,
        id: Uuid,
        to: Status,
        by: Uuid,
        at: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<bool, Error> {
        match self.references.get_mut(&id) {
            Some(mut reference) if reference.status == Status::Submitted => {
                reference.status = to;
                reference.verified_at = Some(at);
                reference.verified_by = Some(by);
                reference.rejection_note = note;
                reference.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_deleted(&self, id: Uuid) -> Result<bool, Error> {
        match self.references.get_mut(&id) {
            Some(mut reference) if reference.status == Status::Draft => {
                reference.status = Status::Deleted;
                reference.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemDetailStore {
    documents: DashMap<String, AchievementDetail>,
}

impl MemDetailStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[axum::async_trait]
impl super::DetailStore for MemDetailStore {
    async fn insert(&self, detail: AchievementDetail) -> Result<String, Error> {
        let id = Uuid::new_v4().simple().to_string();
        self.documents.insert(id.clone(), detail);
        Ok(id)
    }

    async fn by_id(&self, id: &str) -> Result<Option<AchievementDetail>, Error> {
        Ok(self.documents.get(id).map(|entry| entry.value().clone()))
    }

    async fn by_ids(&self, ids: &[String]) -> Result<Vec<(String, AchievementDetail)>, Error> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.documents
                    .get(id)
                    .map(|entry| (id.clone(), entry.value().clone()))
            })
            .collect())
    }

    async fn by_student(&self, student_id: Uuid) -> Result<Vec<AchievementDetail>, Error> {
        let mut documents: Vec<AchievementDetail> = self
            .documents
            .iter()
            .filter(|entry| entry.value().student_id == student_id)
            .map(|entry| entry.value().clone())
            .collect();
        documents.sort_by_key(|doc| doc.created_at);
        Ok(documents)
    }

    async fn update_content(&self, id: &str, content: AchievementContent) -> Result<(), Error> {
        match self.documents.get_mut(id) {
            Some(mut document) => {
                document.content = content;
                document.updated_at = Utc::now();
                Ok(())
            }
            None => Err(Error::Storage(format!("detail document {id} missing"))),
        }
    }

    async fn push_attachment(&self, id: &str, attachment: Attachment) -> Result<(), Error> {
        match self.documents.get_mut(id) {
            Some(mut document) => {
                document.attachments.push(attachment);
                document.updated_at = Utc::now();
                Ok(())
            }
            None => Err(Error::Storage(format!("detail document {id} missing"))),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), Error> {
        self.documents.remove(id);
        Ok(())
    }

    async fn global_statistics(&self) -> Result<GlobalStatistics, Error> {
        let mut stats = GlobalStatistics::default();
        let mut points: HashMap<Uuid, i64> = HashMap::new();

        for entry in self.documents.iter() {
            let doc = entry.value();
            stats.total_achievements += 1;
            *stats
                .type_distribution
                .entry(doc.content.achievement_type.clone())
                .or_default() += 1;
            *stats
                .level_distribution
                .entry(doc.content.details.competition_level.clone())
                .or_default() += 1;
            *stats
                .trend_by_year
                .entry(doc.created_at.format("%Y").to_string())
                .or_default() += 1;
            *points.entry(doc.student_id).or_default() += doc.content.points as i64;
        }

        let mut top: Vec<TopStudent> = points
            .into_iter()
            .map(|(student_id, total_points)| TopStudent {
                student_id,
                name: String::new(),
                program_study: String::new(),
                total_points,
            })
            .collect();
        top.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then(a.student_id.cmp(&b.student_id))
        });
        top.truncate(5);
        stats.points_distribution = top;

        Ok(stats)
    }

    async fn student_statistics(&self, student_id: Uuid) -> Result<StudentStatistics, Error> {
        let mut stats = StudentStatistics::default();
        for entry in self.documents.iter() {
            let doc = entry.value();
            if doc.student_id != student_id {
                continue;
            }
            stats.total_achievements += 1;
            stats.total_points += doc.content.points as i64;
            *stats
                .by_type
                .entry(doc.content.achievement_type.clone())
                .or_default() += 1;
        }
        Ok(stats)
    }
}
