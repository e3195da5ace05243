//! Router-level tests driving the production routing table through
//! `tower::ServiceExt::oneshot`, over fresh in-memory stores per test.

mod achievement;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use crate::account::{Lecturer, Student, User};
use crate::auth::token::TokenCodec;
use crate::auth::{hash_password, Principal};
use crate::config::Config;
use crate::store::memory::{MemDetailStore, MemIdentityStore, MemReferenceStore};
use crate::{router, AppState};

pub(crate) const TEST_PASSWORD: &str = "password123456";

pub(crate) struct TestEnv {
    pub state: Arc<AppState>,
    pub identity: Arc<MemIdentityStore>,
    pub references: Arc<MemReferenceStore>,
    pub details: Arc<MemDetailStore>,
}

impl TestEnv {
    pub fn new() -> Self {
        let config = Config::default();
        let identity = Arc::new(MemIdentityStore::new());
        let references = Arc::new(MemReferenceStore::new());
        let details = Arc::new(MemDetailStore::new());
        let state = Arc::new(AppState {
            tokens: TokenCodec::new(&config.jwt),
            identity: identity.clone(),
            references: references.clone(),
            details: details.clone(),
            config,
        });
        Self {
            state,
            identity,
            references,
            details,
        }
    }

    pub fn app(&self) -> Router {
        router(self.state.clone())
    }

    /// Create an active user in the given role and hand back an access
    /// token for them.
    pub async fn seed_user(&self, username: &str, role_name: &str) -> (User, String) {
        seed_user(&self.identity, &self.state.tokens, username, role_name).await
    }

    pub async fn seed_student(&self, username: &str) -> (User, Student, String) {
        let (user, token) = self.seed_user(username, stars_shared::account::role::STUDENT).await;
        let student = Student {
            id: Uuid::new_v4(),
            user_id: user.id,
            student_number: format!("S-{}", &username.to_uppercase()),
            program_study: "Computer Science".to_string(),
            academic_year: "2025".to_string(),
            advisor_id: None,
            full_name: String::new(),
            created_at: Utc::now(),
        };
        self.identity.add_student(student.clone());
        (user, student, token)
    }

    pub async fn seed_lecturer(&self, username: &str) -> (User, Lecturer, String) {
        let (user, token) = self
            .seed_user(username, stars_shared::account::role::LECTURER)
            .await;
        let lecturer = Lecturer {
            id: Uuid::new_v4(),
            user_id: user.id,
            lecturer_number: format!("L-{}", &username.to_uppercase()),
            department: "Informatics".to_string(),
            full_name: String::new(),
            created_at: Utc::now(),
        };
        self.identity.add_lecturer(lecturer.clone());
        (user, lecturer, token)
    }
}

pub(crate) async fn seed_user(
    identity: &MemIdentityStore,
    tokens: &TokenCodec,
    username: &str,
    role_name: &str,
) -> (User, String) {
    use crate::store::IdentityStore;

    let role = identity.role_named(role_name).unwrap();
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        full_name: format!("{username} of testing"),
        password_sha: hash_password(TEST_PASSWORD),
        role_id: role.id,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    identity.create_user(user.clone()).await.unwrap();

    let principal = Principal {
        user_id: user.id,
        role_id: role.id,
        role_name: role.name.clone(),
        permissions: role.permissions.clone(),
    };
    let token = tokens.issue_access_token(&principal).unwrap();
    (user, token)
}

/// Fire one request at the router and decode the JSON response.
pub(crate) async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Like [`send`], but with a raw (non-JSON) request body.
pub(crate) async fn send_bytes(
    app: &Router,
    method: Method,
    uri: &str,
    token: &str,
    content_type: &str,
    body: Vec<u8>,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .uri(uri)
        .method(method)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Create a draft achievement through the API and return its id.
pub(crate) async fn create_achievement(env: &TestEnv, token: &str, title: &str) -> Uuid {
    let (status, body) = send(
        &env.app(),
        Method::POST,
        "/api/v1/achievements",
        Some(token),
        Some(serde_json::json!({
            "title": title,
            "description": "created from the test suite",
            "achievementType": "competition",
            "tags": ["testing"],
            "points": 100,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "draft");
    body["id"].as_str().unwrap().parse().unwrap()
}

pub(crate) async fn submit_achievement(env: &TestEnv, token: &str, id: Uuid) {
    let (status, _) = send(
        &env.app(),
        Method::POST,
        &format!("/api/v1/achievements/{id}/submit"),
        Some(token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
