use super::*;
use crate::achievement::AchievementReference;
use crate::store::{DetailStore, IdentityStore, ReferenceFilter, ReferenceStore, SortOrder};
use crate::Error;
use chrono::DateTime;
use stars_shared::achievement::Status;

#[tokio::test]
async fn scenario_a_create_then_scoped_detail_access() {
    let env = TestEnv::new();
    let (_, _, token) = env.seed_student("alice").await;
    let (_, _, other_token) = env.seed_student("mallory").await;

    let id = create_achievement(&env, &token, "Hackathon Winner").await;

    let (status, body) = send(
        &env.app(),
        Method::GET,
        &format!("/api/v1/achievements/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "draft");
    assert_eq!(body["details"]["title"], "Hackathon Winner");

    let (status, body) = send(
        &env.app(),
        Method::GET,
        &format!("/api/v1/achievements/{id}"),
        Some(&other_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden: you cannot view this achievement");
}

#[tokio::test]
async fn scenario_b_submit_is_single_shot() {
    let env = TestEnv::new();
    let (_, _, token) = env.seed_student("alice").await;
    let id = create_achievement(&env, &token, "Hackathon Winner").await;

    submit_achievement(&env, &token, id).await;

    let stored = env.references.by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, Status::Submitted);
    assert!(stored.submitted_at.is_some());

    let (status, body) = send(
        &env.app(),
        Method::POST,
        &format!("/api/v1/achievements/{id}/submit"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "only draft achievements can be submitted");

    // The stored state is untouched by the failed second submit.
    let after = env.references.by_id(id).await.unwrap().unwrap();
    assert_eq!(after.status, Status::Submitted);
    assert_eq!(after.submitted_at, stored.submitted_at);
}

#[tokio::test]
async fn scenario_c_verification_stamps_reviewer() {
    let env = TestEnv::new();
    let (_, student, student_token) = env.seed_student("alice").await;
    let (advisor_user, advisor, advisor_token) = env.seed_lecturer("prof").await;
    env.identity
        .update_advisor(student.id, advisor.id)
        .await
        .unwrap();

    let id = create_achievement(&env, &student_token, "Hackathon Winner").await;
    submit_achievement(&env, &student_token, id).await;

    let (status, _) = send(
        &env.app(),
        Method::POST,
        &format!("/api/v1/achievements/{id}/verify"),
        Some(&advisor_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let stored = env.references.by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, Status::Verified);
    assert_eq!(stored.verified_by, Some(advisor_user.id));
    assert!(stored.verified_at.is_some());

    // Verifying twice hits the submitted-only guard.
    let (status, body) = send(
        &env.app(),
        Method::POST,
        &format!("/api/v1/achievements/{id}/verify"),
        Some(&advisor_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "achievement must be in 'submitted' status to be verified"
    );
}

/// The advisee link is deliberately not checked on verification: any
/// caller with a lecturer profile and the verify permission may review
/// a submitted achievement.
#[tokio::test]
async fn verify_allows_any_lecturer() {
    let env = TestEnv::new();
    let (_, _, student_token) = env.seed_student("alice").await;
    let (outsider_user, _, outsider_token) = env.seed_lecturer("unrelated").await;

    let id = create_achievement(&env, &student_token, "Hackathon Winner").await;
    submit_achievement(&env, &student_token, id).await;

    let (status, _) = send(
        &env.app(),
        Method::POST,
        &format!("/api/v1/achievements/{id}/verify"),
        Some(&outsider_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let stored = env.references.by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.verified_by, Some(outsider_user.id));
}

#[tokio::test]
async fn verify_requires_lecturer_profile() {
    let env = TestEnv::new();
    let (_, _, student_token) = env.seed_student("alice").await;
    // Lecturer role but no lecturer profile behind it.
    let (_, profileless_token) = env
        .seed_user("ghost", stars_shared::account::role::LECTURER)
        .await;

    let id = create_achievement(&env, &student_token, "Hackathon Winner").await;
    submit_achievement(&env, &student_token, id).await;

    let (status, body) = send(
        &env.app(),
        Method::POST,
        &format!("/api/v1/achievements/{id}/verify"),
        Some(&profileless_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden: user is not a lecturer");
}

struct FailingReferenceStore;

#[axum::async_trait]
impl ReferenceStore for FailingReferenceStore {
    async fn insert(&self, _reference: AchievementReference) -> Result<(), Error> {
        Err(Error::Storage("reference write refused".to_string()))
    }

    async fn by_id(&self, _id: Uuid) -> Result<Option<AchievementReference>, Error> {
        Ok(None)
    }

    async fn list(
        &self,
        _filter: &ReferenceFilter,
        _limit: i64,
        _offset: i64,
        _sort: SortOrder,
    ) -> Result<(Vec<AchievementReference>, i64), Error> {
        Ok((Vec::new(), 0))
    }

    async fn submit(&self, _id: Uuid, _at: DateTime<chrono::Utc>) -> Result<bool, Error> {
        Ok(false)
    }

    async fn review(
        &self,
        _id: Uuid,
        _to: Status,
        _by: Uuid,
        _at: DateTime<chrono::Utc>,
        _note: Option<String>,
    ) -> Result<bool, Error> {
        Ok(false)
    }

    async fn mark_deleted(&self, _id: Uuid) -> Result<bool, Error> {
        Ok(false)
    }
}

/// Scenario D: when the reference write fails after the detail write
/// succeeded, the orphaned document is compensated away and the caller
/// gets a 500.
#[tokio::test]
async fn create_compensates_when_reference_write_fails() {
    let config = Config::default();
    let identity = Arc::new(MemIdentityStore::new());
    let details = Arc::new(MemDetailStore::new());
    let state = Arc::new(AppState {
        tokens: TokenCodec::new(&config.jwt),
        identity: identity.clone(),
        references: Arc::new(FailingReferenceStore),
        details: details.clone(),
        config,
    });

    let (user, token) = seed_user(
        &identity,
        &state.tokens,
        "alice",
        stars_shared::account::role::STUDENT,
    )
    .await;
    let student = crate::account::Student {
        id: Uuid::new_v4(),
        user_id: user.id,
        student_number: "S-ALICE".to_string(),
        program_study: "Computer Science".to_string(),
        academic_year: "2025".to_string(),
        advisor_id: None,
        full_name: String::new(),
        created_at: Utc::now(),
    };
    identity.add_student(student.clone());

    let app = router(state);
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/achievements",
        Some(&token),
        Some(serde_json::json!({ "title": "Orphan", "points": 10 })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal server error");
    // The detail document written before the failure is gone again.
    assert!(details.by_student(student.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn ownership_guards_every_student_mutation() {
    let env = TestEnv::new();
    let (_, _, owner_token) = env.seed_student("alice").await;
    let (_, _, other_token) = env.seed_student("mallory").await;

    let id = create_achievement(&env, &owner_token, "Hackathon Winner").await;

    let attempts = [
        (Method::PUT, format!("/api/v1/achievements/{id}"), Some(serde_json::json!({ "title": "stolen" }))),
        (Method::DELETE, format!("/api/v1/achievements/{id}"), None),
        (Method::POST, format!("/api/v1/achievements/{id}/submit"), None),
    ];
    for (method, uri, body) in attempts {
        let (status, body) = send(&env.app(), method, &uri, Some(&other_token), body).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "forbidden: you do not own this achievement");
    }

    // Still an untouched draft owned by alice.
    let stored = env.references.by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, Status::Draft);
}

#[tokio::test]
async fn advisor_never_sees_drafts_directly() {
    let env = TestEnv::new();
    let (_, student, student_token) = env.seed_student("alice").await;
    let (_, advisor, advisor_token) = env.seed_lecturer("prof").await;
    env.identity
        .update_advisor(student.id, advisor.id)
        .await
        .unwrap();

    let draft = create_achievement(&env, &student_token, "Unfinished").await;

    let (status, body) = send(
        &env.app(),
        Method::GET,
        &format!("/api/v1/achievements/{draft}"),
        Some(&advisor_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "forbidden: you cannot view draft achievements of your advisees"
    );

    // A submitted one becomes visible.
    submit_achievement(&env, &student_token, draft).await;
    let (status, _) = send(
        &env.app(),
        Method::GET,
        &format!("/api/v1/achievements/{draft}"),
        Some(&advisor_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn advisor_is_denied_on_non_advisees() {
    let env = TestEnv::new();
    let (_, _, student_token) = env.seed_student("alice").await;
    let (_, _, lecturer_token) = env.seed_lecturer("stranger").await;

    let id = create_achievement(&env, &student_token, "Private").await;
    submit_achievement(&env, &student_token, id).await;

    let (status, body) = send(
        &env.app(),
        Method::GET,
        &format!("/api/v1/achievements/{id}"),
        Some(&lecturer_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden: this student is not your advisee");
}

#[tokio::test]
async fn listing_is_scoped_by_role() {
    let env = TestEnv::new();
    let (_, student_a, token_a) = env.seed_student("alice").await;
    let (_, _, token_b) = env.seed_student("bob").await;
    let (_, advisor, advisor_token) = env.seed_lecturer("prof").await;
    let (_, admin_token) = env.seed_user("root", stars_shared::account::role::ADMIN).await;
    env.identity
        .update_advisor(student_a.id, advisor.id)
        .await
        .unwrap();

    let draft = create_achievement(&env, &token_a, "Draft of alice").await;
    let submitted = create_achievement(&env, &token_a, "Submitted of alice").await;
    submit_achievement(&env, &token_a, submitted).await;
    create_achievement(&env, &token_b, "Draft of bob").await;

    // Students see exactly their own records.
    let (_, body) = send(&env.app(), Method::GET, "/api/v1/achievements", Some(&token_a), None).await;
    assert_eq!(body["meta"]["totalData"], 2);

    // The advisor defaults to submitted/verified work of advisees.
    let (_, body) = send(
        &env.app(),
        Method::GET,
        "/api/v1/achievements",
        Some(&advisor_token),
        None,
    )
    .await;
    assert_eq!(body["meta"]["totalData"], 1);
    assert_eq!(body["data"][0]["id"], submitted.to_string());

    // An explicit status filter widens the advisor listing to drafts.
    let (_, body) = send(
        &env.app(),
        Method::GET,
        "/api/v1/achievements?status=draft",
        Some(&advisor_token),
        None,
    )
    .await;
    assert_eq!(body["meta"]["totalData"], 1);
    assert_eq!(body["data"][0]["id"], draft.to_string());

    // Admins see everything.
    let (_, body) = send(
        &env.app(),
        Method::GET,
        "/api/v1/achievements",
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(body["meta"]["totalData"], 3);

    // A lecturer with no advisees sees an empty page.
    let (_, _, lonely_token) = env.seed_lecturer("lonely").await;
    let (_, body) = send(
        &env.app(),
        Method::GET,
        "/api/v1/achievements",
        Some(&lonely_token),
        None,
    )
    .await;
    assert_eq!(body["meta"]["totalData"], 0);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn listing_paginates_and_clamps() {
    let env = TestEnv::new();
    let (_, _, token) = env.seed_student("alice").await;
    for i in 0..3 {
        create_achievement(&env, &token, &format!("Entry {i}")).await;
    }

    let (_, body) = send(
        &env.app(),
        Method::GET,
        "/api/v1/achievements?page=1&limit=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"]["totalData"], 3);
    assert_eq!(body["meta"]["totalPage"], 2);

    let (_, body) = send(
        &env.app(),
        Method::GET,
        "/api/v1/achievements?page=2&limit=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["meta"]["currentPage"], 2);

    let (_, body) = send(
        &env.app(),
        Method::GET,
        "/api/v1/achievements?limit=500",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["meta"]["limit"], 100);

    let (status, body) = send(
        &env.app(),
        Method::GET,
        "/api/v1/achievements?status=bogus",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown status filter 'bogus'");
}

#[tokio::test]
async fn draft_update_and_delete_lifecycle() {
    let env = TestEnv::new();
    let (_, _, token) = env.seed_student("alice").await;
    let id = create_achievement(&env, &token, "Before").await;

    let (status, _) = send(
        &env.app(),
        Method::PUT,
        &format!("/api/v1/achievements/{id}"),
        Some(&token),
        Some(serde_json::json!({ "title": "After", "points": 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &env.app(),
        Method::GET,
        &format!("/api/v1/achievements/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["details"]["title"], "After");
    assert_eq!(body["details"]["points"], 42);

    let (status, _) = send(
        &env.app(),
        Method::DELETE,
        &format!("/api/v1/achievements/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Gone from lookups and listings alike.
    let (status, _) = send(
        &env.app(),
        Method::GET,
        &format!("/api/v1/achievements/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&env.app(), Method::GET, "/api/v1/achievements", Some(&token), None).await;
    assert_eq!(body["meta"]["totalData"], 0);
}

#[tokio::test]
async fn submitted_achievements_are_frozen() {
    let env = TestEnv::new();
    let (_, _, token) = env.seed_student("alice").await;
    let id = create_achievement(&env, &token, "Frozen").await;
    submit_achievement(&env, &token, id).await;

    let (status, body) = send(
        &env.app(),
        Method::PUT,
        &format!("/api/v1/achievements/{id}"),
        Some(&token),
        Some(serde_json::json!({ "title": "Nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "only draft achievements can be updated");

    let (status, body) = send(
        &env.app(),
        Method::DELETE,
        &format!("/api/v1/achievements/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "only draft achievements can be deleted");
}

#[tokio::test]
async fn reject_requires_note_and_records_it() {
    let env = TestEnv::new();
    let (_, _, student_token) = env.seed_student("alice").await;
    let (_, _, lecturer_token) = env.seed_lecturer("prof").await;

    let id = create_achievement(&env, &student_token, "Questionable").await;
    submit_achievement(&env, &student_token, id).await;

    let (status, body) = send(
        &env.app(),
        Method::POST,
        &format!("/api/v1/achievements/{id}/reject"),
        Some(&lecturer_token),
        Some(serde_json::json!({ "note": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "rejection note is required");

    let (status, _) = send(
        &env.app(),
        Method::POST,
        &format!("/api/v1/achievements/{id}/reject"),
        Some(&lecturer_token),
        Some(serde_json::json!({ "note": "missing evidence" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let stored = env.references.by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, Status::Rejected);
    assert_eq!(stored.rejection_note.as_deref(), Some("missing evidence"));

    let (_, body) = send(
        &env.app(),
        Method::GET,
        &format!("/api/v1/achievements/{id}"),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(body["rejectionNote"], "missing evidence");
}

#[tokio::test]
async fn attachment_upload_on_draft_only() {
    let env = TestEnv::new();
    let (_, _, token) = env.seed_student("alice").await;
    let id = create_achievement(&env, &token, "With files").await;

    let (status, body) = send_bytes(
        &env.app(),
        Method::POST,
        &format!("/api/v1/achievements/{id}/attachments?filename=certificate.pdf"),
        &token,
        "application/pdf",
        b"%PDF-1.4 not really".to_vec(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["attachment"]["fileName"], "certificate.pdf");
    assert_eq!(body["attachment"]["fileType"], "application/pdf");
    assert!(body["attachment"]["fileUrl"]
        .as_str()
        .unwrap()
        .starts_with("/uploads/"));

    let (_, detail) = send(
        &env.app(),
        Method::GET,
        &format!("/api/v1/achievements/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(detail["details"]["attachments"].as_array().unwrap().len(), 1);

    submit_achievement(&env, &token, id).await;
    let (status, _) = send_bytes(
        &env.app(),
        Method::POST,
        &format!("/api/v1/achievements/{id}/attachments?filename=late.pdf"),
        &token,
        "application/pdf",
        b"too late".to_vec(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_is_derived_from_timestamps() {
    let env = TestEnv::new();
    let (_, _, student_token) = env.seed_student("alice").await;
    let (_, _, lecturer_token) = env.seed_lecturer("prof").await;

    let id = create_achievement(&env, &student_token, "Storied").await;

    let (_, history) = send(
        &env.app(),
        Method::GET,
        &format!("/api/v1/achievements/{id}/history"),
        Some(&student_token),
        None,
    )
    .await;
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["status"], "created");

    submit_achievement(&env, &student_token, id).await;
    send(
        &env.app(),
        Method::POST,
        &format!("/api/v1/achievements/{id}/reject"),
        Some(&lecturer_token),
        Some(serde_json::json!({ "note": "redo the paperwork" })),
    )
    .await;

    let (_, history) = send(
        &env.app(),
        Method::GET,
        &format!("/api/v1/achievements/{id}/history"),
        Some(&student_token),
        None,
    )
    .await;
    let entries = history.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["status"], "created");
    assert_eq!(entries[1]["status"], "submitted");
    assert_eq!(entries[2]["status"], "rejected");
    assert_eq!(entries[2]["note"], "redo the paperwork");
    assert!(entries[2]["by"].is_string());
}

#[tokio::test]
async fn references_with_missing_documents_are_dropped_from_listings() {
    let env = TestEnv::new();
    let (_, _, token) = env.seed_student("alice").await;

    let keep = create_achievement(&env, &token, "Kept").await;
    let lose = create_achievement(&env, &token, "Lost").await;

    let orphan = env.references.by_id(lose).await.unwrap().unwrap();
    env.details.delete(&orphan.detail_id).await.unwrap();

    let (_, body) = send(&env.app(), Method::GET, "/api/v1/achievements", Some(&token), None).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], keep.to_string());
}

#[tokio::test]
async fn malformed_and_unknown_ids() {
    let env = TestEnv::new();
    let (_, _, token) = env.seed_student("alice").await;

    let (status, body) = send(
        &env.app(),
        Method::GET,
        "/api/v1/achievements/not-a-uuid",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid achievement id");

    let (status, body) = send(
        &env.app(),
        Method::GET,
        &format!("/api/v1/achievements/{}", Uuid::new_v4()),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "achievement not found");
}

#[tokio::test]
async fn create_requires_student_profile() {
    let env = TestEnv::new();
    // Student role without a student profile behind it.
    let (_, token) = env
        .seed_user("ghost", stars_shared::account::role::STUDENT)
        .await;

    let (status, body) = send(
        &env.app(),
        Method::POST,
        "/api/v1/achievements",
        Some(&token),
        Some(serde_json::json!({ "title": "Nobody's" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "student profile not found");
}

#[tokio::test]
async fn role_gate_blocks_cross_role_actions() {
    let env = TestEnv::new();
    let (_, _, student_token) = env.seed_student("alice").await;
    let (_, _, lecturer_token) = env.seed_lecturer("prof").await;

    // A lecturer cannot create achievements.
    let (status, body) = send(
        &env.app(),
        Method::POST,
        "/api/v1/achievements",
        Some(&lecturer_token),
        Some(serde_json::json!({ "title": "Lecturer's own" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden: role not allowed");

    // A student cannot verify.
    let id = create_achievement(&env, &student_token, "Own work").await;
    submit_achievement(&env, &student_token, id).await;
    let (status, _) = send(
        &env.app(),
        Method::POST,
        &format!("/api/v1/achievements/{id}/verify"),
        Some(&student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // And stays untouched.
    let stored = env.references.by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, Status::Submitted);
}
