use anyhow::Result;
use axum::http::StatusCode;
use serde_json::{json, Value};

use motionify_portal::authz::reasons;
use motionify_portal::models::user::Role;

mod common;
use common::{id_of, message_of, TestApp};

struct Crew {
    pm_token: String,
    editor_token: String,
    primary_token: String,
    reviewer_token: String,
    outsider_token: String,
    project_id: String,
    deliverable_id: String,
}

async fn crew(t: &TestApp) -> Result<Crew> {
    let (_pm, pm_token) = t.user("Pat", Role::ProjectManager).await?;
    let (editor, editor_token) = t.user("Eli", Role::TeamMember).await?;
    let (primary, primary_token) = t.user("Cora", Role::Client).await?;
    let (reviewer, reviewer_token) = t.user("Rui", Role::Client).await?;
    let (_outsider, outsider_token) = t.user("Sam", Role::Client).await?;

    let project = t
        .expect(StatusCode::CREATED, "POST", "/projects", Some(&pm_token), Some(json!({ "name": "Launch film", "total_revisions": 2 })))
        .await?;
    let project_id = id_of(&project)?;

    for (user_id, body) in [
        (editor.id, json!({})),
        (primary.id, json!({ "is_primary_contact": true })),
        (reviewer.id, json!({ "beta_access": true })),
    ] {
        t.expect(
            StatusCode::OK,
            "PUT",
            &format!("/projects/{}/members/{}", project_id, user_id),
            Some(&pm_token),
            Some(body),
        )
        .await?;
    }

    let deliverable = t
        .expect(
            StatusCode::CREATED,
            "POST",
            &format!("/projects/{}/deliverables", project_id),
            Some(&pm_token),
            Some(json!({ "title": "Explainer cut" })),
        )
        .await?;
    assert_eq!(deliverable["status"], "pending");
    let deliverable_id = id_of(&deliverable)?;

    t.expect(
        StatusCode::OK,
        "PUT",
        &format!("/projects/{}/deliverables/{}", project_id, deliverable_id),
        Some(&pm_token),
        Some(json!({ "status": "in_progress" })),
    )
    .await?;

    Ok(Crew {
        pm_token,
        editor_token,
        primary_token,
        reviewer_token,
        outsider_token,
        project_id,
        deliverable_id,
    })
}

impl Crew {
    fn uri(&self, suffix: &str) -> String {
        format!("/projects/{}/deliverables/{}{}", self.project_id, self.deliverable_id, suffix)
    }
}

fn allowed(summary: &Value, action: &str) -> bool {
    summary["permissions"]
        .as_array()
        .into_iter()
        .flatten()
        .any(|entry| entry["action"] == action && entry["allowed"] == json!(true))
}

#[tokio::test]
async fn primary_contact_signs_off_after_beta_upload() -> Result<()> {
    let t = common::setup().await?;
    let c = crew(&t).await?;

    // Beta files are hidden until something is uploaded
    let (status, body) = t
        .send("GET", &c.uri("/files?kind=beta"), Some(&c.reviewer_token), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message_of(&body), reasons::NO_BETA_FILES);

    let (status, body) = t
        .send(
            "POST",
            &c.uri("/files"),
            Some(&c.primary_token),
            Some(json!({ "kind": "beta", "file_name": "cut.mp4", "storage_key": "beta/cut.mp4" })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message_of(&body), reasons::CLIENT_UPLOAD);

    t.expect(
        StatusCode::CREATED,
        "POST",
        &c.uri("/files"),
        Some(&c.editor_token),
        Some(json!({ "kind": "beta", "file_name": "cut.mp4", "storage_key": "beta/cut.mp4" })),
    )
    .await?;

    let deliverable = t.expect(StatusCode::OK, "GET", &c.uri(""), Some(&c.primary_token), None).await?;
    assert_eq!(deliverable["status"], "beta_ready");
    assert_eq!(deliverable["beta_file_count"], 1);

    let beta = t
        .expect(StatusCode::OK, "GET", &c.uri("/files?kind=beta"), Some(&c.reviewer_token), None)
        .await?;
    assert_eq!(beta.as_array().map(Vec::len), Some(1));

    let (status, body) = t
        .send("GET", &c.uri("/files?kind=final"), Some(&c.primary_token), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message_of(&body), reasons::FINAL_NOT_RELEASED);

    let (status, body) = t.send("POST", &c.uri("/approve"), Some(&c.reviewer_token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message_of(&body), reasons::APPROVE_PRIMARY_ONLY);

    let (status, body) = t.send("POST", &c.uri("/approve"), Some(&c.editor_token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message_of(&body), reasons::APPROVE_PRIMARY_ONLY);

    let approved = t
        .expect(
            StatusCode::OK,
            "POST",
            &c.uri("/approve"),
            Some(&c.primary_token),
            Some(json!({ "feedback": "Looks great" })),
        )
        .await?;
    assert_eq!(approved["status"], "approved");
    assert!(approved["approved_at"].is_string());

    // Approving twice is no longer possible
    let (status, body) = t.send("POST", &c.uri("/approve"), Some(&c.primary_token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message_of(&body), reasons::NOT_AWAITING_APPROVAL);

    let history = t
        .expect(StatusCode::OK, "GET", &c.uri("/approvals"), Some(&c.reviewer_token), None)
        .await?;
    let history = history.as_array().cloned().unwrap_or_default();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["decision"], "approved");
    assert_eq!(history[0]["feedback"], "Looks great");

    t.expect(
        StatusCode::CREATED,
        "POST",
        &c.uri("/files"),
        Some(&c.pm_token),
        Some(json!({ "kind": "final", "file_name": "master.mov", "storage_key": "final/master.mov" })),
    )
    .await?;

    let finals = t
        .expect(StatusCode::OK, "GET", &c.uri("/files?kind=final"), Some(&c.primary_token), None)
        .await?;
    assert_eq!(finals.as_array().map(Vec::len), Some(1));

    let all = t.expect(StatusCode::OK, "GET", &c.uri("/files"), Some(&c.primary_token), None).await?;
    assert_eq!(all.as_array().map(Vec::len), Some(2));

    Ok(())
}

#[tokio::test]
async fn editors_cannot_upload_finals() -> Result<()> {
    let t = common::setup().await?;
    let c = crew(&t).await?;

    let (status, body) = t
        .send(
            "POST",
            &c.uri("/files"),
            Some(&c.editor_token),
            Some(json!({ "kind": "final", "file_name": "master.mov", "storage_key": "final/master.mov" })),
        )
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message_of(&body), reasons::UPLOAD_FINAL_ELEVATED);

    Ok(())
}

#[tokio::test]
async fn outsiders_see_nothing() -> Result<()> {
    let t = common::setup().await?;
    let c = crew(&t).await?;

    for uri in [c.uri(""), c.uri("/approvals"), c.uri("/comments"), c.uri("/permissions")] {
        let (status, body) = t.send("GET", &uri, Some(&c.outsider_token), None).await?;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(message_of(&body), reasons::NOT_A_MEMBER);
    }

    let (status, body) = t.send("GET", &c.uri(""), None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message_of(&body), reasons::NOT_LOGGED_IN);

    Ok(())
}

#[tokio::test]
async fn permission_summary_tracks_role_and_state() -> Result<()> {
    let t = common::setup().await?;
    let c = crew(&t).await?;

    let summary = t
        .expect(StatusCode::OK, "GET", &c.uri("/permissions"), Some(&c.primary_token), None)
        .await?;
    assert!(allowed(&summary, "view"));
    assert!(allowed(&summary, "comment"));
    assert!(!allowed(&summary, "approve"));
    assert!(!allowed(&summary, "upload_beta"));
    assert!(!allowed(&summary, "edit"));

    t.expect(
        StatusCode::CREATED,
        "POST",
        &c.uri("/files"),
        Some(&c.editor_token),
        Some(json!({ "kind": "beta", "file_name": "cut.mp4", "storage_key": "beta/cut.mp4" })),
    )
    .await?;

    let summary = t
        .expect(StatusCode::OK, "GET", &c.uri("/permissions"), Some(&c.primary_token), None)
        .await?;
    assert!(allowed(&summary, "approve"));
    assert!(allowed(&summary, "request_revision"));
    assert!(allowed(&summary, "view_beta_files"));

    let summary = t
        .expect(StatusCode::OK, "GET", &c.uri("/permissions"), Some(&c.editor_token), None)
        .await?;
    assert!(allowed(&summary, "upload_beta"));
    assert!(!allowed(&summary, "upload_final"));
    assert!(!allowed(&summary, "approve"));

    Ok(())
}

#[tokio::test]
async fn comments_are_open_to_the_team() -> Result<()> {
    let t = common::setup().await?;
    let c = crew(&t).await?;

    t.expect(
        StatusCode::CREATED,
        "POST",
        &c.uri("/comments"),
        Some(&c.primary_token),
        Some(json!({ "body": "Can the logo come in earlier?" })),
    )
    .await?;
    t.expect(
        StatusCode::CREATED,
        "POST",
        &c.uri("/comments"),
        Some(&c.editor_token),
        Some(json!({ "body": "Moved it to 0:03" })),
    )
    .await?;

    let (status, _) = t
        .send("POST", &c.uri("/comments"), Some(&c.outsider_token), Some(json!({ "body": "hi" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .send("POST", &c.uri("/comments"), Some(&c.editor_token), Some(json!({ "body": "   " })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let comments = t
        .expect(StatusCode::OK, "GET", &c.uri("/comments"), Some(&c.reviewer_token), None)
        .await?;
    assert_eq!(comments.as_array().map(Vec::len), Some(2));

    Ok(())
}

#[tokio::test]
async fn approval_outcomes_cannot_be_set_directly() -> Result<()> {
    let t = common::setup().await?;
    let c = crew(&t).await?;

    let (status, _) = t
        .send("PUT", &c.uri(""), Some(&c.pm_token), Some(json!({ "status": "approved" })))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t
        .send("PUT", &c.uri(""), Some(&c.pm_token), Some(json!({ "status": "final_delivered" })))
        .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        message_of(&body),
        "Cannot transition deliverable from 'in_progress' to 'final_delivered'. Allowed transitions: beta_ready"
    );

    let (status, body) = t
        .send("PUT", &c.uri(""), Some(&c.editor_token), Some(json!({ "title": "New title" })))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message_of(&body), reasons::EDIT_ELEVATED);

    let (status, body) = t.send("DELETE", &c.uri(""), Some(&c.editor_token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message_of(&body), reasons::DELETE_ELEVATED);

    let (status, _) = t.send("DELETE", &c.uri(""), Some(&c.pm_token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = t.send("GET", &c.uri(""), Some(&c.pm_token), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn manual_beta_ready_without_files_cannot_be_signed_off() -> Result<()> {
    let t = common::setup().await?;
    let c = crew(&t).await?;

    let moved = t
        .expect(StatusCode::OK, "PUT", &c.uri(""), Some(&c.pm_token), Some(json!({ "status": "beta_ready" })))
        .await?;
    assert_eq!(moved["status"], "beta_ready");
    assert_eq!(moved["beta_file_count"], 0);

    let (status, body) = t
        .send("GET", &c.uri("/files?kind=beta"), Some(&c.primary_token), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message_of(&body), reasons::NO_BETA_FILES);

    for action in ["/approve", "/revisions"] {
        let (status, body) = t.send("POST", &c.uri(action), Some(&c.primary_token), None).await?;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", action);
        assert_eq!(message_of(&body), reasons::NOTHING_TO_REVIEW);
    }

    let deliverable = t.expect(StatusCode::OK, "GET", &c.uri(""), Some(&c.pm_token), None).await?;
    assert_eq!(deliverable["status"], "beta_ready");

    let project = t
        .expect(StatusCode::OK, "GET", &format!("/projects/{}", c.project_id), Some(&c.pm_token), None)
        .await?;
    assert_eq!(project["used_revisions"], 0);

    Ok(())
}
