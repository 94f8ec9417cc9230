use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use motionify_portal::authz::reasons;
use motionify_portal::models::user::Role;

mod common;
use common::{id_of, message_of};

#[tokio::test]
async fn revision_requests_stop_when_budget_is_spent() -> Result<()> {
    let t = common::setup().await?;
    let (_pm, pm_token) = t.user("Pat", Role::ProjectManager).await?;
    let (editor, editor_token) = t.user("Eli", Role::TeamMember).await?;
    let (primary, primary_token) = t.user("Cora", Role::Client).await?;
    let (reviewer, reviewer_token) = t.user("Rui", Role::Client).await?;

    let project = t
        .expect(StatusCode::CREATED, "POST", "/projects", Some(&pm_token), Some(json!({ "name": "Teaser", "total_revisions": 1 })))
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
            Some(json!({ "title": "Teaser cut" })),
        )
        .await?;
    let uri = format!("/projects/{}/deliverables/{}", project_id, id_of(&deliverable)?);

    t.expect(StatusCode::OK, "PUT", &uri, Some(&pm_token), Some(json!({ "status": "in_progress" })))
        .await?;

    let upload = json!({ "kind": "beta", "file_name": "teaser.mp4", "storage_key": "beta/teaser-v1.mp4" });
    t.expect(StatusCode::CREATED, "POST", &format!("{}/files", uri), Some(&editor_token), Some(upload))
        .await?;

    let (status, body) = t
        .send("POST", &format!("{}/revisions", uri), Some(&reviewer_token), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message_of(&body), reasons::REVISION_PRIMARY_ONLY);

    let revised = t
        .expect(
            StatusCode::OK,
            "POST",
            &format!("{}/revisions", uri),
            Some(&primary_token),
            Some(json!({ "feedback": "Shorter intro please" })),
        )
        .await?;
    assert_eq!(revised["status"], "revision_requested");

    let project = t
        .expect(StatusCode::OK, "GET", &format!("/projects/{}", project_id), Some(&primary_token), None)
        .await?;
    assert_eq!(project["used_revisions"], 1);

    // A new beta cut puts the deliverable back in front of the client
    let upload = json!({ "kind": "beta", "file_name": "teaser.mp4", "storage_key": "beta/teaser-v2.mp4" });
    t.expect(StatusCode::CREATED, "POST", &format!("{}/files", uri), Some(&editor_token), Some(upload))
        .await?;
    let current = t.expect(StatusCode::OK, "GET", &uri, Some(&primary_token), None).await?;
    assert_eq!(current["status"], "beta_ready");

    let (status, body) = t
        .send("POST", &format!("{}/revisions", uri), Some(&primary_token), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message_of(&body), "No revisions remaining (1 of 1 used)");

    let project = t
        .expect(StatusCode::OK, "GET", &format!("/projects/{}", project_id), Some(&pm_token), None)
        .await?;
    assert_eq!(project["used_revisions"], 1);

    // The budget only limits revisions; approval still works
    let approved = t
        .expect(StatusCode::OK, "POST", &format!("{}/approve", uri), Some(&primary_token), None)
        .await?;
    assert_eq!(approved["status"], "approved");

    let history = t
        .expect(StatusCode::OK, "GET", &format!("{}/approvals", uri), Some(&pm_token), None)
        .await?;
    let decisions: Vec<&str> = history
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|record| record["decision"].as_str())
        .collect();
    assert_eq!(decisions, vec!["revision_requested", "approved"]);

    Ok(())
}

#[tokio::test]
async fn revisions_need_a_review_window() -> Result<()> {
    let t = common::setup().await?;
    let (_pm, pm_token) = t.user("Pat", Role::ProjectManager).await?;
    let (primary, primary_token) = t.user("Cora", Role::Client).await?;

    let project = t
        .expect(StatusCode::CREATED, "POST", "/projects", Some(&pm_token), Some(json!({ "name": "Teaser", "total_revisions": 3 })))
        .await?;
    let project_id = id_of(&project)?;
    t.expect(
        StatusCode::OK,
        "PUT",
        &format!("/projects/{}/members/{}", project_id, primary.id),
        Some(&pm_token),
        Some(json!({ "is_primary_contact": true })),
    )
    .await?;

    let deliverable = t
        .expect(
            StatusCode::CREATED,
            "POST",
            &format!("/projects/{}/deliverables", project_id),
            Some(&pm_token),
            Some(json!({ "title": "Teaser cut" })),
        )
        .await?;
    let uri = format!("/projects/{}/deliverables/{}", project_id, id_of(&deliverable)?);

    let (status, body) = t
        .send("POST", &format!("{}/revisions", uri), Some(&primary_token), None)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message_of(&body), reasons::REVISION_NOT_AWAITING);

    let project = t
        .expect(StatusCode::OK, "GET", &format!("/projects/{}", project_id), Some(&pm_token), None)
        .await?;
    assert_eq!(project["used_revisions"], 0);

    Ok(())
}
