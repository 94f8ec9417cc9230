use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, PermissionContext};
use crate::db::loaders;
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::jwt::Actor;
use crate::models::project::{Project, ProjectMemberRequest};
use crate::models::user::Role;

/// Adds or updates a team member. Naming a new primary contact clears the
/// previous one in the same transaction.
#[utoipa::path(
    put,
    path = "/projects/{id}/members/{user_id}",
    tag = "Projects",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("user_id" = Uuid, Path, description = "User id")
    ),
    request_body = ProjectMemberRequest,
    responses((status = 200, description = "Team updated", body = Project))
)]
pub async fn upsert_member(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ProjectMemberRequest>,
) -> AppResult<Json<Project>> {
    let project = loaders::fetch_project(&state.pool, id).await?;
    state
        .policy
        .ensure(Action::Edit, &PermissionContext::new(actor.user(), &project))?;

    let member = loaders::find_user(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    if payload.is_primary_contact && member.role != Role::Client {
        return Err(AppError::bad_request("only client users can be the primary contact"));
    }

    let mut tx = state.pool.begin().await?;

    if payload.is_primary_contact {
        sqlx::query("UPDATE project_members SET is_primary_contact = 0 WHERE project_id = ? AND user_id <> ?")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO project_members (project_id, user_id, is_primary_contact, beta_access)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (project_id, user_id)
        DO UPDATE SET is_primary_contact = excluded.is_primary_contact, beta_access = excluded.beta_access
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(payload.is_primary_contact)
    .bind(payload.beta_access)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let old = serde_json::to_value(&project).ok();
    let project = loaders::fetch_project(&state.pool, id).await?;
    tracing::info!(project_id = %id, user_id = %user_id, primary = payload.is_primary_contact, "project member updated");
    log_activity(&state.events, "member_updated", actor.id(), &project, old);

    Ok(Json(project))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}/members/{user_id}",
    tag = "Projects",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("user_id" = Uuid, Path, description = "User id")
    ),
    responses((status = 204, description = "Member removed"))
)]
pub async fn remove_member(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let project = loaders::fetch_project(&state.pool, id).await?;
    state
        .policy
        .ensure(Action::Edit, &PermissionContext::new(actor.user(), &project))?;

    let affected = sqlx::query("DELETE FROM project_members WHERE project_id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("member not found"));
    }

    log_activity(&state.events, "member_removed", actor.id(), &project, None);
    Ok(StatusCode::NO_CONTENT)
}
