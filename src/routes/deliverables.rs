use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, PermissionContext, PermissionSummary};
use crate::db::loaders;
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::jwt::Actor;
use crate::lifecycle::validate_deliverable_transition;
use crate::models::deliverable::{
    Deliverable, DeliverableCreateRequest, DeliverableStatus, DeliverableUpdateRequest,
};
use crate::utils::{required_text, utc_now};

#[utoipa::path(
    get,
    path = "/projects/{project_id}/deliverables",
    tag = "Deliverables",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "List deliverables", body = [Deliverable]))
)]
pub async fn list_deliverables(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<Deliverable>>> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    state
        .policy
        .ensure(Action::View, &PermissionContext::new(actor.user(), &project))?;

    let deliverables = loaders::list_deliverables(&state.pool, project_id).await?;
    Ok(Json(deliverables))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/deliverables",
    tag = "Deliverables",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = DeliverableCreateRequest,
    responses((status = 201, description = "Deliverable created", body = Deliverable))
)]
pub async fn create_deliverable(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<DeliverableCreateRequest>,
) -> AppResult<(StatusCode, Json<Deliverable>)> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    state
        .policy
        .ensure(Action::Create, &PermissionContext::new(actor.user(), &project))?;

    let title = required_text("title", &payload.title)?;
    let mut deliverable = Deliverable::new(project_id, title, DeliverableStatus::Pending);
    deliverable.description = payload.description.clone();

    sqlx::query(
        "INSERT INTO deliverables (id, project_id, title, description, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(deliverable.id)
    .bind(project_id)
    .bind(&deliverable.title)
    .bind(&deliverable.description)
    .bind(deliverable.status.as_str())
    .bind(deliverable.created_at)
    .bind(deliverable.updated_at)
    .execute(&state.pool)
    .await?;

    log_activity(&state.events, "created", actor.id(), &deliverable, None);
    Ok((StatusCode::CREATED, Json(deliverable)))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/deliverables/{id}",
    tag = "Deliverables",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Deliverable id")
    ),
    responses((status = 200, description = "Deliverable detail", body = Deliverable))
)]
pub async fn get_deliverable(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Deliverable>> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    let deliverable = loaders::fetch_deliverable(&state.pool, project_id, id).await?;
    state.policy.ensure(
        Action::View,
        &PermissionContext::new(actor.user(), &project).with_deliverable(&deliverable),
    )?;
    Ok(Json(deliverable))
}

/// Status changes here go through the deliverable lifecycle table. Approval
/// and revision outcomes belong to the client and have their own endpoints.
#[utoipa::path(
    put,
    path = "/projects/{project_id}/deliverables/{id}",
    tag = "Deliverables",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Deliverable id")
    ),
    request_body = DeliverableUpdateRequest,
    responses((status = 200, description = "Deliverable updated", body = Deliverable))
)]
pub async fn update_deliverable(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<DeliverableUpdateRequest>,
) -> AppResult<Json<Deliverable>> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    let mut deliverable = loaders::fetch_deliverable(&state.pool, project_id, id).await?;
    state.policy.ensure(
        Action::Edit,
        &PermissionContext::new(actor.user(), &project).with_deliverable(&deliverable),
    )?;

    let old = serde_json::to_value(&deliverable).ok();
    let previous_status = deliverable.status;

    if let Some(title) = payload.title.as_deref() {
        deliverable.title = required_text("title", title)?;
    }
    if payload.description.is_some() {
        deliverable.description = payload.description.clone();
    }
    if let Some(status) = payload.status {
        if matches!(status, DeliverableStatus::Approved | DeliverableStatus::RevisionRequested)
            && status != previous_status
        {
            return Err(AppError::bad_request(
                "approval decisions are recorded through the approve and revisions endpoints",
            ));
        }
        validate_deliverable_transition(previous_status, status).into_result()?;
        deliverable.status = status;
    }

    let now = utc_now();
    let affected = sqlx::query(
        "UPDATE deliverables SET title = ?, description = ?, status = ?, updated_at = ? WHERE id = ? AND project_id = ? AND status = ?",
    )
    .bind(&deliverable.title)
    .bind(&deliverable.description)
    .bind(deliverable.status.as_str())
    .bind(now)
    .bind(id)
    .bind(project_id)
    .bind(previous_status.as_str())
    .execute(&state.pool)
    .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::conflict("deliverable changed concurrently; reload and retry"));
    }

    deliverable.updated_at = now;
    log_activity(&state.events, "updated", actor.id(), &deliverable, old);
    Ok(Json(deliverable))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}/deliverables/{id}",
    tag = "Deliverables",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Deliverable id")
    ),
    responses((status = 204, description = "Deliverable deleted"))
)]
pub async fn delete_deliverable(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    let deliverable = loaders::fetch_deliverable(&state.pool, project_id, id).await?;
    state.policy.ensure(
        Action::Delete,
        &PermissionContext::new(actor.user(), &project).with_deliverable(&deliverable),
    )?;

    let affected = sqlx::query("DELETE FROM deliverables WHERE id = ? AND project_id = ?")
        .bind(id)
        .bind(project_id)
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("deliverable not found"));
    }

    log_activity(&state.events, "deleted", actor.id(), &deliverable, None);
    Ok(StatusCode::NO_CONTENT)
}

/// Capability summary for the caller. Advisory: every mutating endpoint
/// re-checks.
#[utoipa::path(
    get,
    path = "/projects/{project_id}/deliverables/{id}/permissions",
    tag = "Deliverables",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Deliverable id")
    ),
    responses((status = 200, description = "Allowed actions", body = PermissionSummary))
)]
pub async fn get_permissions(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<PermissionSummary>> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    let deliverable = loaders::fetch_deliverable(&state.pool, project_id, id).await?;
    let ctx = PermissionContext::new(actor.user(), &project).with_deliverable(&deliverable);

    state.policy.ensure(Action::View, &ctx)?;
    Ok(Json(state.policy.evaluate_all(&ctx)))
}
