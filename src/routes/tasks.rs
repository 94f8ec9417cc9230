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
use crate::models::task::{Task, TaskCreateRequest, TaskStatus};
use crate::models::user::Role;
use crate::utils::required_text;

#[utoipa::path(
    get,
    path = "/projects/{project_id}/tasks",
    tag = "Tasks",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "List tasks", body = [Task]))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<Task>>> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    state
        .policy
        .ensure(Action::View, &PermissionContext::new(actor.user(), &project))?;

    Ok(Json(loaders::list_tasks(&state.pool, project_id).await?))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/tasks",
    tag = "Tasks",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = TaskCreateRequest,
    responses((status = 201, description = "Task created", body = Task))
)]
pub async fn create_task(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    state
        .policy
        .ensure(Action::Create, &PermissionContext::new(actor.user(), &project))?;

    if let Some(deliverable_id) = payload.deliverable_id {
        loaders::fetch_deliverable(&state.pool, project_id, deliverable_id).await?;
    }
    if let Some(assignee) = payload.assignee {
        let user = loaders::find_user(&state.pool, assignee)
            .await?
            .ok_or_else(|| AppError::not_found("assignee not found"))?;
        if user.role == Role::Client {
            return Err(AppError::bad_request("tasks can only be assigned to staff"));
        }
    }

    let mut task = Task::new(
        project_id,
        required_text("title", &payload.title)?,
        payload.status.unwrap_or(TaskStatus::Pending),
    );
    task.deliverable_id = payload.deliverable_id;
    task.assignee = payload.assignee;

    sqlx::query(
        "INSERT INTO tasks (id, project_id, deliverable_id, title, status, assignee, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(task.id)
    .bind(task.project_id)
    .bind(task.deliverable_id)
    .bind(&task.title)
    .bind(task.status.as_str())
    .bind(task.assignee)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(&state.pool)
    .await?;

    log_activity(&state.events, "created", actor.id(), &task, None);
    Ok((StatusCode::CREATED, Json(task)))
}
