use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{reasons, Action, PermissionContext};
use crate::db::loaders;
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::jwt::Actor;
use crate::lifecycle::{allowed_transitions, validate_transition};
use crate::models::project::{
    Project, ProjectCreateRequest, ProjectMember, ProjectStatus, ProjectStatusUpdateRequest,
    ProjectTransitionsResponse,
};
use crate::utils::{required_text, utc_now};

#[utoipa::path(
    get,
    path = "/projects",
    tag = "Projects",
    responses((status = 200, description = "Projects visible to the caller", body = [Project]))
)]
pub async fn list_projects(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<Project>>> {
    if actor.user().is_none() {
        return Err(AppError::unauthorized(reasons::NOT_LOGGED_IN));
    }

    let projects = loaders::list_projects(&state.pool)
        .await?
        .into_iter()
        .filter(|project| state.policy.can(Action::View, &PermissionContext::new(actor.user(), project)))
        .collect();

    Ok(Json(projects))
}

#[utoipa::path(
    post,
    path = "/projects",
    tag = "Projects",
    request_body = ProjectCreateRequest,
    responses((status = 201, description = "Project created", body = Project))
)]
pub async fn create_project(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<ProjectCreateRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let name = required_text("name", &payload.name)?;
    let total_revisions = payload.total_revisions.unwrap_or(0);
    if total_revisions < 0 {
        return Err(AppError::bad_request("total_revisions must not be negative"));
    }

    // Every other status is only reachable through the transition table.
    let initial = payload.status.unwrap_or(ProjectStatus::Draft);
    if !matches!(initial, ProjectStatus::Draft | ProjectStatus::InReview) {
        return Err(AppError::bad_request(format!(
            "projects start as '{}' or '{}', not '{}'",
            ProjectStatus::Draft,
            ProjectStatus::InReview,
            initial
        )));
    }

    let mut project = Project::new(name, initial).with_revisions(total_revisions, 0);
    project.description = payload.description.clone();

    state
        .policy
        .ensure(Action::Create, &PermissionContext::new(actor.user(), &project))?;
    let creator = actor
        .user()
        .ok_or_else(|| AppError::unauthorized(reasons::NOT_LOGGED_IN))?;

    let mut tx = state.pool.begin().await?;

    sqlx::query(
        "INSERT INTO projects (id, name, description, status, total_revisions, used_revisions, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(project.id)
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.status.as_str())
    .bind(project.total_revisions)
    .bind(project.used_revisions)
    .bind(project.created_at)
    .bind(project.updated_at)
    .execute(&mut *tx)
    .await?;

    // The creator joins the team so staff-only rules that need assignment apply.
    sqlx::query("INSERT INTO project_members (project_id, user_id, is_primary_contact, beta_access) VALUES (?, ?, 0, 0)")
        .bind(project.id)
        .bind(creator.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    project.team.push(ProjectMember::new(creator.id));
    tracing::info!(project_id = %project.id, user_id = %creator.id, "project created");
    log_activity(&state.events, "created", Some(creator.id), &project, None);

    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    get,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Project detail", body = Project))
)]
pub async fn get_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Project>> {
    let project = loaders::fetch_project(&state.pool, id).await?;
    state
        .policy
        .ensure(Action::View, &PermissionContext::new(actor.user(), &project))?;
    Ok(Json(project))
}

#[utoipa::path(
    get,
    path = "/projects/{id}/transitions",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Statuses the project may move to", body = ProjectTransitionsResponse))
)]
pub async fn list_transitions(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProjectTransitionsResponse>> {
    let project = loaders::fetch_project(&state.pool, id).await?;
    state
        .policy
        .ensure(Action::View, &PermissionContext::new(actor.user(), &project))?;

    Ok(Json(ProjectTransitionsResponse {
        current: project.status,
        allowed: allowed_transitions(project.status).to_vec(),
    }))
}

#[utoipa::path(
    put,
    path = "/projects/{id}/status",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = ProjectStatusUpdateRequest,
    responses(
        (status = 200, description = "Status updated", body = Project),
        (status = 409, description = "Status changed concurrently"),
        (status = 422, description = "Transition not allowed")
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectStatusUpdateRequest>,
) -> AppResult<Json<Project>> {
    let mut project = loaders::fetch_project(&state.pool, id).await?;
    state
        .policy
        .ensure(Action::Edit, &PermissionContext::new(actor.user(), &project))?;

    let current = project.status;
    let proposed = payload.status;
    validate_transition(current, proposed).into_result()?;

    if current == proposed {
        return Ok(Json(project));
    }

    let now = utc_now();
    let affected = sqlx::query("UPDATE projects SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
        .bind(proposed.as_str())
        .bind(now)
        .bind(id)
        .bind(current.as_str())
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        tracing::warn!(project_id = %id, from = %current, to = %proposed, "lost status update race");
        return Err(AppError::conflict("project status changed concurrently; reload and retry"));
    }

    let old = serde_json::to_value(&project).ok();
    project.status = proposed;
    project.updated_at = now;

    tracing::info!(project_id = %id, from = %current, to = %proposed, "project status changed");
    log_activity(&state.events, "status_changed", actor.id(), &project, old);

    Ok(Json(project))
}
