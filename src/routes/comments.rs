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
use crate::models::deliverable::{Comment, CommentCreateRequest};
use crate::utils::{required_text, utc_now};

#[utoipa::path(
    get,
    path = "/projects/{project_id}/deliverables/{id}/comments",
    tag = "Comments",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Deliverable id")
    ),
    responses((status = 200, description = "Comments, oldest first", body = [Comment]))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<Comment>>> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    let deliverable = loaders::fetch_deliverable(&state.pool, project_id, id).await?;
    state.policy.ensure(
        Action::View,
        &PermissionContext::new(actor.user(), &project).with_deliverable(&deliverable),
    )?;

    let comments = sqlx::query_as::<_, Comment>(
        "SELECT id, deliverable_id, author_id, body, created_at FROM comments WHERE deliverable_id = ? ORDER BY created_at ASC",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(comments))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/deliverables/{id}/comments",
    tag = "Comments",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Deliverable id")
    ),
    request_body = CommentCreateRequest,
    responses((status = 201, description = "Comment added", body = Comment))
)]
pub async fn create_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CommentCreateRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    let deliverable = loaders::fetch_deliverable(&state.pool, project_id, id).await?;
    state.policy.ensure(
        Action::Comment,
        &PermissionContext::new(actor.user(), &project).with_deliverable(&deliverable),
    )?;

    let author_id = actor
        .id()
        .ok_or_else(|| AppError::internal("comment permitted without an actor"))?;

    let comment = Comment {
        id: Uuid::new_v4(),
        deliverable_id: id,
        author_id,
        body: required_text("body", &payload.body)?,
        created_at: utc_now(),
    };

    sqlx::query("INSERT INTO comments (id, deliverable_id, author_id, body, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(comment.id)
        .bind(comment.deliverable_id)
        .bind(comment.author_id)
        .bind(&comment.body)
        .bind(comment.created_at)
        .execute(&state.pool)
        .await?;

    log_activity(&state.events, "commented", Some(author_id), &comment, None);
    Ok((StatusCode::CREATED, Json(comment)))
}
