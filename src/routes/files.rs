use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, PermissionContext};
use crate::db::loaders;
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::jwt::Actor;
use crate::lifecycle::validate_deliverable_transition;
use crate::models::deliverable::{
    DbDeliverableFile, DeliverableFile, DeliverableStatus, FileKind, FileUploadRequest,
};
use crate::utils::{required_text, utc_now};

#[derive(Debug, Deserialize)]
pub struct FileListQuery {
    pub kind: Option<FileKind>,
}

fn action_for_reading(kind: FileKind) -> Action {
    match kind {
        FileKind::Beta => Action::ViewBetaFiles,
        FileKind::Final => Action::AccessFinalFiles,
    }
}

fn action_for_upload(kind: FileKind) -> Action {
    match kind {
        FileKind::Beta => Action::UploadBeta,
        FileKind::Final => Action::UploadFinal,
    }
}

/// Lists files of the requested kind. Without `kind`, returns every group
/// the caller may read.
#[utoipa::path(
    get,
    path = "/projects/{project_id}/deliverables/{id}/files",
    tag = "Deliverables",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Deliverable id"),
        ("kind" = Option<String>, Query, description = "beta or final")
    ),
    responses((status = 200, description = "Files", body = [DeliverableFile]))
)]
pub async fn list_files(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    Query(query): Query<FileListQuery>,
) -> AppResult<Json<Vec<DeliverableFile>>> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    let deliverable = loaders::fetch_deliverable(&state.pool, project_id, id).await?;
    let ctx = PermissionContext::new(actor.user(), &project).with_deliverable(&deliverable);

    let kinds: Vec<FileKind> = match query.kind {
        Some(kind) => {
            state.policy.ensure(action_for_reading(kind), &ctx)?;
            vec![kind]
        }
        None => {
            state.policy.ensure(Action::View, &ctx)?;
            [FileKind::Beta, FileKind::Final]
                .into_iter()
                .filter(|kind| state.policy.can(action_for_reading(*kind), &ctx))
                .collect()
        }
    };

    let mut files = Vec::new();
    for kind in kinds {
        let rows = sqlx::query_as::<_, DbDeliverableFile>(
            "SELECT id, deliverable_id, kind, file_name, storage_key, uploaded_by, created_at FROM deliverable_files WHERE deliverable_id = ? AND kind = ? ORDER BY created_at ASC",
        )
        .bind(id)
        .bind(kind.as_str())
        .fetch_all(&state.pool)
        .await?;

        for row in rows {
            files.push(DeliverableFile::try_from(row)?);
        }
    }

    Ok(Json(files))
}

/// Records an uploaded file. The object itself lives in external storage;
/// only its key is kept here. A beta upload on work in progress marks the
/// deliverable `beta_ready`.
#[utoipa::path(
    post,
    path = "/projects/{project_id}/deliverables/{id}/files",
    tag = "Deliverables",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Deliverable id")
    ),
    request_body = FileUploadRequest,
    responses((status = 201, description = "File recorded", body = DeliverableFile))
)]
pub async fn upload_file(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<FileUploadRequest>,
) -> AppResult<(StatusCode, Json<DeliverableFile>)> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    let deliverable = loaders::fetch_deliverable(&state.pool, project_id, id).await?;

    let task = match payload.task_id {
        Some(task_id) => {
            let task = loaders::fetch_task(&state.pool, project_id, task_id).await?;
            if task.deliverable_id.is_some_and(|linked| linked != id) {
                return Err(AppError::bad_request("task belongs to a different deliverable"));
            }
            Some(task)
        }
        None => None,
    };

    let mut ctx = PermissionContext::new(actor.user(), &project).with_deliverable(&deliverable);
    if let Some(task) = task.as_ref() {
        ctx = ctx.with_task(task);
    }
    state.policy.ensure(action_for_upload(payload.kind), &ctx)?;

    let uploader = actor
        .id()
        .ok_or_else(|| AppError::internal("upload permitted without an actor"))?;

    let file = DeliverableFile {
        id: Uuid::new_v4(),
        deliverable_id: id,
        kind: payload.kind,
        file_name: required_text("file_name", &payload.file_name)?,
        storage_key: required_text("storage_key", &payload.storage_key)?,
        uploaded_by: uploader,
        created_at: utc_now(),
    };

    let mut tx = state.pool.begin().await?;

    sqlx::query(
        "INSERT INTO deliverable_files (id, deliverable_id, kind, file_name, storage_key, uploaded_by, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(file.id)
    .bind(file.deliverable_id)
    .bind(file.kind.as_str())
    .bind(&file.file_name)
    .bind(&file.storage_key)
    .bind(file.uploaded_by)
    .bind(file.created_at)
    .execute(&mut *tx)
    .await?;

    let promotes = file.kind == FileKind::Beta
        && matches!(deliverable.status, DeliverableStatus::InProgress | DeliverableStatus::RevisionRequested)
        && validate_deliverable_transition(deliverable.status, DeliverableStatus::BetaReady).is_valid;
    if promotes {
        sqlx::query("UPDATE deliverables SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(DeliverableStatus::BetaReady.as_str())
            .bind(file.created_at)
            .bind(id)
            .bind(deliverable.status.as_str())
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::info!(deliverable_id = %id, kind = file.kind.as_str(), promoted = promotes, "deliverable file recorded");
    log_activity(&state.events, "uploaded", Some(uploader), &file, None);

    Ok((StatusCode::CREATED, Json(file)))
}
