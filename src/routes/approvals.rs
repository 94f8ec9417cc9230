use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, PermissionContext};
use crate::db::loaders;
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::jwt::Actor;
use crate::lifecycle::validate_deliverable_transition;
use crate::models::deliverable::{
    ApprovalDecision, ApprovalRecord, ApprovalRequest, DbApprovalRecord, Deliverable,
    DeliverableStatus,
};
use crate::utils::utc_now;

#[utoipa::path(
    post,
    path = "/projects/{project_id}/deliverables/{id}/approve",
    tag = "Approvals",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Deliverable id")
    ),
    request_body = ApprovalRequest,
    responses(
        (status = 200, description = "Deliverable approved", body = Deliverable),
        (status = 403, description = "Caller may not approve")
    )
)]
pub async fn approve(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    payload: Option<Json<ApprovalRequest>>,
) -> AppResult<Json<Deliverable>> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    let deliverable = loaders::fetch_deliverable(&state.pool, project_id, id).await?;
    state.policy.ensure(
        Action::Approve,
        &PermissionContext::new(actor.user(), &project).with_deliverable(&deliverable),
    )?;
    validate_deliverable_transition(deliverable.status, DeliverableStatus::Approved).into_result()?;

    let approver = actor
        .id()
        .ok_or_else(|| AppError::internal("approval permitted without an actor"))?;
    let feedback = payload.and_then(|Json(body)| body.feedback);
    let now = utc_now();

    let mut tx = state.pool.begin().await?;

    let affected = sqlx::query(
        "UPDATE deliverables SET status = ?, approved_at = ?, approved_by = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(DeliverableStatus::Approved.as_str())
    .bind(now)
    .bind(approver)
    .bind(now)
    .bind(id)
    .bind(deliverable.status.as_str())
    .execute(&mut *tx)
    .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::conflict("deliverable changed concurrently; reload and retry"));
    }

    let record = insert_record(&mut tx, id, approver, ApprovalDecision::Approved, feedback).await?;
    tx.commit().await?;

    tracing::info!(deliverable_id = %id, user_id = %approver, "deliverable approved");
    log_activity(&state.events, "approved", Some(approver), &record, None);

    let deliverable = loaders::fetch_deliverable(&state.pool, project_id, id).await?;
    Ok(Json(deliverable))
}

/// Sends the deliverable back for changes, consuming one revision from the
/// project's budget.
#[utoipa::path(
    post,
    path = "/projects/{project_id}/deliverables/{id}/revisions",
    tag = "Approvals",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Deliverable id")
    ),
    request_body = ApprovalRequest,
    responses(
        (status = 200, description = "Revision requested", body = Deliverable),
        (status = 403, description = "Caller may not request revisions")
    )
)]
pub async fn request_revision(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    payload: Option<Json<ApprovalRequest>>,
) -> AppResult<Json<Deliverable>> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    let deliverable = loaders::fetch_deliverable(&state.pool, project_id, id).await?;
    state.policy.ensure(
        Action::RequestRevision,
        &PermissionContext::new(actor.user(), &project).with_deliverable(&deliverable),
    )?;
    validate_deliverable_transition(deliverable.status, DeliverableStatus::RevisionRequested).into_result()?;

    let requester = actor
        .id()
        .ok_or_else(|| AppError::internal("revision permitted without an actor"))?;
    let feedback = payload.and_then(|Json(body)| body.feedback);
    let now = utc_now();

    let mut tx = state.pool.begin().await?;

    let budget = sqlx::query(
        "UPDATE projects SET used_revisions = used_revisions + 1, updated_at = ? WHERE id = ? AND used_revisions < total_revisions",
    )
    .bind(now)
    .bind(project_id)
    .execute(&mut *tx)
    .await?;

    if budget.rows_affected() == 0 {
        return Err(AppError::conflict("revision budget was used up concurrently"));
    }

    let affected = sqlx::query("UPDATE deliverables SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
        .bind(DeliverableStatus::RevisionRequested.as_str())
        .bind(now)
        .bind(id)
        .bind(deliverable.status.as_str())
        .execute(&mut *tx)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::conflict("deliverable changed concurrently; reload and retry"));
    }

    let record = insert_record(&mut tx, id, requester, ApprovalDecision::RevisionRequested, feedback).await?;
    tx.commit().await?;

    tracing::info!(
        deliverable_id = %id,
        user_id = %requester,
        used = project.used_revisions + 1,
        total = project.total_revisions,
        "revision requested"
    );
    log_activity(&state.events, "revision_requested", Some(requester), &record, None);

    let deliverable = loaders::fetch_deliverable(&state.pool, project_id, id).await?;
    Ok(Json(deliverable))
}

#[utoipa::path(
    get,
    path = "/projects/{project_id}/deliverables/{id}/approvals",
    tag = "Approvals",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Deliverable id")
    ),
    responses((status = 200, description = "Approval history, oldest first", body = [ApprovalRecord]))
)]
pub async fn list_approvals(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Vec<ApprovalRecord>>> {
    let project = loaders::fetch_project(&state.pool, project_id).await?;
    let deliverable = loaders::fetch_deliverable(&state.pool, project_id, id).await?;
    state.policy.ensure(
        Action::ViewApprovalHistory,
        &PermissionContext::new(actor.user(), &project).with_deliverable(&deliverable),
    )?;

    let rows = sqlx::query_as::<_, DbApprovalRecord>(
        "SELECT id, deliverable_id, actor_id, decision, feedback, created_at FROM approvals WHERE deliverable_id = ? ORDER BY created_at ASC",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    let records = rows
        .into_iter()
        .map(ApprovalRecord::try_from)
        .collect::<Result<_, _>>()?;

    Ok(Json(records))
}

async fn insert_record(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    deliverable_id: Uuid,
    actor_id: Uuid,
    decision: ApprovalDecision,
    feedback: Option<String>,
) -> AppResult<ApprovalRecord> {
    let record = ApprovalRecord {
        id: Uuid::new_v4(),
        deliverable_id,
        actor_id,
        decision,
        feedback: feedback.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()),
        created_at: utc_now(),
    };

    sqlx::query(
        "INSERT INTO approvals (id, deliverable_id, actor_id, decision, feedback, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(record.id)
    .bind(record.deliverable_id)
    .bind(record.actor_id)
    .bind(record.decision.as_str())
    .bind(&record.feedback)
    .bind(record.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(record)
}
