use std::borrow::Cow;

use serde::Serialize;
use utoipa::ToSchema;

use super::context::PermissionContext;
use super::{reasons, Action};
use crate::errors::{AppError, AppResult};
use crate::models::task::TaskStatus;
use crate::models::user::Role;

type Decision = Result<(), Cow<'static, str>>;

/// Policy evaluator trait for pluggable authorization logic
pub trait PolicyEvaluator: Send + Sync {
    /// Why `action` is denied in `ctx`, or `None` when it is allowed.
    fn denial_reason(&self, action: Action, ctx: &PermissionContext<'_>) -> Option<String>;

    fn can(&self, action: Action, ctx: &PermissionContext<'_>) -> bool {
        self.denial_reason(action, ctx).is_none()
    }

    /// Server-side guard: anonymous callers get 401, everyone else 403 with
    /// the denial reason as the message.
    fn ensure(&self, action: Action, ctx: &PermissionContext<'_>) -> AppResult<()> {
        match self.denial_reason(action, ctx) {
            None => Ok(()),
            Some(reason) if ctx.actor.is_none() => Err(AppError::unauthorized(reason)),
            Some(reason) => Err(AppError::forbidden(reason)),
        }
    }

    fn evaluate_all(&self, ctx: &PermissionContext<'_>) -> PermissionSummary {
        let permissions = Action::ALL
            .into_iter()
            .map(|action| {
                let reason = self.denial_reason(action, ctx);
                PermissionEntry {
                    action,
                    allowed: reason.is_none(),
                    reason,
                }
            })
            .collect();

        PermissionSummary { permissions }
    }
}

/// Portal policy over roles, project membership and deliverable state.
///
/// Evaluation order:
/// 1. no actor -> deny
/// 2. action specific rule
#[derive(Debug, Clone, Default)]
pub struct DefaultPolicyEvaluator;

impl DefaultPolicyEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl PolicyEvaluator for DefaultPolicyEvaluator {
    fn denial_reason(&self, action: Action, ctx: &PermissionContext<'_>) -> Option<String> {
        let outcome = decide(action, ctx);

        let user_id = ctx.actor.map(|a| a.id.to_string()).unwrap_or_else(|| "anonymous".to_string());
        match &outcome {
            Ok(()) => tracing::debug!(
                user_id = %user_id,
                project_id = %ctx.project.id,
                action = %action,
                "permission granted"
            ),
            Err(reason) => tracing::debug!(
                user_id = %user_id,
                project_id = %ctx.project.id,
                action = %action,
                reason = %reason,
                "permission denied"
            ),
        }

        outcome.err().map(Cow::into_owned)
    }
}

/// A single entry of [`PermissionSummary`].
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PermissionEntry {
    pub action: Action,
    pub allowed: bool,
    pub reason: Option<String>,
}

/// Allowance for every action, for UIs deciding which controls to enable.
/// Advisory only: handlers re-check before writing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PermissionSummary {
    pub permissions: Vec<PermissionEntry>,
}

impl PermissionSummary {
    pub fn is_allowed(&self, action: Action) -> bool {
        self.permissions
            .iter()
            .any(|entry| entry.action == action && entry.allowed)
    }
}

pub fn is_allowed(action: Action, ctx: &PermissionContext<'_>) -> bool {
    decide(action, ctx).is_ok()
}

pub fn permission_denied_reason(action: Action, ctx: &PermissionContext<'_>) -> Option<String> {
    decide(action, ctx).err().map(Cow::into_owned)
}

pub fn can_view(ctx: &PermissionContext<'_>) -> bool {
    is_allowed(Action::View, ctx)
}

pub fn can_view_beta_files(ctx: &PermissionContext<'_>) -> bool {
    is_allowed(Action::ViewBetaFiles, ctx)
}

pub fn can_upload_beta(ctx: &PermissionContext<'_>) -> bool {
    is_allowed(Action::UploadBeta, ctx)
}

pub fn can_upload_final(ctx: &PermissionContext<'_>) -> bool {
    is_allowed(Action::UploadFinal, ctx)
}

pub fn can_approve(ctx: &PermissionContext<'_>) -> bool {
    is_allowed(Action::Approve, ctx)
}

pub fn can_request_revisions(ctx: &PermissionContext<'_>) -> bool {
    is_allowed(Action::RequestRevision, ctx)
}

pub fn can_view_approval_history(ctx: &PermissionContext<'_>) -> bool {
    is_allowed(Action::ViewApprovalHistory, ctx)
}

pub fn can_access_final_files(ctx: &PermissionContext<'_>) -> bool {
    is_allowed(Action::AccessFinalFiles, ctx)
}

pub fn can_edit(ctx: &PermissionContext<'_>) -> bool {
    is_allowed(Action::Edit, ctx)
}

pub fn can_create(ctx: &PermissionContext<'_>) -> bool {
    is_allowed(Action::Create, ctx)
}

pub fn can_delete(ctx: &PermissionContext<'_>) -> bool {
    is_allowed(Action::Delete, ctx)
}

pub fn can_comment(ctx: &PermissionContext<'_>) -> bool {
    is_allowed(Action::Comment, ctx)
}

fn decide(action: Action, ctx: &PermissionContext<'_>) -> Decision {
    let Some(actor) = ctx.actor else {
        return Err(reasons::NOT_LOGGED_IN.into());
    };
    let role = actor.role;

    match action {
        Action::View => staff_or_assigned_client(ctx),

        Action::ViewBetaFiles => {
            if role.is_staff() {
                return Ok(());
            }
            staff_or_assigned_client(ctx)?;
            if !(ctx.is_primary_contact() || ctx.has_beta_grant()) {
                return Err(reasons::BETA_NOT_GRANTED.into());
            }
            let deliverable = ctx.deliverable.ok_or(reasons::DELIVERABLE_MISSING)?;
            if !deliverable.has_beta_files() {
                return Err(reasons::NO_BETA_FILES.into());
            }
            Ok(())
        }

        Action::UploadBeta => {
            if !role.is_staff() {
                return Err(reasons::CLIENT_UPLOAD.into());
            }
            if let Some(task) = ctx.task {
                if task.status == TaskStatus::Completed {
                    return Err(reasons::TASK_COMPLETED.into());
                }
                if task.assignee == Some(actor.id) {
                    return Ok(());
                }
            }
            if ctx.is_assigned() {
                Ok(())
            } else {
                Err(reasons::UPLOAD_BETA_UNASSIGNED.into())
            }
        }

        Action::UploadFinal => elevated(role, reasons::UPLOAD_FINAL_ELEVATED),

        Action::Approve => {
            primary_contact(ctx, reasons::APPROVE_PRIMARY_ONLY)?;
            let deliverable = ctx.deliverable.ok_or(reasons::DELIVERABLE_MISSING)?;
            if !deliverable.status.is_awaiting_approval() {
                return Err(reasons::NOT_AWAITING_APPROVAL.into());
            }
            if !deliverable.has_beta_files() {
                return Err(reasons::NOTHING_TO_REVIEW.into());
            }
            Ok(())
        }

        Action::RequestRevision => {
            primary_contact(ctx, reasons::REVISION_PRIMARY_ONLY)?;
            let deliverable = ctx.deliverable.ok_or(reasons::DELIVERABLE_MISSING)?;
            if !deliverable.status.is_awaiting_approval() {
                return Err(reasons::REVISION_NOT_AWAITING.into());
            }
            if !deliverable.has_beta_files() {
                return Err(reasons::NOTHING_TO_REVIEW.into());
            }
            let project = ctx.project;
            if project.revisions_remaining() == 0 {
                return Err(format!(
                    "No revisions remaining ({} of {} used)",
                    project.used_revisions, project.total_revisions
                )
                .into());
            }
            Ok(())
        }

        Action::ViewApprovalHistory => staff_or_assigned_client(ctx),

        Action::AccessFinalFiles => {
            if role.is_staff() {
                return Ok(());
            }
            staff_or_assigned_client(ctx)?;
            let deliverable = ctx.deliverable.ok_or(reasons::DELIVERABLE_MISSING)?;
            if !deliverable.status.is_released() {
                return Err(reasons::FINAL_NOT_RELEASED.into());
            }
            Ok(())
        }

        Action::Edit => elevated(role, reasons::EDIT_ELEVATED),
        Action::Create => elevated(role, reasons::CREATE_ELEVATED),
        Action::Delete => elevated(role, reasons::DELETE_ELEVATED),

        Action::Comment => {
            if ctx.is_assigned() {
                Ok(())
            } else {
                Err(reasons::COMMENT_MEMBERS_ONLY.into())
            }
        }
    }
}

fn staff_or_assigned_client(ctx: &PermissionContext<'_>) -> Decision {
    match ctx.actor {
        Some(actor) if actor.role.is_staff() => Ok(()),
        Some(_) if ctx.is_assigned() => Ok(()),
        Some(_) => Err(reasons::NOT_A_MEMBER.into()),
        None => Err(reasons::NOT_LOGGED_IN.into()),
    }
}

fn elevated(role: Role, reason: &'static str) -> Decision {
    if role.is_elevated() {
        Ok(())
    } else {
        Err(reason.into())
    }
}

fn primary_contact(ctx: &PermissionContext<'_>, reason: &'static str) -> Decision {
    if ctx.is_primary_contact() {
        Ok(())
    } else {
        Err(reason.into())
    }
}
