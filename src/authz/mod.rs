//! Authorization module - permission rules for deliverables and tasks
//!
//! Decisions are pure functions of an explicit [`PermissionContext`]:
//! - the actor (or `None` for an unauthenticated caller, which denies everything)
//! - the project, with its team membership and revision budget
//! - the deliverable and task under consideration, when relevant
//!
//! The same evaluator backs the advisory capability summary shown to UIs and
//! the authoritative checks run by every mutating handler.

mod context;
mod evaluator;

pub use context::PermissionContext;
pub use evaluator::{
    can_access_final_files, can_approve, can_comment, can_create, can_delete, can_edit,
    can_request_revisions, can_upload_beta, can_upload_final, can_view, can_view_approval_history,
    can_view_beta_files, is_allowed, permission_denied_reason, DefaultPolicyEvaluator,
    PermissionEntry, PermissionSummary, PolicyEvaluator,
};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;

/// Named actions a user can attempt on a deliverable or its project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    ViewBetaFiles,
    UploadBeta,
    UploadFinal,
    Approve,
    RequestRevision,
    ViewApprovalHistory,
    AccessFinalFiles,
    Edit,
    Create,
    Delete,
    Comment,
}

impl Action {
    pub const ALL: [Action; 12] = [
        Action::View,
        Action::ViewBetaFiles,
        Action::UploadBeta,
        Action::UploadFinal,
        Action::Approve,
        Action::RequestRevision,
        Action::ViewApprovalHistory,
        Action::AccessFinalFiles,
        Action::Edit,
        Action::Create,
        Action::Delete,
        Action::Comment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::ViewBetaFiles => "view_beta_files",
            Action::UploadBeta => "upload_beta",
            Action::UploadFinal => "upload_final",
            Action::Approve => "approve",
            Action::RequestRevision => "request_revision",
            Action::ViewApprovalHistory => "view_approval_history",
            Action::AccessFinalFiles => "access_final_files",
            Action::Edit => "edit",
            Action::Create => "create",
            Action::Delete => "delete",
            Action::Comment => "comment",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s.trim())
            .ok_or_else(|| AppError::bad_request(format!("unknown action: {s}")))
    }
}

/// User-facing denial messages.
pub mod reasons {
    pub const NOT_LOGGED_IN: &str = "You must be logged in";
    pub const NOT_A_MEMBER: &str = "You are not a member of this project";
    pub const DELIVERABLE_MISSING: &str = "Deliverable not found";

    pub const BETA_NOT_GRANTED: &str =
        "Only the primary client contact or invited reviewers can view beta files";
    pub const NO_BETA_FILES: &str = "No beta files are available for this deliverable yet";

    pub const CLIENT_UPLOAD: &str = "Clients cannot upload files";
    pub const UPLOAD_BETA_UNASSIGNED: &str =
        "You must be assigned to this project or task to upload beta files";
    pub const TASK_COMPLETED: &str = "This task is already completed";
    pub const UPLOAD_FINAL_ELEVATED: &str = "Only admins and project managers can upload final files";

    pub const APPROVE_PRIMARY_ONLY: &str = "Only the primary client contact can approve deliverables";
    pub const NOT_AWAITING_APPROVAL: &str = "This deliverable is not awaiting approval";
    pub const NOTHING_TO_REVIEW: &str = "There are no beta files to review yet";
    pub const REVISION_PRIMARY_ONLY: &str = "Only the primary client contact can request revisions";
    pub const REVISION_NOT_AWAITING: &str =
        "Revisions can only be requested while a deliverable is awaiting approval";

    pub const FINAL_NOT_RELEASED: &str =
        "Final files are available once the deliverable has been approved";

    pub const EDIT_ELEVATED: &str = "Only admins and project managers can edit deliverables";
    pub const CREATE_ELEVATED: &str = "Only admins and project managers can create deliverables";
    pub const DELETE_ELEVATED: &str = "Only admins and project managers can delete deliverables";

    pub const COMMENT_MEMBERS_ONLY: &str = "Only project members can comment";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
            assert_eq!(serde_json::to_value(action).unwrap(), action.as_str());
        }
    }
}
