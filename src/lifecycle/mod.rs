//! Status state machines for projects and deliverables.
//!
//! Both tables are static adjacency lists. A status may always "move" to
//! itself; any other move must be listed for the current status.

mod deliverable_status;
mod project_status;

pub use deliverable_status::{allowed_deliverable_transitions, validate_deliverable_transition};
pub use project_status::{allowed_transitions, validate_transition};

use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{AppError, AppResult};

/// Outcome of a transition check. Invalid results carry the message that
/// must reach the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TransitionValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransitionValidation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
        }
    }

    pub fn into_result(self) -> AppResult<()> {
        if self.is_valid {
            return Ok(());
        }
        Err(AppError::invalid_transition(
            self.error.unwrap_or_else(|| "invalid status transition".to_string()),
        ))
    }
}

fn describe_allowed<T: std::fmt::Display>(allowed: &[T]) -> String {
    if allowed.is_empty() {
        return "None".to_string();
    }
    allowed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
