use super::{describe_allowed, TransitionValidation};
use crate::models::project::ProjectStatus;

/// Statuses a project may move to from `current`.
pub fn allowed_transitions(current: ProjectStatus) -> &'static [ProjectStatus] {
    use ProjectStatus::*;

    match current {
        Draft => &[Active],
        Active => &[OnHold, Completed, AwaitingPayment],
        OnHold => &[Active],
        AwaitingPayment => &[Active, Completed],
        Completed => &[Active, Archived],
        Archived => &[],
        InReview => &[Active, Completed],
    }
}

impl ProjectStatus {
    pub fn is_terminal(&self) -> bool {
        allowed_transitions(*self).is_empty()
    }

    pub fn can_transition_to(&self, proposed: ProjectStatus) -> bool {
        validate_transition(*self, proposed).is_valid
    }
}

pub fn validate_transition(current: ProjectStatus, proposed: ProjectStatus) -> TransitionValidation {
    if current == proposed {
        return TransitionValidation::valid();
    }

    let allowed = allowed_transitions(current);
    if allowed.contains(&proposed) {
        return TransitionValidation::valid();
    }

    TransitionValidation::invalid(format!(
        "Cannot transition project from '{}' to '{}'. Allowed transitions: {}",
        current,
        proposed,
        describe_allowed(allowed)
    ))
}
