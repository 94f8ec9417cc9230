use super::{describe_allowed, TransitionValidation};
use crate::models::deliverable::DeliverableStatus;

pub fn allowed_deliverable_transitions(current: DeliverableStatus) -> &'static [DeliverableStatus] {
    use DeliverableStatus::*;

    match current {
        Pending => &[InProgress],
        InProgress => &[BetaReady],
        BetaReady => &[AwaitingApproval, InProgress, Approved, RevisionRequested],
        AwaitingApproval => &[Approved, RevisionRequested],
        RevisionRequested => &[InProgress, BetaReady],
        Approved => &[PaymentPending, FinalDelivered],
        PaymentPending => &[FinalDelivered],
        FinalDelivered => &[],
    }
}

pub fn validate_deliverable_transition(
    current: DeliverableStatus,
    proposed: DeliverableStatus,
) -> TransitionValidation {
    if current == proposed || allowed_deliverable_transitions(current).contains(&proposed) {
        return TransitionValidation::valid();
    }

    TransitionValidation::invalid(format!(
        "Cannot transition deliverable from '{}' to '{}'. Allowed transitions: {}",
        current,
        proposed,
        describe_allowed(allowed_deliverable_transitions(current))
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use DeliverableStatus::*;

    #[test]
    fn review_window_can_be_resolved() {
        for status in [AwaitingApproval, BetaReady] {
            assert!(validate_deliverable_transition(status, Approved).is_valid);
            assert!(validate_deliverable_transition(status, RevisionRequested).is_valid);
        }
    }

    #[test]
    fn delivered_is_terminal() {
        assert!(allowed_deliverable_transitions(FinalDelivered).is_empty());
        let result = validate_deliverable_transition(FinalDelivered, InProgress);
        assert_eq!(
            result.error.as_deref(),
            Some("Cannot transition deliverable from 'final_delivered' to 'in_progress'. Allowed transitions: None")
        );
    }

    #[test]
    fn cannot_skip_to_approved() {
        assert!(!validate_deliverable_transition(Pending, Approved).is_valid);
        assert!(!validate_deliverable_transition(InProgress, FinalDelivered).is_valid);
    }
}
