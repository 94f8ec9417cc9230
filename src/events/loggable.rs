use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How much an activity log row matters to someone reading the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Approvals, revision requests, status changes and deletions.
    Critical,
    #[default]
    Important,
    Noise,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
            Severity::Noise => "noise",
        }
    }
}

/// Entities that can appear as the subject of an activity log entry.
pub trait Loggable: Serialize + Send + Sync {
    /// Prefix of event names, e.g. `deliverable` in `deliverable.approved`.
    fn entity_type() -> &'static str;

    fn subject_id(&self) -> Uuid;

    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "deleted" | "approved" | "revision_requested" | "status_changed" => Severity::Critical,
            "commented" => Severity::Noise,
            _ => Severity::Important,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Thing(Uuid);

    impl Loggable for Thing {
        fn entity_type() -> &'static str { "thing" }
        fn subject_id(&self) -> Uuid { self.0 }
    }

    #[test]
    fn sign_offs_are_critical() {
        let thing = Thing(Uuid::new_v4());
        assert_eq!(thing.severity_for_action("approved"), Severity::Critical);
        assert_eq!(thing.severity_for_action("status_changed"), Severity::Critical);
        assert_eq!(thing.severity_for_action("revision_requested"), Severity::Critical);
        assert_eq!(thing.severity_for_action("deleted"), Severity::Critical);
        assert_eq!(thing.severity_for_action("commented"), Severity::Noise);
        assert_eq!(thing.severity_for_action("created"), Severity::Important);
    }
}
