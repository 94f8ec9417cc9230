use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod loggable;
pub use loggable::{Loggable, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub severity: Severity,
    pub payload: Value,
}

impl DomainEvent {
    pub fn new(name: impl Into<String>, actor_id: Option<Uuid>, subject_id: Option<Uuid>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            occurred_at: Utc::now(),
            actor_id,
            subject_id,
            severity: Severity::default(),
            payload,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

pub type EventBus = broadcast::Sender<DomainEvent>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<DomainEvent>) {
    broadcast::channel(1024)
}

/// Publishes `<entity>.<action>` with the entity's current state and, for
/// updates, the previous state.
pub fn log_activity<T: Loggable>(
    event_bus: &EventBus,
    action: &str,
    actor_id: Option<Uuid>,
    entity: &T,
    old: Option<Value>,
) {
    let name = format!("{}.{}", T::entity_type(), action);
    let mut payload = serde_json::json!({ "new": serde_json::to_value(entity).unwrap_or_default() });
    if let Some(old) = old {
        payload["old"] = old;
    }

    let event = DomainEvent::new(name, actor_id, Some(entity.subject_id()), payload)
        .with_severity(entity.severity_for_action(action));

    // No receivers only means the listener is not running (tests, CLI).
    if event_bus.send(event).is_err() {
        tracing::debug!("activity event dropped: no listener");
    }
}

pub fn describe(event_name: &str) -> &'static str {
    match event_name {
        "project.created" => "Project created",
        "project.status_changed" => "Project status changed",
        "project.member_updated" => "Project team updated",
        "project.member_removed" => "Member removed from project",
        "deliverable.created" => "Deliverable created",
        "deliverable.updated" => "Deliverable updated",
        "deliverable.deleted" => "Deliverable deleted",
        "deliverable.approved" => "Deliverable approved",
        "deliverable.revision_requested" => "Revision requested",
        "deliverable_file.uploaded" => "File uploaded",
        "comment.commented" => "Comment added",
        "task.created" => "Task created",
        _ => "System event",
    }
}

/// SHA-256 over the previous link and this event's payload, hex encoded.
pub fn chain_hash(prev_hash: Option<&str>, payload: &str) -> String {
    let mut hasher = Sha256::new();
    if let Some(prev) = prev_hash {
        hasher.update(prev.as_bytes());
    }
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

pub async fn start_activity_listener(mut rx: broadcast::Receiver<DomainEvent>, pool: SqlitePool) {
    tracing::info!("Activity listener started");
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "activity listener lagged, events dropped");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if let Err(e) = persist_event(&pool, &event).await {
            tracing::error!(event = %event.name, "Failed to save activity log: {}", e);
        }
    }
}

pub async fn persist_event(pool: &SqlitePool, event: &DomainEvent) -> Result<(), sqlx::Error> {
    let properties = serde_json::to_string(&event.payload).unwrap_or_default();

    let mut tx = pool.begin().await?;

    let prev_hash: Option<String> =
        sqlx::query_scalar("SELECT hash FROM activity_log ORDER BY rowid DESC LIMIT 1")
            .fetch_optional(&mut *tx)
            .await?;
    let hash = chain_hash(prev_hash.as_deref(), &properties);

    sqlx::query(
        r#"
        INSERT INTO activity_log (id, event_name, description, actor_id, subject_id, occurred_at, properties, severity, prev_hash, hash)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.id)
    .bind(&event.name)
    .bind(describe(&event.name))
    .bind(event.actor_id)
    .bind(event.subject_id)
    .bind(event.occurred_at)
    .bind(&properties)
    .bind(event.severity.as_str())
    .bind(&prev_hash)
    .bind(&hash)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Subject {
        id: Uuid,
    }

    impl Loggable for Subject {
        fn entity_type() -> &'static str { "deliverable" }
        fn subject_id(&self) -> Uuid { self.id }
    }

    #[test]
    fn chain_hash_depends_on_previous_link() {
        let first = chain_hash(None, "{}");
        let second = chain_hash(Some(&first), "{}");
        assert_eq!(first.len(), 64);
        assert_ne!(first, second);
        assert_eq!(second, chain_hash(Some(&first), "{}"));
    }

    #[tokio::test]
    async fn log_activity_names_event_after_entity() {
        let (bus, mut rx) = init_event_bus();
        let subject = Subject { id: Uuid::new_v4() };

        log_activity(&bus, "approved", None, &subject, None);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, "deliverable.approved");
        assert_eq!(event.subject_id, Some(subject.id));
        assert_eq!(event.severity, Severity::Critical);
        assert_eq!(describe(&event.name), "Deliverable approved");
    }
}
