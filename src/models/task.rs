use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(AppError::bad_request(format!("unknown task status: {other}"))),
        }
    }
}

/// Unit of work, optionally tied to a deliverable.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub deliverable_id: Option<Uuid>,
    pub title: String,
    pub status: TaskStatus,
    pub assignee: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(project_id: Uuid, title: impl Into<String>, status: TaskStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            deliverable_id: None,
            title: title.into(),
            status,
            assignee: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn assigned_to(mut self, user_id: Uuid) -> Self {
        self.assignee = Some(user_id);
        self
    }

    pub fn for_deliverable(mut self, deliverable_id: Uuid) -> Self {
        self.deliverable_id = Some(deliverable_id);
        self
    }
}

impl crate::events::Loggable for Task {
    fn entity_type() -> &'static str { "task" }
    fn subject_id(&self) -> Uuid { self.id }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTask {
    pub id: Uuid,
    pub project_id: Uuid,
    pub deliverable_id: Option<Uuid>,
    pub title: String,
    pub status: String,
    pub assignee: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbTask> for Task {
    type Error = AppError;

    fn try_from(value: DbTask) -> Result<Self, Self::Error> {
        let status = value
            .status
            .parse::<TaskStatus>()
            .map_err(|_| AppError::internal(format!("invalid status stored for task {}", value.id)))?;

        Ok(Task {
            id: value.id,
            project_id: value.project_id,
            deliverable_id: value.deliverable_id,
            title: value.title,
            status,
            assignee: value.assignee,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskCreateRequest {
    #[schema(example = "Color grade hero cut")]
    pub title: String,
    pub status: Option<TaskStatus>,
    pub deliverable_id: Option<Uuid>,
    pub assignee: Option<Uuid>,
}
