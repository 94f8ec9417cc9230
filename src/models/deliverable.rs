use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliverableStatus {
    Pending,
    InProgress,
    BetaReady,
    AwaitingApproval,
    Approved,
    RevisionRequested,
    PaymentPending,
    FinalDelivered,
}

impl DeliverableStatus {
    pub const ALL: [DeliverableStatus; 8] = [
        DeliverableStatus::Pending,
        DeliverableStatus::InProgress,
        DeliverableStatus::BetaReady,
        DeliverableStatus::AwaitingApproval,
        DeliverableStatus::Approved,
        DeliverableStatus::RevisionRequested,
        DeliverableStatus::PaymentPending,
        DeliverableStatus::FinalDelivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliverableStatus::Pending => "pending",
            DeliverableStatus::InProgress => "in_progress",
            DeliverableStatus::BetaReady => "beta_ready",
            DeliverableStatus::AwaitingApproval => "awaiting_approval",
            DeliverableStatus::Approved => "approved",
            DeliverableStatus::RevisionRequested => "revision_requested",
            DeliverableStatus::PaymentPending => "payment_pending",
            DeliverableStatus::FinalDelivered => "final_delivered",
        }
    }

    /// States in which the primary contact may approve or ask for changes.
    pub fn is_awaiting_approval(&self) -> bool {
        matches!(self, DeliverableStatus::AwaitingApproval | DeliverableStatus::BetaReady)
    }

    /// States after approval in which final files may be released to the client.
    pub fn is_released(&self) -> bool {
        matches!(
            self,
            DeliverableStatus::Approved
                | DeliverableStatus::PaymentPending
                | DeliverableStatus::FinalDelivered
        )
    }
}

impl fmt::Display for DeliverableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliverableStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeliverableStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| AppError::bad_request(format!("unknown deliverable status: {s}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Deliverable {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: DeliverableStatus,
    pub beta_file_count: i64,
    pub final_file_count: i64,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deliverable {
    pub fn new(project_id: Uuid, title: impl Into<String>, status: DeliverableStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            title: title.into(),
            description: None,
            status,
            beta_file_count: 0,
            final_file_count: 0,
            approved_at: None,
            approved_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_beta_files(mut self, count: i64) -> Self {
        self.beta_file_count = count;
        self
    }

    pub fn has_beta_files(&self) -> bool {
        self.beta_file_count > 0
    }
}

impl crate::events::Loggable for Deliverable {
    fn entity_type() -> &'static str { "deliverable" }
    fn subject_id(&self) -> Uuid { self.id }
}

/// Row shape; file counts are aggregated from `deliverable_files` in the query.
#[derive(Debug, Clone, FromRow)]
pub struct DbDeliverable {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub beta_file_count: i64,
    pub final_file_count: i64,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbDeliverable> for Deliverable {
    type Error = AppError;

    fn try_from(value: DbDeliverable) -> Result<Self, Self::Error> {
        let status = value.status.parse::<DeliverableStatus>().map_err(|_| {
            AppError::internal(format!("invalid status '{}' stored for deliverable {}", value.status, value.id))
        })?;

        Ok(Deliverable {
            id: value.id,
            project_id: value.project_id,
            title: value.title,
            description: value.description,
            status,
            beta_file_count: value.beta_file_count,
            final_file_count: value.final_file_count,
            approved_at: value.approved_at,
            approved_by: value.approved_by,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Watermarked review copy.
    Beta,
    Final,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Beta => "beta",
            FileKind::Final => "final",
        }
    }
}

impl FromStr for FileKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "beta" => Ok(FileKind::Beta),
            "final" => Ok(FileKind::Final),
            other => Err(AppError::bad_request(format!("unknown file kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliverableFile {
    pub id: Uuid,
    pub deliverable_id: Uuid,
    pub kind: FileKind,
    pub file_name: String,
    pub storage_key: String,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl crate::events::Loggable for DeliverableFile {
    fn entity_type() -> &'static str { "deliverable_file" }
    fn subject_id(&self) -> Uuid { self.deliverable_id }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbDeliverableFile {
    pub id: Uuid,
    pub deliverable_id: Uuid,
    pub kind: String,
    pub file_name: String,
    pub storage_key: String,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbDeliverableFile> for DeliverableFile {
    type Error = AppError;

    fn try_from(value: DbDeliverableFile) -> Result<Self, Self::Error> {
        Ok(DeliverableFile {
            id: value.id,
            deliverable_id: value.deliverable_id,
            kind: value.kind.parse()?,
            file_name: value.file_name,
            storage_key: value.storage_key,
            uploaded_by: value.uploaded_by,
            created_at: value.created_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    RevisionRequested,
}

impl ApprovalDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalDecision::Approved => "approved",
            ApprovalDecision::RevisionRequested => "revision_requested",
        }
    }
}

impl FromStr for ApprovalDecision {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(ApprovalDecision::Approved),
            "revision_requested" => Ok(ApprovalDecision::RevisionRequested),
            other => Err(AppError::internal(format!("unknown approval decision: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovalRecord {
    pub id: Uuid,
    pub deliverable_id: Uuid,
    pub actor_id: Uuid,
    pub decision: ApprovalDecision,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbApprovalRecord {
    pub id: Uuid,
    pub deliverable_id: Uuid,
    pub actor_id: Uuid,
    pub decision: String,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbApprovalRecord> for ApprovalRecord {
    type Error = AppError;

    fn try_from(value: DbApprovalRecord) -> Result<Self, Self::Error> {
        Ok(ApprovalRecord {
            id: value.id,
            deliverable_id: value.deliverable_id,
            actor_id: value.actor_id,
            decision: value.decision.parse()?,
            feedback: value.feedback,
            created_at: value.created_at,
        })
    }
}

impl crate::events::Loggable for ApprovalRecord {
    fn entity_type() -> &'static str { "deliverable" }
    fn subject_id(&self) -> Uuid { self.deliverable_id }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub deliverable_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl crate::events::Loggable for Comment {
    fn entity_type() -> &'static str { "comment" }
    fn subject_id(&self) -> Uuid { self.id }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeliverableCreateRequest {
    #[schema(example = "Hero cut (90s)")]
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeliverableUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<DeliverableStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FileUploadRequest {
    pub kind: FileKind,
    #[schema(example = "hero_v2_watermarked.mp4")]
    pub file_name: String,
    #[schema(example = "projects/3f1c/deliverables/hero/beta/hero_v2.mp4")]
    pub storage_key: String,
    /// Task this upload belongs to, used to authorize the task assignee.
    pub task_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ApprovalRequest {
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommentCreateRequest {
    #[schema(example = "Can we try a warmer grade on the opening shot?")]
    pub body: String,
}
