use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

/// Project status. Serialized with the same display strings the portal shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ProjectStatus {
    Draft,
    Active,
    #[serde(rename = "On Hold")]
    OnHold,
    #[serde(rename = "Awaiting Payment")]
    AwaitingPayment,
    Completed,
    Archived,
    #[serde(rename = "In Review")]
    InReview,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 7] = [
        ProjectStatus::Draft,
        ProjectStatus::Active,
        ProjectStatus::OnHold,
        ProjectStatus::AwaitingPayment,
        ProjectStatus::Completed,
        ProjectStatus::Archived,
        ProjectStatus::InReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "Draft",
            ProjectStatus::Active => "Active",
            ProjectStatus::OnHold => "On Hold",
            ProjectStatus::AwaitingPayment => "Awaiting Payment",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Archived => "Archived",
            ProjectStatus::InReview => "In Review",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::bad_request(format!("unknown project status: {s}")))
    }
}

/// Team membership of a user on one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProjectMember {
    pub user_id: Uuid,
    /// At most one member per project carries this flag.
    pub is_primary_contact: bool,
    /// Explicit grant to see beta files for non-primary client contacts.
    pub beta_access: bool,
}

impl ProjectMember {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_primary_contact: false,
            beta_access: false,
        }
    }

    pub fn primary_contact(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_primary_contact: true,
            beta_access: false,
        }
    }

    pub fn with_beta_access(mut self) -> Self {
        self.beta_access = true;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub total_revisions: i32,
    pub used_revisions: i32,
    pub team: Vec<ProjectMember>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, status: ProjectStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            status,
            total_revisions: 0,
            used_revisions: 0,
            team: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_revisions(mut self, total: i32, used: i32) -> Self {
        self.total_revisions = total;
        self.used_revisions = used;
        self
    }

    pub fn with_member(mut self, member: ProjectMember) -> Self {
        self.team.push(member);
        self
    }

    pub fn member(&self, user_id: Uuid) -> Option<&ProjectMember> {
        self.team.iter().find(|m| m.user_id == user_id)
    }

    pub fn revisions_remaining(&self) -> i32 {
        (self.total_revisions - self.used_revisions).max(0)
    }
}

impl crate::events::Loggable for Project {
    fn entity_type() -> &'static str { "project" }
    fn subject_id(&self) -> Uuid { self.id }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbProject {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub total_revisions: i32,
    pub used_revisions: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbProjectMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub is_primary_contact: bool,
    pub beta_access: bool,
}

impl From<DbProjectMember> for ProjectMember {
    fn from(value: DbProjectMember) -> Self {
        ProjectMember {
            user_id: value.user_id,
            is_primary_contact: value.is_primary_contact,
            beta_access: value.beta_access,
        }
    }
}

impl DbProject {
    /// Joins the row with its team membership list.
    pub fn into_project(self, members: Vec<DbProjectMember>) -> Result<Project, AppError> {
        let status = self.status.parse::<ProjectStatus>().map_err(|_| {
            AppError::internal(format!("invalid status '{}' stored for project {}", self.status, self.id))
        })?;

        Ok(Project {
            id: self.id,
            name: self.name,
            description: self.description,
            status,
            total_revisions: self.total_revisions,
            used_revisions: self.used_revisions,
            team: members.into_iter().map(ProjectMember::from).collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectCreateRequest {
    #[schema(example = "Brand launch film")]
    pub name: String,
    #[schema(example = "90 second hero video plus three cutdowns.")]
    pub description: Option<String>,
    /// Defaults to `Draft`.
    pub status: Option<ProjectStatus>,
    #[schema(example = 3)]
    pub total_revisions: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectStatusUpdateRequest {
    pub status: ProjectStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectTransitionsResponse {
    pub current: ProjectStatus,
    pub allowed: Vec<ProjectStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectMemberRequest {
    #[serde(default)]
    pub is_primary_contact: bool,
    #[serde(default)]
    pub beta_access: bool,
}
