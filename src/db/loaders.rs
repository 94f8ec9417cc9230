//! Row loaders shared by the route handlers. Each returns the domain type the
//! permission rules consume.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::deliverable::{DbDeliverable, Deliverable};
use crate::models::project::{DbProject, DbProjectMember, Project};
use crate::models::task::{DbTask, Task};
use crate::models::user::{DbUser, User};

const PROJECT_COLUMNS: &str =
    "id, name, description, status, total_revisions, used_revisions, created_at, updated_at";

const DELIVERABLE_SELECT: &str = r#"
    SELECT d.id, d.project_id, d.title, d.description, d.status,
        (SELECT COUNT(*) FROM deliverable_files f WHERE f.deliverable_id = d.id AND f.kind = 'beta') AS beta_file_count,
        (SELECT COUNT(*) FROM deliverable_files f WHERE f.deliverable_id = d.id AND f.kind = 'final') AS final_file_count,
        d.approved_at, d.approved_by, d.created_at, d.updated_at
    FROM deliverables d
"#;

pub async fn find_user(pool: &SqlitePool, user_id: Uuid) -> AppResult<Option<User>> {
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, name, email, role, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(User::try_from).transpose()
}

pub async fn fetch_project(pool: &SqlitePool, project_id: Uuid) -> AppResult<Project> {
    let row = sqlx::query_as::<_, DbProject>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"
    ))
    .bind(project_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("project not found"))?;

    let members = fetch_members(pool, project_id).await?;
    row.into_project(members)
}

pub async fn list_projects(pool: &SqlitePool) -> AppResult<Vec<Project>> {
    let rows = sqlx::query_as::<_, DbProject>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;

    let mut projects = Vec::with_capacity(rows.len());
    for row in rows {
        let members = fetch_members(pool, row.id).await?;
        projects.push(row.into_project(members)?);
    }
    Ok(projects)
}

async fn fetch_members(pool: &SqlitePool, project_id: Uuid) -> AppResult<Vec<DbProjectMember>> {
    let members = sqlx::query_as::<_, DbProjectMember>(
        "SELECT project_id, user_id, is_primary_contact, beta_access FROM project_members WHERE project_id = ?",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(members)
}

pub async fn fetch_deliverable(pool: &SqlitePool, project_id: Uuid, deliverable_id: Uuid) -> AppResult<Deliverable> {
    sqlx::query_as::<_, DbDeliverable>(&format!(
        "{DELIVERABLE_SELECT} WHERE d.project_id = ? AND d.id = ?"
    ))
    .bind(project_id)
    .bind(deliverable_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("deliverable not found"))?
    .try_into()
}

pub async fn list_deliverables(pool: &SqlitePool, project_id: Uuid) -> AppResult<Vec<Deliverable>> {
    let rows = sqlx::query_as::<_, DbDeliverable>(&format!(
        "{DELIVERABLE_SELECT} WHERE d.project_id = ? ORDER BY d.created_at ASC"
    ))
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Deliverable::try_from).collect()
}

pub async fn fetch_task(pool: &SqlitePool, project_id: Uuid, task_id: Uuid) -> AppResult<Task> {
    sqlx::query_as::<_, DbTask>(
        "SELECT id, project_id, deliverable_id, title, status, assignee, created_at, updated_at FROM tasks WHERE project_id = ? AND id = ?",
    )
    .bind(project_id)
    .bind(task_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("task not found"))?
    .try_into()
}

pub async fn list_tasks(pool: &SqlitePool, project_id: Uuid) -> AppResult<Vec<Task>> {
    let rows = sqlx::query_as::<_, DbTask>(
        "SELECT id, project_id, deliverable_id, title, status, assignee, created_at, updated_at FROM tasks WHERE project_id = ? ORDER BY created_at ASC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Task::try_from).collect()
}
