pub mod approvals;
pub mod comments;
pub mod deliverables;
pub mod files;
pub mod health;
pub mod members;
pub mod projects;
pub mod tasks;
