use crate::models::deliverable::Deliverable;
use crate::models::project::{Project, ProjectMember};
use crate::models::task::Task;
use crate::models::user::{Role, User};

/// Everything a permission decision may look at, passed explicitly.
///
/// `actor` is `None` when the request carries no verified identity; the
/// evaluator denies every action in that case.
#[derive(Debug, Clone, Copy)]
pub struct PermissionContext<'a> {
    pub actor: Option<&'a User>,
    pub project: &'a Project,
    pub deliverable: Option<&'a Deliverable>,
    pub task: Option<&'a Task>,
}

impl<'a> PermissionContext<'a> {
    pub fn new(actor: Option<&'a User>, project: &'a Project) -> Self {
        Self {
            actor,
            project,
            deliverable: None,
            task: None,
        }
    }

    pub fn with_deliverable(mut self, deliverable: &'a Deliverable) -> Self {
        self.deliverable = Some(deliverable);
        self
    }

    pub fn with_task(mut self, task: &'a Task) -> Self {
        self.task = Some(task);
        self
    }

    /// Membership row of the actor on this project, if any.
    pub fn membership(&self) -> Option<&'a ProjectMember> {
        let actor = self.actor?;
        self.project.member(actor.id)
    }

    /// Super admins count as assigned to every project.
    pub fn is_assigned(&self) -> bool {
        match self.actor {
            Some(actor) if actor.role == Role::SuperAdmin => true,
            Some(_) => self.membership().is_some(),
            None => false,
        }
    }

    pub fn is_primary_contact(&self) -> bool {
        match self.actor {
            Some(actor) if actor.role == Role::Client => {
                self.membership().map(|m| m.is_primary_contact).unwrap_or(false)
            }
            _ => false,
        }
    }

    pub fn has_beta_grant(&self) -> bool {
        self.membership().map(|m| m.beta_access).unwrap_or(false)
    }
}
