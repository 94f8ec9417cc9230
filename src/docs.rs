use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::authz::{Action, PermissionEntry, PermissionSummary};
use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::projects::list_projects,
		routes::projects::create_project,
		routes::projects::get_project,
		routes::projects::list_transitions,
		routes::projects::update_status,
		routes::members::upsert_member,
		routes::members::remove_member,
		routes::tasks::list_tasks,
		routes::tasks::create_task,
		routes::deliverables::list_deliverables,
		routes::deliverables::create_deliverable,
		routes::deliverables::get_deliverable,
		routes::deliverables::update_deliverable,
		routes::deliverables::delete_deliverable,
		routes::deliverables::get_permissions,
		routes::files::list_files,
		routes::files::upload_file,
		routes::approvals::approve,
		routes::approvals::request_revision,
		routes::approvals::list_approvals,
		routes::comments::list_comments,
		routes::comments::create_comment
	),
	components(
		schemas(
			routes::health::HealthResponse,
			models::user::Role,
			models::user::User,
			models::project::Project,
			models::project::ProjectStatus,
			models::project::ProjectMember,
			models::project::ProjectCreateRequest,
			models::project::ProjectStatusUpdateRequest,
			models::project::ProjectTransitionsResponse,
			models::project::ProjectMemberRequest,
			models::deliverable::Deliverable,
			models::deliverable::DeliverableStatus,
			models::deliverable::DeliverableCreateRequest,
			models::deliverable::DeliverableUpdateRequest,
			models::deliverable::DeliverableFile,
			models::deliverable::FileKind,
			models::deliverable::FileUploadRequest,
			models::deliverable::ApprovalDecision,
			models::deliverable::ApprovalRecord,
			models::deliverable::ApprovalRequest,
			models::deliverable::Comment,
			models::deliverable::CommentCreateRequest,
			models::task::Task,
			models::task::TaskStatus,
			models::task::TaskCreateRequest,
			Action,
			PermissionEntry,
			PermissionSummary
		)
	),
	modifiers(&BearerAuth),
	tags(
		(name = "Health", description = "Service health"),
		(name = "Projects", description = "Projects, status workflow and team"),
		(name = "Tasks", description = "Production tasks"),
		(name = "Deliverables", description = "Deliverables and their files"),
		(name = "Approvals", description = "Client sign-off and revision requests"),
		(name = "Comments", description = "Deliverable discussion")
	)
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
	fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
		let components = openapi.components.get_or_insert_with(Default::default);
		components.add_security_scheme(
			"bearerAuth",
			SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
		);
	}
}

pub fn build_openapi() -> utoipa::openapi::OpenApi {
	ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn openapi_lists_approval_routes() {
		let doc = serde_json::to_value(build_openapi()).unwrap();
		let paths = doc.get("paths").and_then(|p| p.as_object()).unwrap();
		assert!(paths.contains_key("/projects/{project_id}/deliverables/{id}/approve"));
		assert!(paths.contains_key("/projects/{id}/status"));
		assert!(doc.pointer("/components/securitySchemes/bearerAuth").is_some());
	}
}
