use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{DefaultPolicyEvaluator, PolicyEvaluator};
use crate::errors::AppError;
use crate::events::{self, EventBus};
use crate::jwt::JwtConfig;
use crate::routes::{approvals, comments, deliverables, files, health, members, projects, tasks};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub policy: Arc<dyn PolicyEvaluator>,
    pub events: EventBus,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        let (events, _rx) = events::init_event_bus();
        Self {
            pool,
            jwt: Arc::new(jwt),
            policy: Arc::new(DefaultPolicyEvaluator::new()),
            events,
        }
    }

    pub fn from_env(pool: SqlitePool) -> Result<Self, AppError> {
        Ok(Self::new(pool, JwtConfig::from_env()?))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let project_routes = Router::new()
        .route("/", get(projects::list_projects).post(projects::create_project))
        .route("/:id", get(projects::get_project))
        .route("/:id/transitions", get(projects::list_transitions))
        .route("/:id/status", put(projects::update_status))
        .route(
            "/:id/members/:user_id",
            put(members::upsert_member).delete(members::remove_member),
        );

    let task_routes = Router::new().route("/", get(tasks::list_tasks).post(tasks::create_task));

    let deliverable_routes = Router::new()
        .route("/", get(deliverables::list_deliverables).post(deliverables::create_deliverable))
        .route(
            "/:id",
            get(deliverables::get_deliverable)
                .put(deliverables::update_deliverable)
                .delete(deliverables::delete_deliverable),
        )
        .route("/:id/permissions", get(deliverables::get_permissions))
        .route("/:id/files", get(files::list_files).post(files::upload_file))
        .route("/:id/approve", post(approvals::approve))
        .route("/:id/revisions", post(approvals::request_revision))
        .route("/:id/approvals", get(approvals::list_approvals))
        .route("/:id/comments", get(comments::list_comments).post(comments::create_comment));

    Router::new()
        .route("/api/health", get(health::health))
        .nest("/projects", project_routes)
        .nest("/projects/:project_id/tasks", task_routes)
        .nest("/projects/:project_id/deliverables", deliverable_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
