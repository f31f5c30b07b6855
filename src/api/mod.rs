mod handlers;

pub use handlers::{AssignCatRequest, CreateMissionRequest, CreatedResponse, ErrorBody, UpdateNotesRequest};

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::breeds::BreedValidator;
use crate::service::{CatService, MissionService};
use crate::store::Store;

/// Per-request deadline used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub cats: CatService,
    pub missions: MissionService,
}

impl AppState {
    /// Wire both services over one storage backend.
    pub fn new<S: Store + 'static>(store: Arc<S>, breeds: Arc<dyn BreedValidator>) -> Self {
        let cats = CatService::new(store.clone(), breeds, tracing::info_span!("cats"));
        let missions = MissionService::new(store, tracing::info_span!("missions"));
        Self { cats, missions }
    }
}

pub fn create_router(state: AppState) -> Router {
    create_router_with_timeout(state, DEFAULT_REQUEST_TIMEOUT)
}

pub fn create_router_with_timeout(state: AppState, request_timeout: Duration) -> Router {
    let api = Router::new()
        // Cats
        .route("/cats", get(handlers::list_cats))
        .route("/cats", post(handlers::create_cat))
        .route("/cats/{id}", get(handlers::get_cat))
        .route("/cats/{id}", put(handlers::update_cat))
        .route("/cats/{id}", delete(handlers::delete_cat))
        // Missions
        .route("/missions", get(handlers::list_missions))
        .route("/missions", post(handlers::create_mission))
        .route("/missions/{id}", get(handlers::get_mission))
        .route("/missions/{id}", delete(handlers::delete_mission))
        .route("/missions/{id}/complete", post(handlers::complete_mission))
        .route("/missions/{id}/assign", put(handlers::assign_cat))
        .route("/missions/{id}/assign", delete(handlers::unassign_cat))
        // Targets
        .route("/missions/{id}/targets", post(handlers::add_target))
        .route("/missions/{id}/targets/{target_id}", put(handlers::update_target_notes))
        .route("/missions/{id}/targets/{target_id}", delete(handlers::delete_target))
        .route(
            "/missions/{id}/targets/{target_id}/complete",
            post(handlers::complete_target),
        )
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
