//! Axum wiring for the six extraction-control endpoints (SPEC_FULL.md §6).
//! Grounded on `orbit-web::server`'s router/layer composition, trimmed down
//! to this crate's surface — no WS, auth, file-explorer, or user-management
//! routes survive the transformation.

use crate::api;
use crate::config::OrchestratorConfig;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/extract/:source/:dataset", post(api::start_extraction))
        .route("/extraction-pause/:source/:dataset", post(api::pause_extraction))
        .route("/extraction-resume/:source/:dataset", post(api::resume_extraction))
        .route(
            "/clear-extraction-state/:source/:dataset",
            post(api::clear_extraction_state),
        )
        .route("/extraction-status/:source/:dataset", get(api::extraction_status))
        .route("/extraction-progress/list", get(api::list_extraction_progress))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(config: OrchestratorConfig, state: AppState) -> Result<(), Box<dyn std::error::Error + Send>> {
    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!(addr = %addr, "extraction orchestrator listening");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send>)?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send>)
}
