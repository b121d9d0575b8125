//! Document-extraction orchestrator.
//!
//! Coordinates PDF-to-markdown conversion (cached on disk), paragraph-bounded
//! chunking, iterative LLM-based schema extraction and merging, and durable
//! job-progress tracking, over the external `BlobStore`/`LLMClient`/
//! `SchemaStore` contracts declared in their respective modules.

pub mod api;
pub mod batch_poller;
pub mod blob_store;
pub mod chunker;
pub mod config;
pub mod engine;
pub mod error;
pub mod job_manager;
pub mod llm_client;
pub mod markdown_cache;
pub mod prompt_builder;
pub mod schema_store;
pub mod state;

pub mod server;

pub use config::OrchestratorConfig;
pub use error::{WebError, WebResult};
pub use state::AppState;

/// Starts the HTTP control plane. Does not spawn the `BatchPoller` — callers
/// that want background job execution spawn it separately (see
/// `orchestrator`'s `main.rs`), since tests often want the API without it.
pub async fn start_server(config: OrchestratorConfig, state: AppState) -> Result<(), Box<dyn std::error::Error + Send>> {
    server::run_server(config, state).await
}
