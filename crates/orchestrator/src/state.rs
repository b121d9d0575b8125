//! Shared application state for the orchestrator's HTTP control plane and
//! background `BatchPoller`.

use crate::batch_poller::PollerHandle;
use crate::blob_store::BlobStore;
use crate::config::OrchestratorConfig;
use crate::llm_client::LLMClient;
use crate::schema_store::SchemaStore;
use progress_store::ProgressStore;
use std::sync::Arc;

/// Handles shared across all HTTP handlers and the background poller. Every
/// field is a trait object behind an `Arc` so the external contracts
/// (BlobStore, LLMClient, SchemaStore) can be swapped for test doubles.
///
/// `poller` starts `None` until `batch_poller::spawn` hands back a handle —
/// `AppState::new` is called before the poller exists, so `job_manager`
/// wires it in afterward via `with_poller`.
#[derive(Clone)]
pub struct AppState {
    pub progress: Arc<dyn ProgressStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub llm: Arc<dyn LLMClient>,
    pub schemas: Arc<dyn SchemaStore>,
    pub config: Arc<OrchestratorConfig>,
    pub poller: Option<PollerHandle>,
}

impl AppState {
    pub fn new(
        progress: Arc<dyn ProgressStore>,
        blobs: Arc<dyn BlobStore>,
        llm: Arc<dyn LLMClient>,
        schemas: Arc<dyn SchemaStore>,
        config: OrchestratorConfig,
    ) -> Self {
        AppState {
            progress,
            blobs,
            llm,
            schemas,
            config: Arc::new(config),
            poller: None,
        }
    }

    /// Attaches the `BatchPoller` handle once it's been spawned. `Resume`
    /// wakes the poller through this handle rather than hand-running the
    /// job itself (SPEC_FULL.md §4.7/§4.8).
    pub fn with_poller(mut self, poller: PollerHandle) -> Self {
        self.poller = Some(poller);
        self
    }
}
