//! Document-extraction orchestrator binary: bootstraps the four external
//! contracts (`ProgressStore`, `BlobStore`, `LLMClient`, `SchemaStore`) from
//! environment configuration, spawns the `BatchPoller`, and starts the
//! control-plane HTTP server. Bootstrap order follows `orbit-web::main`'s
//! env-var-first idiom, minus the Sentinel/JWT/UI concerns that belong to
//! the out-of-scope layers named in SPEC_FULL.md §1.

use orchestrator::batch_poller;
use orchestrator::blob_store::LocalBlobStore;
use orchestrator::llm_client::{AnthropicClient, DeepSeekClient, LLMClient, OllamaClient, OpenAiClient, ResilientLLMClient};
use orchestrator::schema_store::SqliteSchemaStore;
use orchestrator::{server, AppState, OrchestratorConfig};
use progress_store::backends::sqlite::SqliteProgressStore;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = OrchestratorConfig::from_env();
    tracing::info!(host = %config.host, port = config.port, provider = %config.llm_provider, "loaded configuration");

    let progress = SqliteProgressStore::open(&config.progress_db)
        .await
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send>)?;

    let schemas = SqliteSchemaStore::open(&format!("{}.schemas.db", config.progress_db))
        .await
        .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send>)?;

    let blobs = LocalBlobStore::new(config.data_root.as_str());

    let llm_timeout = Duration::from_secs(config.llm_timeout_seconds);
    let raw_llm: Arc<dyn LLMClient> = build_llm_client(&config);
    let llm = ResilientLLMClient::new(raw_llm, llm_timeout);

    let state = AppState::new(
        Arc::new(progress),
        Arc::new(blobs),
        Arc::new(llm),
        Arc::new(schemas),
        config.clone(),
    );

    let poller = batch_poller::spawn(state.clone());
    tracing::info!("batch poller started");

    let state = state.with_poller(poller);

    server::run_server(config, state).await
}

fn build_llm_client(config: &OrchestratorConfig) -> Arc<dyn LLMClient> {
    let model = env::var("ORCHESTRATOR_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

    match config.llm_provider.as_str() {
        "anthropic" => {
            let api_key = env::var("ANTHROPIC_API_KEY").unwrap_or_default();
            Arc::new(AnthropicClient::new(api_key, model))
        }
        "deepseek" => {
            let api_key = env::var("DEEPSEEK_API_KEY").unwrap_or_default();
            Arc::new(DeepSeekClient::new(api_key, model))
        }
        "ollama" => {
            let base_url = env::var("OLLAMA_BASE_URL").unwrap_or_else(|_| "http://localhost:11434".to_string());
            Arc::new(OllamaClient::new(model, base_url))
        }
        _ => {
            let api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
            Arc::new(OpenAiClient::new(api_key, model))
        }
    }
}
