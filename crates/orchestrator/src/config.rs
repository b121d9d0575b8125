//! Environment-driven configuration, in the style of
//! `orbit-web::main`'s `env::var(...).unwrap_or_else(...)` idiom.

use std::env;

/// Tunables enumerated in SPEC_FULL.md §6, plus the HTTP bind address and
/// the database paths.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub host: String,
    pub port: u16,
    pub progress_db: String,
    pub data_root: String,
    pub max_chunk_chars: usize,
    pub poll_interval_seconds: u64,
    pub max_pdf_concurrency: usize,
    pub llm_temperature: f64,
    pub llm_max_tokens: u32,
    pub llm_timeout_seconds: u64,
    pub llm_provider: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            progress_db: "progress.db".to_string(),
            data_root: "./data".to_string(),
            max_chunk_chars: 4000,
            poll_interval_seconds: 60,
            max_pdf_concurrency: 10,
            llm_temperature: 0.3,
            llm_max_tokens: 4000,
            llm_timeout_seconds: 60,
            llm_provider: "openai".to_string(),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl OrchestratorConfig {
    /// Loads configuration from environment variables, falling back to the
    /// defaults above for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("ORCHESTRATOR_HOST").unwrap_or(defaults.host),
            port: env_or("ORCHESTRATOR_PORT", defaults.port),
            progress_db: env::var("ORCHESTRATOR_PROGRESS_DB").unwrap_or(defaults.progress_db),
            data_root: env::var("ORCHESTRATOR_DATA_ROOT").unwrap_or(defaults.data_root),
            max_chunk_chars: env_or("ORCHESTRATOR_MAX_CHUNK_CHARS", defaults.max_chunk_chars),
            poll_interval_seconds: env_or(
                "ORCHESTRATOR_POLL_INTERVAL_SECONDS",
                defaults.poll_interval_seconds,
            ),
            max_pdf_concurrency: env_or(
                "ORCHESTRATOR_MAX_PDF_CONCURRENCY",
                defaults.max_pdf_concurrency,
            ),
            llm_temperature: env_or("ORCHESTRATOR_LLM_TEMPERATURE", defaults.llm_temperature),
            llm_max_tokens: env_or("ORCHESTRATOR_LLM_MAX_TOKENS", defaults.llm_max_tokens),
            llm_timeout_seconds: env_or(
                "ORCHESTRATOR_LLM_TIMEOUT_SECONDS",
                defaults.llm_timeout_seconds,
            ),
            llm_provider: env::var("ORCHESTRATOR_LLM_PROVIDER").unwrap_or(defaults.llm_provider),
        }
    }

    /// Cache path for a document, per SPEC_FULL.md §6's
    /// `<dataRoot>/cached/<source>/<dataset>-md/<stem>.md` layout.
    pub fn markdown_cache_path(&self, source: &str, dataset: &str, stem: &str) -> std::path::PathBuf {
        std::path::Path::new(&self.data_root)
            .join("cached")
            .join(source)
            .join(format!("{}-md", dataset))
            .join(format!("{}.md", stem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.max_chunk_chars, 4000);
        assert_eq!(cfg.poll_interval_seconds, 60);
        assert_eq!(cfg.max_pdf_concurrency, 10);
        assert_eq!(cfg.llm_temperature, 0.3);
        assert_eq!(cfg.llm_max_tokens, 4000);
        assert_eq!(cfg.llm_timeout_seconds, 60);
    }

    #[test]
    fn markdown_cache_path_matches_convention() {
        let cfg = OrchestratorConfig {
            data_root: "/data".to_string(),
            ..OrchestratorConfig::default()
        };
        let path = cfg.markdown_cache_path("local", "invoices", "a");
        assert_eq!(path, std::path::PathBuf::from("/data/cached/local/invoices-md/a.md"));
    }
}
