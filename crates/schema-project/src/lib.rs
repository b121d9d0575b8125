//! schema-project: JSON extraction and schema-shaped projection for the
//! extraction orchestrator's `ResponseParser` (C5).
//!
//! This crate owns the schema-filtering half of C5 — pulling a JSON object
//! out of a model's free-form text response and filtering it down to the
//! shape declared by a JSON-Schema document. The orchestrator crate owns
//! the prompt-shape-specific wrapping around these functions
//! (`ParseWithReasoning`'s merge-prompt conventions live here too, since
//! they operate on the same parsed value).
//!
//! # Example
//!
//! ```
//! use schema_project::{parse, project};
//! use serde_json::json;
//!
//! let schema = json!({"type": "object", "properties": {"title": {"type": "string"}}});
//! let value = parse(r#"{"title": "X", "unused": 1}"#).unwrap();
//! assert_eq!(project(&value, &schema), json!({"title": "X"}));
//! ```

pub mod error;
pub mod project;

pub use error::{Error, Result};
pub use project::{clean_json_string, parse, parse_with_reasoning, project, validate_schema_document};
