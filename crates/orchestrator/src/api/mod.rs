//! HTTP control-plane endpoints (SPEC_FULL.md §6).

pub mod jobs;

pub use jobs::{
    clear_extraction_state, extraction_status, list_extraction_progress, pause_extraction,
    resume_extraction, start_extraction, StartExtractionRequest, StartExtractionResponse,
};
