// src/error.rs
//! Operation-level error taxonomy. Every generation or persistence
//! failure is converted into one of these at the operation boundary and
//! surfaced as a caller-visible message; nothing escapes unhandled.

use thiserror::Error;

use crate::gemini_client::{GenerationError, ImageGenerationError};
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum StudioError {
    /// Local pre-call failure (missing form fields, missing credential).
    /// Never reaches the API.
    #[error("{0}")]
    Validation(String),

    /// Another generation call is already running against this session or
    /// project; callers retry once it finishes.
    #[error("another generation call is already in progress")]
    Busy,

    #[error("{0} not found")]
    NotFound(String),

    #[error("content generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Image(#[from] ImageGenerationError),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    /// A section-content failure stopped the bulk run. Batches persisted
    /// before the failure stay committed; nothing is rolled back.
    #[error("bulk generation stopped after {completed}/{total} sections: {reason}")]
    BulkAborted {
        completed: usize,
        total: usize,
        reason: String,
    },
}
