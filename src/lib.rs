// lib.rs - Main library file that exports all modules
pub mod error;
pub mod gemini_client;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod scheduler;
pub mod services;
pub mod store;

use std::sync::Arc;

use error::StudioError;
use gemini_client::ContentGenerator;
use pipeline::{ProjectLocks, SessionManager};
use store::ProjectStore;

// Re-export commonly used types for convenience
pub use error::StudioError as Error;
pub use models::*;

/// Shared application state: the storage backend chosen at startup, the
/// (optional) generation client, and the busy-gating registries.
pub struct AppState {
    pub store: Arc<dyn ProjectStore>,
    /// `None` when no API credential is configured; generation endpoints
    /// then fail with a validation error before any network call.
    pub generator: Option<Arc<dyn ContentGenerator>>,
    pub sessions: SessionManager,
    pub project_locks: ProjectLocks,
}

impl AppState {
    pub fn new(store: Arc<dyn ProjectStore>, generator: Option<Arc<dyn ContentGenerator>>) -> Self {
        Self {
            store,
            generator,
            sessions: SessionManager::new(),
            project_locks: ProjectLocks::new(),
        }
    }

    /// The generation client, or the missing-credential validation error.
    pub fn generator(&self) -> Result<Arc<dyn ContentGenerator>, StudioError> {
        self.generator.clone().ok_or_else(|| {
            StudioError::Validation(
                "GEMINI_API_KEY is missing; content generation is disabled".to_string(),
            )
        })
    }
}
