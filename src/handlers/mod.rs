// src/handlers/mod.rs
pub mod channels;
pub mod generator;
pub mod projects;
pub mod settings;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::error::StudioError;

impl IntoResponse for StudioError {
    fn into_response(self) -> Response {
        let status = match &self {
            StudioError::Validation(_) => StatusCode::BAD_REQUEST,
            StudioError::Busy => StatusCode::CONFLICT,
            StudioError::NotFound(_) => StatusCode::NOT_FOUND,
            StudioError::Generation(_) | StudioError::Image(_) => StatusCode::BAD_GATEWAY,
            StudioError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StudioError::BulkAborted { .. } => StatusCode::BAD_GATEWAY,
        };

        let body = match &self {
            // Bulk aborts carry their committed progress so the caller
            // knows which batches are already persisted.
            StudioError::BulkAborted {
                completed,
                total,
                reason,
            } => json!({
                "error": self.to_string(),
                "completed": completed,
                "total": total,
                "reason": reason,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
