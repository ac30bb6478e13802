// src/handlers/settings.rs
//! Studio-wide settings: the global instruction preamble and the
//! preferred content model.

use axum::{
    extract::Extension,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::StudioError;
use crate::services::token_pricing::{FLASH_MODEL, PRO_MODEL};
use crate::AppState;

#[derive(Deserialize)]
pub struct GlobalPromptRequest {
    pub prompt: String,
}

#[derive(Deserialize)]
pub struct PreferredModelRequest {
    pub model: String,
}

/// GET /api/settings/global-prompt
pub async fn get_global_prompt(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let prompt = state.store.global_prompt().await;
    Json(json!({ "prompt": prompt }))
}

/// PUT /api/settings/global-prompt
pub async fn set_global_prompt(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<GlobalPromptRequest>,
) -> Result<Json<Value>, StudioError> {
    state.store.set_global_prompt(&request.prompt).await?;
    tracing::info!("Updated global instruction prompt ({} chars)", request.prompt.len());
    Ok(Json(json!({ "prompt": request.prompt })))
}

/// GET /api/settings/model
pub async fn get_preferred_model(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let model = state.store.preferred_model().await;
    Json(json!({
        "model": model,
        "available": [FLASH_MODEL, PRO_MODEL],
    }))
}

/// PUT /api/settings/model
pub async fn set_preferred_model(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<PreferredModelRequest>,
) -> Result<Json<Value>, StudioError> {
    if request.model.trim().is_empty() {
        return Err(StudioError::Validation("model id is required".to_string()));
    }
    state.store.set_preferred_model(&request.model).await?;
    tracing::info!("Preferred model set to {}", request.model);
    Ok(Json(json!({ "model": request.model })))
}

pub fn settings_routes() -> Router {
    Router::new()
        .route(
            "/api/settings/global-prompt",
            get(get_global_prompt).put(set_global_prompt),
        )
        .route(
            "/api/settings/model",
            get(get_preferred_model).put(set_preferred_model),
        )
}
