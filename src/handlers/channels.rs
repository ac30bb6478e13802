// src/handlers/channels.rs
//! Channel profile CRUD. Deleting a profile leaves existing projects
//! untouched; their channel references may dangle and are resolved with a
//! fallback at generation time.

use axum::{
    extract::{Extension, Path},
    response::Json,
    routing::{delete, get},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StudioError;
use crate::models::ChannelProfile;
use crate::AppState;

/// GET /api/channels - stored profiles, or the built-in defaults
pub async fn list_channels(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let channels = state.store.list_channels().await;
    Json(json!({ "channels": channels }))
}

/// POST /api/channels - upsert a profile (id assigned when empty)
pub async fn save_channel(
    Extension(state): Extension<Arc<AppState>>,
    Json(mut channel): Json<ChannelProfile>,
) -> Result<Json<ChannelProfile>, StudioError> {
    if channel.name.trim().is_empty() {
        return Err(StudioError::Validation("channel name is required".to_string()));
    }
    if channel.id.trim().is_empty() {
        channel.id = format!("ch_{}", Uuid::new_v4());
    }

    state.store.save_channel(&channel).await?;
    tracing::info!("Saved channel profile {} ({})", channel.id, channel.name);
    Ok(Json(channel))
}

/// DELETE /api/channels/:id
pub async fn delete_channel(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, StudioError> {
    state.store.delete_channel(&id).await?;
    tracing::info!("Deleted channel profile {}", id);
    Ok(Json(json!({ "deleted": id })))
}

pub fn channel_routes() -> Router {
    Router::new()
        .route("/api/channels", get(list_channels).post(save_channel))
        .route("/api/channels/:id", delete(delete_channel))
}
