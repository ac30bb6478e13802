// src/handlers/generator.rs
//! Generator wizard endpoints - one session per wizard run, two phases:
//! hooks from the briefing, then blueprint commit from the selected hook.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StudioError;
use crate::pipeline::Briefing;
use crate::AppState;

#[derive(Deserialize)]
pub struct BlueprintRequest {
    #[serde(rename = "hookId")]
    pub hook_id: String,
}

/// POST /api/generator/sessions - open a new wizard session
pub async fn create_session(
    Extension(state): Extension<Arc<AppState>>,
) -> (StatusCode, Json<Value>) {
    let id = state.sessions.create().await;
    (StatusCode::CREATED, Json(json!({ "sessionId": id })))
}

/// POST /api/generator/sessions/:id/hooks - phase 1: briefing to hooks
pub async fn generate_hooks(
    Path(session_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Json(briefing): Json<Briefing>,
) -> Result<Json<Value>, StudioError> {
    let generator = state.generator()?;
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| StudioError::NotFound(format!("session {}", session_id)))?;

    // One outstanding generation call per session.
    let mut session = session.try_lock().map_err(|_| StudioError::Busy)?;
    let hooks = session
        .generate_hooks(briefing, generator.as_ref(), state.store.as_ref())
        .await?
        .to_vec();

    Ok(Json(json!({
        "step": session.step(),
        "hooks": hooks,
        "usage": session.accumulated_usage(),
    })))
}

/// POST /api/generator/sessions/:id/back - return to the briefing form
pub async fn go_back(
    Path(session_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, StudioError> {
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| StudioError::NotFound(format!("session {}", session_id)))?;

    let mut session = session.try_lock().map_err(|_| StudioError::Busy)?;
    session.go_back()?;
    Ok(Json(json!({ "step": session.step() })))
}

/// POST /api/generator/sessions/:id/blueprint - phase 2: commit
pub async fn commit_blueprint(
    Path(session_id): Path<Uuid>,
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<BlueprintRequest>,
) -> Result<Json<Value>, StudioError> {
    let generator = state.generator()?;
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or_else(|| StudioError::NotFound(format!("session {}", session_id)))?;

    let mut session = session.try_lock().map_err(|_| StudioError::Busy)?;
    let project = session
        .commit_blueprint(&request.hook_id, generator.as_ref(), state.store.as_ref())
        .await?;

    // The session is terminal once committed.
    drop(session);
    state.sessions.remove(&session_id).await;

    Ok(Json(json!({ "project": project })))
}

pub fn generator_routes() -> Router {
    Router::new()
        .route("/api/generator/sessions", post(create_session))
        .route("/api/generator/sessions/:id/hooks", post(generate_hooks))
        .route("/api/generator/sessions/:id/back", post(go_back))
        .route("/api/generator/sessions/:id/blueprint", post(commit_blueprint))
}
