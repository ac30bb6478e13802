// src/handlers/projects.rs
//! Project endpoints - listing, deletion and the post-commit generation
//! operations (section fill, bulk fill, images, repurposing).

use axum::{
    extract::{Extension, Path},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::StudioError;
use crate::models::VideoProject;
use crate::pipeline;
use crate::scheduler;
use crate::store::find_project;
use crate::AppState;

async fn load_project(state: &AppState, id: &str) -> Result<VideoProject, StudioError> {
    find_project(state.store.as_ref(), id)
        .await
        .ok_or_else(|| StudioError::NotFound(format!("project {}", id)))
}

/// GET /api/projects - all projects, newest first
pub async fn list_projects(Extension(state): Extension<Arc<AppState>>) -> Json<Value> {
    let projects = state.store.list_projects().await;
    Json(json!({ "projects": projects }))
}

/// GET /api/projects/:id
pub async fn get_project(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<VideoProject>, StudioError> {
    Ok(Json(load_project(&state, &id).await?))
}

/// DELETE /api/projects/:id
pub async fn delete_project(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, StudioError> {
    state.store.delete_project(&id).await?;
    state.project_locks.release(&id).await;
    tracing::info!("Deleted project {}", id);
    Ok(Json(json!({ "deleted": id })))
}

/// POST /api/projects/:id/sections/:index/content - fill one section
pub async fn fill_section(
    Path((id, index)): Path<(String, usize)>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<VideoProject>, StudioError> {
    let generator = state.generator()?;
    let gate = state.project_locks.gate(&id).await;
    let _guard = gate.try_lock().map_err(|_| StudioError::Busy)?;

    let mut project = load_project(&state, &id).await?;
    pipeline::fill_section(generator.as_ref(), state.store.as_ref(), &mut project, index).await?;
    Ok(Json(project))
}

/// POST /api/projects/:id/sections/:index/image - one section's preview
pub async fn generate_section_image(
    Path((id, index)): Path<(String, usize)>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<VideoProject>, StudioError> {
    let generator = state.generator()?;
    let gate = state.project_locks.gate(&id).await;
    let _guard = gate.try_lock().map_err(|_| StudioError::Busy)?;

    let mut project = load_project(&state, &id).await?;
    pipeline::generate_section_image(generator.as_ref(), state.store.as_ref(), &mut project, index)
        .await?;
    Ok(Json(project))
}

/// POST /api/projects/:id/thumbnail/image
pub async fn generate_thumbnail_image(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<VideoProject>, StudioError> {
    let generator = state.generator()?;
    let gate = state.project_locks.gate(&id).await;
    let _guard = gate.try_lock().map_err(|_| StudioError::Busy)?;

    let mut project = load_project(&state, &id).await?;
    pipeline::generate_thumbnail_image(generator.as_ref(), state.store.as_ref(), &mut project)
        .await?;
    Ok(Json(project))
}

/// POST /api/projects/:id/bulk-fill - fill every unfilled section in
/// batches, one persistence write per batch
pub async fn bulk_fill(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, StudioError> {
    let generator = state.generator()?;
    let gate = state.project_locks.gate(&id).await;
    let _guard = gate.try_lock().map_err(|_| StudioError::Busy)?;

    let mut project = load_project(&state, &id).await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let result = scheduler::fill_unfilled_sections(
        generator.as_ref(),
        state.store.as_ref(),
        &mut project,
        Some(&tx),
    )
    .await;
    drop(tx);

    let mut progress = Vec::new();
    while let Ok(update) = rx.try_recv() {
        progress.push(update);
    }

    let report = result?;
    Ok(Json(json!({
        "report": report,
        "progress": progress,
        "project": project,
    })))
}

/// POST /api/projects/:id/repurpose - derive shorts/community/social
pub async fn generate_repurposing(
    Path(id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<VideoProject>, StudioError> {
    let generator = state.generator()?;
    let gate = state.project_locks.gate(&id).await;
    let _guard = gate.try_lock().map_err(|_| StudioError::Busy)?;

    let mut project = load_project(&state, &id).await?;
    pipeline::generate_repurposing(generator.as_ref(), state.store.as_ref(), &mut project).await?;
    Ok(Json(project))
}

pub fn project_routes() -> Router {
    Router::new()
        .route("/api/projects", get(list_projects))
        .route("/api/projects/:id", get(get_project).delete(delete_project))
        .route("/api/projects/:id/sections/:index/content", post(fill_section))
        .route("/api/projects/:id/sections/:index/image", post(generate_section_image))
        .route("/api/projects/:id/thumbnail/image", post(generate_thumbnail_image))
        .route("/api/projects/:id/bulk-fill", post(bulk_fill))
        .route("/api/projects/:id/repurpose", post(generate_repurposing))
}
