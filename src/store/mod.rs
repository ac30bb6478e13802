// src/store/mod.rs
//! Project store - uniform persistence contract for projects, channel
//! profiles and studio-wide settings.
//!
//! The backend is chosen once at startup and injected as `Arc<dyn
//! ProjectStore>`; nothing reads storage through ambient globals. Reads
//! degrade to built-in defaults on any backend failure, so read accessors
//! return plain values. Writes report failure.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ChannelProfile, VideoProject};
use crate::services::token_pricing::FLASH_MODEL;

pub mod local;
pub mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

/// Instruction preamble prepended to every content-generation prompt when
/// no custom one has been saved.
pub const DEFAULT_GLOBAL_PROMPT: &str = "\
You are an expert content strategist and scriptwriter for YouTube.
GLOBAL RULES APPLICABLE TO ALL CHANNELS:
1. QUALITY: Content must be engaging, factual, and well-structured.
2. FORMATTING: Do not use markdown bolding (**text**) within the spoken voiceover text. Keep it plain text for easy reading.
3. SAFETY: Do not generate hate speech, dangerous content, or sexually explicit material.
4. ENGAGEMENT: Focus on high retention. Use hooks, open loops, and clear payoffs.
5. LANGUAGE: Ensure natural phrasing native to the requested language.";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// CRUD-style persistence contract, independent of backend.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// All projects, newest first.
    async fn list_projects(&self) -> Vec<VideoProject>;
    /// Upsert by id.
    async fn save_project(&self, project: &VideoProject) -> Result<(), StoreError>;
    async fn delete_project(&self, id: &str) -> Result<(), StoreError>;

    /// All channel profiles; the built-in default set when none exist yet.
    async fn list_channels(&self) -> Vec<ChannelProfile>;
    /// Upsert by id.
    async fn save_channel(&self, channel: &ChannelProfile) -> Result<(), StoreError>;
    async fn delete_channel(&self, id: &str) -> Result<(), StoreError>;

    /// Studio-wide instruction preamble, defaulting to the built-in one.
    async fn global_prompt(&self) -> String;
    async fn set_global_prompt(&self, text: &str) -> Result<(), StoreError>;

    /// Preferred content model id, defaulting to the economy tier.
    async fn preferred_model(&self) -> String;
    async fn set_preferred_model(&self, model: &str) -> Result<(), StoreError>;
}

pub(crate) fn default_model() -> String {
    FLASH_MODEL.to_string()
}

/// Fetch a project by id.
pub async fn find_project(store: &dyn ProjectStore, id: &str) -> Option<VideoProject> {
    store.list_projects().await.into_iter().find(|p| p.id == id)
}

/// Resolve a project's channel, falling back to the first available
/// profile when the referenced id dangles after a profile deletion.
pub async fn resolve_channel(store: &dyn ProjectStore, channel_id: &str) -> Option<ChannelProfile> {
    let channels = store.list_channels().await;
    channels
        .iter()
        .find(|c| c.id == channel_id)
        .cloned()
        .or_else(|| channels.into_iter().next())
}
