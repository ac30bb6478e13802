// src/store/memory.rs
//! In-process backend. Stands in for the cloud document store at the
//! interface level and backs the test suite.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{default_model, ProjectStore, StoreError, DEFAULT_GLOBAL_PROMPT};
use crate::models::{ChannelProfile, VideoProject, DEFAULT_CHANNELS};

#[derive(Default)]
struct MemoryInner {
    projects: HashMap<String, VideoProject>,
    /// `None` means "nothing stored yet" - list reads fall back to the
    /// built-in defaults, exactly like an empty document collection.
    channels: Option<Vec<ChannelProfile>>,
    global_prompt: Option<String>,
    preferred_model: Option<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn list_projects(&self) -> Vec<VideoProject> {
        let inner = self.inner.read().await;
        let mut projects: Vec<VideoProject> = inner.projects.values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        projects
    }

    async fn save_project(&self, project: &VideoProject) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn delete_project(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.projects.remove(id);
        Ok(())
    }

    async fn list_channels(&self) -> Vec<ChannelProfile> {
        let inner = self.inner.read().await;
        match &inner.channels {
            Some(channels) => channels.clone(),
            None => DEFAULT_CHANNELS.clone(),
        }
    }

    async fn save_channel(&self, channel: &ChannelProfile) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let channels = inner.channels.get_or_insert_with(|| DEFAULT_CHANNELS.clone());
        match channels.iter_mut().find(|c| c.id == channel.id) {
            Some(existing) => *existing = channel.clone(),
            None => channels.push(channel.clone()),
        }
        Ok(())
    }

    async fn delete_channel(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let channels = inner.channels.get_or_insert_with(|| DEFAULT_CHANNELS.clone());
        channels.retain(|c| c.id != id);
        Ok(())
    }

    async fn global_prompt(&self) -> String {
        let inner = self.inner.read().await;
        inner
            .global_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_GLOBAL_PROMPT.to_string())
    }

    async fn set_global_prompt(&self, text: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.global_prompt = Some(text.to_string());
        Ok(())
    }

    async fn preferred_model(&self) -> String {
        let inner = self.inner.read().await;
        inner.preferred_model.clone().unwrap_or_else(default_model)
    }

    async fn set_preferred_model(&self, model: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.preferred_model = Some(model.to_string());
        Ok(())
    }
}
