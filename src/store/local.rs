// src/store/local.rs
//! Flat-file fallback backend: four key-value slots under a data
//! directory. Best-effort durability - a missing or unparseable file is
//! treated as "nothing stored yet" and never surfaces to callers.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;

use super::{default_model, ProjectStore, StoreError, DEFAULT_GLOBAL_PROMPT};
use crate::models::{ChannelProfile, VideoProject, DEFAULT_CHANNELS};

const PROJECTS_FILE: &str = "projects.json";
const CHANNELS_FILE: &str = "channels.json";
const GLOBAL_PROMPT_FILE: &str = "global_prompt.txt";
const PREFERRED_MODEL_FILE: &str = "preferred_model.txt";

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Read and parse a JSON slot. Any failure degrades to `None`.
    async fn read_json<T: DeserializeOwned>(&self, file: &str) -> Option<T> {
        let path = self.path(file);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Discarding unparseable {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(value)?;
        self.write_raw(file, &raw).await
    }

    async fn read_text(&self, file: &str) -> Option<String> {
        match fs::read_to_string(self.path(file)).await {
            Ok(raw) => Some(raw),
            Err(_) => None,
        }
    }

    async fn write_raw(&self, file: &str, raw: &str) -> Result<(), StoreError> {
        if let Err(e) = fs::create_dir_all(&self.dir).await {
            tracing::warn!("Failed to create data directory {}: {}", self.dir.display(), e);
            return Err(e.into());
        }
        fs::write(self.path(file), raw).await?;
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ProjectStore for LocalStore {
    async fn list_projects(&self) -> Vec<VideoProject> {
        let mut projects: Vec<VideoProject> = self.read_json(PROJECTS_FILE).await.unwrap_or_default();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        projects
    }

    async fn save_project(&self, project: &VideoProject) -> Result<(), StoreError> {
        let mut projects: Vec<VideoProject> = self.read_json(PROJECTS_FILE).await.unwrap_or_default();
        match projects.iter_mut().find(|p| p.id == project.id) {
            Some(existing) => *existing = project.clone(),
            None => projects.insert(0, project.clone()),
        }
        self.write_json(PROJECTS_FILE, &projects).await
    }

    async fn delete_project(&self, id: &str) -> Result<(), StoreError> {
        let mut projects: Vec<VideoProject> = self.read_json(PROJECTS_FILE).await.unwrap_or_default();
        projects.retain(|p| p.id != id);
        self.write_json(PROJECTS_FILE, &projects).await
    }

    async fn list_channels(&self) -> Vec<ChannelProfile> {
        match self.read_json::<Vec<ChannelProfile>>(CHANNELS_FILE).await {
            Some(channels) => channels,
            None => DEFAULT_CHANNELS.clone(),
        }
    }

    async fn save_channel(&self, channel: &ChannelProfile) -> Result<(), StoreError> {
        let mut channels = self.list_channels().await;
        match channels.iter_mut().find(|c| c.id == channel.id) {
            Some(existing) => *existing = channel.clone(),
            None => channels.push(channel.clone()),
        }
        self.write_json(CHANNELS_FILE, &channels).await
    }

    async fn delete_channel(&self, id: &str) -> Result<(), StoreError> {
        let mut channels = self.list_channels().await;
        channels.retain(|c| c.id != id);
        self.write_json(CHANNELS_FILE, &channels).await
    }

    async fn global_prompt(&self) -> String {
        self.read_text(GLOBAL_PROMPT_FILE)
            .await
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| DEFAULT_GLOBAL_PROMPT.to_string())
    }

    async fn set_global_prompt(&self, text: &str) -> Result<(), StoreError> {
        self.write_raw(GLOBAL_PROMPT_FILE, text).await
    }

    async fn preferred_model(&self) -> String {
        self.read_text(PREFERRED_MODEL_FILE)
            .await
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(default_model)
    }

    async fn set_preferred_model(&self, model: &str) -> Result<(), StoreError> {
        self.write_raw(PREFERRED_MODEL_FILE, model).await
    }
}
