// src/models/project.rs
//! Video project entities - the accumulated output of the generation
//! pipeline, persisted as one document per project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name recorded as the project creator. Role gating is a single static
/// owner check upstream of this service, so the name is a constant.
pub const DEFAULT_CREATOR_NAME: &str = "Admin User";

/// A voiceover shorter than this is treated as not yet written.
pub const MIN_FILLED_VOICEOVER_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoMode {
    Original,
    Rewrite,
}

impl std::fmt::Display for VideoMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoMode::Original => write!(f, "ORIGINAL"),
            VideoMode::Rewrite => write!(f, "REWRITE"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Language {
    #[serde(rename = "EN")]
    En,
    #[serde(rename = "VI")]
    Vi,
    #[serde(rename = "EN_VI")]
    EnVi,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::En => write!(f, "EN"),
            Language::Vi => write!(f, "VI"),
            Language::EnVi => write!(f, "EN_VI"),
        }
    }
}

/// Only `Generated` is ever set by the pipeline; `Draft` and `Published`
/// exist for documents written by other tooling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Draft,
    Generated,
    Published,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HookCategory {
    Controversial,
    Story,
    Question,
    Statistic,
}

/// One opening-line variant. Immutable once generated; the id only exists
/// to track selection within a wizard session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HookVariant {
    pub id: String,
    #[serde(rename = "type")]
    pub category: HookCategory,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptSection {
    pub section_title: String,
    /// Deep content; blueprint generation leaves this empty.
    #[serde(default)]
    pub voiceover_text: String,
    pub visual_prompt: String,
    /// Generated preview image as a data URI.
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ScriptSection {
    pub fn is_filled(&self) -> bool {
        self.voiceover_text.chars().count() >= MIN_FILLED_VOICEOVER_CHARS
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeoPackage {
    pub youtube_title: String,
    pub youtube_description: String,
    /// Target cardinality is 15, not enforced.
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThumbnailPackage {
    pub thumbnail_text: String,
    pub thumbnail_visual_prompt: String,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShortsIdea {
    pub title: String,
    pub visual_concept: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepurposingPackage {
    pub shorts_ideas: Vec<ShortsIdea>,
    pub community_post: String,
    pub social_blurb: String,
}

/// Token counts and estimated cost of one or more API calls.
/// Costs only ever accumulate; they are never recomputed from scratch.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct TokenUsage {
    #[serde(rename = "inputTokens")]
    pub input_tokens: u32,
    #[serde(rename = "outputTokens")]
    pub output_tokens: u32,
    /// USD, rounded to 5 decimal places.
    #[serde(rename = "estimatedCost")]
    pub estimated_cost: f64,
}

impl TokenUsage {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Round a USD amount to 5 decimal places, the precision costs are
    /// stored and accumulated at.
    pub fn round_cost(cost: f64) -> f64 {
        (cost * 100_000.0).round() / 100_000.0
    }

    /// Add another call's usage onto this running total.
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.estimated_cost = Self::round_cost(self.estimated_cost + other.estimated_cost);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoProject {
    /// Generated at blueprint-commit time, never before.
    pub id: String,
    #[serde(rename = "channelId")]
    pub channel_id: String,
    /// Topic text, or a reference link in `Rewrite` mode.
    pub topic: String,
    pub mode: VideoMode,
    pub language: Language,
    #[serde(rename = "targetAudience")]
    pub target_audience: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "createdBy")]
    pub created_by: String,

    pub status: ProjectStatus,

    #[serde(rename = "hookVariants", default, skip_serializing_if = "Option::is_none")]
    pub hook_variants: Option<Vec<HookVariant>>,
    /// The chosen hook's content text (not its id).
    #[serde(rename = "selectedHook", default, skip_serializing_if = "Option::is_none")]
    pub selected_hook: Option<String>,

    /// Fixed length after blueprint generation; later phases only mutate
    /// elements in place.
    pub script: Vec<ScriptSection>,
    pub seo: SeoPackage,
    pub thumbnail: ThumbnailPackage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repurposing: Option<RepurposingPackage>,

    #[serde(rename = "tokenUsage", default, skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
}
