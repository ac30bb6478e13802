// src/gemini_client.rs
//! Gemini content + Imagen image client for the four generation phases
//! (hooks, blueprint, section content, repurposing) and thumbnail/scene
//! image synthesis.
//!
//! The global instruction preamble and the preferred model id are fetched
//! from the injected store on every call, never cached, so edits made in
//! the prompt manager apply to the next request immediately.

use std::sync::Arc;

use async_trait::async_trait;
use base64::prelude::*;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    ChannelProfile, HookCategory, HookVariant, Language, RepurposingPackage, ScriptSection,
    SeoPackage, ThumbnailPackage, TokenUsage, VideoMode, VideoProject,
};
use crate::services::token_pricing::compute_usage;
use crate::store::ProjectStore;

/// Image models tried in order; the first success wins.
pub const IMAGE_MODEL_FALLBACKS: [&str; 2] = ["imagen-4.0-generate-001", "imagen-3.0-generate-001"];

/// Number of script sections requested from the blueprint phase.
pub const BLUEPRINT_SECTION_COUNT: usize = 12;

/// Character budget for the script context fed into repurposing.
const SCRIPT_CONTEXT_CHAR_LIMIT: usize = 10_000;

lazy_static! {
    static ref DATA_URI_RE: Regex = Regex::new(r"^data:(.+);base64,(.+)$").unwrap();
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Gemini API error: {0}")]
    Api(String),
    #[error("Gemini request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("response failed schema validation: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("response contained no content")]
    EmptyResponse,
}

/// Raised only after every model in the fallback list has failed.
#[derive(Error, Debug)]
#[error("no image generated after trying all models (the prompt may have triggered safety filters): {last_error}")]
pub struct ImageGenerationError {
    pub last_error: String,
}

// --- Wire types (generateContent) ---

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            parts,
            role: Some("user".to_string()),
        }
    }

    fn text(text: impl Into<String>) -> Self {
        Self::user(vec![Part::Text { text: text.into() }])
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InlineData {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Base64 encoded payload.
    pub data: String,
}

#[derive(Debug, Serialize, Default)]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    pub prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    pub candidates_token_count: u32,
    #[serde(rename = "totalTokenCount", default)]
    pub total_token_count: u32,
}

// --- Wire types (Imagen predict) ---

#[derive(Debug, Serialize)]
struct ImagePredictRequest {
    instances: Vec<ImageInstance>,
    parameters: ImageParameters,
}

#[derive(Debug, Serialize)]
struct ImageInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
struct ImageParameters {
    #[serde(rename = "sampleCount")]
    sample_count: u32,
    #[serde(rename = "aspectRatio")]
    aspect_ratio: String,
    #[serde(rename = "outputMimeType")]
    output_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct ImagePredictResponse {
    #[serde(default)]
    predictions: Vec<ImagePrediction>,
}

#[derive(Debug, Deserialize)]
struct ImagePrediction {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64_encoded: Option<String>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

/// Decoded image bytes plus their MIME type.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl GeneratedImage {
    /// Encode as a `data:` URI, the form images are persisted in.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64_STANDARD.encode(&self.bytes))
    }
}

// --- Structured response payloads ---
// Parsed with a fail-closed typed step: a response that does not match the
// requested schema is a GenerationError, not a silently-defaulted value.

#[derive(Debug, Deserialize)]
struct HookBatchPayload {
    hooks: Vec<HookPayload>,
}

#[derive(Debug, Deserialize)]
struct HookPayload {
    #[serde(rename = "type")]
    category: HookCategory,
    content: String,
}

/// The 12-section script skeleton plus SEO and thumbnail metadata produced
/// by the blueprint phase.
#[derive(Debug, Clone, Deserialize)]
pub struct Blueprint {
    pub seo: SeoPackage,
    pub thumbnail: ThumbnailPackage,
    pub script_sections: Vec<ScriptSection>,
}

// --- Response schemas sent to the API ---

fn hook_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "hooks": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": {
                            "type": "STRING",
                            "enum": ["CONTROVERSIAL", "STORY", "QUESTION", "STATISTIC"]
                        },
                        "content": { "type": "STRING" }
                    },
                    "required": ["type", "content"]
                }
            }
        },
        "required": ["hooks"]
    })
}

fn video_package_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "seo": {
                "type": "OBJECT",
                "properties": {
                    "youtube_title": { "type": "STRING" },
                    "youtube_description": { "type": "STRING" },
                    "tags": { "type": "ARRAY", "items": { "type": "STRING" } }
                },
                "required": ["youtube_title", "youtube_description", "tags"]
            },
            "thumbnail": {
                "type": "OBJECT",
                "properties": {
                    "thumbnail_text": { "type": "STRING" },
                    "thumbnail_visual_prompt": { "type": "STRING" }
                },
                "required": ["thumbnail_text", "thumbnail_visual_prompt"]
            },
            "script_sections": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "section_title": { "type": "STRING" },
                        "voiceover_text": { "type": "STRING" },
                        "visual_prompt": { "type": "STRING" }
                    },
                    "required": ["section_title", "voiceover_text", "visual_prompt"]
                }
            }
        },
        "required": ["seo", "thumbnail", "script_sections"]
    })
}

fn repurposing_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "shorts_ideas": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "visual_concept": { "type": "STRING" }
                    },
                    "required": ["title", "visual_concept"]
                }
            },
            "community_post": { "type": "STRING" },
            "social_blurb": { "type": "STRING" }
        },
        "required": ["shorts_ideas", "community_post", "social_blurb"]
    })
}

/// The five generation operations, as a seam so the pipeline and the bulk
/// scheduler can run against stub generators in tests.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Phase 1: four typed opening-line variants for the briefing.
    async fn generate_hooks(
        &self,
        topic: &str,
        audience: &str,
        language: Language,
        channel: &ChannelProfile,
    ) -> Result<(Vec<HookVariant>, TokenUsage), GenerationError>;

    /// Phase 2: the full video blueprint (SEO, thumbnail, empty sections).
    async fn generate_video_package(
        &self,
        topic: &str,
        mode: VideoMode,
        language: Language,
        channel: &ChannelProfile,
        audience: &str,
        selected_hook: &str,
    ) -> Result<(Blueprint, TokenUsage), GenerationError>;

    /// Phase 3: deep voiceover content for one section. Returns an empty
    /// string when the model answers with no text.
    async fn generate_section_content(
        &self,
        channel: &ChannelProfile,
        topic: &str,
        section_title: &str,
        visual_context: &str,
        language: Language,
    ) -> Result<String, GenerationError>;

    /// Phase 4: shorts ideas, community post and social blurb derived from
    /// the available voiceover text.
    async fn generate_repurposed_content(
        &self,
        project: &VideoProject,
    ) -> Result<(RepurposingPackage, TokenUsage), GenerationError>;

    /// Image synthesis with ordered model fallback.
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ImageGenerationError>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    store: Arc<dyn ProjectStore>,
}

impl GeminiClient {
    pub fn new(api_key: String, store: Arc<dyn ProjectStore>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            store,
        }
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini API error ({}): {}", model, error_text);
            return Err(GenerationError::Api(error_text));
        }

        let response_text = response.text().await?;
        tracing::debug!(
            "Gemini response (truncated): {}",
            response_text.chars().take(300).collect::<String>()
        );

        Ok(serde_json::from_str(&response_text)?)
    }

    /// First text part of the first candidate, if any.
    fn response_text(response: &GenerateContentResponse) -> Option<&str> {
        response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|content| {
                content.parts.iter().find_map(|part| match part {
                    Part::Text { text } => Some(text.as_str()),
                    _ => None,
                })
            })
    }

    fn usage_of(response: &GenerateContentResponse, model: &str) -> TokenUsage {
        let meta = response.usage_metadata.as_ref();
        compute_usage(
            model,
            meta.map(|m| m.prompt_token_count).unwrap_or(0),
            meta.map(|m| m.candidates_token_count).unwrap_or(0),
        )
    }

    /// Parse a structured JSON response, failing closed on any mismatch.
    fn parse_structured<T: serde::de::DeserializeOwned>(
        response: &GenerateContentResponse,
    ) -> Result<T, GenerationError> {
        let text = Self::response_text(response).ok_or(GenerationError::EmptyResponse)?;
        Ok(serde_json::from_str(text)?)
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate_hooks(
        &self,
        topic: &str,
        audience: &str,
        language: Language,
        channel: &ChannelProfile,
    ) -> Result<(Vec<HookVariant>, TokenUsage), GenerationError> {
        let global_prompt = self.store.global_prompt().await;
        let model = self.store.preferred_model().await;

        let prompt = format!(
            "{global_prompt}\n\n\
             Generate 4 distinct \"Killer Hooks\" (first 3-10 seconds of video) for a YouTube video.\n\n\
             TOPIC: {topic}\n\
             TARGET AUDIENCE: {audience}\n\
             LANGUAGE: {language}\n\
             CHANNEL STYLE: {style}\n\n\
             TYPES REQUIRED:\n\
             1. CONTROVERSIAL (Challenge a common belief)\n\
             2. STORY (Start in the middle of action)\n\
             3. QUESTION (Provoke curiosity)\n\
             4. STATISTIC (Shocking number)\n\n\
             Output strict JSON.",
            style = channel.script_prompt,
        );

        let request = GenerateContentRequest {
            contents: vec![Content::text(prompt)],
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: 0.8,
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(hook_schema()),
                ..Default::default()
            },
        };

        tracing::info!("Generating hooks for topic '{}' with {}", topic, model);
        let response = self.generate_content(&model, &request).await?;
        let payload: HookBatchPayload = Self::parse_structured(&response)?;

        // The API does not supply ids; assign fresh ones for selection.
        let hooks = payload
            .hooks
            .into_iter()
            .map(|h| HookVariant {
                id: Uuid::new_v4().to_string(),
                category: h.category,
                content: h.content,
            })
            .collect();

        Ok((hooks, Self::usage_of(&response, &model)))
    }

    async fn generate_video_package(
        &self,
        topic: &str,
        mode: VideoMode,
        language: Language,
        channel: &ChannelProfile,
        audience: &str,
        selected_hook: &str,
    ) -> Result<(Blueprint, TokenUsage), GenerationError> {
        let global_prompt = self.store.global_prompt().await;
        let model = self.store.preferred_model().await;

        let system_prompt = format!(
            "{global_prompt}\n\n\
             TASK: Generate a VIDEO BLUEPRINT for a YouTube long-form video.\n\n\
             CONTEXT:\n\
             - TOPIC: {topic}\n\
             - TARGET AUDIENCE: {audience}\n\
             - SELECTED HOOK (Use this to start the script structure): \"{selected_hook}\"\n\n\
             STRUCTURE REQUIREMENTS:\n\
             1. Generate exactly {sections} SECTIONS in the 'script_sections' array.\n\
             2. For 'voiceover_text', RETURN AN EMPTY STRING \"\". We will generate the deep content later.\n\
             3. Focus creativity on 'section_title' and 'visual_prompt'.\n\
             4. 'visual_prompt' must be detailed (Describe B-roll, Text overlays, Animations).\n\n\
             METADATA REQUIREMENTS:\n\
             1. SEO: High-CTR Title, Description, 15 Tags.\n\
             2. THUMBNAIL: Concept and overlay text.\n\n\
             LANGUAGE: {language}\n\
             MODE: {mode}",
            sections = BLUEPRINT_SECTION_COUNT,
        );

        let mut parts = vec![Part::Text {
            text: format!(
                "--- CHANNEL IDENTITY ---\n{}\n\
                 --- VISUAL STYLE ---\n{}\n\
                 --- THUMBNAIL GUIDANCE ---\n{}",
                channel.script_prompt, channel.image_gen_prompt, channel.thumbnail_prompt
            ),
        }];

        // Attach the reference image as inline context for thumbnail styling.
        if let Some(data_uri) = &channel.thumbnail_ref_image {
            if let Some(caps) = DATA_URI_RE.captures(data_uri) {
                parts.push(Part::InlineData {
                    inline_data: InlineData {
                        mime_type: caps[1].to_string(),
                        data: caps[2].to_string(),
                    },
                });
                parts.push(Part::Text {
                    text: "Use this reference image for thumbnail style.".to_string(),
                });
            }
        }

        let request = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            system_instruction: Some(Content {
                parts: vec![Part::Text { text: system_prompt }],
                role: None,
            }),
            generation_config: GenerationConfig {
                temperature: 0.7,
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(video_package_schema()),
                ..Default::default()
            },
        };

        tracing::info!("Generating video blueprint for topic '{}' with {}", topic, model);
        let response = self.generate_content(&model, &request).await?;
        let blueprint: Blueprint = Self::parse_structured(&response)?;

        Ok((blueprint, Self::usage_of(&response, &model)))
    }

    async fn generate_section_content(
        &self,
        channel: &ChannelProfile,
        topic: &str,
        section_title: &str,
        visual_context: &str,
        language: Language,
    ) -> Result<String, GenerationError> {
        let global_prompt = self.store.global_prompt().await;
        let model = self.store.preferred_model().await;

        let prompt = format!(
            "{global_prompt}\n\
             CHANNEL IDENTITY: {style}\n\
             TOPIC: {topic}\n\
             SECTION TITLE: {section_title}\n\
             VISUAL CONTEXT: {visual_context}\n\
             LANGUAGE: {language}\n\n\
             TASK: Write voiceover content for this section (800-1200 words).\n\
             Do NOT include \"Scene\" or \"Visual\" labels. Just the spoken words.",
            style = channel.script_prompt,
        );

        let request = GenerateContentRequest {
            contents: vec![Content::text(prompt)],
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: Some(8192),
                ..Default::default()
            },
        };

        tracing::info!("Generating section content: '{}'", section_title);
        let response = self.generate_content(&model, &request).await?;

        // A contentless response is an empty section, not a failure.
        Ok(Self::response_text(&response).unwrap_or_default().to_string())
    }

    async fn generate_repurposed_content(
        &self,
        project: &VideoProject,
    ) -> Result<(RepurposingPackage, TokenUsage), GenerationError> {
        let model = self.store.preferred_model().await;

        let script_context: String = project
            .script
            .iter()
            .map(|s| s.voiceover_text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .chars()
            .take(SCRIPT_CONTEXT_CHAR_LIMIT)
            .collect();

        let prompt = format!(
            "Based on this YouTube script, generate repurposed content:\n\
             1. 3 YouTube Shorts Ideas (Title + Visual Concept).\n\
             2. 1 Engaging Community Tab Post (Poll or Question).\n\
             3. 1 Short Social Media Blurb (Twitter/TikTok style).\n\n\
             SCRIPT CONTEXT:\n{script_context}"
        );

        let request = GenerateContentRequest {
            contents: vec![Content::text(prompt)],
            system_instruction: None,
            generation_config: GenerationConfig {
                temperature: 0.7,
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(repurposing_schema()),
                ..Default::default()
            },
        };

        tracing::info!("Generating repurposed content for project {}", project.id);
        let response = self.generate_content(&model, &request).await?;
        let package: RepurposingPackage = Self::parse_structured(&response)?;

        Ok((package, Self::usage_of(&response, &model)))
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, ImageGenerationError> {
        let mut last_error = "no models attempted".to_string();

        for model in IMAGE_MODEL_FALLBACKS {
            match self.predict_image(model, prompt).await {
                Ok(image) => {
                    tracing::info!(
                        "Generated {} byte {} image with {}",
                        image.bytes.len(),
                        image.mime_type,
                        model
                    );
                    return Ok(image);
                }
                Err(e) => {
                    tracing::warn!("Image generation failed with {}: {}", model, e);
                    last_error = e;
                }
            }
        }

        tracing::error!("Image generation exhausted all models: {}", last_error);
        Err(ImageGenerationError { last_error })
    }
}

impl GeminiClient {
    /// One Imagen predict round trip. Errors are strings so the fallback
    /// loop can report the last one verbatim.
    async fn predict_image(&self, model: &str, prompt: &str) -> Result<GeneratedImage, String> {
        let url = format!("{}/models/{}:predict?key={}", self.base_url, model, self.api_key);

        let request = ImagePredictRequest {
            instances: vec![ImageInstance {
                prompt: prompt.to_string(),
            }],
            parameters: ImageParameters {
                sample_count: 1,
                aspect_ratio: "16:9".to_string(),
                output_mime_type: "image/jpeg".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Imagen API error: {}", error_text));
        }

        let parsed: ImagePredictResponse = response.json().await.map_err(|e| e.to_string())?;
        let prediction = parsed
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| "response contained no predictions".to_string())?;

        let encoded = prediction
            .bytes_base64_encoded
            .filter(|b| !b.is_empty())
            .ok_or_else(|| "prediction contained no image bytes".to_string())?;

        let bytes = BASE64_STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| format!("invalid base64 image payload: {}", e))?;

        Ok(GeneratedImage {
            bytes,
            mime_type: prediction.mime_type.unwrap_or_else(|| "image/jpeg".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_response(text: &str, input: u32, output: u32) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content::text(text)),
                finish_reason: Some("STOP".to_string()),
            }],
            usage_metadata: Some(UsageMetadata {
                prompt_token_count: input,
                candidates_token_count: output,
                total_token_count: input + output,
            }),
        }
    }

    #[test]
    fn test_hook_batch_parses_typed_categories() {
        let raw = r#"{"hooks":[
            {"type":"CONTROVERSIAL","content":"Everything you know is wrong."},
            {"type":"STORY","content":"The lab was already on fire."},
            {"type":"QUESTION","content":"What if qubits could lie?"},
            {"type":"STATISTIC","content":"99% of encryption breaks tomorrow."}
        ]}"#;
        let response = text_response(raw, 100, 200);
        let payload: HookBatchPayload = GeminiClient::parse_structured(&response).unwrap();
        assert_eq!(payload.hooks.len(), 4);
        assert_eq!(payload.hooks[0].category, HookCategory::Controversial);
    }

    #[test]
    fn test_malformed_hook_payload_fails_closed() {
        // Missing "content" field must be a parse error, not an empty hook.
        let response = text_response(r#"{"hooks":[{"type":"STORY"}]}"#, 1, 1);
        let result: Result<HookBatchPayload, _> = GeminiClient::parse_structured(&response);
        assert!(matches!(result, Err(GenerationError::Parse(_))));
    }

    #[test]
    fn test_unknown_hook_category_fails_closed() {
        let response = text_response(r#"{"hooks":[{"type":"CLICKBAIT","content":"x"}]}"#, 1, 1);
        let result: Result<HookBatchPayload, _> = GeminiClient::parse_structured(&response);
        assert!(matches!(result, Err(GenerationError::Parse(_))));
    }

    #[test]
    fn test_blueprint_parses_sections_with_empty_voiceover() {
        let sections: Vec<Value> = (0..BLUEPRINT_SECTION_COUNT)
            .map(|i| {
                json!({
                    "section_title": format!("Section {}", i + 1),
                    "voiceover_text": "",
                    "visual_prompt": "B-roll"
                })
            })
            .collect();
        let raw = json!({
            "seo": {
                "youtube_title": "Quantum Computing Explained",
                "youtube_description": "A deep dive.",
                "tags": ["quantum", "computing"]
            },
            "thumbnail": {
                "thumbnail_text": "BROKEN?",
                "thumbnail_visual_prompt": "split screen"
            },
            "script_sections": sections
        })
        .to_string();

        let response = text_response(&raw, 500, 900);
        let blueprint: Blueprint = GeminiClient::parse_structured(&response).unwrap();
        assert_eq!(blueprint.script_sections.len(), BLUEPRINT_SECTION_COUNT);
        assert!(blueprint.script_sections.iter().all(|s| !s.is_filled()));
    }

    #[test]
    fn test_empty_response_is_an_error_for_structured_calls() {
        let response = GenerateContentResponse {
            candidates: vec![],
            usage_metadata: None,
        };
        let result: Result<HookBatchPayload, _> = GeminiClient::parse_structured(&response);
        assert!(matches!(result, Err(GenerationError::EmptyResponse)));
    }

    #[test]
    fn test_usage_defaults_to_zero_when_metadata_missing() {
        let response = GenerateContentResponse {
            candidates: vec![],
            usage_metadata: None,
        };
        let usage = GeminiClient::usage_of(&response, "gemini-2.0-flash");
        assert_eq!(usage.input_tokens, 0);
        assert_eq!(usage.output_tokens, 0);
        assert_eq!(usage.estimated_cost, 0.0);
    }

    #[test]
    fn test_data_uri_regex_splits_mime_and_payload() {
        let caps = DATA_URI_RE.captures("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(&caps[1], "image/png");
        assert_eq!(&caps[2], "aGVsbG8=");
        assert!(DATA_URI_RE.captures("not a data uri").is_none());
    }

    #[test]
    fn test_generated_image_data_uri_round_trip() {
        let image = GeneratedImage {
            bytes: b"jpegdata".to_vec(),
            mime_type: "image/jpeg".to_string(),
        };
        let uri = image.to_data_uri();
        let caps = DATA_URI_RE.captures(&uri).unwrap();
        assert_eq!(&caps[1], "image/jpeg");
        assert_eq!(BASE64_STANDARD.decode(caps[2].as_bytes()).unwrap(), b"jpegdata");
    }

    // --- Wire-level tests against a mock server ---

    mod wire {
        use super::*;
        use crate::models::DEFAULT_CHANNELS;
        use crate::store::MemoryStore;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        async fn client_against(server: &MockServer) -> GeminiClient {
            let store: Arc<dyn ProjectStore> = Arc::new(MemoryStore::new());
            GeminiClient::new("test-key".to_string(), store).with_base_url(server.uri())
        }

        fn gemini_text_body(payload: &str, input: u32, output: u32) -> Value {
            json!({
                "candidates": [{
                    "content": {
                        "parts": [{ "text": payload }],
                        "role": "model"
                    },
                    "finishReason": "STOP"
                }],
                "usageMetadata": {
                    "promptTokenCount": input,
                    "candidatesTokenCount": output,
                    "totalTokenCount": input + output
                }
            })
        }

        #[tokio::test]
        async fn test_generate_hooks_round_trip() {
            let server = MockServer::start().await;
            let hooks_payload = json!({
                "hooks": [
                    { "type": "CONTROVERSIAL", "content": "Quantum hype is a lie." },
                    { "type": "STORY", "content": "The qubit was already decohering." },
                    { "type": "QUESTION", "content": "What breaks first?" },
                    { "type": "STATISTIC", "content": "128 qubits, zero profits." }
                ]
            })
            .to_string();

            Mock::given(method("POST"))
                .and(path("/models/gemini-2.0-flash:generateContent"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(gemini_text_body(&hooks_payload, 1000, 2000)),
                )
                .expect(1)
                .mount(&server)
                .await;

            let client = client_against(&server).await;
            let (hooks, usage) = client
                .generate_hooks("Quantum Computing", "Students", Language::En, &DEFAULT_CHANNELS[0])
                .await
                .unwrap();

            assert_eq!(hooks.len(), 4);
            let mut ids: Vec<&str> = hooks.iter().map(|h| h.id.as_str()).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), 4, "hook ids must be unique within a batch");

            assert_eq!(usage.input_tokens, 1000);
            assert_eq!(usage.output_tokens, 2000);
            // (1000/1M)*0.10 + (2000/1M)*0.40 at flash pricing
            assert!((usage.estimated_cost - 0.0009).abs() < 1e-9);
        }

        #[tokio::test]
        async fn test_api_failure_surfaces_as_generation_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/models/gemini-2.0-flash:generateContent"))
                .respond_with(ResponseTemplate::new(429).set_body_string("quota exhausted"))
                .mount(&server)
                .await;

            let client = client_against(&server).await;
            let err = client
                .generate_hooks("Topic", "Audience", Language::En, &DEFAULT_CHANNELS[0])
                .await
                .unwrap_err();
            assert!(matches!(err, GenerationError::Api(_)));
        }

        #[tokio::test]
        async fn test_sectionless_response_yields_empty_string() {
            let server = MockServer::start().await;
            // No candidates at all: section content degrades to "".
            Mock::given(method("POST"))
                .and(path("/models/gemini-2.0-flash:generateContent"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
                .mount(&server)
                .await;

            let client = client_against(&server).await;
            let text = client
                .generate_section_content(
                    &DEFAULT_CHANNELS[0],
                    "Topic",
                    "Section 1",
                    "Visuals",
                    Language::En,
                )
                .await
                .unwrap();
            assert_eq!(text, "");
        }

        #[tokio::test]
        async fn test_image_fallback_returns_second_model_result() {
            let server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/models/imagen-4.0-generate-001:predict"))
                .respond_with(ResponseTemplate::new(500).set_body_string("primary model down"))
                .expect(1)
                .mount(&server)
                .await;

            Mock::given(method("POST"))
                .and(path("/models/imagen-3.0-generate-001:predict"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "predictions": [{
                        "bytesBase64Encoded": BASE64_STANDARD.encode(b"fallback-jpeg"),
                        "mimeType": "image/jpeg"
                    }]
                })))
                .expect(1)
                .mount(&server)
                .await;

            let client = client_against(&server).await;
            let image = client.generate_image("a neon robot").await.unwrap();
            assert_eq!(image.bytes, b"fallback-jpeg");
            assert_eq!(image.mime_type, "image/jpeg");
        }

        #[tokio::test]
        async fn test_image_error_only_after_all_models_fail() {
            let server = MockServer::start().await;

            Mock::given(method("POST"))
                .and(path("/models/imagen-4.0-generate-001:predict"))
                .respond_with(ResponseTemplate::new(500).set_body_string("first failure"))
                .mount(&server)
                .await;

            Mock::given(method("POST"))
                .and(path("/models/imagen-3.0-generate-001:predict"))
                .respond_with(ResponseTemplate::new(500).set_body_string("second failure"))
                .mount(&server)
                .await;

            let client = client_against(&server).await;
            let err = client.generate_image("a neon robot").await.unwrap_err();
            // The error wraps the last underlying failure.
            assert!(err.last_error.contains("second failure"));
        }
    }
}
