// src/pipeline.rs
//! Generation pipeline controller.
//!
//! The generator wizard is a 2-step state machine per session: briefing
//! (channel/topic/audience form) then hook selection, committing into a
//! persisted project once a hook is chosen and the blueprint succeeds.
//! Post-commit operations (section fill, images, repurposing) mutate the
//! stored project element-wise and persist after every mutation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::StudioError;
use crate::gemini_client::ContentGenerator;
use crate::models::{
    ChannelProfile, HookVariant, Language, ProjectStatus, VideoMode, VideoProject,
    DEFAULT_CREATOR_NAME,
};
use crate::services::UsageAccumulator;
use crate::store::{resolve_channel, ProjectStore};

/// Wizard position. `Committed` is terminal.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WizardStep {
    Briefing,
    HookSelection,
    Committed,
}

/// Form fields collected during the briefing step.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Briefing {
    #[serde(rename = "channelId")]
    pub channel_id: String,
    pub topic: String,
    #[serde(rename = "targetAudience")]
    pub target_audience: String,
    pub mode: VideoMode,
    pub language: Language,
}

/// One wizard run. Owned exclusively by its registry entry; callers lock
/// it for the duration of each operation.
pub struct GeneratorSession {
    step: WizardStep,
    briefing: Option<Briefing>,
    hooks: Vec<HookVariant>,
    usage: UsageAccumulator,
}

impl GeneratorSession {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Briefing,
            briefing: None,
            hooks: Vec::new(),
            usage: UsageAccumulator::new(),
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn hooks(&self) -> &[HookVariant] {
        &self.hooks
    }

    pub fn accumulated_usage(&self) -> crate::models::TokenUsage {
        self.usage.total()
    }

    /// Step 1: validate the briefing and generate the hook variants.
    /// On success the session moves to hook selection; on failure it stays
    /// in briefing with nothing recorded.
    pub async fn generate_hooks(
        &mut self,
        briefing: Briefing,
        generator: &dyn ContentGenerator,
        store: &dyn ProjectStore,
    ) -> Result<&[HookVariant], StudioError> {
        if self.step != WizardStep::Briefing {
            return Err(StudioError::Validation(
                "hooks can only be generated from the briefing step".to_string(),
            ));
        }
        if briefing.channel_id.trim().is_empty()
            || briefing.topic.trim().is_empty()
            || briefing.target_audience.trim().is_empty()
        {
            return Err(StudioError::Validation(
                "Please fill in all fields (Channel, Topic, Audience).".to_string(),
            ));
        }

        let channel = find_channel(store, &briefing.channel_id).await.ok_or_else(|| {
            StudioError::Validation(format!("unknown channel profile '{}'", briefing.channel_id))
        })?;

        let (hooks, usage) = generator
            .generate_hooks(
                &briefing.topic,
                &briefing.target_audience,
                briefing.language,
                &channel,
            )
            .await?;

        tracing::info!("Generated {} hooks for topic '{}'", hooks.len(), briefing.topic);
        self.usage.add(&usage);
        self.hooks = hooks;
        self.briefing = Some(briefing);
        self.step = WizardStep::HookSelection;
        Ok(&self.hooks)
    }

    /// Explicit back action: discard generated hooks, keep accumulated
    /// usage and the briefing form.
    pub fn go_back(&mut self) -> Result<(), StudioError> {
        if self.step != WizardStep::HookSelection {
            return Err(StudioError::Validation(
                "can only go back from hook selection".to_string(),
            ));
        }
        self.hooks.clear();
        self.step = WizardStep::Briefing;
        Ok(())
    }

    /// Step 2: commit the selected hook, generate the blueprint and
    /// persist the new project. Only now does a project id exist.
    pub async fn commit_blueprint(
        &mut self,
        hook_id: &str,
        generator: &dyn ContentGenerator,
        store: &dyn ProjectStore,
    ) -> Result<VideoProject, StudioError> {
        if self.step != WizardStep::HookSelection {
            return Err(StudioError::Validation(
                "blueprint generation requires a generated hook set".to_string(),
            ));
        }
        let briefing = self
            .briefing
            .clone()
            .ok_or_else(|| StudioError::Validation("briefing data missing".to_string()))?;
        let hook = self
            .hooks
            .iter()
            .find(|h| h.id == hook_id)
            .cloned()
            .ok_or_else(|| StudioError::Validation("Please select a hook.".to_string()))?;

        let channel = find_channel(store, &briefing.channel_id).await.ok_or_else(|| {
            StudioError::Validation(format!("unknown channel profile '{}'", briefing.channel_id))
        })?;

        let (blueprint, usage) = generator
            .generate_video_package(
                &briefing.topic,
                briefing.mode,
                briefing.language,
                &channel,
                &briefing.target_audience,
                &hook.content,
            )
            .await?;
        self.usage.add(&usage);

        let project = VideoProject {
            id: Uuid::new_v4().to_string(),
            channel_id: channel.id.clone(),
            topic: briefing.topic.clone(),
            mode: briefing.mode,
            language: briefing.language,
            target_audience: briefing.target_audience.clone(),
            created_at: chrono::Utc::now(),
            created_by: DEFAULT_CREATOR_NAME.to_string(),
            status: ProjectStatus::Generated,
            hook_variants: Some(self.hooks.clone()),
            // The chosen hook is stored by content; its id was only ever
            // transient selection state.
            selected_hook: Some(hook.content),
            script: blueprint.script_sections,
            seo: blueprint.seo,
            thumbnail: blueprint.thumbnail,
            repurposing: None,
            token_usage: Some(self.usage.total()),
        };

        store.save_project(&project).await?;
        tracing::info!(
            "Committed project {} ({} sections, ${:.5} accumulated)",
            project.id,
            project.script.len(),
            self.usage.total().estimated_cost
        );

        self.step = WizardStep::Committed;
        Ok(project)
    }
}

impl Default for GeneratorSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Exact-id channel lookup for the wizard; no fallback, a briefing that
/// names a deleted profile is a validation failure.
async fn find_channel(store: &dyn ProjectStore, channel_id: &str) -> Option<ChannelProfile> {
    store
        .list_channels()
        .await
        .into_iter()
        .find(|c| c.id == channel_id)
}

// --- Post-commit operations ---

/// Generate voiceover content for a single section and persist.
pub async fn fill_section(
    generator: &dyn ContentGenerator,
    store: &dyn ProjectStore,
    project: &mut VideoProject,
    index: usize,
) -> Result<(), StudioError> {
    let section = project
        .script
        .get(index)
        .ok_or_else(|| StudioError::Validation(format!("section index {} out of range", index)))?
        .clone();

    let channel = project_channel(store, project).await?;
    let content = generator
        .generate_section_content(
            &channel,
            &project.topic,
            &section.section_title,
            &section.visual_prompt,
            project.language,
        )
        .await?;

    project.script[index].voiceover_text = content;
    store.save_project(project).await?;
    Ok(())
}

/// Generate the preview image for one section and persist. Image failures
/// surface distinctly and leave the section's text untouched.
pub async fn generate_section_image(
    generator: &dyn ContentGenerator,
    store: &dyn ProjectStore,
    project: &mut VideoProject,
    index: usize,
) -> Result<(), StudioError> {
    let prompt = project
        .script
        .get(index)
        .ok_or_else(|| StudioError::Validation(format!("section index {} out of range", index)))?
        .visual_prompt
        .clone();

    let image = generator.generate_image(&prompt).await?;
    project.script[index].image_url = Some(image.to_data_uri());
    store.save_project(project).await?;
    Ok(())
}

/// Generate the thumbnail image from its visual prompt and persist.
pub async fn generate_thumbnail_image(
    generator: &dyn ContentGenerator,
    store: &dyn ProjectStore,
    project: &mut VideoProject,
) -> Result<(), StudioError> {
    let image = generator
        .generate_image(&project.thumbnail.thumbnail_visual_prompt)
        .await?;
    project.thumbnail.image_url = Some(image.to_data_uri());
    store.save_project(project).await?;
    Ok(())
}

/// Generate the repurposing package from the available voiceover text,
/// fold its usage into the project total and persist.
pub async fn generate_repurposing(
    generator: &dyn ContentGenerator,
    store: &dyn ProjectStore,
    project: &mut VideoProject,
) -> Result<(), StudioError> {
    let (package, usage) = generator.generate_repurposed_content(project).await?;

    project.repurposing = Some(package);
    let mut total = project.token_usage.unwrap_or_default();
    total.accumulate(&usage);
    project.token_usage = Some(total);

    store.save_project(project).await?;
    Ok(())
}

/// Channel for post-commit operations: dangling references fall back to
/// the first available profile.
async fn project_channel(
    store: &dyn ProjectStore,
    project: &VideoProject,
) -> Result<ChannelProfile, StudioError> {
    resolve_channel(store, &project.channel_id)
        .await
        .ok_or_else(|| StudioError::Validation("no channel profiles available".to_string()))
}

// --- Registries ---

/// Live wizard sessions. One outstanding generation call per session is
/// enforced by handing out `Arc<Mutex<_>>` entries that callers try-lock.
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<GeneratorSession>>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, Arc::new(Mutex::new(GeneratorSession::new())));
        tracing::info!("Created generator session {}", id);
        id
    }

    pub async fn get(&self, id: &Uuid) -> Option<Arc<Mutex<GeneratorSession>>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    pub async fn remove(&self, id: &Uuid) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id);
    }
}

/// Per-project operation gates: at most one generation call mutates a
/// given project at a time.
#[derive(Default)]
pub struct ProjectLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn gate(&self, project_id: &str) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(gate) = locks.get(project_id) {
                return gate.clone();
            }
        }
        let mut locks = self.locks.write().await;
        locks
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn release(&self, project_id: &str) {
        let mut locks = self.locks.write().await;
        locks.remove(project_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini_client::{
        Blueprint, GeneratedImage, GenerationError, ImageGenerationError, BLUEPRINT_SECTION_COUNT,
    };
    use crate::models::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HOOK_USAGE: TokenUsage = TokenUsage {
        input_tokens: 1200,
        output_tokens: 400,
        estimated_cost: 0.00028,
    };
    const BLUEPRINT_USAGE: TokenUsage = TokenUsage {
        input_tokens: 2500,
        output_tokens: 1800,
        estimated_cost: 0.00097,
    };
    const REPURPOSE_USAGE: TokenUsage = TokenUsage {
        input_tokens: 900,
        output_tokens: 300,
        estimated_cost: 0.00021,
    };

    struct StubGenerator {
        fail_hooks: bool,
        fail_blueprint: bool,
        hook_calls: AtomicUsize,
    }

    impl StubGenerator {
        fn ok() -> Self {
            Self {
                fail_hooks: false,
                fail_blueprint: false,
                hook_calls: AtomicUsize::new(0),
            }
        }

        fn failing_blueprint() -> Self {
            Self {
                fail_blueprint: true,
                ..Self::ok()
            }
        }

        fn failing_hooks() -> Self {
            Self {
                fail_hooks: true,
                ..Self::ok()
            }
        }
    }

    #[async_trait]
    impl ContentGenerator for StubGenerator {
        async fn generate_hooks(
            &self,
            topic: &str,
            _audience: &str,
            _language: Language,
            _channel: &ChannelProfile,
        ) -> Result<(Vec<HookVariant>, TokenUsage), GenerationError> {
            self.hook_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_hooks {
                return Err(GenerationError::Api("hook generation down".to_string()));
            }
            let categories = [
                HookCategory::Controversial,
                HookCategory::Story,
                HookCategory::Question,
                HookCategory::Statistic,
            ];
            let hooks = categories
                .iter()
                .map(|&category| HookVariant {
                    id: uuid::Uuid::new_v4().to_string(),
                    category,
                    content: format!("{:?} hook about {}", category, topic),
                })
                .collect();
            Ok((hooks, HOOK_USAGE))
        }

        async fn generate_video_package(
            &self,
            _topic: &str,
            _mode: VideoMode,
            _language: Language,
            _channel: &ChannelProfile,
            _audience: &str,
            _selected_hook: &str,
        ) -> Result<(Blueprint, TokenUsage), GenerationError> {
            if self.fail_blueprint {
                return Err(GenerationError::Api("blueprint generation down".to_string()));
            }
            let script_sections = (0..BLUEPRINT_SECTION_COUNT)
                .map(|i| ScriptSection {
                    section_title: format!("Section {}", i + 1),
                    voiceover_text: String::new(),
                    visual_prompt: format!("Visuals {}", i + 1),
                    image_url: None,
                })
                .collect();
            let blueprint = Blueprint {
                seo: SeoPackage {
                    youtube_title: "Mock Title".to_string(),
                    youtube_description: "Mock description".to_string(),
                    tags: vec!["mock".to_string()],
                },
                thumbnail: ThumbnailPackage {
                    thumbnail_text: "MOCK".to_string(),
                    thumbnail_visual_prompt: "mock thumbnail".to_string(),
                    image_url: None,
                },
                script_sections,
            };
            Ok((blueprint, BLUEPRINT_USAGE))
        }

        async fn generate_section_content(
            &self,
            _channel: &ChannelProfile,
            _topic: &str,
            section_title: &str,
            _visual_context: &str,
            _language: Language,
        ) -> Result<String, GenerationError> {
            Ok(format!("Deep voiceover for {}: {}", section_title, "word ".repeat(30)))
        }

        async fn generate_repurposed_content(
            &self,
            _project: &VideoProject,
        ) -> Result<(RepurposingPackage, TokenUsage), GenerationError> {
            let package = RepurposingPackage {
                shorts_ideas: vec![ShortsIdea {
                    title: "Short 1".to_string(),
                    visual_concept: "Fast cuts".to_string(),
                }],
                community_post: "Which part surprised you?".to_string(),
                social_blurb: "New video is live!".to_string(),
            };
            Ok((package, REPURPOSE_USAGE))
        }

        async fn generate_image(
            &self,
            _prompt: &str,
        ) -> Result<GeneratedImage, ImageGenerationError> {
            Ok(GeneratedImage {
                bytes: vec![0xFF, 0xD8, 0xFF],
                mime_type: "image/jpeg".to_string(),
            })
        }
    }

    fn briefing() -> Briefing {
        Briefing {
            channel_id: "ch_tech".to_string(),
            topic: "Quantum Computing".to_string(),
            target_audience: "Students".to_string(),
            mode: VideoMode::Original,
            language: Language::En,
        }
    }

    #[tokio::test]
    async fn test_missing_fields_fail_before_any_api_call() {
        let generator = StubGenerator::ok();
        let store = MemoryStore::new();
        let mut session = GeneratorSession::new();

        let mut incomplete = briefing();
        incomplete.topic = "  ".to_string();

        let err = session
            .generate_hooks(incomplete, &generator, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(generator.hook_calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.step(), WizardStep::Briefing);
    }

    #[tokio::test]
    async fn test_hook_failure_stays_in_briefing() {
        let generator = StubGenerator::failing_hooks();
        let store = MemoryStore::new();
        let mut session = GeneratorSession::new();

        let err = session
            .generate_hooks(briefing(), &generator, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Generation(_)));
        assert_eq!(session.step(), WizardStep::Briefing);
        assert!(session.hooks().is_empty());
        assert_eq!(session.accumulated_usage(), TokenUsage::zero());
    }

    #[tokio::test]
    async fn test_hook_generation_moves_to_selection() {
        let generator = StubGenerator::ok();
        let store = MemoryStore::new();
        let mut session = GeneratorSession::new();

        let hooks = session
            .generate_hooks(briefing(), &generator, &store)
            .await
            .unwrap()
            .to_vec();

        assert_eq!(hooks.len(), 4);
        // Ids are unique within the batch.
        let mut ids: Vec<&str> = hooks.iter().map(|h| h.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);

        assert_eq!(session.step(), WizardStep::HookSelection);
        assert_eq!(session.accumulated_usage().input_tokens, HOOK_USAGE.input_tokens);
    }

    #[tokio::test]
    async fn test_back_discards_hooks_but_keeps_usage() {
        let generator = StubGenerator::ok();
        let store = MemoryStore::new();
        let mut session = GeneratorSession::new();

        session.generate_hooks(briefing(), &generator, &store).await.unwrap();
        session.go_back().unwrap();

        assert_eq!(session.step(), WizardStep::Briefing);
        assert!(session.hooks().is_empty());
        assert_eq!(session.accumulated_usage().input_tokens, HOOK_USAGE.input_tokens);
    }

    #[tokio::test]
    async fn test_commit_builds_and_persists_project() {
        let generator = StubGenerator::ok();
        let store = MemoryStore::new();
        let mut session = GeneratorSession::new();

        let hook_id = {
            let hooks = session
                .generate_hooks(briefing(), &generator, &store)
                .await
                .unwrap();
            hooks[1].id.clone()
        };

        let project = session
            .commit_blueprint(&hook_id, &generator, &store)
            .await
            .unwrap();

        assert!(!project.id.is_empty());
        assert_eq!(project.script.len(), BLUEPRINT_SECTION_COUNT);
        assert_eq!(project.status, ProjectStatus::Generated);
        assert_eq!(project.created_by, DEFAULT_CREATOR_NAME);
        // The selected hook is stored by content, not id.
        assert_eq!(
            project.selected_hook.as_deref(),
            Some(format!("{:?} hook about Quantum Computing", HookCategory::Story).as_str())
        );

        // Usage is the sum of both phases.
        let usage = project.token_usage.unwrap();
        assert_eq!(
            usage.input_tokens,
            HOOK_USAGE.input_tokens + BLUEPRINT_USAGE.input_tokens
        );
        assert!(
            (usage.estimated_cost - (HOOK_USAGE.estimated_cost + BLUEPRINT_USAGE.estimated_cost))
                .abs()
                < 1e-5
        );

        assert_eq!(session.step(), WizardStep::Committed);
        let stored = store.list_projects().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, project.id);
    }

    #[tokio::test]
    async fn test_commit_requires_a_known_hook_id() {
        let generator = StubGenerator::ok();
        let store = MemoryStore::new();
        let mut session = GeneratorSession::new();

        session.generate_hooks(briefing(), &generator, &store).await.unwrap();

        let err = session
            .commit_blueprint("not-a-hook", &generator, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
        assert_eq!(session.step(), WizardStep::HookSelection);
    }

    #[tokio::test]
    async fn test_blueprint_failure_keeps_session_in_selection() {
        let generator = StubGenerator::failing_blueprint();
        let store = MemoryStore::new();
        let mut session = GeneratorSession::new();

        let hook_id = {
            let hooks = session
                .generate_hooks(briefing(), &generator, &store)
                .await
                .unwrap();
            hooks[0].id.clone()
        };

        let err = session
            .commit_blueprint(&hook_id, &generator, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Generation(_)));
        assert_eq!(session.step(), WizardStep::HookSelection);

        // No partial project was stored.
        assert!(store.list_projects().await.is_empty());
    }

    #[tokio::test]
    async fn test_blueprint_cannot_run_from_briefing() {
        let generator = StubGenerator::ok();
        let store = MemoryStore::new();
        let mut session = GeneratorSession::new();

        let err = session
            .commit_blueprint("any", &generator, &store)
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
    }

    async fn committed_project(
        generator: &StubGenerator,
        store: &MemoryStore,
    ) -> VideoProject {
        let mut session = GeneratorSession::new();
        let hook_id = {
            let hooks = session.generate_hooks(briefing(), generator, store).await.unwrap();
            hooks[0].id.clone()
        };
        session.commit_blueprint(&hook_id, generator, store).await.unwrap()
    }

    #[tokio::test]
    async fn test_fill_section_persists_new_voiceover() {
        let generator = StubGenerator::ok();
        let store = MemoryStore::new();
        let mut project = committed_project(&generator, &store).await;

        fill_section(&generator, &store, &mut project, 0).await.unwrap();
        assert!(project.script[0].is_filled());
        assert_eq!(project.script.len(), BLUEPRINT_SECTION_COUNT);

        let stored = store.list_projects().await;
        assert!(stored[0].script[0].is_filled());
    }

    #[tokio::test]
    async fn test_fill_section_rejects_out_of_range_index() {
        let generator = StubGenerator::ok();
        let store = MemoryStore::new();
        let mut project = committed_project(&generator, &store).await;

        let err = fill_section(&generator, &store, &mut project, 99)
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
    }

    #[tokio::test]
    async fn test_fill_section_tolerates_dangling_channel() {
        let generator = StubGenerator::ok();
        let store = MemoryStore::new();
        let mut project = committed_project(&generator, &store).await;

        // Delete the referenced profile; the fill falls back to the first
        // remaining one instead of failing.
        store.delete_channel("ch_tech").await.unwrap();
        fill_section(&generator, &store, &mut project, 2).await.unwrap();
        assert!(project.script[2].is_filled());
    }

    #[tokio::test]
    async fn test_section_image_is_stored_as_data_uri() {
        let generator = StubGenerator::ok();
        let store = MemoryStore::new();
        let mut project = committed_project(&generator, &store).await;

        generate_section_image(&generator, &store, &mut project, 3)
            .await
            .unwrap();
        let url = project.script[3].image_url.as_deref().unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_repurposing_accumulates_usage_onto_project() {
        let generator = StubGenerator::ok();
        let store = MemoryStore::new();
        let mut project = committed_project(&generator, &store).await;
        let before = project.token_usage.unwrap();

        generate_repurposing(&generator, &store, &mut project).await.unwrap();

        assert!(project.repurposing.is_some());
        let after = project.token_usage.unwrap();
        assert_eq!(
            after.input_tokens,
            before.input_tokens + REPURPOSE_USAGE.input_tokens
        );
        assert!(
            (after.estimated_cost - (before.estimated_cost + REPURPOSE_USAGE.estimated_cost)).abs()
                < 1e-5
        );
    }

    #[tokio::test]
    async fn test_session_gate_rejects_concurrent_calls() {
        let manager = SessionManager::new();
        let id = manager.create().await;
        let session = manager.get(&id).await.unwrap();

        let _held = session.try_lock().unwrap();
        assert!(session.try_lock().is_err());
    }
}
