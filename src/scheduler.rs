// src/scheduler.rs
//! Bulk regeneration scheduler. Fills every unfilled section of a
//! committed project in fixed-size concurrent batches with a strict
//! barrier between batches: one persistence write per batch, cumulative
//! progress after each.

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::error::StudioError;
use crate::gemini_client::ContentGenerator;
use crate::models::{ScriptSection, VideoProject};
use crate::store::{resolve_channel, ProjectStore};

/// Sections generated concurrently per batch.
pub const SECTION_BATCH_SIZE: usize = 3;

/// Cumulative progress pushed to the caller after each batch commits.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct BulkProgress {
    pub completed: usize,
    pub total: usize,
}

/// Outcome of a completed bulk run.
#[derive(Debug, Clone, Copy, Serialize, Default)]
pub struct BulkReport {
    /// Sections filled by this run.
    pub filled: usize,
    /// Unfilled sections at the start of the run.
    pub total: usize,
    /// Persistence writes issued (one per committed batch).
    pub batches_persisted: usize,
}

/// Indices of sections whose voiceover is still missing, in script order.
pub fn unfilled_indices(script: &[ScriptSection]) -> Vec<usize> {
    script
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_filled())
        .map(|(i, _)| i)
        .collect()
}

/// Fill every unfilled section of `project`, batch by batch.
///
/// Each batch runs its section-content calls concurrently and is fully
/// awaited before the next batch starts. Successful results are applied
/// and persisted once per batch. When a call fails, the sibling successes
/// of that batch are still committed, then the run aborts with
/// `BulkAborted`; earlier batches stay persisted and nothing is retried.
pub async fn fill_unfilled_sections(
    generator: &dyn ContentGenerator,
    store: &dyn ProjectStore,
    project: &mut VideoProject,
    progress: Option<&mpsc::UnboundedSender<BulkProgress>>,
) -> Result<BulkReport, StudioError> {
    let indices = unfilled_indices(&project.script);
    if indices.is_empty() {
        tracing::debug!("Bulk fill requested but every section is already filled");
        return Ok(BulkReport::default());
    }

    let channel = resolve_channel(store, &project.channel_id)
        .await
        .ok_or_else(|| StudioError::Validation("no channel profiles available".to_string()))?;

    let topic = project.topic.clone();
    let language = project.language;
    let total = indices.len();
    let mut report = BulkReport {
        filled: 0,
        total,
        batches_persisted: 0,
    };

    tracing::info!(
        "Bulk filling {} sections of project {} in batches of {}",
        total,
        project.id,
        SECTION_BATCH_SIZE
    );

    for batch in indices.chunks(SECTION_BATCH_SIZE) {
        // Owned inputs so the in-flight calls never borrow the project
        // they are about to mutate.
        let inputs: Vec<(usize, String, String)> = batch
            .iter()
            .map(|&idx| {
                let section = &project.script[idx];
                (idx, section.section_title.clone(), section.visual_prompt.clone())
            })
            .collect();

        let calls = inputs.iter().map(|(idx, title, visual)| {
            let channel = &channel;
            let topic = topic.as_str();
            async move {
                let result = generator
                    .generate_section_content(channel, topic, title, visual, language)
                    .await;
                (*idx, result)
            }
        });

        let mut failure: Option<(usize, String)> = None;
        let mut batch_filled = 0usize;
        for (idx, result) in join_all(calls).await {
            match result {
                Ok(content) => {
                    project.script[idx].voiceover_text = content;
                    batch_filled += 1;
                }
                Err(e) => {
                    tracing::error!("Section {} failed during bulk fill: {}", idx + 1, e);
                    if failure.is_none() {
                        failure = Some((idx, e.to_string()));
                    }
                }
            }
        }

        // One write per batch; a batch with no successes writes nothing.
        if batch_filled > 0 {
            store.save_project(project).await?;
            report.batches_persisted += 1;
            report.filled += batch_filled;

            if let Some(tx) = progress {
                let update = BulkProgress {
                    completed: report.filled,
                    total,
                };
                if tx.send(update).is_err() {
                    tracing::warn!("Bulk progress receiver dropped, continuing without updates");
                }
            }
        }

        if let Some((idx, reason)) = failure {
            return Err(StudioError::BulkAborted {
                completed: report.filled,
                total,
                reason: format!("section {}: {}", idx + 1, reason),
            });
        }
    }

    tracing::info!(
        "Bulk fill of project {} complete: {}/{} sections in {} batches",
        project.id,
        report.filled,
        report.total,
        report.batches_persisted
    );
    Ok(report)
}
