//! Pipeline coordination for Klipp.
//!
//! Wires explicitly constructed stage services together; no hidden global
//! state. Every operation reads one script file, transforms the segment
//! sequence, and writes the result as a single complete overwrite.

use crate::config::{Prompts, Settings};
use crate::dedup::dedupe_takes;
use crate::error::{KlippError, Result};
use crate::rank::{rank_segments, rerank_by_novelty};
use crate::scoring::{OpenAiScorer, QualityScorer, Scorer};
use crate::sequence::{DialogueSequencer, StorySequencer};
use crate::store::{parse_script, write_script, Segment};
use crate::timeline::{expand_windows, trim_to_budget};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// The main pipeline for Klipp.
pub struct Pipeline {
    settings: Settings,
    prompts: Prompts,
    scorer: Arc<dyn Scorer>,
}

impl Pipeline {
    /// Create a pipeline with the default OpenAI-backed oracle.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let scorer: Arc<dyn Scorer> = Arc::new(OpenAiScorer::new(
            &settings.scoring.model,
            Duration::from_secs(settings.scoring.timeout_seconds),
        ));

        Ok(Self {
            settings,
            prompts,
            scorer,
        })
    }

    /// Create a pipeline with an injected oracle (used by tests and by
    /// callers embedding the library).
    pub fn with_components(settings: Settings, prompts: Prompts, scorer: Arc<dyn Scorer>) -> Self {
        Self {
            settings,
            prompts,
            scorer,
        }
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn quality_scorer(&self) -> QualityScorer {
        QualityScorer::new(
            self.scorer.clone(),
            self.prompts.clone(),
            self.settings.scoring.composite_weights.clone(),
        )
    }

    /// The topic prompt: per-invocation override, else the configured
    /// default.
    fn topic<'a>(&'a self, topic: Option<&'a str>) -> &'a str {
        topic.unwrap_or(&self.settings.scoring.topic)
    }

    /// Read a script file; missing or empty input is a terminal failure, so
    /// no partial output is ever written.
    fn read_input(&self, input: &Path) -> Result<Vec<Segment>> {
        let segments = parse_script(input)?;
        if segments.is_empty() {
            return Err(KlippError::EmptyScript(input.display().to_string()));
        }
        Ok(segments)
    }

    /// Score any segments that do not carry a quality vector yet. Each
    /// segment is scored at most once over its lifetime: already-scored
    /// segments keep their vectors, only the missing ones go to the oracle.
    async fn ensure_scored(&self, mut segments: Vec<Segment>, topic: &str) -> Vec<Segment> {
        let unscored: Vec<usize> = segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.quality.is_none())
            .map(|(index, _)| index)
            .collect();
        if unscored.is_empty() {
            return segments;
        }

        let pending: Vec<Segment> = unscored.iter().map(|&i| segments[i].clone()).collect();
        let scored = self
            .quality_scorer()
            .score_segments(pending, topic, self.settings.scoring.max_concurrent)
            .await;

        for (&index, segment) in unscored.iter().zip(scored) {
            segments[index] = segment;
        }
        segments
    }

    /// Score every segment in the input file and write the scored script.
    #[instrument(skip(self))]
    pub async fn score_file(
        &self,
        input: &Path,
        output: &Path,
        topic: Option<&str>,
    ) -> Result<StageResult> {
        let segments = self.read_input(input)?;
        let count = segments.len();

        let scored = self
            .quality_scorer()
            .score_segments(segments, self.topic(topic), self.settings.scoring.max_concurrent)
            .await;

        write_script(output, &scored)?;
        Ok(StageResult::new(count, &scored, output))
    }

    /// Cluster near-duplicate takes and write only the canonical ones.
    /// Unscored input is scored first so canonical selection has composite
    /// scores to compare.
    #[instrument(skip(self))]
    pub async fn dedupe_file(
        &self,
        input: &Path,
        output: &Path,
        topic: Option<&str>,
    ) -> Result<StageResult> {
        let segments = self.read_input(input)?;
        let count = segments.len();

        let scored = self.ensure_scored(segments, self.topic(topic)).await;
        let canonical = dedupe_takes(scored, &self.settings.dedup);

        write_script(output, &canonical)?;
        Ok(StageResult::new(count, &canonical, output))
    }

    /// The full highlight-reel path: score, dedupe, rank, novelty-rerank,
    /// expand windows, trim to the duration budget, write.
    #[instrument(skip(self))]
    pub async fn build_reel(
        &self,
        input: &Path,
        output: &Path,
        topic: Option<&str>,
        budget_seconds: Option<f64>,
    ) -> Result<StageResult> {
        let segments = self.read_input(input)?;
        let count = segments.len();
        info!("Building reel from {} segments", count);

        let scored = self.ensure_scored(segments, self.topic(topic)).await;
        let canonical = dedupe_takes(scored, &self.settings.dedup);
        let ranked = rank_segments(canonical, &self.settings.ranking.weights);
        let reranked = rerank_by_novelty(ranked, self.settings.ranking.lambda);
        let expanded = expand_windows(reranked, self.settings.timeline.base_window_seconds);
        let trimmed = trim_to_budget(
            expanded,
            budget_seconds.unwrap_or(self.settings.timeline.duration_budget_seconds),
        );

        write_script(output, &trimmed)?;
        Ok(StageResult::new(count, &trimmed, output))
    }

    /// Reorder a speaker-labelled pool into an alternating conversation and
    /// write the result.
    #[instrument(skip(self, cancel))]
    pub async fn sequence_dialogue(
        &self,
        input: &Path,
        output: &Path,
        topic: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<StageResult> {
        let segments = self.read_input(input)?;
        let count = segments.len();

        let scored = self.ensure_scored(segments, self.topic(topic)).await;

        let mut sequencer = DialogueSequencer::new(
            self.scorer.clone(),
            self.prompts.clone(),
            self.settings.sequencing.clone(),
        );
        let ordered = sequencer.sequence(scored, cancel).await?;

        write_script(output, &ordered)?;
        Ok(StageResult::new(count, &ordered, output))
    }

    /// Reorder a pool into a narratively coherent story and write the
    /// result. Works on raw (unscored) transcripts.
    #[instrument(skip(self, cancel))]
    pub async fn sequence_story(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<StageResult> {
        let segments = self.read_input(input)?;
        let count = segments.len();

        let sequencer = StorySequencer::new(
            self.scorer.clone(),
            self.prompts.clone(),
            self.settings.sequencing.clone(),
        );
        let ordered = sequencer.sequence(segments, cancel).await?;

        write_script(output, &ordered)?;
        Ok(StageResult::new(count, &ordered, output))
    }
}

/// Summary of one pipeline operation.
#[derive(Debug)]
pub struct StageResult {
    /// Segments read from the input file.
    pub segments_in: usize,
    /// Segments written to the output file.
    pub segments_out: usize,
    /// Total duration of the output segments in seconds.
    pub total_duration_seconds: f64,
    /// Path the output was written to.
    pub output: PathBuf,
}

impl StageResult {
    fn new(segments_in: usize, output_segments: &[Segment], output: &Path) -> Self {
        Self {
            segments_in,
            segments_out: output_segments.len(),
            total_duration_seconds: output_segments.iter().map(|s| s.duration()).sum(),
            output: output.to_path_buf(),
        }
    }
}
