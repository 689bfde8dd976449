//! Quality scoring for segments.
//!
//! One oracle call per segment produces the four core text dimensions; the
//! flub (filler-word) score is computed locally. All dimensions land on a
//! common 0-100 scale.

mod openai;

pub use openai::OpenAiScorer;

use crate::config::Prompts;
use crate::error::Result;
use crate::store::{QualityVector, Segment, NEUTRAL_SCORE, PLACEHOLDER_SCORE};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Filler words counted against a segment's delivery cleanliness.
const FILLER_WORDS: &[&str] = &[
    "um", "umm", "uh", "uhh", "er", "ah", "hmm", "mhm", "like", "literally", "actually",
    "basically", "y'know",
];

/// External text-scoring oracle.
///
/// The pipeline depends only on these two contracts and their documented
/// failure mode (arbitrary text back, or an error); never on model internals.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Send a prompt to the oracle and return its raw text response.
    async fn generate_text(&self, system: &str, user: &str) -> Result<String>;

    /// Score how relevant `text` is to `subject`, on a 0-100 scale.
    async fn score_relevance(&self, text: &str, subject: &str) -> Result<f64>;
}

/// Weights for the internal composite blend used for take selection.
///
/// Sentiment and novelty are deliberately excluded: a negative or familiar
/// take can still be the best take.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub relevance: f64,
    pub flub: f64,
    pub focus: f64,
    pub energy: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            relevance: 2.0,
            flub: 1.0,
            focus: 0.5,
            energy: 1.0,
        }
    }
}

/// Scores segment text against a topic prompt via the oracle.
pub struct QualityScorer {
    scorer: Arc<dyn Scorer>,
    prompts: Prompts,
    weights: CompositeWeights,
}

impl QualityScorer {
    pub fn new(scorer: Arc<dyn Scorer>, prompts: Prompts, weights: CompositeWeights) -> Self {
        Self {
            scorer,
            prompts,
            weights,
        }
    }

    /// Score a single text against the topic. Issues exactly one oracle call;
    /// an unparsable response degrades to a neutral vector rather than
    /// failing the stage.
    pub async fn score(&self, text: &str, topic: &str) -> QualityVector {
        let mut vars = HashMap::new();
        vars.insert("text".to_string(), text.to_string());
        vars.insert("topic".to_string(), topic.to_string());

        let system = self
            .prompts
            .render_with_custom(&self.prompts.scoring.system, &vars);
        let user = self
            .prompts
            .render_with_custom(&self.prompts.scoring.user, &vars);

        let raw = match self.scorer.generate_text(&system, &user).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Oracle scoring call failed, using neutral vector: {}", e);
                return self.finish_vector(QualityVector::neutral(), text);
            }
        };

        let vector = match parse_score_line(&raw) {
            Some((relevance, sentiment, novelty, energy)) => QualityVector {
                relevance: clamp(relevance),
                sentiment: clamp((sentiment + 100.0) / 2.0),
                novelty: clamp(novelty * 10.0),
                energy: clamp((energy - 1.0) * 25.0),
                ..Default::default()
            },
            None => {
                // Char-based truncation: the oracle may return arbitrary
                // multi-byte text and a byte cut can land mid-character.
                let preview: String = raw.chars().take(120).collect();
                warn!(
                    "Unparsable oracle score response, using neutral vector: {:?}",
                    preview
                );
                QualityVector::neutral()
            }
        };

        self.finish_vector(vector, text)
    }

    /// Fill in the locally computed and placeholder dimensions, then the
    /// composite.
    fn finish_vector(&self, mut vector: QualityVector, text: &str) -> QualityVector {
        vector.focus = PLACEHOLDER_SCORE;
        vector.clarity = PLACEHOLDER_SCORE;
        vector.emotion = PLACEHOLDER_SCORE;
        vector.flub_score = flub_score(text);
        vector.composite_score = composite_score(&vector, &self.weights);
        vector
    }

    /// Score every segment in the pool, fanning out oracle calls with bounded
    /// concurrency. Results are written back in original index order so output
    /// is deterministic even when completion order is not.
    pub async fn score_segments(
        &self,
        segments: Vec<Segment>,
        topic: &str,
        max_concurrent: usize,
    ) -> Vec<Segment> {
        let count = segments.len();
        info!("Scoring {} segments against topic", count);

        let mut scored: Vec<Option<Segment>> = (0..count).map(|_| None).collect();

        let mut results = stream::iter(segments.into_iter().enumerate())
            .map(|(index, mut segment)| async move {
                let quality = self.score(&segment.text, topic).await;
                debug!(
                    "Segment {} composite {:.1}",
                    index, quality.composite_score
                );
                segment.quality = Some(quality);
                (index, segment)
            })
            .buffer_unordered(max_concurrent.max(1));

        while let Some((index, segment)) = results.next().await {
            scored[index] = Some(segment);
        }

        scored.into_iter().flatten().collect()
    }
}

/// Parse the oracle's `relevance,sentiment,novelty,energy` response.
/// Anything other than exactly four numeric fields is a parse failure.
fn parse_score_line(response: &str) -> Option<(f64, f64, f64, f64)> {
    let fields: Vec<&str> = response.trim().split(',').map(|f| f.trim()).collect();
    if fields.len() != 4 {
        return None;
    }

    let mut values = [0.0; 4];
    for (slot, field) in values.iter_mut().zip(&fields) {
        *slot = field.parse::<f64>().ok()?;
    }

    Some((values[0], values[1], values[2], values[3]))
}

fn clamp(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Delivery cleanliness: `100 * (1 - fillers/words)`. Computed locally, no
/// oracle call.
pub fn flub_score(text: &str) -> f64 {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return 100.0;
    }

    let fillers = words
        .iter()
        .filter(|word| {
            let cleaned: String = word
                .to_lowercase()
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '\'')
                .collect();
            FILLER_WORDS.contains(&cleaned.as_str())
        })
        .count();

    100.0 * (1.0 - fillers as f64 / words.len() as f64)
}

/// Weighted average of relevance, flub, focus and energy. An all-zero weight
/// set yields the neutral midpoint instead of dividing by zero.
pub fn composite_score(vector: &QualityVector, weights: &CompositeWeights) -> f64 {
    let weight_sum = weights.relevance + weights.flub + weights.focus + weights.energy;
    if weight_sum <= 0.0 {
        return NEUTRAL_SCORE;
    }

    let weighted = vector.relevance * weights.relevance
        + vector.flub_score * weights.flub
        + vector.focus * weights.focus
        + vector.energy * weights.energy;

    (weighted / weight_sum).clamp(0.0, 100.0)
}
