//! Canonical segment types and the script record store.
//!
//! Every pipeline stage consumes and produces `Segment` sequences; this is the
//! one shared shape (no per-stage tuple variants).

pub mod record;

pub use record::{parse_script, parse_script_str, serialize_script, write_script};

use serde::{Deserialize, Serialize};

/// Sentinel speaker label used when diarization could not attribute a segment.
pub const UNKNOWN_SPEAKER: &str = "UNK";

/// Neutral midpoint on the common 0-100 quality scale.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Fixed value for the reserved visual/audio dimensions (focus, clarity,
/// emotion) until non-text analysis lands.
pub const PLACEHOLDER_SCORE: f64 = 50.0;

/// A single timestamped spoken-text unit from a source recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Identifier of the originating recording.
    pub source_file: String,
    /// Start offset in seconds.
    pub start: f64,
    /// End offset in seconds (always > start).
    pub end: f64,
    /// Spoken-content transcript, never empty after trimming.
    pub text: String,
    /// Quality scores, absent until the segment has been scored.
    pub quality: Option<QualityVector>,
    /// Speaker label from diarization, if any.
    pub speaker_id: Option<String>,
    /// Camera framing tag, passed through untouched.
    pub shot_label: Option<String>,
}

impl Segment {
    /// Create a new unscored segment.
    pub fn new(source_file: impl Into<String>, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            start,
            end,
            text: text.into(),
            quality: None,
            speaker_id: None,
            shot_label: None,
        }
    }

    /// Duration of this segment in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Speaker label, with the `UNK` sentinel for unattributed segments.
    pub fn speaker(&self) -> &str {
        self.speaker_id.as_deref().unwrap_or(UNKNOWN_SPEAKER)
    }

    /// Stable identity for this segment, used as a cache key by the
    /// sequencers. Derived from source and millisecond offsets so it survives
    /// reordering without needing an ID field in the file format.
    pub fn identity(&self) -> String {
        format!(
            "{}:{}-{}",
            self.source_file,
            (self.start * 1000.0).round() as i64,
            (self.end * 1000.0).round() as i64
        )
    }

    /// Composite score if the segment has been scored, else the neutral
    /// midpoint.
    pub fn composite_or_neutral(&self) -> f64 {
        self.quality
            .as_ref()
            .map(|q| q.composite_score)
            .unwrap_or(NEUTRAL_SCORE)
    }
}

/// Multi-dimensional quality scores for a segment, all on a common 0-100
/// scale (higher is better).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityVector {
    /// How on-topic the text is for the operator's subject prompt.
    pub relevance: f64,
    /// Emotional positivity, remapped from the oracle's -100..+100 scale.
    pub sentiment: f64,
    /// How novel/surprising the content is, remapped from 0-10.
    pub novelty: f64,
    /// Delivery energy, remapped from 1-5.
    pub energy: f64,
    /// Reserved for visual focus analysis.
    pub focus: f64,
    /// Reserved for audio clarity analysis.
    pub clarity: f64,
    /// Reserved for facial-emotion analysis.
    pub emotion: f64,
    /// Cleanliness of delivery: 100 means no filler words.
    pub flub_score: f64,
    /// Weighted blend used for take selection and trimming order.
    pub composite_score: f64,
}

impl QualityVector {
    /// A vector with every dimension at the neutral midpoint, used when the
    /// oracle response could not be parsed.
    pub fn neutral() -> Self {
        Self {
            relevance: NEUTRAL_SCORE,
            sentiment: NEUTRAL_SCORE,
            novelty: NEUTRAL_SCORE,
            energy: NEUTRAL_SCORE,
            focus: PLACEHOLDER_SCORE,
            clarity: PLACEHOLDER_SCORE,
            emotion: PLACEHOLDER_SCORE,
            flub_score: NEUTRAL_SCORE,
            composite_score: NEUTRAL_SCORE,
        }
    }

    /// Mean of the four core text dimensions. Used by the dialogue sequencer
    /// as a segment's intrinsic score.
    pub fn base_score(&self) -> f64 {
        (self.relevance + self.sentiment + self.novelty + self.energy) / 4.0
    }
}

/// Non-negative weights over the four core quality dimensions, supplied by
/// the caller for presentation-order ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    pub relevance: f64,
    pub sentiment: f64,
    pub novelty: f64,
    pub energy: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            relevance: 1.0,
            sentiment: 0.5,
            novelty: 0.5,
            energy: 1.0,
        }
    }
}

impl RankingWeights {
    pub fn sum(&self) -> f64 {
        self.relevance + self.sentiment + self.novelty + self.energy
    }
}

/// A non-empty group of near-duplicate takes with a chosen canonical member.
#[derive(Debug, Clone)]
pub struct Cluster {
    /// All takes judged to be the same spoken line, in encounter order.
    pub members: Vec<Segment>,
    /// Index into `members` of the highest-composite-score take.
    pub canonical: usize,
}

impl Cluster {
    /// The canonical take for this cluster.
    pub fn canonical_segment(&self) -> &Segment {
        &self.members[self.canonical]
    }
}
