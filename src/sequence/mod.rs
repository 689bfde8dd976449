//! Terminal reordering passes: dialogue and story sequencing.
//!
//! Both are greedy nearest-neighbor searches over oracle-scored pairwise
//! compatibility. Oracle calls dominate total runtime, so both sequencers
//! check a cancellation token between call batches and never hold state
//! across a call that a fallback could not replace.

mod dialogue;
mod story;

pub use dialogue::DialogueSequencer;
pub use story::StorySequencer;

use serde::{Deserialize, Serialize};

/// Settings shared by the sequencing passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencingConfig {
    /// Balance between a candidate's intrinsic score and its pairwise
    /// compatibility with the sequence tail, clamped to [0, 1].
    pub lambda: f64,
    /// Pools above this size are split before story sequencing.
    pub outer_chunk_size: usize,
    /// Chunks above this size are split into fixed sub-chunks.
    pub inner_chunk_size: usize,
    /// Story-opener prompts truncate segment text to this many characters.
    pub opener_truncate_chars: usize,
    /// Continuation prompts truncate each side to this many characters.
    pub continuation_truncate_chars: usize,
    /// Maximum in-flight oracle calls when fanning out over candidates.
    pub max_concurrent: usize,
}

impl Default for SequencingConfig {
    fn default() -> Self {
        Self {
            lambda: 0.7,
            outer_chunk_size: 20,
            inner_chunk_size: 10,
            opener_truncate_chars: 500,
            continuation_truncate_chars: 300,
            max_concurrent: 4,
        }
    }
}

/// Truncate to at most `max_chars` characters, on a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Parse a bare numeric oracle response, clamped to the 0-100 scale.
/// Returns `None` on anything non-numeric so the caller's fallback is
/// visible at the call site.
fn parse_numeric_score(response: &str) -> Option<f64> {
    response
        .trim()
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .map(|score| score.clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hei", 10), "hei");
        // Multi-byte chars count as one.
        assert_eq!(truncate_chars("åæø", 2), "åæ");
    }

    #[test]
    fn test_parse_numeric_score() {
        assert_eq!(parse_numeric_score("85"), Some(85.0));
        assert_eq!(parse_numeric_score(" 42.5 "), Some(42.5));
        assert_eq!(parse_numeric_score("120"), Some(100.0));
        assert_eq!(parse_numeric_score("-5"), Some(0.0));
        assert_eq!(parse_numeric_score("85."), Some(85.0));
        assert_eq!(parse_numeric_score("I'd say 85"), None);
    }
}
