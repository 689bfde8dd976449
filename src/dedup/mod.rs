//! Take deduplication: cluster near-duplicate takes of the same spoken line
//! and keep one canonical take per cluster.

use crate::store::{Cluster, Segment};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Normalized texts shorter than this are too ambiguous for the
/// edit-distance/cosine heuristics; they must match exactly.
const SHORT_TEXT_LEN: usize = 10;

/// Similarity thresholds for take clustering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Maximum Levenshtein distance as a fraction of the longer string.
    pub edit_distance_threshold: f64,
    /// Minimum word-frequency cosine similarity.
    pub cosine_threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            edit_distance_threshold: 0.3,
            cosine_threshold: 0.8,
        }
    }
}

/// Normalize text for similarity comparison: lowercase, strip punctuation,
/// collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let lower = text.to_lowercase();
    let no_punct: String = lower
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    no_punct.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Levenshtein distance normalized by the longer string's length.
fn normalized_edit_distance(a: &str, b: &str) -> f64 {
    let longer = a.chars().count().max(b.chars().count());
    if longer == 0 {
        return 0.0;
    }
    strsim::levenshtein(a, b) as f64 / longer as f64
}

/// Cosine similarity of word-frequency vectors over the union vocabulary.
fn word_cosine_similarity(a: &str, b: &str) -> f64 {
    let count = |text: &str| -> HashMap<String, f64> {
        let mut counts = HashMap::new();
        for word in text.split_whitespace() {
            *counts.entry(word.to_string()).or_insert(0.0) += 1.0;
        }
        counts
    };

    let counts_a = count(a);
    let counts_b = count(b);

    let vocabulary: HashSet<&String> = counts_a.keys().chain(counts_b.keys()).collect();

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for word in vocabulary {
        let x = counts_a.get(word).copied().unwrap_or(0.0);
        let y = counts_b.get(word).copied().unwrap_or(0.0);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Decide whether two texts are near-duplicate takes of the same line.
///
/// Either signal suffices: a low normalized edit distance or a high cosine
/// similarity. Short utterances require exact equality instead.
pub fn are_similar_takes(a: &str, b: &str, config: &DedupConfig) -> bool {
    let norm_a = normalize_text(a);
    let norm_b = normalize_text(b);

    if norm_a.chars().count() < SHORT_TEXT_LEN || norm_b.chars().count() < SHORT_TEXT_LEN {
        return norm_a == norm_b;
    }

    normalized_edit_distance(&norm_a, &norm_b) <= config.edit_distance_threshold
        || word_cosine_similarity(&norm_a, &norm_b) >= config.cosine_threshold
}

/// Partition a segment pool into clusters of near-duplicate takes.
///
/// Single-pass agglomeration in original order: each unassigned segment opens
/// a cluster and scans all later unassigned segments once. O(n^2) comparisons;
/// pools are expected to be tens to low hundreds of segments per source file.
pub fn cluster_takes(segments: Vec<Segment>, config: &DedupConfig) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut assigned = vec![false; segments.len()];

    for i in 0..segments.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;

        let mut members = vec![segments[i].clone()];
        for j in (i + 1)..segments.len() {
            if assigned[j] {
                continue;
            }
            if are_similar_takes(&segments[i].text, &segments[j].text, config) {
                assigned[j] = true;
                members.push(segments[j].clone());
            }
        }

        // Highest composite wins; ties resolve to the first-encountered take
        // because the strict comparison never replaces on equal scores.
        let mut canonical = 0;
        let mut best = members[0].composite_or_neutral();
        for (index, member) in members.iter().enumerate().skip(1) {
            let score = member.composite_or_neutral();
            if score > best {
                best = score;
                canonical = index;
            }
        }

        debug!(
            "Cluster of {} take(s), canonical composite {:.1}",
            members.len(),
            best
        );
        clusters.push(Cluster { members, canonical });
    }

    clusters
}

/// Cluster the pool and return only the canonical takes, sorted by start
/// time.
pub fn dedupe_takes(segments: Vec<Segment>, config: &DedupConfig) -> Vec<Segment> {
    let input_count = segments.len();
    let clusters = cluster_takes(segments, config);

    let mut canonicals: Vec<Segment> = clusters
        .iter()
        .map(|c| c.canonical_segment().clone())
        .collect();
    canonicals.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    info!(
        "Deduplicated {} segments into {} canonical takes",
        input_count,
        canonicals.len()
    );
    canonicals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::QualityVector;

    fn seg(start: f64, text: &str, composite: f64) -> Segment {
        let mut segment = Segment::new("a.mp4", start, start + 2.0, text);
        segment.quality = Some(QualityVector {
            composite_score: composite,
            ..Default::default()
        });
        segment
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text("So, we STARTED  the project!"),
            "so we started the project"
        );
    }

    #[test]
    fn test_punctuation_case_variants_cluster() {
        let config = DedupConfig::default();
        assert!(are_similar_takes(
            "So we started the project",
            "so we started the project.",
            &config
        ));
    }

    #[test]
    fn test_short_texts_require_exact_match() {
        let config = DedupConfig::default();
        // Both under 10 normalized chars and one edit apart; still not takes.
        assert!(!are_similar_takes("yes", "yet", &config));
        assert!(are_similar_takes("Yes!", "yes", &config));
    }

    #[test]
    fn test_dissimilar_texts_stay_apart() {
        let config = DedupConfig::default();
        assert!(!are_similar_takes(
            "we shipped the release on friday",
            "the weather in bergen was terrible",
            &config
        ));
    }

    #[test]
    fn test_cosine_or_edit_distance_suffices() {
        let config = DedupConfig::default();
        // Same words reordered: edit distance is large, cosine is 1.0.
        assert!(are_similar_takes(
            "the project started well really",
            "really the project started well",
            &config
        ));
    }

    #[test]
    fn test_canonical_pool_is_singletons() {
        let config = DedupConfig::default();
        let segments = vec![
            seg(0.0, "we talked about the architecture", 60.0),
            seg(5.0, "the budget discussion happened after lunch", 70.0),
            seg(10.0, "shipping dates moved to october", 50.0),
        ];

        let clusters = cluster_takes(segments, &config);
        assert_eq!(clusters.len(), 3);
        assert!(clusters.iter().all(|c| c.members.len() == 1));
    }

    #[test]
    fn test_highest_composite_is_canonical() {
        let config = DedupConfig::default();
        let segments = vec![
            seg(0.0, "So we started the project", 55.0),
            seg(8.0, "so we started the project.", 72.0),
        ];

        let deduped = dedupe_takes(segments, &config);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].text, "so we started the project.");
    }

    #[test]
    fn test_ties_keep_first_encountered() {
        let config = DedupConfig::default();
        let segments = vec![
            seg(0.0, "so we started the project", 60.0),
            seg(8.0, "So we started the project", 60.0),
        ];

        let clusters = cluster_takes(segments, &config);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].canonical, 0);
    }

    #[test]
    fn test_output_sorted_by_start_time() {
        let config = DedupConfig::default();
        let segments = vec![
            seg(20.0, "closing remarks about the roadmap ahead", 60.0),
            seg(0.0, "opening remarks about the quarter behind", 60.0),
        ];

        let deduped = dedupe_takes(segments, &config);
        assert_eq!(deduped.len(), 2);
        assert!(deduped[0].start < deduped[1].start);
    }
}
