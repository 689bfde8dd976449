//! Presentation-order ranking and novelty reranking.
//!
//! The ranker's weighted blend is caller-tunable and distinct from the
//! quality scorer's internal composite: the composite picks takes, this
//! orders the survivors for presentation.

use crate::store::{QualityVector, RankingWeights, Segment, NEUTRAL_SCORE};
use tracing::debug;

/// Weighted blend of the four core quality dimensions. All-zero weights
/// yield the neutral constant for every segment, so ranking degrades to the
/// input order.
pub fn blend_score(quality: &QualityVector, weights: &RankingWeights) -> f64 {
    let weight_sum = weights.sum();
    if weight_sum <= 0.0 {
        return NEUTRAL_SCORE;
    }

    let weighted = quality.relevance * weights.relevance
        + quality.sentiment * weights.sentiment
        + quality.novelty * weights.novelty
        + quality.energy * weights.energy;

    weighted / weight_sum
}

fn segment_blend(segment: &Segment, weights: &RankingWeights) -> f64 {
    segment
        .quality
        .as_ref()
        .map(|q| blend_score(q, weights))
        .unwrap_or(NEUTRAL_SCORE)
}

/// Stable descending sort by the weighted blend.
pub fn rank_segments(mut segments: Vec<Segment>, weights: &RankingWeights) -> Vec<Segment> {
    segments.sort_by(|a, b| {
        segment_blend(b, weights)
            .partial_cmp(&segment_blend(a, weights))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    segments
}

/// Greedy Maximal-Marginal-Relevance reordering.
///
/// At each step the remaining segment maximizing
/// `lambda * (relevance/100) - (1 - lambda) * (1 - novelty/100)` moves to the
/// output: high relevance is rewarded, a novelty deficit is penalized. O(n^2),
/// acceptable at expected pool sizes. Output is a permutation of the input.
pub fn rerank_by_novelty(segments: Vec<Segment>, lambda: f64) -> Vec<Segment> {
    let lambda = lambda.clamp(0.0, 1.0);
    let mut pool = segments;
    let mut ordered = Vec::with_capacity(pool.len());

    while !pool.is_empty() {
        let mut best_index = 0;
        let mut best_score = f64::NEG_INFINITY;

        for (index, segment) in pool.iter().enumerate() {
            let (relevance, novelty) = segment
                .quality
                .as_ref()
                .map(|q| (q.relevance, q.novelty))
                .unwrap_or((NEUTRAL_SCORE, NEUTRAL_SCORE));

            let score = lambda * (relevance / 100.0) - (1.0 - lambda) * (1.0 - novelty / 100.0);
            if score > best_score {
                best_score = score;
                best_index = index;
            }
        }

        debug!("MMR pick: score {:.3}", best_score);
        ordered.push(pool.remove(best_index));
    }

    ordered
}
