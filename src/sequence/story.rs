//! Story sequencing: reorder a segment pool into a narratively coherent
//! order when no speaker structure exists.

use super::{parse_numeric_score, truncate_chars, SequencingConfig};
use crate::config::Prompts;
use crate::error::Result;
use crate::scoring::Scorer;
use crate::store::Segment;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Two-level chunked greedy story sequencer.
///
/// Pools above the outer chunk size are split, sequenced independently,
/// concatenated, then given one additional chunk-level pass for global
/// coherence. Within a chunk, pools above the inner size are split into
/// fixed-size, index-based sub-chunks with no cross-boundary optimization --
/// a deliberate complexity/quality tradeoff. Inner chunks are ordered by
/// best-start then best-next oracle scoring. Unlike the dialogue path there
/// is no pair cache: pairs are never revisited.
pub struct StorySequencer {
    scorer: Arc<dyn Scorer>,
    prompts: Prompts,
    config: SequencingConfig,
}

impl StorySequencer {
    pub fn new(scorer: Arc<dyn Scorer>, prompts: Prompts, config: SequencingConfig) -> Self {
        Self {
            scorer,
            prompts,
            config,
        }
    }

    /// Reorder the pool for narrative coherence. Output is always a
    /// permutation of the input.
    pub async fn sequence(
        &self,
        pool: Vec<Segment>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Segment>> {
        info!("Story sequencing {} segments", pool.len());

        if pool.len() <= self.config.outer_chunk_size {
            return Ok(self.sequence_chunk(pool, cancel).await);
        }

        let mut concatenated = Vec::with_capacity(pool.len());
        for chunk in chunk_by_index(pool, self.config.outer_chunk_size) {
            let ordered = self.sequence_chunk(chunk, cancel).await;
            concatenated.extend(ordered);
        }

        // One more chunk-level pass over the concatenated result for global
        // coherence.
        Ok(self.sequence_chunk(concatenated, cancel).await)
    }

    /// Order one chunk, splitting into fixed-size sub-chunks first when it
    /// exceeds the inner size.
    async fn sequence_chunk(
        &self,
        chunk: Vec<Segment>,
        cancel: &CancellationToken,
    ) -> Vec<Segment> {
        if chunk.len() <= self.config.inner_chunk_size {
            return self.order_greedy(chunk, cancel).await;
        }

        let mut ordered = Vec::with_capacity(chunk.len());
        for sub_chunk in chunk_by_index(chunk, self.config.inner_chunk_size) {
            ordered.extend(self.order_greedy(sub_chunk, cancel).await);
        }
        ordered
    }

    /// Greedy best-start, best-next ordering of one inner chunk.
    async fn order_greedy(&self, pool: Vec<Segment>, cancel: &CancellationToken) -> Vec<Segment> {
        if pool.len() < 2 {
            return pool;
        }

        let mut pool = pool;

        if cancel.is_cancelled() {
            return pool;
        }

        // Score every segment as a candidate opener and seed with the best.
        let opener_scores = self
            .fan_out(&pool, |segment| self.fetch_opener_score(segment))
            .await;

        let seed_index = match best_index(&opener_scores) {
            Some(index) => index,
            None => {
                // Every opener call failed; nothing to anchor a greedy search
                // on. Fall back to score order.
                warn!("No opener could be scored, falling back to score order");
                pool.sort_by(|a, b| {
                    b.composite_or_neutral()
                        .partial_cmp(&a.composite_or_neutral())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                return pool;
            }
        };

        let mut ordered = vec![pool.remove(seed_index)];
        debug!("Story seed chosen, {} segments remain", pool.len());

        while !pool.is_empty() {
            if cancel.is_cancelled() {
                ordered.append(&mut pool);
                break;
            }

            let tail = match ordered.last() {
                Some(tail) => tail,
                None => break,
            };
            let continuation_scores = self
                .fan_out(&pool, |segment| self.fetch_continuation_score(tail, segment))
                .await;

            match best_index(&continuation_scores) {
                Some(index) => ordered.push(pool.remove(index)),
                None => {
                    // No remaining candidate yielded a score; append the rest
                    // in current order and stop extending.
                    warn!(
                        "No continuation could be scored, appending {} remaining segments",
                        pool.len()
                    );
                    ordered.append(&mut pool);
                    break;
                }
            }
        }

        ordered
    }

    /// Score every pool member through the bounded worker pool; results land
    /// in per-candidate slots in original index order.
    async fn fan_out<'a, F, Fut>(&self, pool: &'a [Segment], score: F) -> Vec<Option<f64>>
    where
        F: Fn(&'a Segment) -> Fut,
        Fut: std::future::Future<Output = Option<f64>> + 'a,
    {
        let mut slots: Vec<Option<f64>> = vec![None; pool.len()];

        let mut results = stream::iter(pool.iter().enumerate())
            .map(|(index, segment)| {
                let future = score(segment);
                async move { (index, future.await) }
            })
            .buffer_unordered(self.config.max_concurrent.max(1));

        while let Some((index, value)) = results.next().await {
            slots[index] = value;
        }

        slots
    }

    /// Ask the oracle how well a segment opens the story, 0-100. `None` on
    /// any failure so the caller's fallback stays visible.
    async fn fetch_opener_score(&self, segment: &Segment) -> Option<f64> {
        let mut vars = HashMap::new();
        vars.insert(
            "text".to_string(),
            truncate_chars(&segment.text, self.config.opener_truncate_chars),
        );

        let system = self
            .prompts
            .render_with_custom(&self.prompts.story.opener_system, &vars);
        let user = self
            .prompts
            .render_with_custom(&self.prompts.story.opener_user, &vars);

        match self.scorer.generate_text(&system, &user).await {
            Ok(response) => parse_numeric_score(&response),
            Err(e) => {
                warn!("Opener-score call failed: {}", e);
                None
            }
        }
    }

    /// Ask the oracle how well `candidate` continues from `previous`, 0-100.
    async fn fetch_continuation_score(
        &self,
        previous: &Segment,
        candidate: &Segment,
    ) -> Option<f64> {
        let limit = self.config.continuation_truncate_chars;
        let mut vars = HashMap::new();
        vars.insert("previous".to_string(), truncate_chars(&previous.text, limit));
        vars.insert("candidate".to_string(), truncate_chars(&candidate.text, limit));

        let system = self
            .prompts
            .render_with_custom(&self.prompts.story.continuation_system, &vars);
        let user = self
            .prompts
            .render_with_custom(&self.prompts.story.continuation_user, &vars);

        match self.scorer.generate_text(&system, &user).await {
            Ok(response) => parse_numeric_score(&response),
            Err(e) => {
                warn!("Continuation-score call failed: {}", e);
                None
            }
        }
    }
}

/// Split into fixed-size chunks by index, preserving order. Content-oblivious
/// by design.
fn chunk_by_index(segments: Vec<Segment>, size: usize) -> Vec<Vec<Segment>> {
    let mut chunks = Vec::new();
    let mut current = Vec::with_capacity(size.max(1));
    for segment in segments {
        current.push(segment);
        if current.len() == size.max(1) {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Index of the highest `Some` score, ties to the first; `None` when no slot
/// scored.
fn best_index(scores: &[Option<f64>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, score) in scores.iter().enumerate() {
        if let Some(value) = score {
            match best {
                Some((_, current)) if *value <= current => {}
                _ => best = Some((index, *value)),
            }
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KlippError;
    use crate::scoring::tests::MockScorer;
    use crate::store::QualityVector;

    fn seg(text: &str, composite: f64) -> Segment {
        let mut segment = Segment::new("story.mp4", 0.0, 2.0, text);
        segment.quality = Some(QualityVector {
            composite_score: composite,
            ..Default::default()
        });
        segment
    }

    fn sequencer(scorer: MockScorer, config: SequencingConfig) -> StorySequencer {
        StorySequencer::new(Arc::new(scorer), Prompts::default(), config)
    }

    fn texts(segments: &[Segment]) -> Vec<&str> {
        segments.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_chunk_by_index() {
        let segments: Vec<Segment> = (0..7).map(|i| seg(&format!("s{}", i), 50.0)).collect();
        let chunks = chunk_by_index(segments, 3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 3);
        assert_eq!(chunks[2].len(), 1);
        assert_eq!(chunks[2][0].text, "s6");
    }

    #[test]
    fn test_best_index() {
        assert_eq!(best_index(&[Some(1.0), Some(5.0), Some(5.0)]), Some(1));
        assert_eq!(best_index(&[None, Some(2.0)]), Some(1));
        assert_eq!(best_index(&[None, None]), None);
        assert_eq!(best_index(&[]), None);
    }

    #[tokio::test]
    async fn test_permutation_small_pool() {
        let pool = vec![seg("a", 10.0), seg("b", 20.0), seg("c", 30.0)];
        let sequencer = sequencer(MockScorer::always("50"), SequencingConfig::default());
        let ordered = sequencer
            .sequence(pool, &CancellationToken::new())
            .await
            .unwrap();

        let mut sorted = texts(&ordered);
        sorted.sort();
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_permutation_across_chunk_boundaries() {
        // 25 segments: exceeds the outer chunk size of 20 and forces both
        // chunking levels plus the final pass.
        let pool: Vec<Segment> = (0..25).map(|i| seg(&format!("s{:02}", i), 50.0)).collect();
        let sequencer = sequencer(MockScorer::always("50"), SequencingConfig::default());
        let ordered = sequencer
            .sequence(pool, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ordered.len(), 25);
        let mut sorted = texts(&ordered);
        sorted.sort();
        let mut expected: Vec<String> = (0..25).map(|i| format!("s{:02}", i)).collect();
        expected.sort();
        assert_eq!(sorted, expected);
    }

    #[tokio::test]
    async fn test_best_opener_seeds_sequence() {
        // Opener scores: a=10, b=90, c=20; continuations all 50.
        let pool = vec![seg("a", 50.0), seg("b", 50.0), seg("c", 50.0)];
        let scorer = MockScorer::new(vec![
            Ok("10".to_string()),
            Ok("90".to_string()),
            Ok("20".to_string()),
            Ok("50".to_string()),
            Ok("50".to_string()),
            Ok("50".to_string()),
        ]);
        let sequencer = sequencer(
            scorer,
            SequencingConfig {
                max_concurrent: 1,
                ..Default::default()
            },
        );

        let ordered = sequencer
            .sequence(pool, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ordered[0].text, "b");
    }

    #[tokio::test]
    async fn test_all_openers_fail_falls_back_to_score_order() {
        let pool = vec![seg("weak", 10.0), seg("strong", 90.0), seg("mid", 40.0)];
        let sequencer = sequencer(
            MockScorer::new(vec![
                Err(KlippError::OpenAI("down".to_string())),
                Err(KlippError::OpenAI("down".to_string())),
                Err(KlippError::OpenAI("down".to_string())),
            ]),
            SequencingConfig::default(),
        );

        let ordered = sequencer
            .sequence(pool, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(texts(&ordered), vec!["strong", "mid", "weak"]);
    }

    #[tokio::test]
    async fn test_continuation_failure_appends_remainder() {
        // Openers score fine, every continuation call fails afterwards.
        let pool = vec![seg("a", 50.0), seg("b", 50.0), seg("c", 50.0)];
        let scorer = MockScorer::new(vec![
            Ok("90".to_string()),
            Ok("10".to_string()),
            Ok("10".to_string()),
            Err(KlippError::OpenAI("down".to_string())),
            Err(KlippError::OpenAI("down".to_string())),
        ]);
        let sequencer = sequencer(
            scorer,
            SequencingConfig {
                max_concurrent: 1,
                ..Default::default()
            },
        );

        let ordered = sequencer
            .sequence(pool, &CancellationToken::new())
            .await
            .unwrap();
        // Seed is "a" (opener 90), then the remainder in current order.
        assert_eq!(texts(&ordered), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_cancellation_returns_pool_unordered() {
        let pool: Vec<Segment> = (0..5).map(|i| seg(&format!("s{}", i), 50.0)).collect();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let sequencer = sequencer(MockScorer::always("50"), SequencingConfig::default());
        let ordered = sequencer.sequence(pool, &cancel).await.unwrap();
        assert_eq!(ordered.len(), 5);
    }
}
