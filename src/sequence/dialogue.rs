//! Dialogue sequencing: reorder a pool of speaker-labelled segments into an
//! alternating-speaker conversational order.

use super::{parse_numeric_score, truncate_chars, SequencingConfig};
use crate::config::Prompts;
use crate::error::Result;
use crate::scoring::Scorer;
use crate::store::{Segment, NEUTRAL_SCORE};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Greedy nearest-neighbor dialogue sequencer.
///
/// Seeds with the pool's highest-base-score segment, then repeatedly appends
/// the different-speaker candidate maximizing
/// `lambda * base(candidate) + (1 - lambda) * reply_score(tail, candidate)`.
/// Reply scores come from the oracle and are cached by ordered segment-pair
/// identity, so each distinct pair is scored at most once.
pub struct DialogueSequencer {
    scorer: Arc<dyn Scorer>,
    prompts: Prompts,
    config: SequencingConfig,
    reply_cache: HashMap<(String, String), f64>,
}

impl DialogueSequencer {
    pub fn new(scorer: Arc<dyn Scorer>, prompts: Prompts, config: SequencingConfig) -> Self {
        Self {
            scorer,
            prompts,
            config,
            reply_cache: HashMap::new(),
        }
    }

    /// Reorder the pool into an alternating-speaker sequence.
    ///
    /// Never drops or duplicates a segment: cancellation and the relaxation
    /// rule both degrade to appending in pool order.
    pub async fn sequence(
        &mut self,
        mut pool: Vec<Segment>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Segment>> {
        if pool.is_empty() {
            return Ok(Vec::new());
        }

        let lambda = self.config.lambda.clamp(0.0, 1.0);
        info!("Dialogue sequencing {} segments", pool.len());

        // Seed with the single highest base score; ties go to the first
        // encountered.
        let seed = {
            let mut best_index = 0;
            let mut best = base_score(&pool[0]);
            for (index, segment) in pool.iter().enumerate().skip(1) {
                let score = base_score(segment);
                if score > best {
                    best = score;
                    best_index = index;
                }
            }
            pool.remove(best_index)
        };

        let mut ordered = vec![seed];

        while !pool.is_empty() {
            if cancel.is_cancelled() {
                info!("Dialogue sequencing cancelled, appending {} remaining", pool.len());
                ordered.append(&mut pool);
                break;
            }

            let tail_speaker = ordered.last().map(|s| s.speaker().to_string()).unwrap_or_default();
            let candidates: Vec<usize> = pool
                .iter()
                .enumerate()
                .filter(|(_, segment)| segment.speaker() != tail_speaker)
                .map(|(index, _)| index)
                .collect();

            // Relaxation: every remaining segment shares the tail's speaker,
            // so alternation would deadlock. Drop the constraint for this
            // step.
            if candidates.is_empty() {
                debug!("No alternating candidate left, relaxing speaker constraint");
                let next = pool.remove(0);
                ordered.push(next);
                continue;
            }

            let tail = match ordered.last() {
                Some(tail) => tail.clone(),
                None => break,
            };
            self.fill_reply_cache(&tail, &pool, &candidates).await;

            let tail_id = tail.identity();
            let mut best_index = candidates[0];
            let mut best_score = f64::NEG_INFINITY;
            for &index in &candidates {
                let reply = self
                    .reply_cache
                    .get(&(tail_id.clone(), pool[index].identity()))
                    .copied()
                    .unwrap_or(NEUTRAL_SCORE);
                let score = lambda * base_score(&pool[index]) + (1.0 - lambda) * reply;
                if score > best_score {
                    best_score = score;
                    best_index = index;
                }
            }

            ordered.push(pool.remove(best_index));
        }

        Ok(ordered)
    }

    /// Score all not-yet-cached (tail, candidate) pairs through the bounded
    /// worker pool, then merge the results into the cache.
    ///
    /// Fan-out writes land in per-candidate slots and the shared cache is only
    /// written here, between greedy steps, so there is a single writer per key
    /// and no lock is held across an oracle call.
    async fn fill_reply_cache(&mut self, tail: &Segment, pool: &[Segment], candidates: &[usize]) {
        let tail_id = tail.identity();
        let missing: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&index| {
                !self
                    .reply_cache
                    .contains_key(&(tail_id.clone(), pool[index].identity()))
            })
            .collect();

        if missing.is_empty() {
            return;
        }

        let this: &Self = self;
        let scored: Vec<(String, f64)> = stream::iter(missing)
            .map(|index| {
                let candidate = &pool[index];
                async move {
                    let score = this.fetch_reply_score(tail, candidate).await;
                    (candidate.identity(), score)
                }
            })
            .buffer_unordered(this.config.max_concurrent.max(1))
            .collect()
            .await;

        for (candidate_id, score) in scored {
            self.reply_cache.insert((tail_id.clone(), candidate_id), score);
        }
    }

    /// Ask the oracle whether `candidate` naturally replies to `previous`.
    /// Any failure (call error, non-numeric response) degrades to the
    /// neutral midpoint.
    async fn fetch_reply_score(&self, previous: &Segment, candidate: &Segment) -> f64 {
        let limit = self.config.continuation_truncate_chars;
        let mut vars = HashMap::new();
        vars.insert("previous".to_string(), truncate_chars(&previous.text, limit));
        vars.insert("candidate".to_string(), truncate_chars(&candidate.text, limit));

        let system = self
            .prompts
            .render_with_custom(&self.prompts.dialogue.system, &vars);
        let user = self
            .prompts
            .render_with_custom(&self.prompts.dialogue.user, &vars);

        match self.scorer.generate_text(&system, &user).await {
            Ok(response) => parse_numeric_score(&response).unwrap_or_else(|| {
                warn!(
                    "Unparsable reply-score response, using neutral: {:?}",
                    truncate_chars(&response, 80)
                );
                NEUTRAL_SCORE
            }),
            Err(e) => {
                warn!("Reply-score call failed, using neutral: {}", e);
                NEUTRAL_SCORE
            }
        }
    }
}

/// A segment's intrinsic scalar score: the mean of its four core quality
/// dimensions, neutral when unscored.
fn base_score(segment: &Segment) -> f64 {
    segment
        .quality
        .as_ref()
        .map(|q| q.base_score())
        .unwrap_or(NEUTRAL_SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KlippError;
    use crate::scoring::tests::MockScorer;
    use crate::store::QualityVector;

    fn seg(text: &str, speaker: &str, start: f64, base: f64) -> Segment {
        let mut segment = Segment::new("conv.mp4", start, start + 2.0, text);
        segment.speaker_id = Some(speaker.to_string());
        segment.quality = Some(QualityVector {
            relevance: base,
            sentiment: base,
            novelty: base,
            energy: base,
            ..Default::default()
        });
        segment
    }

    fn sequencer(scorer: MockScorer) -> DialogueSequencer {
        DialogueSequencer::new(
            Arc::new(scorer),
            Prompts::default(),
            SequencingConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_seeds_with_highest_base_score() {
        let pool = vec![
            seg("first line", "A", 0.0, 40.0),
            seg("best line", "B", 2.0, 90.0),
            seg("ok line", "A", 4.0, 60.0),
            seg("weak line", "B", 6.0, 20.0),
        ];

        let mut sequencer = sequencer(MockScorer::always("50"));
        let ordered = sequencer
            .sequence(pool, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ordered[0].text, "best line");
        assert_eq!(ordered.len(), 4);
    }

    #[tokio::test]
    async fn test_speakers_alternate() {
        let pool = vec![
            seg("a1", "A", 0.0, 80.0),
            seg("a2", "A", 2.0, 70.0),
            seg("b1", "B", 4.0, 60.0),
            seg("b2", "B", 6.0, 50.0),
        ];

        let mut sequencer = sequencer(MockScorer::always("50"));
        let ordered = sequencer
            .sequence(pool, &CancellationToken::new())
            .await
            .unwrap();

        for pair in ordered.windows(2) {
            assert_ne!(pair[0].speaker(), pair[1].speaker());
        }
    }

    #[tokio::test]
    async fn test_relaxation_on_imbalanced_pool() {
        // One B line, three A lines: alternation is impossible at the end.
        let pool = vec![
            seg("a1", "A", 0.0, 90.0),
            seg("a2", "A", 2.0, 50.0),
            seg("a3", "A", 4.0, 50.0),
            seg("b1", "B", 6.0, 60.0),
        ];

        let mut sequencer = sequencer(MockScorer::always("50"));
        let ordered = sequencer
            .sequence(pool, &CancellationToken::new())
            .await
            .unwrap();

        // Nothing dropped, nothing duplicated.
        assert_eq!(ordered.len(), 4);
        let mut texts: Vec<&str> = ordered.iter().map(|s| s.text.as_str()).collect();
        texts.sort();
        assert_eq!(texts, vec!["a1", "a2", "a3", "b1"]);
    }

    #[tokio::test]
    async fn test_reply_score_picks_best_reply() {
        // Seed is a1 (highest base). Both B lines have equal base, so the
        // reply score decides: b2 scores 90, b1 scores 10.
        let pool = vec![
            seg("a1", "A", 0.0, 90.0),
            seg("b1", "B", 2.0, 50.0),
            seg("b2", "B", 4.0, 50.0),
        ];

        let mut sequencer = DialogueSequencer::new(
            Arc::new(MockScorer::new(vec![
                Ok("10".to_string()),
                Ok("90".to_string()),
            ])),
            Prompts::default(),
            SequencingConfig {
                // Sequential fan-out keeps the canned responses aligned with
                // candidate order.
                max_concurrent: 1,
                ..Default::default()
            },
        );
        let ordered = sequencer
            .sequence(pool, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ordered[1].text, "b2");
    }

    #[tokio::test]
    async fn test_oracle_failure_falls_back_to_neutral() {
        let pool = vec![
            seg("a1", "A", 0.0, 90.0),
            seg("b1", "B", 2.0, 80.0),
            seg("b2", "B", 4.0, 20.0),
        ];

        // Every reply-score call fails; base score decides.
        let mut sequencer = DialogueSequencer::new(
            Arc::new(MockScorer::new(vec![
                Err(KlippError::OpenAI("boom".to_string())),
                Err(KlippError::OpenAI("boom".to_string())),
            ])),
            Prompts::default(),
            SequencingConfig::default(),
        );
        let ordered = sequencer
            .sequence(pool, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ordered.len(), 3);
        assert_eq!(ordered[1].text, "b1");
    }

    #[tokio::test]
    async fn test_cancellation_appends_remainder() {
        let pool = vec![
            seg("a1", "A", 0.0, 90.0),
            seg("b1", "B", 2.0, 50.0),
            seg("a2", "A", 4.0, 50.0),
        ];

        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut sequencer = sequencer(MockScorer::always("50"));
        let ordered = sequencer.sequence(pool, &cancel).await.unwrap();
        assert_eq!(ordered.len(), 3);
    }
}
