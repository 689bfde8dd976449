//! Time-window adjustment: temporal expansion and duration trimming.

use crate::store::Segment;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Settings for the timeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Base window in seconds added on each side of a segment.
    pub base_window_seconds: f64,
    /// Total duration budget in seconds for the trimmed script.
    pub duration_budget_seconds: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            base_window_seconds: 0.5,
            duration_budget_seconds: 60.0,
        }
    }
}

/// Widen each segment's window with an energy-driven delta, so high-energy
/// moments get more breathing room and emphasis is not clipped.
///
/// `delta = base_window * (0.8 + 0.5 * energy/100)`; the start is floored at
/// zero.
pub fn expand_windows(segments: Vec<Segment>, base_window_seconds: f64) -> Vec<Segment> {
    segments
        .into_iter()
        .map(|mut segment| {
            let energy_norm = segment
                .quality
                .as_ref()
                .map(|q| q.energy / 100.0)
                .unwrap_or(0.5);
            let delta = base_window_seconds * (0.8 + 0.5 * energy_norm);

            segment.start = (segment.start - delta).max(0.0);
            segment.end += delta;
            segment
        })
        .collect()
}

/// Greedily accept ranked segments until the duration budget is exhausted.
///
/// Stops at the first segment that would exceed the budget: the output is a
/// prefix of the ranked order, never a backfilled subset, so budget may go
/// unused if a later short segment would have fit.
pub fn trim_to_budget(segments: Vec<Segment>, budget_seconds: f64) -> Vec<Segment> {
    let mut selected = Vec::new();
    let mut total = 0.0;

    for segment in segments {
        let duration = segment.duration();
        if total + duration > budget_seconds {
            debug!(
                "Budget cut: {:.1}s used of {:.1}s, next segment is {:.1}s",
                total, budget_seconds, duration
            );
            break;
        }
        total += duration;
        selected.push(segment);
    }

    info!(
        "Trimmed to {} segments, {:.1}s of {:.1}s budget",
        selected.len(),
        total,
        budget_seconds
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::QualityVector;

    fn seg(start: f64, end: f64, energy: f64) -> Segment {
        let mut segment = Segment::new("a.mp4", start, end, "text");
        segment.quality = Some(QualityVector {
            energy,
            ..Default::default()
        });
        segment
    }

    #[test]
    fn test_expand_scales_with_energy() {
        let expanded = expand_windows(vec![seg(10.0, 12.0, 0.0), seg(20.0, 22.0, 100.0)], 1.0);

        // Low energy: delta = 1.0 * (0.8 + 0.0) = 0.8
        assert!((expanded[0].start - 9.2).abs() < 1e-9);
        assert!((expanded[0].end - 12.8).abs() < 1e-9);

        // High energy: delta = 1.0 * (0.8 + 0.5) = 1.3
        assert!((expanded[1].start - 18.7).abs() < 1e-9);
        assert!((expanded[1].end - 23.3).abs() < 1e-9);
    }

    #[test]
    fn test_expand_floors_start_at_zero() {
        let expanded = expand_windows(vec![seg(0.2, 3.0, 50.0)], 2.0);
        assert_eq!(expanded[0].start, 0.0);
    }

    #[test]
    fn test_trim_respects_budget() {
        let segments = vec![seg(0.0, 20.0, 0.0), seg(0.0, 20.0, 0.0), seg(0.0, 20.0, 0.0)];
        let trimmed = trim_to_budget(segments, 30.0);

        // Three 20s segments against a 30s budget: only the first fits.
        assert_eq!(trimmed.len(), 1);
    }

    #[test]
    fn test_trim_is_prefix_no_backfill() {
        // 25s, then 10s (too big at that point), then 4s which would fit but
        // must not be backfilled.
        let segments = vec![seg(0.0, 25.0, 0.0), seg(0.0, 10.0, 0.0), seg(0.0, 4.0, 0.0)];
        let trimmed = trim_to_budget(segments, 30.0);
        assert_eq!(trimmed.len(), 1);
        assert!((trimmed[0].duration() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_trim_total_never_exceeds_budget() {
        // 12 + 9 = 21 fits; adding the 10s segment would reach 31.
        let segments = vec![seg(0.0, 12.0, 0.0), seg(0.0, 9.0, 0.0), seg(0.0, 10.0, 0.0)];
        let trimmed = trim_to_budget(segments, 30.0);
        let total: f64 = trimmed.iter().map(|s| s.duration()).sum();
        assert!(total <= 30.0);
        assert_eq!(trimmed.len(), 2);
    }

    #[test]
    fn test_trim_empty_budget() {
        let trimmed = trim_to_budget(vec![seg(0.0, 5.0, 0.0)], 0.0);
        assert!(trimmed.is_empty());
    }
}
