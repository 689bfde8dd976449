//! Parse and serialize the plain-text script record format.
//!
//! Blocks are separated by a single blank line:
//!
//! ```text
//! 1
//! 00:00:12,340 --> 00:00:15,900
//! interview_a.mp4
//! Relevance: 82.00
//! Sentiment: 61.50
//! Novelty: 40.00
//! Energy: 75.00
//! FlubScore: 92.00
//! CompositeScore: 78.30
//! So we started the project back in March.
//! ```
//!
//! Parsing is tolerant: blank lines are skipped, a non-numeric index line
//! advances the cursor by one and retries, and malformed blocks are logged
//! and skipped without aborting the file. Writing is always a full-file
//! overwrite with blocks renumbered from 1.

use super::{QualityVector, Segment};
use crate::error::{KlippError, Result};
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

/// Parser for the script record format.
pub struct RecordParser {
    time_pattern: Regex,
}

impl RecordParser {
    pub fn new() -> Self {
        Self {
            time_pattern: Regex::new(
                r"(\d{2,}):(\d{2}):(\d{2}),(\d{3})\s*-->\s*(\d{2,}):(\d{2}):(\d{2}),(\d{3})",
            )
            .expect("Invalid timecode regex"),
        }
    }

    /// Parse a script file into segments.
    ///
    /// A missing file is the one terminal failure of this layer; everything
    /// inside the file degrades to skipped blocks.
    pub fn parse_file(&self, path: &Path) -> Result<Vec<Segment>> {
        if !path.exists() {
            return Err(KlippError::ScriptNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(self.parse(&content))
    }

    /// Parse script content into segments, skipping malformed blocks.
    pub fn parse(&self, content: &str) -> Vec<Segment> {
        let lines: Vec<&str> = content.lines().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            if lines[i].trim().is_empty() {
                i += 1;
                continue;
            }

            // An index line opens a block. Anything else means we are out of
            // sync; advance one line and retry rather than giving up.
            if lines[i].trim().parse::<u32>().is_err() {
                debug!("Skipping non-index line {}: {:?}", i + 1, lines[i]);
                i += 1;
                continue;
            }

            // Collect the block: everything up to the next blank line.
            let block_start = i;
            let mut block_end = i;
            while block_end < lines.len() && !lines[block_end].trim().is_empty() {
                block_end += 1;
            }

            match self.parse_block(&lines[block_start..block_end]) {
                Some(segment) => segments.push(segment),
                None => {
                    warn!(
                        "Skipping malformed record block at line {}",
                        block_start + 1
                    );
                }
            }

            i = block_end;
        }

        segments
    }

    fn parse_block(&self, block: &[&str]) -> Option<Segment> {
        if block.len() < 4 {
            return None;
        }

        let (start, end) = self.parse_timecode(block[1])?;
        if end <= start {
            return None;
        }

        let source_file = block[2].trim();
        if source_file.is_empty() {
            return None;
        }

        let mut quality: Option<QualityVector> = None;
        let mut speaker_id = None;
        let mut shot_label = None;
        let mut text_lines: Vec<&str> = Vec::new();

        for line in &block[3..] {
            if let Some((key, value)) = split_field(line) {
                match key {
                    "Relevance" => quality.get_or_insert_with(Default::default).relevance = value.parse().unwrap_or(0.0),
                    "Sentiment" => quality.get_or_insert_with(Default::default).sentiment = value.parse().unwrap_or(0.0),
                    "Novelty" => quality.get_or_insert_with(Default::default).novelty = value.parse().unwrap_or(0.0),
                    "Energy" => quality.get_or_insert_with(Default::default).energy = value.parse().unwrap_or(0.0),
                    "Focus" => quality.get_or_insert_with(Default::default).focus = value.parse().unwrap_or(0.0),
                    "Clarity" => quality.get_or_insert_with(Default::default).clarity = value.parse().unwrap_or(0.0),
                    "Emotion" => quality.get_or_insert_with(Default::default).emotion = value.parse().unwrap_or(0.0),
                    "FlubScore" => quality.get_or_insert_with(Default::default).flub_score = value.parse().unwrap_or(0.0),
                    "CompositeScore" => quality.get_or_insert_with(Default::default).composite_score = value.parse().unwrap_or(0.0),
                    "Speaker" => speaker_id = Some(value.to_string()),
                    "Shot" => shot_label = Some(value.to_string()),
                    // Unknown key: treat the line as transcript text.
                    _ => text_lines.push(line),
                }
            } else {
                text_lines.push(line);
            }
        }

        let text = text_lines.join("\n").trim().to_string();
        if text.is_empty() {
            return None;
        }

        Some(Segment {
            source_file: source_file.to_string(),
            start,
            end,
            text,
            quality,
            speaker_id,
            shot_label,
        })
    }

    /// Parse `hh:mm:ss,mmm --> hh:mm:ss,mmm` into start/end seconds. The file
    /// format uses a comma millisecond separator; internally everything is
    /// fractional seconds.
    fn parse_timecode(&self, line: &str) -> Option<(f64, f64)> {
        let caps = self.time_pattern.captures(line)?;

        let field = |i: usize| -> Option<f64> { caps[i].parse::<f64>().ok() };

        let start = field(1)? * 3600.0 + field(2)? * 60.0 + field(3)? + field(4)? / 1000.0;
        let end = field(5)? * 3600.0 + field(6)? * 60.0 + field(7)? + field(8)? / 1000.0;

        Some((start, end))
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a `Key: value` field line into its parts.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    // Field keys are single words; a colon mid-sentence is transcript text.
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, value.trim()))
}

/// Format seconds as a `hh:mm:ss,mmm` timecode.
pub fn format_timecode(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, ms)
}

/// Serialize segments to the record format, numbered contiguously from 1.
pub fn serialize_script(segments: &[Segment]) -> String {
    let mut out = String::new();

    for (i, segment) in segments.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_timecode(segment.start),
            format_timecode(segment.end)
        ));
        out.push_str(&segment.source_file);
        out.push('\n');

        if let Some(q) = &segment.quality {
            out.push_str(&format!("Relevance: {:.2}\n", q.relevance));
            out.push_str(&format!("Sentiment: {:.2}\n", q.sentiment));
            out.push_str(&format!("Novelty: {:.2}\n", q.novelty));
            out.push_str(&format!("Energy: {:.2}\n", q.energy));
            out.push_str(&format!("Focus: {:.2}\n", q.focus));
            out.push_str(&format!("Clarity: {:.2}\n", q.clarity));
            out.push_str(&format!("Emotion: {:.2}\n", q.emotion));
            out.push_str(&format!("FlubScore: {:.2}\n", q.flub_score));
            out.push_str(&format!("CompositeScore: {:.2}\n", q.composite_score));
        }

        if let Some(speaker) = &segment.speaker_id {
            out.push_str(&format!("Speaker: {}\n", speaker));
        }
        if let Some(shot) = &segment.shot_label {
            out.push_str(&format!("Shot: {}\n", shot));
        }

        out.push_str(&segment.text);
        out.push_str("\n\n");
    }

    out
}

/// Parse a script file into segments.
pub fn parse_script(path: &Path) -> Result<Vec<Segment>> {
    RecordParser::new().parse_file(path)
}

/// Parse script content into segments.
pub fn parse_script_str(content: &str) -> Vec<Segment> {
    RecordParser::new().parse(content)
}

/// Write segments to a script file as one complete overwrite, so the file
/// always reflects exactly the given sequence.
pub fn write_script(path: &Path, segments: &[Segment]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, serialize_script(segments))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n\
00:00:01,000 --> 00:00:04,500\n\
clip_a.mp4\n\
Relevance: 80.00\n\
Sentiment: 55.00\n\
Novelty: 30.00\n\
Energy: 70.00\n\
Speaker: S1\n\
So we started the project back in March.\n\
\n\
2\n\
00:00:05,000 --> 00:00:06,250\n\
clip_a.mp4\n\
And it grew from there.\n";

    #[test]
    fn test_parse_basic() {
        let segments = parse_script_str(SAMPLE);
        assert_eq!(segments.len(), 2);

        let first = &segments[0];
        assert_eq!(first.source_file, "clip_a.mp4");
        assert!((first.start - 1.0).abs() < 1e-9);
        assert!((first.end - 4.5).abs() < 1e-9);
        assert_eq!(first.text, "So we started the project back in March.");
        assert_eq!(first.speaker_id.as_deref(), Some("S1"));

        let q = first.quality.as_ref().unwrap();
        assert_eq!(q.relevance, 80.0);
        assert_eq!(q.energy, 70.0);
        // Optional score lines absent default to 0.
        assert_eq!(q.flub_score, 0.0);

        // Second block carries no score lines at all.
        assert!(segments[1].quality.is_none());
    }

    #[test]
    fn test_parse_skips_garbage_lines() {
        let content = format!("WEBVTT header junk\nnot-a-number\n\n{}", SAMPLE);
        let segments = parse_script_str(&content);
        assert_eq!(segments.len(), 2);
    }

    #[test]
    fn test_parse_skips_malformed_block() {
        let content = "1\n00:00:01,000 --> BROKEN\nclip.mp4\ntext\n\n\
2\n00:00:02,000 --> 00:00:03,000\nclip.mp4\nsurvives\n";
        let segments = parse_script_str(content);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "survives");
    }

    #[test]
    fn test_zero_duration_block_skipped() {
        let content = "1\n00:00:05,000 --> 00:00:05,000\nclip.mp4\ntext\n";
        assert!(parse_script_str(content).is_empty());
    }

    #[test]
    fn test_colon_in_transcript_is_text() {
        let content =
            "1\n00:00:01,000 --> 00:00:02,000\nclip.mp4\nHe said: never again. Believe me: never.\n";
        let segments = parse_script_str(content);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].text.starts_with("He said:"));
    }

    #[test]
    fn test_round_trip() {
        let segments = parse_script_str(SAMPLE);
        let rendered = serialize_script(&segments);
        let reparsed = parse_script_str(&rendered);

        assert_eq!(reparsed.len(), segments.len());
        for (a, b) in segments.iter().zip(&reparsed) {
            assert_eq!(a.text, b.text);
            assert_eq!(a.source_file, b.source_file);
            assert!((a.start - b.start).abs() < 1e-3);
            assert!((a.end - b.end).abs() < 1e-3);
            assert_eq!(a.speaker_id, b.speaker_id);
        }
    }

    #[test]
    fn test_write_renumbers_from_one() {
        let mut segments = parse_script_str(SAMPLE);
        segments.reverse();
        let rendered = serialize_script(&segments);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "1");
        assert!(rendered.contains("\n2\n"));
    }

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(0.0), "00:00:00,000");
        assert_eq!(format_timecode(3661.5), "01:01:01,500");
        assert_eq!(format_timecode(12.345), "00:00:12,345");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.txt");

        let segments = parse_script_str(SAMPLE);
        write_script(&path, &segments).unwrap();
        let reparsed = parse_script(&path).unwrap();
        assert_eq!(reparsed.len(), 2);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = parse_script(Path::new("/nonexistent/script.txt")).unwrap_err();
        assert!(matches!(err, KlippError::ScriptNotFound(_)));
    }
}
