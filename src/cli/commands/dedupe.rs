//! Dedupe command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Run the dedupe command.
pub async fn run_dedupe(
    input: &Path,
    output: Option<PathBuf>,
    topic: Option<&str>,
    settings: Settings,
) -> Result<()> {
    let pipeline = Pipeline::new(settings)?;
    let output = output.unwrap_or_else(|| input.to_path_buf());

    let spinner = Output::spinner("Clustering takes...");
    let result = pipeline.dedupe_file(input, &output, topic).await;
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            let removed = summary.segments_in - summary.segments_out;
            Output::success(&format!(
                "Kept {} canonical takes ({} duplicates removed)",
                summary.segments_out, removed
            ));
            Output::stage_summary(
                summary.segments_in,
                summary.segments_out,
                summary.total_duration_seconds,
                &summary.output.display().to_string(),
            );
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Deduplication failed: {}", e));
            Err(anyhow::anyhow!("{}", e))
        }
    }
}
