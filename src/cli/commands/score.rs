//! Score command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Run the score command.
pub async fn run_score(
    input: &Path,
    output: Option<PathBuf>,
    topic: Option<&str>,
    settings: Settings,
) -> Result<()> {
    let pipeline = Pipeline::new(settings)?;
    let output = output.unwrap_or_else(|| input.to_path_buf());

    let spinner = Output::spinner("Scoring segments...");
    let result = pipeline.score_file(input, &output, topic).await;
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            Output::success(&format!("Scored {} segments", summary.segments_out));
            Output::stage_summary(
                summary.segments_in,
                summary.segments_out,
                summary.total_duration_seconds,
                &summary.output.display().to_string(),
            );
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Scoring failed: {}", e));
            Err(anyhow::anyhow!("{}", e))
        }
    }
}
