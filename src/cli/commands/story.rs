//! Story command implementation.

use super::ctrl_c_token;
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;
use std::path::Path;

/// Run the story command.
pub async fn run_story(input: &Path, output: &Path, settings: Settings) -> Result<()> {
    let pipeline = Pipeline::new(settings)?;
    let cancel = ctrl_c_token();

    let spinner = Output::spinner("Sequencing story...");
    let result = pipeline.sequence_story(input, output, &cancel).await;
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            if cancel.is_cancelled() {
                Output::warning("Cancelled; remaining segments were appended unordered.");
            }
            Output::success(&format!(
                "Sequenced {} segments into story order",
                summary.segments_out
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
            Output::error(&format!("Story sequencing failed: {}", e));
            Err(anyhow::anyhow!("{}", e))
        }
    }
}
