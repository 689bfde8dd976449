//! Reel command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::Result;
use std::path::Path;

/// Run the reel command: the full highlight path from raw pool to trimmed
/// script.
pub async fn run_reel(
    input: &Path,
    output: &Path,
    topic: Option<&str>,
    budget: Option<f64>,
    settings: Settings,
) -> Result<()> {
    let pipeline = Pipeline::new(settings)?;

    let spinner = Output::spinner("Building highlight reel...");
    let result = pipeline.build_reel(input, output, topic, budget).await;
    spinner.finish_and_clear();

    match result {
        Ok(summary) => {
            Output::success(&format!(
                "Reel complete: {} of {} segments selected",
                summary.segments_out, summary.segments_in
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
            Output::error(&format!("Reel build failed: {}", e));
            Err(anyhow::anyhow!("{}", e))
        }
    }
}
