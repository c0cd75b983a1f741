//! Run command: every stage end to end.

use crate::cli::output::format_duration;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::media::MediaInput;
use crate::pipeline::{Pipeline, RunOptions};
use anyhow::Result;

/// Run the full pipeline for one lecture.
pub async fn run_pipeline(
    input: &str,
    title: &str,
    overwrite: bool,
    cleanup: bool,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Run, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let input = MediaInput::parse(input)?;
    Output::info(&format!("Processing: {} ({})", title, input.base_name()));

    let pipeline = Pipeline::new(settings)?;
    let report = match pipeline
        .run(&input, title, RunOptions { overwrite, cleanup })
        .await
    {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("Run failed: {}", e));
            Output::info("Rerun the same command to resume from the last finished stage.");
            return Err(e.into());
        }
    };

    Output::header("Stages");
    Output::artifact(&report.media);
    Output::artifact(&report.audio);
    Output::artifact(&report.transcript);

    if report.retries.retries > 0 {
        Output::kv(
            "Rate limited",
            &format!(
                "{} times, waited {}",
                report.retries.retries,
                format_duration(report.retries.seconds_waited)
            ),
        );
    }

    match &report.summary.path {
        Some(path) => {
            Output::header("Summary");
            println!("{}\n", report.summary.text);
            Output::success(&format!("Summary written to {}", path.display()));
        }
        None => Output::warning("The transcript was empty, no summary was written."),
    }

    Ok(())
}
