//! Yoyaku CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use yoyaku::cli::{commands, Cli, Commands};
use yoyaku::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging: RUST_LOG, then -v, then the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("yoyaku={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Run {
            input,
            title,
            overwrite,
            cleanup,
        } => {
            commands::run_pipeline(input, title, *overwrite, *cleanup, settings).await?;
        }

        Commands::Download { input, overwrite } => {
            commands::run_download(input, *overwrite, settings).await?;
        }

        Commands::Rip { media, overwrite } => {
            commands::run_rip(media, *overwrite, settings).await?;
        }

        Commands::Transcribe {
            audio,
            language,
            overwrite,
        } => {
            commands::run_transcribe(audio, language.clone(), *overwrite, settings).await?;
        }

        Commands::Summarize {
            transcript,
            title,
            chunks_only,
            overwrite,
            cleanup,
        } => {
            commands::run_summarize(transcript, title, *chunks_only, *overwrite, *cleanup, settings)
                .await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}
