//! CLI command implementations.

mod config;
mod media;
mod run;
mod summarize;
mod transcribe;

pub use config::run_config;
pub use media::{run_download, run_rip};
pub use run::run_pipeline;
pub use summarize::run_summarize;
pub use transcribe::run_transcribe;
