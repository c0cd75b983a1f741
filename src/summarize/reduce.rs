//! Summary of summaries (reduce pass).

use super::map::SummaryUnit;
use crate::completion::{CompletionConfig, RateLimitedClient};
use crate::config::Prompts;
use crate::error::Result;
use crate::stage::write_atomic;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct MetaSummarizer {
    client: Arc<RateLimitedClient>,
    prompts: Arc<Prompts>,
    config: CompletionConfig,
}

impl MetaSummarizer {
    pub fn new(
        client: Arc<RateLimitedClient>,
        prompts: Arc<Prompts>,
        config: CompletionConfig,
    ) -> Self {
        Self {
            client,
            prompts,
            config,
        }
    }

    /// Join the units newline-separated, in index order, and trim the result.
    pub fn stitch(units: &[SummaryUnit]) -> String {
        let mut ordered: Vec<&SummaryUnit> = units.iter().collect();
        ordered.sort_by_key(|u| u.index);
        ordered
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    /// Request the final summary and write it to `output`.
    ///
    /// Returns `None` without contacting the service when there is nothing to
    /// summarize; `output` is left untouched in that case.
    #[instrument(skip(self, units), fields(units = units.len(), output = %output.display()))]
    pub async fn reduce(
        &self,
        units: &[SummaryUnit],
        course_title: &str,
        output: &Path,
    ) -> Result<Option<String>> {
        let stitched = Self::stitch(units);
        if stitched.is_empty() {
            warn!("No summary text to combine, skipping the final request");
            return Ok(None);
        }

        info!("Requesting summary of {} chunk summaries", units.len());
        let prompt = self.prompts.meta_prompt(course_title, &stitched);
        let summary = self.client.send(&prompt, &self.config).await?;

        write_atomic(output, &summary)?;
        info!("Final summary written to {}", output.display());

        Ok(Some(summary))
    }
}
