//! Prompt templates for Yoyaku.
//!
//! Prompts can be customized by placing a `summary.toml` in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder pattern"));

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub summary: SummaryPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the map and reduce passes.
///
/// Available variables:
/// - `chunk`: `{{index}}` (1-based), `{{total}}`, `{{title}}`, `{{text}}`
/// - `meta`: `{{title}}`, `{{summaries}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    pub system: String,
    pub chunk: String,
    pub meta: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            system: "This is text summarization.".to_string(),

            chunk: r#"The following is snippet {{index}} of {{total}}, of a Japanese language transcript of an online course titled "{{title}}". Summarize it. Pay attention to any especially important parts, and include those in your summary. Do not include the course title in your summary.

{{text}}"#
                .to_string(),

            meta: r#"The following is a list of summaries of an online course titled "{{title}}". Extract between 10 to 20 bullet points of important, interesting, useful, or notable information:

{{summaries}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                let content = std::fs::read_to_string(&summary_path)?;
                prompts.summary = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are replaced in a single pass over the template, so
    /// `{{name}}` text inside a substituted value is left as written.
    /// Unknown placeholders are kept.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }

    /// Render the per-chunk prompt.
    pub fn chunk_prompt(&self, index: usize, total: usize, title: &str, text: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("index".to_string(), index.to_string());
        vars.insert("total".to_string(), total.to_string());
        vars.insert("title".to_string(), title.to_string());
        vars.insert("text".to_string(), text.to_string());
        self.render_with_custom(&self.summary.chunk, &vars)
    }

    /// Render the summary-of-summaries prompt.
    pub fn meta_prompt(&self, title: &str, summaries: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("title".to_string(), title.to_string());
        vars.insert("summaries".to_string(), summaries.to_string());
        self.render_with_custom(&self.summary.meta, &vars)
    }
}
