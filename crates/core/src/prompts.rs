//! Prompt Templates
//!
//! Templates are Markdown files keyed by file stem. Placeholders are written
//! as `{name}` and substituted in a single pass at render time, so braces inside
//! a substituted value are never treated as placeholders.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub const CONVERSATION_TURN: &str = "conversation_turn";
pub const EVALUATION: &str = "evaluation";

/// A named collection of prompt templates.
#[derive(Debug, Clone)]
pub struct PromptSet {
    prompts: HashMap<String, String>,
}

impl PromptSet {
    pub fn new(prompts: HashMap<String, String>) -> Self {
        Self { prompts }
    }

    /// The templates compiled into the crate.
    pub fn builtin() -> Self {
        let mut prompts = HashMap::new();
        prompts.insert(
            CONVERSATION_TURN.to_string(),
            include_str!("../prompts/conversation_turn.md").to_string(),
        );
        prompts.insert(
            EVALUATION.to_string(),
            include_str!("../prompts/evaluation.md").to_string(),
        );
        Self { prompts }
    }

    /// Loads every `*.md` file in `dir` on top of the built-in templates.
    pub fn load_overrides(dir: &Path) -> Result<Self> {
        let mut set = Self::builtin();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read prompts directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
                let prompt_key = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .context("Could not get file stem")?
                    .to_string();
                let content = std::fs::read_to_string(&path)?;
                info!(prompt = %prompt_key, path = %path.display(), "Loaded prompt override");
                set.prompts.insert(prompt_key, content);
            }
        }
        Ok(set)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.prompts.get(key).map(String::as_str)
    }

    /// Renders the template `key`, replacing each `{name}` with its value.
    ///
    /// Unknown placeholders are left as written.
    pub fn render(&self, key: &str, vars: &[(&str, &str)]) -> Result<String> {
        let template = self
            .get(key)
            .with_context(|| format!("Missing prompt template: '{}'", key))?;

        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let value = after.find('}').and_then(|close| {
                let name = &after[..close];
                vars.iter()
                    .find(|(var, _)| *var == name)
                    .map(|(_, value)| (*value, close))
            });
            match value {
                Some((value, close)) => {
                    rendered.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    rendered.push('{');
                    rest = after;
                }
            }
        }
        rendered.push_str(rest);
        Ok(rendered)
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::builtin()
    }
}
