//! Query pipeline types.

use ragline_core::config::LlmSettings;
use serde::{Deserialize, Serialize};

/// Generation parameters passed to the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl AnswerOptions {
    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

/// Contexts retrieved for a question, best match first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContexts {
    pub contexts: Vec<String>,

    /// Source of each context, aligned with `contexts`
    pub sources: Vec<String>,
}

impl RetrievedContexts {
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Sources without duplicates, in first-occurrence order.
    pub fn unique_sources(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.sources
            .iter()
            .filter(|s| seen.insert(s.as_str()))
            .cloned()
            .collect()
    }
}
