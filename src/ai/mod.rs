//! Generative-text backend: a prompt goes in, raw text comes out.

pub mod gemini;

use anyhow::Result;

/// Raw answer of one backend call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    /// Concatenated text of the first candidate, if any.
    pub text: Option<String>,
    /// Provider-supplied reason when the prompt or answer was blocked.
    pub block_reason: Option<String>,
}

impl Generation {
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            text: Some(s.into()),
            block_reason: None,
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            text: None,
            block_reason: Some(reason.into()),
        }
    }

    /// Non-blank text, or `None`.
    pub fn usable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Transport/HTTP failures are errors; an empty or blocked answer is not.
    async fn generate(&self, prompt: &str) -> Result<Generation>;
    fn provider_name(&self) -> &'static str;
}
