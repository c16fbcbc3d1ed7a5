//! Thread synthesizer: turns one feed item into a validated thread through the
//! generative backend, with a bounded number of attempts.
//!
//! Every attempt either yields a usable answer or a [`SoftFailure`]. Soft
//! failures are logged and retried after a fixed delay; when the attempts run
//! out the caller gets [`Synthesis::Exhausted`], never an error.

pub mod extract;
pub mod prompt;
pub mod validate;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ai::TextGenerator;
use crate::config::{AiSettings, ThreadRules};
use crate::feed::FeedItem;

pub use extract::{extract_json_object, parse_thread_payload, ThreadPayload};
pub use validate::{validate_thread, ContractViolation};

/// Input of one synthesis call.
#[derive(Debug, Clone, Copy)]
pub struct ThreadRequest<'a> {
    pub item: &'a FeedItem,
    pub summary: &'a str,
    /// Run date stamp, `YYYY-MM-DD`.
    pub date: &'a str,
}

impl<'a> ThreadRequest<'a> {
    pub fn new(item: &'a FeedItem, summary: &'a str, date: &'a str) -> Self {
        Self {
            item,
            summary,
            date,
        }
    }
}

/// Expected opening of the first segment, before the link.
pub fn first_segment_head(req: &ThreadRequest<'_>, rules: &ThreadRules) -> String {
    format!("{} ({}): {}", rules.headline, req.date, req.item.title)
}

/// Ordered, validated, non-empty list of posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    segments: Vec<String>,
}

impl Thread {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Build a thread without contract checks (publisher-side callers and tests).
    pub fn from_segments(segments: Vec<String>) -> Option<Self> {
        if segments.is_empty() {
            None
        } else {
            Some(Self { segments })
        }
    }
}

/// Final result of [`ThreadSynthesizer::synthesize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesis {
    Thread(Thread),
    /// The backend answered with valid JSON but no thread in it.
    NothingToSay,
    /// Every attempt failed.
    Exhausted,
}

/// Per-attempt failure; triggers a retry.
#[derive(Debug, thiserror::Error)]
pub enum SoftFailure {
    #[error("backend call failed: {0:#}")]
    Backend(anyhow::Error),
    #[error("backend returned an empty response")]
    Empty,
    #[error("backend response was blocked: {0}")]
    Blocked(String),
    #[error("no JSON object found in response")]
    NoJsonObject,
    #[error("response JSON does not parse: {0}")]
    InvalidJson(String),
    #[error("unexpected response shape: {0}")]
    WrongShape(&'static str),
    #[error("thread breaks the output contract: {0}")]
    Contract(#[from] ContractViolation),
}

pub struct ThreadSynthesizer {
    generator: Arc<dyn TextGenerator>,
    rules: ThreadRules,
    max_attempts: u32,
    retry_delay: Duration,
}

impl ThreadSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>, rules: ThreadRules, ai: &AiSettings) -> Self {
        Self {
            generator,
            rules,
            max_attempts: ai.max_attempts.max(1),
            retry_delay: ai.retry_delay(),
        }
    }

    pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn rules(&self) -> &ThreadRules {
        &self.rules
    }

    pub async fn synthesize(&self, req: &ThreadRequest<'_>) -> Synthesis {
        let prompt = prompt::build_prompt(req, &self.rules);
        let provider = self.generator.provider_name();

        for attempt in 1..=self.max_attempts {
            match self.attempt(&prompt, req).await {
                Ok(ThreadPayload::Segments(segments)) => {
                    let unmarked = validate::missing_position_markers(&segments);
                    if !unmarked.is_empty() {
                        warn!(item_id = %req.item.id, segments = ?unmarked, "thread segments without position marker");
                    }
                    info!(item_id = %req.item.id, attempt, segments = segments.len(), provider, "thread synthesized");
                    return Synthesis::Thread(Thread { segments });
                }
                Ok(ThreadPayload::Missing) => {
                    info!(item_id = %req.item.id, attempt, provider, "backend produced no thread");
                    return Synthesis::NothingToSay;
                }
                Err(e) => {
                    warn!(
                        item_id = %req.item.id,
                        title = %req.item.title,
                        attempt,
                        max_attempts = self.max_attempts,
                        provider,
                        error = %e,
                        "synthesis attempt failed"
                    );
                }
            }

            if attempt < self.max_attempts {
                info!(delay_ms = self.retry_delay.as_millis() as u64, "retrying synthesis");
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        warn!(item_id = %req.item.id, attempts = self.max_attempts, "synthesis exhausted");
        Synthesis::Exhausted
    }

    async fn attempt(
        &self,
        prompt: &str,
        req: &ThreadRequest<'_>,
    ) -> Result<ThreadPayload, SoftFailure> {
        let generation = self
            .generator
            .generate(prompt)
            .await
            .map_err(SoftFailure::Backend)?;

        let Some(text) = generation.usable_text() else {
            return Err(match generation.block_reason.clone() {
                Some(reason) => SoftFailure::Blocked(reason),
                None => SoftFailure::Empty,
            });
        };

        let payload = parse_thread_payload(text).inspect_err(|_| {
            let snippet: String = text.chars().take(500).collect();
            debug!(response = %snippet, "unusable backend response");
        })?;
        if let ThreadPayload::Segments(segments) = &payload {
            validate_thread(segments, req, &self.rules)?;
        }
        Ok(payload)
    }
}
