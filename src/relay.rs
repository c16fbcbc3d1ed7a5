//! # Relay run
//! One invocation advances at most one feed item:
//! load processed set → fetch feed → pick the first unknown item →
//! synthesize → publish → commit.
//!
//! The processed marker is written only after the work for that item is
//! confirmed (published, or deliberately nothing to publish). Every other exit
//! leaves the item eligible for the next run.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::ai::TextGenerator;
use crate::config::RelayConfig;
use crate::feed::FeedSource;
use crate::publish::{PostClient, ThreadPublisher};
use crate::store::{self, ProcessedStore, StoreError};
use crate::synth::{Synthesis, Thread, ThreadRequest, ThreadSynthesizer};

/// Conditions that end a run before any item is advanced.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("feed unavailable: {0:#}")]
    FeedUnavailable(anyhow::Error),
    #[error("processed set unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),
}

impl RelayError {
    pub fn exit_code(&self) -> u8 {
        match self {
            RelayError::Configuration(_) => 2,
            RelayError::FeedUnavailable(_) => 3,
            RelayError::StorageUnavailable(_) => 4,
        }
    }
}

/// How a run ended when no fatal condition occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every item in the feed is already processed.
    NoNewItem,
    /// Selected item has no summary; left for a later run.
    SkippedNoSummary { id: String },
    /// All synthesis attempts failed; left for a later run.
    SynthesisExhausted { id: String },
    /// Backend had nothing to say; committed without posting.
    CommittedWithoutThread { id: String },
    /// Backend had nothing to say and empty threads are not committed.
    LeftEmptyThread { id: String },
    Published { id: String, post_ids: Vec<String> },
    /// Publishing stopped; `posted` segments remain live, item uncommitted.
    PublishFailed {
        id: String,
        posted: Vec<String>,
        error: String,
    },
    /// Dry run: thread produced (or not) but nothing posted or committed.
    DryRun { id: String, thread: Option<Thread> },
}

impl RunOutcome {
    /// True when this run wrote a processed marker.
    pub fn committed(&self) -> bool {
        matches!(
            self,
            RunOutcome::CommittedWithoutThread { .. } | RunOutcome::Published { .. }
        )
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::NoNewItem
            | RunOutcome::CommittedWithoutThread { .. }
            | RunOutcome::Published { .. }
            | RunOutcome::DryRun { .. } => 0,
            RunOutcome::SkippedNoSummary { .. }
            | RunOutcome::SynthesisExhausted { .. }
            | RunOutcome::LeftEmptyThread { .. }
            | RunOutcome::PublishFailed { .. } => 5,
        }
    }
}

pub struct Relay {
    store: Arc<dyn ProcessedStore>,
    feed: Arc<dyn FeedSource>,
    synthesizer: ThreadSynthesizer,
    publisher: ThreadPublisher,
    backend_key_present: bool,
    commit_on_empty_thread: bool,
    dry_run: bool,
}

impl Relay {
    pub fn new(
        config: &RelayConfig,
        store: Arc<dyn ProcessedStore>,
        feed: Arc<dyn FeedSource>,
        generator: Arc<dyn TextGenerator>,
        poster: Arc<dyn PostClient>,
    ) -> Self {
        Self {
            store,
            feed,
            synthesizer: ThreadSynthesizer::new(generator, config.thread.clone(), &config.ai),
            publisher: ThreadPublisher::new(poster),
            backend_key_present: !config.ai.api_key.trim().is_empty(),
            commit_on_empty_thread: config.thread.commit_on_empty_thread,
            dry_run: false,
        }
    }

    /// Synthesize and log, but neither publish nor commit.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run one pass. `date` is the run stamp, `YYYY-MM-DD`.
    pub async fn run_once(&self, date: &str) -> Result<RunOutcome, RelayError> {
        if !self.backend_key_present {
            error!("generative backend key is missing (GOOGLE_API_KEY)");
            return Err(RelayError::Configuration(
                "generative backend key is missing".into(),
            ));
        }

        let processed = self.store.load().inspect_err(|e| {
            error!(error = %e, "cannot load processed set");
        })?;
        let items = self.feed.fetch().await.map_err(|e| {
            error!(error = %format!("{e:#}"), source = self.feed.name(), "cannot fetch feed");
            RelayError::FeedUnavailable(e)
        })?;
        info!(known = processed.len(), fetched = items.len(), "feed loaded");

        let mut fresh = items.iter().filter(|it| !processed.contains(&it.id));
        // An id the store cannot record would be selected and posted forever.
        let Some(item) = fresh.find(|it| {
            let ok = store::is_storable(&it.id);
            if !ok {
                warn!(item_id = ?it.id, title = %it.title, "identifier cannot be recorded; skipping");
            }
            ok
        }) else {
            info!("no new items");
            return Ok(RunOutcome::NoNewItem);
        };
        info!(item_id = %item.id, title = %item.title, "new item selected");

        let Some(summary) = item.summary.as_deref() else {
            warn!(item_id = %item.id, title = %item.title, "item has no summary; skipping");
            return Ok(RunOutcome::SkippedNoSummary {
                id: item.id.clone(),
            });
        };

        let request = ThreadRequest::new(item, summary, date);
        let thread = match self.synthesizer.synthesize(&request).await {
            Synthesis::Exhausted => {
                warn!(item_id = %item.id, title = %item.title, "synthesis failed; item left for next run");
                return Ok(RunOutcome::SynthesisExhausted {
                    id: item.id.clone(),
                });
            }
            Synthesis::NothingToSay if self.dry_run => {
                return Ok(RunOutcome::DryRun {
                    id: item.id.clone(),
                    thread: None,
                });
            }
            Synthesis::NothingToSay if self.commit_on_empty_thread => {
                self.store.commit(&item.id)?;
                info!(item_id = %item.id, title = %item.title, "no thread to post; item marked processed");
                return Ok(RunOutcome::CommittedWithoutThread {
                    id: item.id.clone(),
                });
            }
            Synthesis::NothingToSay => {
                warn!(item_id = %item.id, "no thread to post; item left uncommitted");
                return Ok(RunOutcome::LeftEmptyThread {
                    id: item.id.clone(),
                });
            }
            Synthesis::Thread(thread) => thread,
        };

        if self.dry_run {
            for (i, seg) in thread.segments().iter().enumerate() {
                info!(item_id = %item.id, segment = i + 1, text = %seg, "dry run segment");
            }
            return Ok(RunOutcome::DryRun {
                id: item.id.clone(),
                thread: Some(thread),
            });
        }

        match self.publisher.publish(&thread).await {
            Ok(report) => {
                self.store.commit(&item.id)?;
                info!(item_id = %item.id, title = %item.title, posts = report.post_ids.len(), "item published and marked processed");
                Ok(RunOutcome::Published {
                    id: item.id.clone(),
                    post_ids: report.post_ids,
                })
            }
            Err(failure) if failure.is_configuration() => {
                error!(item_id = %item.id, error = %failure, "platform credentials missing");
                Err(RelayError::Configuration(failure.to_string()))
            }
            Err(failure) => {
                warn!(
                    item_id = %item.id,
                    title = %item.title,
                    live = ?failure.posted,
                    error = %failure,
                    "publish failed; item left for next run"
                );
                Ok(RunOutcome::PublishFailed {
                    id: item.id.clone(),
                    error: failure.to_string(),
                    posted: failure.posted,
                })
            }
        }
    }
}
