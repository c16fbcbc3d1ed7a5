// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ai;
pub mod config;
pub mod feed;
pub mod publish;
pub mod relay;
pub mod store;
pub mod synth;

// ---- Re-exports for stable public API ----
pub use crate::config::RelayConfig;
pub use crate::relay::{Relay, RelayError, RunOutcome};

use std::sync::Arc;
use std::time::Duration;

use crate::ai::gemini::GeminiClient;
use crate::feed::rss::RssFeedSource;
use crate::publish::x::XClient;
use crate::store::FileProcessedStore;

/// Wire the production components (RSS feed, Gemini, X, processed file) from
/// one config value.
pub fn build_relay(config: &RelayConfig) -> anyhow::Result<Relay> {
    let feed = RssFeedSource::from_url(
        &config.feed_url,
        Duration::from_secs(config.feed_timeout_secs.max(1)),
    )?;
    let generator = GeminiClient::new(&config.ai)?;
    let poster = XClient::new(config.twitter.clone());
    let store = FileProcessedStore::new(&config.processed_path);

    tracing::info!(
        feed = %config.feed_url,
        processed = %config.processed_path.display(),
        model = %config.ai.model,
        ai_key_len = config.ai.api_key.len(),
        twitter_ready = config.twitter.is_complete(),
        "relay configured"
    );

    Ok(Relay::new(
        config,
        Arc::new(store),
        Arc::new(feed),
        Arc::new(generator),
        Arc::new(poster),
    ))
}
