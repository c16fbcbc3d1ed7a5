//! Thread publisher: posts segments as a strict linear reply chain.
//!
//! Publishing stops at the first failed post. Segments already posted stay
//! live; the failure reports their ids so the caller can log them.

pub mod oauth;
pub mod x;

use std::sync::Arc;
use tracing::{info, warn};

use crate::synth::Thread;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("platform credentials are missing or incomplete")]
    MissingCredentials,
    #[error("post request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("platform rejected post with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected platform response: {0}")]
    Decode(String),
}

/// Social platform that can create a post, optionally as a reply.
#[async_trait::async_trait]
pub trait PostClient: Send + Sync {
    /// Cheap local check run once before the first post.
    fn check_credentials(&self) -> Result<(), PublishError> {
        Ok(())
    }
    /// Returns the id of the created post.
    async fn create_post(&self, text: &str, in_reply_to: Option<&str>)
        -> Result<String, PublishError>;
    fn name(&self) -> &'static str;
}

/// Every segment made it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub post_ids: Vec<String>,
}

/// Publishing stopped early.
#[derive(Debug, thiserror::Error)]
#[error("segment {failed_segment} of {total} not posted ({} already live): {error}", posted.len())]
pub struct PublishFailure {
    /// Ids of segments that are live, in thread order.
    pub posted: Vec<String>,
    /// 1-based index of the segment that failed.
    pub failed_segment: usize,
    pub total: usize,
    #[source]
    pub error: PublishError,
}

impl PublishFailure {
    pub fn is_configuration(&self) -> bool {
        matches!(self.error, PublishError::MissingCredentials)
    }
}

#[derive(Clone)]
pub struct ThreadPublisher {
    client: Arc<dyn PostClient>,
}

impl ThreadPublisher {
    pub fn new(client: Arc<dyn PostClient>) -> Self {
        Self { client }
    }

    pub async fn publish(&self, thread: &Thread) -> Result<PublishReport, PublishFailure> {
        let total = thread.len();
        if let Err(error) = self.client.check_credentials() {
            return Err(PublishFailure {
                posted: Vec::new(),
                failed_segment: 1,
                total,
                error,
            });
        }

        let mut posted: Vec<String> = Vec::with_capacity(total);
        for (i, text) in thread.segments().iter().enumerate() {
            let segment = i + 1;
            let parent = posted.last().map(String::as_str);
            info!(segment, total, platform = self.client.name(), "posting segment");
            match self.client.create_post(text, parent).await {
                Ok(id) => {
                    info!(segment, post_id = %id, "segment posted");
                    posted.push(id);
                }
                Err(error) => {
                    warn!(segment, total, live = ?posted, error = %error, "publishing stopped");
                    return Err(PublishFailure {
                        posted,
                        failed_segment: segment,
                        total,
                        error,
                    });
                }
            }
        }
        Ok(PublishReport { post_ids: posted })
    }
}
