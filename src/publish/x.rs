use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::oauth::{authorization_header, Nonce};
use super::{PostClient, PublishError};
use crate::config::TwitterCredentials;

/// X (Twitter) API v2 client posting with OAuth 1.0a user context.
#[derive(Clone)]
pub struct XClient {
    creds: TwitterCredentials,
    client: Client,
    timeout: Duration,
}

impl XClient {
    pub fn new(creds: TwitterCredentials) -> Self {
        Self {
            creds,
            client: Client::new(),
            timeout: Duration::from_secs(15),
        }
    }

    fn tweets_url(&self) -> String {
        format!("{}/2/tweets", self.creds.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct Reply<'a> {
    in_reply_to_tweet_id: &'a str,
}

#[derive(Serialize)]
struct CreateTweet<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<Reply<'a>>,
}

#[derive(Deserialize)]
struct CreateTweetResp {
    data: Option<CreatedTweet>,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}

#[async_trait::async_trait]
impl PostClient for XClient {
    fn check_credentials(&self) -> Result<(), PublishError> {
        if self.creds.is_complete() {
            Ok(())
        } else {
            Err(PublishError::MissingCredentials)
        }
    }

    async fn create_post(
        &self,
        text: &str,
        in_reply_to: Option<&str>,
    ) -> Result<String, PublishError> {
        self.check_credentials()?;
        let url = self.tweets_url();
        let auth = authorization_header(&self.creds, "POST", &url, &[], &Nonce::fresh());
        let body = CreateTweet {
            text,
            reply: in_reply_to.map(|id| Reply {
                in_reply_to_tweet_id: id,
            }),
        };

        let rsp = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(&body)
            .send()
            .await?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(PublishError::Status {
                status: status.as_u16(),
                body: body.chars().take(300).collect(),
            });
        }

        let parsed: CreateTweetResp = rsp
            .json()
            .await
            .map_err(|e| PublishError::Decode(e.to_string()))?;
        let id = parsed
            .data
            .map(|d| d.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PublishError::Decode("response has no data.id".into()))?;
        tracing::debug!(post_id = %id, "post live at https://x.com/i/status/{id}");
        Ok(id)
    }

    fn name(&self) -> &'static str {
        "x"
    }
}
