use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;

use crate::feed::{item_from_parts, FeedItem, FeedSource};

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    guid: Option<Text>,
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
}

// --- Atom ---

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<Entry>,
}
#[derive(Debug, Deserialize)]
struct Entry {
    id: Option<String>,
    title: Option<Text>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    summary: Option<Text>,
    content: Option<Text>,
}
#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Element whose attributes we ignore (`guid isPermaLink`, `summary type`).
#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

impl Entry {
    fn alternate_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.link.first())
            .map(|l| l.href.as_str())
    }
}

pub struct RssFeedSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssFeedSource {
    /// Parse an in-memory document instead of hitting the network.
    pub fn from_fixture_str(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("feed-thread-relay/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        })
    }

    pub fn parse_items_from_str(s: &str) -> Result<Vec<FeedItem>> {
        let xml_clean = scrub_html_entities_for_xml(s);

        let rss_err = match from_str::<Rss>(&xml_clean) {
            Ok(rss) => {
                return Ok(rss
                    .channel
                    .item
                    .into_iter()
                    .filter_map(|it| {
                        item_from_parts(
                            it.guid.as_ref().map(|g| g.value.as_str()),
                            it.title.as_deref(),
                            it.link.as_deref(),
                            it.description.as_deref(),
                        )
                    })
                    .collect());
            }
            Err(e) => e,
        };

        // Only try Atom on documents that look like one; an HTML error page
        // would otherwise parse as an empty feed.
        if !xml_clean.contains("<feed") {
            return Err(rss_err).context("parsing rss xml");
        }
        let atom: AtomFeed = from_str(&xml_clean).context("parsing atom xml")?;
        Ok(atom
            .entry
            .iter()
            .filter_map(|e| {
                let summary = e
                    .summary
                    .as_ref()
                    .filter(|t| !t.value.trim().is_empty())
                    .or(e.content.as_ref())
                    .map(|t| t.value.as_str());
                item_from_parts(
                    e.id.as_deref(),
                    e.title.as_ref().map(|t| t.value.as_str()),
                    e.alternate_link(),
                    summary,
                )
            })
            .collect())
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch(&self) -> Result<Vec<FeedItem>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),
            Mode::Http { url, client } => {
                tracing::info!(%url, "fetching feed");
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .context("feed http get()")?
                    .error_for_status()
                    .context("feed non-2xx")?
                    .text()
                    .await
                    .context("feed http .text()")?;
                let items = Self::parse_items_from_str(&body)?;
                tracing::debug!(count = items.len(), "feed parsed");
                Ok(items)
            }
        }
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
