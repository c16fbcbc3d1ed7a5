// src/feed/mod.rs
pub mod rss;

use anyhow::Result;

/// Longest summary handed to the generative backend.
pub const SUMMARY_MAX_CHARS: usize = 4000;

/// One candidate entry of the polled feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub id: String, // guid/id, or the link when the feed has none
    pub title: String,
    pub link: String,
    pub summary: Option<String>, // None => nothing to summarize
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Items in upstream order. Errors mean the feed is unavailable for this run.
    async fn fetch(&self) -> Result<Vec<FeedItem>>;
    fn name(&self) -> &'static str;
}

/// Normalize summary text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap
    if out.chars().count() > SUMMARY_MAX_CHARS {
        out = out.chars().take(SUMMARY_MAX_CHARS).collect();
    }

    out
}

/// Build an item from raw feed fields. Returns `None` when neither an id nor a
/// link is present, since such an entry could never be deduplicated.
pub fn item_from_parts(
    id: Option<&str>,
    title: Option<&str>,
    link: Option<&str>,
    summary: Option<&str>,
) -> Option<FeedItem> {
    let link = link.map(str::trim).unwrap_or_default().to_string();
    let id = id
        .map(single_line)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| single_line(&link));
    if id.is_empty() {
        return None;
    }
    let title = title.map(normalize_text).unwrap_or_default();
    let summary = summary.map(normalize_text).filter(|s| !s.is_empty());
    Some(FeedItem {
        id,
        title,
        link,
        summary,
    })
}

/// Identifiers are stored one per line; fold wrapped ones onto a single line.
fn single_line(s: &str) -> String {
    s.split(['\r', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
