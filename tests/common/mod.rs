// tests/common/mod.rs
// Scripted doubles for the relay's external collaborators.
#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use feed_thread_relay::ai::{Generation, TextGenerator};
use feed_thread_relay::config::RelayConfig;
use feed_thread_relay::feed::{FeedItem, FeedSource};
use feed_thread_relay::publish::{PostClient, PublishError};
use feed_thread_relay::store::{ProcessedStore, StoreError};
use feed_thread_relay::Relay;

pub const DATE: &str = "2025-03-01";

pub fn item(id: &str, title: &str) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        title: title.to_string(),
        link: format!("https://papers.example/{id}"),
        summary: Some(format!("Abstract of {title}.")),
    }
}

/// Backend answer that satisfies the default thread rules for `it`.
pub fn valid_answer(it: &FeedItem, segments: usize) -> String {
    let n = segments.max(1);
    let mut thread = vec![format!(
        "오늘의 AI 논문 ({DATE}): {}\n\n{} (1/{n})",
        it.title, it.link
    )];
    for i in 2..n {
        thread.push(format!("Point number {i}. ({i}/{n})"));
    }
    if n > 1 {
        thread.push(format!("Wrap-up. #AI #ML #논문요약 ({n}/{n})"));
    } else {
        thread[0].push_str(" #AI #ML #논문요약");
    }
    serde_json::json!({ "twitter_thread": thread }).to_string()
}

/// Config with a backend key so the start check passes.
pub fn config() -> RelayConfig {
    let mut cfg = RelayConfig::default();
    cfg.ai.api_key = "test-key".into();
    cfg
}

// ---------------- generator ----------------

pub struct ScriptedGenerator {
    script: Mutex<VecDeque<anyhow::Result<Generation>>>,
    pub prompts: Mutex<Vec<String>>,
    pub call_times: Mutex<Vec<tokio::time::Instant>>,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<anyhow::Result<Generation>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
            call_times: Mutex::new(Vec::new()),
        })
    }

    pub fn texts(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|t| Ok(Generation::text(*t))).collect())
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<Generation> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.call_times
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Generation::default()))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

// ---------------- post client ----------------

/// Records every post; fails the call with the given 1-based number.
pub struct RecordingPoster {
    pub posts: Mutex<Vec<(String, Option<String>)>>,
    fail_on_call: Option<usize>,
    credentials_ok: bool,
    next_id: AtomicUsize,
}

impl RecordingPoster {
    pub fn ok() -> Arc<Self> {
        Self::build(None, true)
    }

    pub fn failing_on(call: usize) -> Arc<Self> {
        Self::build(Some(call), true)
    }

    pub fn without_credentials() -> Arc<Self> {
        Self::build(None, false)
    }

    fn build(fail_on_call: Option<usize>, credentials_ok: bool) -> Arc<Self> {
        Arc::new(Self {
            posts: Mutex::new(Vec::new()),
            fail_on_call,
            credentials_ok,
            next_id: AtomicUsize::new(100),
        })
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl PostClient for RecordingPoster {
    fn check_credentials(&self) -> Result<(), PublishError> {
        if self.credentials_ok {
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
        let call = self.next_id.load(Ordering::SeqCst) - 99;
        if self.fail_on_call == Some(call) {
            self.next_id.fetch_add(1, Ordering::SeqCst);
            return Err(PublishError::Status {
                status: 503,
                body: "service unavailable".into(),
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.posts
            .lock()
            .unwrap()
            .push((text.to_string(), in_reply_to.map(str::to_string)));
        Ok(id)
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

// ---------------- store ----------------

#[derive(Default)]
pub struct MemoryStore {
    pub known: Mutex<HashSet<String>>,
    pub commits: Mutex<Vec<String>>,
    pub loads: AtomicUsize,
    pub unreadable: bool,
}

impl MemoryStore {
    pub fn with(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            known: Mutex::new(ids.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        })
    }

    pub fn unreadable() -> Arc<Self> {
        Arc::new(Self {
            unreadable: true,
            ..Default::default()
        })
    }

    pub fn commits(&self) -> Vec<String> {
        self.commits.lock().unwrap().clone()
    }
}

impl ProcessedStore for MemoryStore {
    fn load(&self) -> Result<HashSet<String>, StoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.unreadable {
            return Err(StoreError::Read {
                path: "memory".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            });
        }
        Ok(self.known.lock().unwrap().clone())
    }

    fn commit(&self, id: &str) -> Result<(), StoreError> {
        self.known.lock().unwrap().insert(id.to_string());
        self.commits.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

// ---------------- feed ----------------

pub struct StaticFeed {
    items: Option<Vec<FeedItem>>,
    pub fetches: AtomicUsize,
}

impl StaticFeed {
    pub fn new(items: Vec<FeedItem>) -> Arc<Self> {
        Arc::new(Self {
            items: Some(items),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn down() -> Arc<Self> {
        Arc::new(Self {
            items: None,
            fetches: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl FeedSource for StaticFeed {
    async fn fetch(&self) -> anyhow::Result<Vec<FeedItem>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.items
            .clone()
            .ok_or_else(|| anyhow::anyhow!("connection refused"))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

pub fn relay(
    cfg: &RelayConfig,
    store: &Arc<MemoryStore>,
    feed: &Arc<StaticFeed>,
    generator: &Arc<ScriptedGenerator>,
    poster: &Arc<RecordingPoster>,
) -> Relay {
    Relay::new(
        cfg,
        store.clone(),
        feed.clone(),
        generator.clone(),
        poster.clone(),
    )
}
