// src/config/relay.rs
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const DEFAULT_CONFIG_PATH: &str = "config/relay.toml";
pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const ENV_FEED_URL: &str = "RELAY_FEED_URL";
pub const ENV_PROCESSED_PATH: &str = "RELAY_PROCESSED_PATH";

pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_TWITTER_API_KEY: &str = "TWITTER_API_KEY";
pub const ENV_TWITTER_API_SECRET: &str = "TWITTER_API_SECRET";
pub const ENV_TWITTER_ACCESS_TOKEN: &str = "TWITTER_ACCESS_TOKEN";
pub const ENV_TWITTER_ACCESS_TOKEN_SECRET: &str = "TWITTER_ACCESS_TOKEN_SECRET";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("RELAY_CONFIG_PATH points to non-existent path {}", .0.display())]
    MissingFile(PathBuf),
}

fn default_feed_url() -> String {
    "https://tldr.takara.ai/api/papers".to_string()
}
fn default_processed_path() -> PathBuf {
    PathBuf::from("processed_posts.txt")
}
fn default_feed_timeout_secs() -> u64 {
    15
}

/// Top-level settings handed to every component constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    #[serde(default = "default_processed_path")]
    pub processed_path: PathBuf,
    #[serde(default = "default_feed_timeout_secs")]
    pub feed_timeout_secs: u64,
    #[serde(default)]
    pub ai: AiSettings,
    #[serde(default)]
    pub thread: ThreadRules,
    #[serde(default)]
    pub twitter: TwitterCredentials,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            processed_path: default_processed_path(),
            feed_timeout_secs: default_feed_timeout_secs(),
            ai: AiSettings::default(),
            thread: ThreadRules::default(),
            twitter: TwitterCredentials::default(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    2
}
fn default_ai_timeout_secs() -> u64 {
    60
}

/// Generative backend settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct AiSettings {
    /// "ENV" (or empty) means: read from GOOGLE_API_KEY.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_ai_base_url(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            timeout_secs: default_ai_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiSettings")
            .field("api_key_len", &self.api_key.len())
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AiSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

fn default_language() -> String {
    "Korean".to_string()
}
fn default_headline() -> String {
    "오늘의 AI 논문".to_string()
}
fn default_hashtags() -> Vec<String> {
    vec!["#AI".into(), "#ML".into(), "#논문요약".into()]
}
fn default_max_chars() -> usize {
    280
}
fn default_commit_on_empty() -> bool {
    true
}

/// Output contract for a synthesized thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadRules {
    #[serde(default = "default_language")]
    pub language: String,
    /// Leading words of the first segment: "{headline} ({date}): {title}".
    #[serde(default = "default_headline")]
    pub headline: String,
    #[serde(default = "default_hashtags")]
    pub hashtags: Vec<String>,
    /// Per-segment ceiling in the platform's weighted length (CJK counts 2,
    /// links 23).
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Commit an item whose backend answer carried no thread at all.
    #[serde(default = "default_commit_on_empty")]
    pub commit_on_empty_thread: bool,
}

impl Default for ThreadRules {
    fn default() -> Self {
        Self {
            language: default_language(),
            headline: default_headline(),
            hashtags: default_hashtags(),
            max_chars: default_max_chars(),
            commit_on_empty_thread: default_commit_on_empty(),
        }
    }
}

fn default_twitter_base_url() -> String {
    "https://api.twitter.com".to_string()
}

/// OAuth 1.0a user-context credentials for X.
#[derive(Clone, Serialize, Deserialize)]
pub struct TwitterCredentials {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub access_token_secret: String,
    #[serde(default = "default_twitter_base_url")]
    pub base_url: String,
}

impl Default for TwitterCredentials {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            access_token: String::new(),
            access_token_secret: String::new(),
            base_url: default_twitter_base_url(),
        }
    }
}

impl TwitterCredentials {
    /// All four secrets must be non-empty.
    pub fn is_complete(&self) -> bool {
        [
            &self.api_key,
            &self.api_secret,
            &self.access_token,
            &self.access_token_secret,
        ]
        .iter()
        .all(|s| !s.trim().is_empty())
    }
}

// Never print secrets; lengths are enough for diagnostics.
impl std::fmt::Debug for TwitterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterCredentials")
            .field("api_key_len", &self.api_key.len())
            .field("api_secret_len", &self.api_secret.len())
            .field("access_token_len", &self.access_token.len())
            .field("access_token_secret_len", &self.access_token_secret.len())
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl RelayConfig {
    /// Parse a TOML file and resolve secrets/overrides from the environment.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_toml_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(cfg.resolved())
    }

    /// Load config using env var + fallbacks:
    /// 1) $RELAY_CONFIG_PATH
    /// 2) config/relay.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(ConfigError::MissingFile(pb));
            }
            return Self::load_from_file(&pb);
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from_file(&fallback);
        }
        Ok(Self::default().resolved())
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Fill "ENV"/empty secrets from the environment, apply path overrides and
    /// clamp values that would make the pipeline meaningless.
    pub fn resolved(mut self) -> Self {
        if let Ok(url) = env::var(ENV_FEED_URL) {
            if !url.trim().is_empty() {
                self.feed_url = url.trim().to_string();
            }
        }
        if let Ok(p) = env::var(ENV_PROCESSED_PATH) {
            if !p.trim().is_empty() {
                self.processed_path = PathBuf::from(p.trim());
            }
        }

        resolve_secret(&mut self.ai.api_key, ENV_GOOGLE_API_KEY);
        resolve_secret(&mut self.twitter.api_key, ENV_TWITTER_API_KEY);
        resolve_secret(&mut self.twitter.api_secret, ENV_TWITTER_API_SECRET);
        resolve_secret(&mut self.twitter.access_token, ENV_TWITTER_ACCESS_TOKEN);
        resolve_secret(
            &mut self.twitter.access_token_secret,
            ENV_TWITTER_ACCESS_TOKEN_SECRET,
        );

        if self.ai.max_attempts == 0 {
            self.ai.max_attempts = default_max_attempts();
        }
        if self.thread.max_chars == 0 {
            self.thread.max_chars = default_max_chars();
        }
        self.thread.hashtags.retain(|t| !t.trim().is_empty());
        self
    }
}

fn resolve_secret(slot: &mut String, var: &str) {
    let t = slot.trim();
    if t.is_empty() || t.eq_ignore_ascii_case("env") {
        *slot = env::var(var).map(|v| v.trim().to_string()).unwrap_or_default();
    }
}
