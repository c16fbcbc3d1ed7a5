pub mod relay;

pub use relay::{AiSettings, ConfigError, RelayConfig, ThreadRules, TwitterCredentials};
