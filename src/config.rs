//! Configuration and settings management
//!
//! Loads settings from environment variables and config files and defines
//! the dispatcher timing constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default minimum pacing between outbound sends, in milliseconds.
pub const DEFAULT_PACING_MS: u64 = 1000;
/// Default per-recipient cooldown, in seconds.
pub const DEFAULT_COOLDOWN_SECS: u64 = 1;
/// Default dedup window for identical (recipient, text) pairs, in seconds.
pub const DEFAULT_DEDUP_SECS: u64 = 2;
/// Default outbound queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 200;
/// Default retry delay when the provider throttles without suggesting one,
/// in milliseconds.
pub const DEFAULT_RETRY_MS: u64 = 1000;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Directory with audio files served by the audio handler
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,

    /// Minimum delay between any two outbound sends (milliseconds)
    #[serde(default = "default_pacing_ms")]
    pub outbound_pacing_ms: u64,

    /// Per-recipient cooldown between admitted sends (seconds)
    #[serde(default = "default_cooldown_secs")]
    pub user_cooldown_secs: u64,

    /// Window during which identical (recipient, text) pairs are dropped (seconds)
    #[serde(default = "default_dedup_secs")]
    pub message_dedup_secs: u64,

    /// Outbound queue capacity; oldest items are evicted when full
    #[serde(default = "default_queue_capacity")]
    pub max_queue_size: usize,

    /// Retry delay when a throttled response carries no suggested delay
    /// (milliseconds)
    #[serde(default = "default_retry_ms")]
    pub throttle_retry_ms: u64,
}

fn default_audio_dir() -> String {
    "audio".to_string()
}

const fn default_pacing_ms() -> u64 {
    DEFAULT_PACING_MS
}

const fn default_cooldown_secs() -> u64 {
    DEFAULT_COOLDOWN_SECS
}

const fn default_dedup_secs() -> u64 {
    DEFAULT_DEDUP_SECS
}

const fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

const fn default_retry_ms() -> u64 {
    DEFAULT_RETRY_MS
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default").required(false))
            // Add in the current environment file
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of APP)
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Also add settings from environment variables directly (without prefix)
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Per-recipient cooldown as a [`Duration`].
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.user_cooldown_secs)
    }

    /// Dedup window as a [`Duration`].
    #[must_use]
    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.message_dedup_secs)
    }

    /// Pacing interval as a [`Duration`].
    #[must_use]
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.outbound_pacing_ms)
    }

    /// Fallback throttle retry delay as a [`Duration`].
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.throttle_retry_ms)
    }
}
