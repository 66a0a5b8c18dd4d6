//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the constants shared by the bot and the download pipeline.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Port for the liveness HTTP endpoint
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path or name of the yt-dlp executable
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,
    /// Browser-exported cookie file passed to yt-dlp when it exists
    #[serde(default = "default_cookies_file")]
    pub cookies_file: String,
    /// Directory downloaded media is written to
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    /// Re-encode audio downloads to this format (e.g. `mp3`).
    /// Unset keeps whatever audio stream the source provides.
    pub audio_format: Option<String>,

    /// Number of downloads allowed to run at the same time
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
    /// Hard limit for a single yt-dlp run
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
    /// Largest file the bot will try to upload, in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,

    /// Idle lifetime of a pending link
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    /// Maximum number of pending links kept in memory
    #[serde(default = "default_session_max_entries")]
    pub session_max_entries: u64,

    /// Connect timeout of the Telegram HTTP client
    #[serde(default = "default_telegram_connect_timeout_secs")]
    pub telegram_connect_timeout_secs: u64,
    /// Request timeout of the Telegram HTTP client (covers uploads)
    #[serde(default = "default_telegram_request_timeout_secs")]
    pub telegram_request_timeout_secs: u64,
}

const fn default_port() -> u16 {
    8080
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

fn default_cookies_file() -> String {
    "cookies.txt".to_string()
}

fn default_download_dir() -> String {
    ".".to_string()
}

const fn default_max_concurrent_downloads() -> usize {
    2
}

const fn default_download_timeout_secs() -> u64 {
    900
}

const fn default_max_upload_mb() -> u64 {
    50
}

const fn default_session_ttl_secs() -> u64 {
    86_400
}

const fn default_session_max_entries() -> u64 {
    10_000
}

const fn default_telegram_connect_timeout_secs() -> u64 {
    30
}

const fn default_telegram_request_timeout_secs() -> u64 {
    300
}

/// Build the layered configuration source.
///
/// Later sources override earlier ones: `config/default`, `config/{RUN_MODE}`,
/// `config/local`, `APP__*` variables, then plain environment variables.
///
/// # Errors
///
/// Returns a `ConfigError` if a present config file cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // UPPER_SNAKE_CASE env vars map onto snake_case keys; empty values count as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_relay_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("TELEGRAM_TOKEN must be set");
    /// assert!(settings.port > 0);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the token is missing.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(build_config()?)
    }

    /// Deserialize and validate settings from an already built source.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a field has the wrong type, the token is
    /// missing or blank, or the worker limit is zero.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let settings: Self = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_token.trim().is_empty() {
            return Err(ConfigError::Message("TELEGRAM_TOKEN is empty".to_string()));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(ConfigError::Message(
                "MAX_CONCURRENT_DOWNLOADS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory downloads are written to
    #[must_use]
    pub fn download_dir(&self) -> PathBuf {
        PathBuf::from(&self.download_dir)
    }

    /// Location of the optional cookie file
    #[must_use]
    pub fn cookies_path(&self) -> PathBuf {
        PathBuf::from(&self.cookies_file)
    }

    /// Upload limit in bytes
    #[must_use]
    pub const fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }

    /// Timeout applied to one yt-dlp run
    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Idle TTL of a session entry
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Audio re-encode target, if configured and non-blank
    #[must_use]
    pub fn audio_format(&self) -> Option<&str> {
        self.audio_format
            .as_deref()
            .map(str::trim)
            .filter(|fmt| !fmt.is_empty())
    }
}

// Telegram API retry configuration
/// Maximum retry attempts for Telegram API calls
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff for Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Backoff ceiling for Telegram API retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;

/// Message length cap in UTF-16 code units; Telegram rejects more than 4096
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;
