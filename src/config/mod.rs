//! Configuration management for tubethread
//!
//! This module handles loading and validating configuration from environment
//! variables, TOML files, and command-line overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::traversal::aggregator::ContentFilter;
use crate::traversal::limit::TimeLimit;
use crate::utils::retry::RetryConfig;
use crate::utils::validate_video_url;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// What to scrape and when to stop
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Browser launch settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Bounded wait timeouts
    #[serde(default)]
    pub waits: WaitConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scrape target, limits and filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Video page to read comments from
    #[serde(default)]
    pub target_url: String,

    /// Maximum number of comment threads (replies not counted).
    /// Defaults to the comment count the page advertises.
    #[serde(default)]
    pub thread_limit: Option<usize>,

    /// Case-insensitive regular expression; threads with no matching comment are skipped
    #[serde(default)]
    pub filter_pattern: Option<String>,

    /// Wall-clock limit for the run (all zero = none)
    #[serde(default)]
    pub time_limit: TimeLimit,
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,

    /// Explicit Chrome/Chromium executable
    pub chrome_path: Option<PathBuf>,

    /// Viewport width in pixels
    pub viewport_width: u32,

    /// Viewport height in pixels
    pub viewport_height: u32,

    /// Extra command-line arguments for Chrome
    pub chrome_args: Vec<String>,

    /// CDP request timeout in seconds
    pub navigation_timeout_secs: u64,
}

/// Bounded wait settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Wait for the title and comment count landmarks
    pub page_load_secs: u64,

    /// Wait for the next thread to render
    pub thread_secs: u64,

    /// Wait for a reply to render after expanding or loading more
    pub reply_secs: u64,

    /// Interval between element checks while waiting
    pub poll_interval_ms: u64,

    /// Hover pause before a click
    pub click_pause_ms: u64,

    /// Extra attempts for launching the browser and loading the page
    pub navigation_retries: u32,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,

    /// Write traversal step traces to a file
    pub diagnostics_enabled: bool,

    /// Destination of the step traces
    pub diagnostics_destination: PathBuf,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            viewport_width: 1920,
            viewport_height: 1080,
            chrome_args: Vec::new(),
            navigation_timeout_secs: 30,
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            page_load_secs: 10,
            thread_secs: 20,
            reply_secs: 20,
            poll_interval_ms: 100,
            click_pause_ms: 500,
            navigation_retries: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
            diagnostics_enabled: false,
            diagnostics_destination: PathBuf::from("debug.log"),
        }
    }
}

impl WaitConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_secs)
    }

    pub fn thread_timeout(&self) -> Duration {
        Duration::from_secs(self.thread_secs)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_secs(self.reply_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn click_pause(&self) -> Duration {
        Duration::from_millis(self.click_pause_ms)
    }

    /// Retry policy for launch and navigation
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.navigation_retries)
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let target_url = std::env::var("TUBETHREAD_URL").unwrap_or_default();

        let thread_limit = env_parse::<usize>("TUBETHREAD_THREAD_LIMIT");

        let filter_pattern = std::env::var("TUBETHREAD_FILTER")
            .ok()
            .filter(|p| !p.is_empty());

        let time_limit = TimeLimit {
            hours: env_parse("TUBETHREAD_HOURS").unwrap_or(0),
            minutes: env_parse("TUBETHREAD_MINUTES").unwrap_or(0),
            seconds: env_parse("TUBETHREAD_SECONDS").unwrap_or(0),
        };

        let headless = env_parse::<bool>("TUBETHREAD_HEADLESS").unwrap_or(defaults.browser.headless);

        let chrome_path = std::env::var("TUBETHREAD_CHROME_PATH").ok().map(PathBuf::from);

        let log_level =
            std::env::var("TUBETHREAD_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format =
            std::env::var("TUBETHREAD_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        let diagnostics_enabled = env_parse::<bool>("TUBETHREAD_DIAGNOSTICS").unwrap_or(false);

        let diagnostics_destination = std::env::var("TUBETHREAD_DIAGNOSTICS_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.logging.diagnostics_destination);

        Ok(Self {
            scrape: ScrapeConfig {
                target_url,
                thread_limit,
                filter_pattern,
                time_limit,
            },
            browser: BrowserConfig {
                headless,
                chrome_path,
                ..defaults.browser
            },
            waits: defaults.waits,
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
                diagnostics_enabled,
                diagnostics_destination,
            },
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.scrape.target_url.trim().is_empty() {
            anyhow::bail!("target_url is required");
        }

        validate_video_url(&self.scrape.target_url).context("Unsupported target_url")?;

        if let Some(pattern) = &self.scrape.filter_pattern {
            ContentFilter::new(pattern)
                .with_context(|| format!("Invalid filter_pattern: {pattern}"))?;
        }

        if self.scrape.time_limit.total_seconds().is_none() {
            let TimeLimit {
                hours,
                minutes,
                seconds,
            } = self.scrape.time_limit;
            anyhow::bail!("time_limit is too large: {hours}h {minutes}m {seconds}s");
        }

        if self.waits.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than 0");
        }

        if self.browser.viewport_width == 0 || self.browser.viewport_height == 0 {
            anyhow::bail!("viewport dimensions must be greater than 0");
        }

        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => anyhow::bail!("Unknown log format: {other} (expected text or json)"),
        }

        Ok(())
    }

    /// Serialize to TOML, e.g. for `check-config`
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.scrape.target_url = String::from("https://www.youtube.com/watch?v=abc123");
        config
    }

    #[test]
    fn test_default_requires_url() {
        let config = Config::default();
        assert!(config.validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_shorts_rejected() {
        let mut config = valid_config();
        config.scrape.target_url = String::from("https://www.youtube.com/shorts/abc");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let mut config = valid_config();
        config.scrape.filter_pattern = Some(String::from("[oops"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("filter_pattern"));
    }

    #[test]
    fn test_oversized_time_limit_rejected() {
        let mut config = valid_config();
        config.scrape.time_limit = TimeLimit::new(u64::MAX, 0, 0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("time_limit"));

        config.scrape.time_limit = TimeLimit::new(24, 90, 90);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = valid_config();
        config.waits.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        let mut config = valid_config();
        config.logging.format = String::from("xml");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wait_durations() {
        let waits = WaitConfig::default();
        assert_eq!(waits.page_load_timeout(), Duration::from_secs(10));
        assert_eq!(waits.thread_timeout(), Duration::from_secs(20));
        assert_eq!(waits.reply_timeout(), Duration::from_secs(20));
        assert_eq!(waits.click_pause(), Duration::from_millis(500));
        assert_eq!(waits.retry_config().max_retries, 2);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml = r#"
            [scrape]
            target_url = "https://www.youtube.com/watch?v=abc"
            thread_limit = 5

            [scrape.time_limit]
            minutes = 3
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.scrape.thread_limit, Some(5));
        assert_eq!(config.scrape.time_limit, TimeLimit::new(0, 3, 0));
        assert_eq!(config.waits, WaitConfig::default());
        assert!(config.browser.headless);
        assert_eq!(
            config.logging.diagnostics_destination,
            PathBuf::from("debug.log")
        );
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = valid_config();
        config.scrape.filter_pattern = Some(String::from("great"));
        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("TUBETHREAD_URL", "https://www.youtube.com/watch?v=env");
        std::env::set_var("TUBETHREAD_THREAD_LIMIT", "7");
        std::env::set_var("TUBETHREAD_FILTER", "hello");
        std::env::set_var("TUBETHREAD_MINUTES", "2");
        std::env::set_var("TUBETHREAD_DIAGNOSTICS", "true");

        let config = Config::from_env().unwrap();

        std::env::remove_var("TUBETHREAD_URL");
        std::env::remove_var("TUBETHREAD_THREAD_LIMIT");
        std::env::remove_var("TUBETHREAD_FILTER");
        std::env::remove_var("TUBETHREAD_MINUTES");
        std::env::remove_var("TUBETHREAD_DIAGNOSTICS");

        assert_eq!(config.scrape.target_url, "https://www.youtube.com/watch?v=env");
        assert_eq!(config.scrape.thread_limit, Some(7));
        assert_eq!(config.scrape.filter_pattern.as_deref(), Some("hello"));
        assert_eq!(config.scrape.time_limit, TimeLimit::new(0, 2, 0));
        assert!(config.logging.diagnostics_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        std::env::remove_var("TUBETHREAD_THREAD_LIMIT");
        std::env::remove_var("TUBETHREAD_HEADLESS");
        let config = Config::from_env().unwrap();
        assert_eq!(config.scrape.thread_limit, None);
        assert!(config.browser.headless);
        assert_eq!(config.waits, WaitConfig::default());
    }
}
