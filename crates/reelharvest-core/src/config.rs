//! Configuration management for reelharvest.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/reelharvest/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scrape orchestration settings
    pub scraping: ScrapingConfig,
    /// Browser session settings
    pub browser: BrowserConfig,
    /// Listing discovery settings
    pub discovery: DiscoveryConfig,
    /// Target platform settings
    pub platform: PlatformConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path. A missing file is an error here.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides in place.
    ///
    /// Supports the following environment variables:
    /// - `REELHARVEST_CONCURRENCY`: Override worker count
    /// - `REELHARVEST_MAX_RETRIES`: Override retries per URL
    /// - `REELHARVEST_SKIP_PROFILES`: Skip profile enrichment (true/false)
    /// - `REELHARVEST_HEADLESS`: Override browser headless mode (true/false)
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("REELHARVEST_CONCURRENCY") {
            if let Ok(concurrency) = val.parse::<usize>() {
                self.scraping.concurrency = Some(concurrency);
                tracing::debug!("Override scraping.concurrency from env: {}", concurrency);
            }
        }

        if let Ok(val) = std::env::var("REELHARVEST_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.scraping.max_retries = retries;
                tracing::debug!("Override scraping.max_retries from env: {}", retries);
            }
        }

        if let Ok(val) = std::env::var("REELHARVEST_SKIP_PROFILES") {
            if let Ok(skip) = val.parse() {
                self.scraping.skip_profile_enrichment = skip;
                tracing::debug!("Override scraping.skip_profile_enrichment from env: {}", skip);
            }
        }

        if let Ok(val) = std::env::var("REELHARVEST_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scraping.concurrency == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "scraping.concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        for (field, range) in [
            ("scraping.item_delay", &self.scraping.item_delay),
            ("scraping.profile_delay", &self.scraping.profile_delay),
        ] {
            if range.min_ms > range.max_ms {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("min_ms {} exceeds max_ms {}", range.min_ms, range.max_ms),
                });
            }
        }

        if self.discovery.buffer_factor < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "discovery.buffer_factor".to_string(),
                reason: "must be at least 1.0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/reelharvest/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "reelharvest", "reelharvest")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Inclusive millisecond range for randomized pauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Lower bound in milliseconds
    pub min_ms: u64,
    /// Upper bound in milliseconds
    pub max_ms: u64,
}

impl DelayRange {
    /// Create a range; bounds are swapped if given in the wrong order.
    #[must_use]
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        if min_ms <= max_ms {
            Self { min_ms, max_ms }
        } else {
            Self {
                min_ms: max_ms,
                max_ms: min_ms,
            }
        }
    }
}

/// Scrape orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Retries per URL, each on a fresh proxy
    pub max_retries: u32,
    /// Navigation timeout for the target URL
    pub request_timeout_ms: u64,
    /// Number of URLs processed at once (chosen from the URL count when unset)
    pub concurrency: Option<usize>,
    /// Skip the profile page visit for item URLs
    pub skip_profile_enrichment: bool,
    /// Successful proxy hand-outs between forced rotations (0 disables)
    pub forced_rotation_threshold: u64,
    /// Pause after an item page loads
    pub item_delay: DelayRange,
    /// Pause after a profile page loads
    pub profile_delay: DelayRange,
    /// Navigation timeout for profile pages
    pub profile_timeout_ms: u64,
}

impl ScrapingConfig {
    /// Navigation timeout for target URLs.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Navigation timeout for profile pages.
    #[must_use]
    pub fn profile_timeout(&self) -> Duration {
        Duration::from_millis(self.profile_timeout_ms)
    }
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            request_timeout_ms: 15_000,
            concurrency: None,
            skip_profile_enrichment: false,
            forced_rotation_threshold: 14,
            item_delay: DelayRange::new(400, 650),
            profile_delay: DelayRange::new(250, 400),
            profile_timeout_ms: 8_000,
        }
    }
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// User agent sent by every session
    pub user_agent: String,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Resource types aborted before they are fetched
    pub blocked_resource_types: Vec<String>,
    /// URL substrings aborted before they are fetched
    pub blocked_url_patterns: Vec<String>,
    /// Extra Chrome command-line arguments
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            window_width: 1920,
            window_height: 1080,
            blocked_resource_types: ["image", "media", "font", "stylesheet"]
                .into_iter()
                .map(String::from)
                .collect(),
            blocked_url_patterns: [
                "analytics",
                "tracking",
                "ads",
                "doubleclick",
                "facebook.com/tr",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            chrome_args: Vec::new(),
        }
    }
}

/// Listing discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Overall item target across all queries (unbounded when absent)
    pub max_items: Option<usize>,
    /// Inflation over the even per-query split
    pub buffer_factor: f64,
    /// Number of trailing queries that chase the remaining deficit
    pub tail_queries: usize,
    /// Extra share of the remaining deficit requested by tail queries
    pub tail_buffer: f64,
    /// Navigation timeout for landing and listing pages
    pub listing_timeout_ms: u64,
    /// How long to wait for the first item link to render
    pub selector_wait_ms: u64,
    /// Where to write page snapshots for queries that yield nothing
    pub debug_snapshot_dir: Option<PathBuf>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_items: None,
            buffer_factor: 1.5,
            tail_queries: 2,
            tail_buffer: 0.3,
            listing_timeout_ms: 30_000,
            selector_wait_ms: 5_000,
            debug_snapshot_dir: None,
        }
    }
}

/// Target platform settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Landing page and base for profile and listing URLs
    pub base_url: String,
}

impl PlatformConfig {
    /// Profile page for a user handle.
    #[must_use]
    pub fn profile_url(&self, username: &str) -> String {
        format!("{}/@{}", self.base_url.trim_end_matches('/'), username)
    }

    /// Listing page for a hashtag query (leading `#` is dropped).
    #[must_use]
    pub fn listing_url(&self, query: &str) -> String {
        format!(
            "{}/tag/{}",
            self.base_url.trim_end_matches('/'),
            query.trim_start_matches('#')
        )
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.tiktok.com".to_string(),
        }
    }
}
