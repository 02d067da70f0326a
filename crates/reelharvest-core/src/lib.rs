//! Reelharvest Core - Foundation crate for the reelharvest scraper.
//!
//! This crate provides shared types, error handling, configuration management,
//! and input-list parsing that all other reelharvest crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Proxy endpoints, normalized records and scrape results
//! - [`inputs`] - Proxy and URL list parsing
//!
//! # Example
//!
//! ```rust
//! use reelharvest_core::{parse_proxy_list, AppConfig};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.scraping.max_retries, 1);
//!
//! let proxies = parse_proxy_list("# pool\n10.0.0.1:8080:user:pass\n");
//! assert_eq!(proxies[0].key(), "10.0.0.1:8080");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod inputs;
#[allow(missing_docs)]
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, DelayRange, DiscoveryConfig, PlatformConfig, ScrapingConfig,
};
pub use error::{ConfigError, ConfigResult, HarvestError, Result};
pub use inputs::{
    load_proxies, load_urls, parse_proxy_line, parse_proxy_list, parse_url_list, validate_urls,
};
pub use types::{
    ProfileData, ProxyEndpoint, Record, RunSummary, ScrapeResult, EMPTY_BIO_SENTINEL,
    LIST_SEPARATOR, PROFILE_SENTINEL, SKIPPED_SENTINEL, UNKNOWN_USERNAME,
};
