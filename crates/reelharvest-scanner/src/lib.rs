//! Reelharvest Scanner - scrape orchestration, extraction and discovery.
//!
//! This crate drives browser sessions over item and profile URLs and turns
//! the loaded pages into flat [`Record`](reelharvest_core::Record)s. It also
//! discovers item URLs from hashtag listings.
//!
//! # Features
//!
//! - Bounded concurrency with one proxy and one session per task
//! - Retry on a different proxy, failed proxies excluded for the rest of the run
//! - Structured page payload first, ordered DOM selector chains as fallback
//! - Optional profile enrichment (bio, email, social links)
//! - Scroll-driven listing discovery with adaptive stopping and an exact
//!   cross-query target
//!
//! # Example
//!
//! ```rust,ignore
//! use reelharvest_scanner::ScrapeOrchestrator;
//! use std::sync::Arc;
//!
//! let orchestrator = ScrapeOrchestrator::new(
//!     Arc::new(engine),
//!     Arc::new(rotation),
//!     &config,
//! );
//!
//! let results = orchestrator.run(&urls, 10).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod discovery;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod extractor;
pub mod numbers;
pub mod orchestrator;
pub mod pacing;
#[allow(missing_docs)]
pub mod profile;
#[allow(missing_docs)]
pub mod selectors;

// Re-export commonly used types
pub use discovery::{finalize, query_limit, DiscoveredUrlSet, ListingCrawler};
pub use error::{Result, ScanError};
pub use extractor::{is_item_url, record_from_payload, username_from_url, Extractor};
pub use numbers::parse_count;
pub use orchestrator::{ScrapeEvent, ScrapeOrchestrator};
pub use profile::read_profile;
