//! Browser sessions for page loading and DOM queries.
//!
//! Scraping code talks to the [`BrowserSession`] and [`SessionFactory`]
//! traits only. [`ChromiumEngine`] is the production factory: one Chromium
//! process, one isolated browser context per session, with the session's
//! proxy, proxy authentication and request blocking fixed at creation.

pub mod blocking;
pub mod engine;
pub mod error;
pub mod session;

pub use blocking::BlockPolicy;
pub use engine::{ChromiumEngine, ChromiumSession};
pub use error::{BrowserError, Result};
pub use session::{extract_domain, BrowserSession, SessionFactory, WaitStrategy};
