//! Reelharvest Proxy - proxy rotation for scrape runs.
//!
//! # Architecture
//!
//! - **Rotation** ([`rotation`]): round-robin pool with permanent failure
//!   exclusion and periodic forced rotation
//! - **Sources** ([`source`]): the [`ProxySource`] capability, implemented by
//!   the rotation pool and by a single upstream gateway
//! - **Errors** ([`error`]): exhaustion
//!
//! # Example
//!
//! ```rust
//! use reelharvest_core::ProxyEndpoint;
//! use reelharvest_proxy::RoundRobinRotation;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let rotation = RoundRobinRotation::new(vec![
//!     ProxyEndpoint::new("10.0.0.1", 8080, "user", "pass"),
//!     ProxyEndpoint::new("10.0.0.2", 8080, "user", "pass"),
//! ])?;
//!
//! let first = rotation.next()?;
//! rotation.mark_failed(&first);
//! assert_ne!(rotation.next()?.key(), first.key());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod rotation;
pub mod source;

// Re-export commonly used types
pub use error::{ProxyError, Result};
pub use rotation::{RoundRobinRotation, DEFAULT_FORCED_ROTATION_THRESHOLD};
pub use source::{GatewaySource, ProxySource};
