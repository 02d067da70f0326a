//! Error types for proxy rotation.

use reelharvest_core::HarvestError;
use thiserror::Error;

/// Errors that can occur when handing out proxies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// Every endpoint in the pool is marked failed, or the pool is empty
    #[error("no usable proxy: {reason}")]
    Exhausted {
        /// Why no endpoint could be returned
        reason: String,
    },
}

impl ProxyError {
    pub(crate) fn exhausted(reason: impl Into<String>) -> Self {
        Self::Exhausted {
            reason: reason.into(),
        }
    }
}

impl From<ProxyError> for HarvestError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Exhausted { reason } => HarvestError::ProxyExhausted(reason),
        }
    }
}

/// Result type for proxy operations.
pub type Result<T> = std::result::Result<T, ProxyError>;
