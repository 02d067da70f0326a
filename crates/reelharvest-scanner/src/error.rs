use reelharvest_browser::BrowserError;
use reelharvest_core::HarvestError;
use reelharvest_proxy::ProxyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Proxy error: {0}")]
    Proxy(#[from] ProxyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub(crate) fn extraction(url: &str, reason: impl Into<String>) -> Self {
        Self::Extraction {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ScanError> for HarvestError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Extraction { .. } => HarvestError::Extraction(err.to_string()),
            ScanError::Browser(e) => e.into(),
            ScanError::Proxy(e) => e.into(),
            ScanError::Io(e) => HarvestError::Io(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
