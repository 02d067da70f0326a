//! The proxy-source capability consumed by the scrape orchestrator.
//!
//! A run is configured with exactly one source at startup: either the local
//! [`RoundRobinRotation`] pool or a [`GatewaySource`] when an upstream
//! rotating-proxy service does the rotation for us.

use crate::error::Result;
use crate::rotation::RoundRobinRotation;
use reelharvest_core::ProxyEndpoint;
use tracing::debug;

/// Something that hands out proxies and accepts failure reports.
pub trait ProxySource: Send + Sync {
    /// Next endpoint to use for a session.
    fn next(&self) -> Result<ProxyEndpoint>;

    /// Report that `endpoint` failed a request.
    fn mark_failed(&self, endpoint: &ProxyEndpoint);

    /// True while `next` can still succeed.
    fn has_available(&self) -> bool;
}

impl ProxySource for RoundRobinRotation {
    fn next(&self) -> Result<ProxyEndpoint> {
        RoundRobinRotation::next(self)
    }

    fn mark_failed(&self, endpoint: &ProxyEndpoint) {
        RoundRobinRotation::mark_failed(self, endpoint);
    }

    fn has_available(&self) -> bool {
        RoundRobinRotation::has_available(self)
    }
}

/// A single upstream gateway that rotates exit IPs on its own.
///
/// Every call returns the same endpoint and failures are not tracked, since
/// the next connection through the gateway already leaves from a new IP.
#[derive(Debug, Clone)]
pub struct GatewaySource {
    endpoint: ProxyEndpoint,
}

impl GatewaySource {
    /// Wrap the gateway endpoint.
    #[must_use]
    pub fn new(endpoint: ProxyEndpoint) -> Self {
        Self { endpoint }
    }

    /// The gateway endpoint handed out on every call.
    #[must_use]
    pub fn endpoint(&self) -> &ProxyEndpoint {
        &self.endpoint
    }
}

impl ProxySource for GatewaySource {
    fn next(&self) -> Result<ProxyEndpoint> {
        Ok(self.endpoint.clone())
    }

    fn mark_failed(&self, endpoint: &ProxyEndpoint) {
        debug!(proxy = %endpoint, "gateway rotates upstream, ignoring failure report");
    }

    fn has_available(&self) -> bool {
        true
    }
}
