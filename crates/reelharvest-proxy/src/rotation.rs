//! Round-robin proxy rotation.
//!
//! The pool state (endpoints, cursor, request counter, failed set) lives
//! behind one mutex so that concurrent scrape tasks observe a single
//! rotation order. Failure exclusion is permanent for the lifetime of the
//! manager.

use crate::error::{ProxyError, Result};
use reelharvest_core::ProxyEndpoint;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Successful hand-outs between forced rotations.
pub const DEFAULT_FORCED_ROTATION_THRESHOLD: u64 = 14;

#[derive(Debug)]
struct PoolState {
    endpoints: Vec<ProxyEndpoint>,
    /// Index examined first by the next selection. Always in `[0, len)`.
    cursor: usize,
    request_count: u64,
    failed: HashSet<String>,
    /// Key of the endpoint handed out by the previous call.
    last: Option<String>,
}

impl PoolState {
    fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.endpoints.len();
    }

    fn available(&self) -> usize {
        self.endpoints
            .iter()
            .filter(|e| !self.failed.contains(&e.key()))
            .count()
    }
}

/// Proxy Rotation Manager.
///
/// Hands out endpoints in pool order, skipping failed ones, and inserts one
/// extra cursor step every `forced_rotation_threshold` successful calls.
/// Two consecutive calls never return the same endpoint while another
/// non-failed one exists.
#[derive(Debug)]
pub struct RoundRobinRotation {
    state: Mutex<PoolState>,
    forced_rotation_threshold: u64,
}

impl RoundRobinRotation {
    /// Create a manager with the default forced-rotation threshold.
    ///
    /// # Errors
    /// Returns `Exhausted` if `endpoints` is empty.
    pub fn new(endpoints: Vec<ProxyEndpoint>) -> Result<Self> {
        Self::with_threshold(endpoints, DEFAULT_FORCED_ROTATION_THRESHOLD)
    }

    /// Create a manager with a custom forced-rotation threshold (0 disables it).
    ///
    /// # Errors
    /// Returns `Exhausted` if `endpoints` is empty.
    pub fn with_threshold(
        endpoints: Vec<ProxyEndpoint>,
        forced_rotation_threshold: u64,
    ) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(ProxyError::exhausted("no proxies available"));
        }

        debug!(
            count = endpoints.len(),
            threshold = forced_rotation_threshold,
            "created proxy rotation"
        );

        Ok(Self {
            state: Mutex::new(PoolState {
                endpoints,
                cursor: 0,
                request_count: 0,
                failed: HashSet::new(),
                last: None,
            }),
            forced_rotation_threshold,
        })
    }

    /// Return the next usable endpoint.
    ///
    /// # Errors
    /// Returns `Exhausted` when every endpoint is marked failed. The bounded
    /// scan is authoritative even if `has_available` said otherwise earlier.
    pub fn next(&self) -> Result<ProxyEndpoint> {
        let mut state = self.lock();

        if state.available() == 0 {
            return Err(ProxyError::exhausted("all proxies have failed"));
        }

        if self.forced_rotation_threshold > 0
            && state.request_count > 0
            && state.request_count % self.forced_rotation_threshold == 0
        {
            state.advance();
            debug!(
                requests = state.request_count,
                cursor = state.cursor,
                "forced proxy rotation"
            );
        }

        // With two or more live endpoints the previous one is never repeated,
        // even when a forced step lands the cursor back on it.
        let avoid_repeat = state.available() > 1;
        for _ in 0..state.endpoints.len() {
            let candidate = state.endpoints[state.cursor].clone();
            state.advance();

            let key = candidate.key();
            if state.failed.contains(&key) {
                continue;
            }
            if avoid_repeat && state.last.as_deref() == Some(key.as_str()) {
                continue;
            }

            state.request_count += 1;
            state.last = Some(key);
            return Ok(candidate);
        }

        Err(ProxyError::exhausted("all proxies have failed"))
    }

    /// Exclude an endpoint from all future selections. Idempotent.
    pub fn mark_failed(&self, endpoint: &ProxyEndpoint) {
        let mut state = self.lock();
        if state.failed.insert(endpoint.key()) {
            warn!(
                proxy = %endpoint,
                remaining = state.available(),
                "marked proxy as failed"
            );
        }
    }

    /// Advance the cursor by one without handing out an endpoint.
    pub fn force_rotate(&self) {
        self.lock().advance();
    }

    /// True while at least one endpoint is not marked failed.
    #[must_use]
    pub fn has_available(&self) -> bool {
        self.lock().available() > 0
    }

    /// Number of endpoints in the pool, failed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().endpoints.len()
    }

    /// Always false; construction rejects an empty pool.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().endpoints.is_empty()
    }

    /// Successful `next` calls so far.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.lock().request_count
    }

    /// Index the next selection starts from.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.lock().cursor
    }

    /// Number of endpoints marked failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.lock().failed.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().expect("acquire lock on proxy pool state")
    }
}
