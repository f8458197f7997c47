//! Guards against stale results from superseded scan requests.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out strictly increasing sequence numbers and answers whether a
/// number is still the latest issued.
///
/// A worker finishing with a stale number drops its result instead of
/// dispatching callbacks; the newer request is authoritative without
/// anyone having to interrupt the older worker.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next sequence number, superseding all earlier ones.
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns `true` while `request_id` is the most recently issued.
    pub fn is_current(&self, request_id: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == request_id
    }
}
