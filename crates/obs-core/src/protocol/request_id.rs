//! Thread-safe generator for request identifiers.
//!
//! Every Request frame carries a `requestId` that the server echoes back in
//! its response.  The client uses it to hand the response to the exact
//! caller that issued the request, so two live requests must never share
//! an identifier.
//!
//! Identifiers are the decimal rendering of a monotonically increasing
//! counter, zero-padded to [`MIN_WIDTH`] digits (`"00000001"`,
//! `"00000002"`, ...).  Decimal rendering is injective, so identifiers stay
//! unique and printable for the whole `u64` range; the padding only keeps
//! them a stable width in logs.
//!
//! # Thread safety
//!
//! The counter uses `AtomicU64`, so concurrent callers can draw identifiers
//! without a lock and never receive the same value twice.

use std::sync::atomic::{AtomicU64, Ordering};

/// Minimum number of digits in a rendered identifier.
pub const MIN_WIDTH: usize = 8;

/// A thread-safe, monotonically increasing source of request identifiers.
///
/// # Examples
///
/// ```rust
/// use obs_core::RequestIdGenerator;
///
/// let ids = RequestIdGenerator::new();
/// assert_eq!(ids.next(), "00000001");
/// assert_eq!(ids.next(), "00000002");
/// ```
#[derive(Debug)]
pub struct RequestIdGenerator {
    /// The last value handed out; `0` means none yet.
    inner: AtomicU64,
}

impl RequestIdGenerator {
    /// Creates a generator whose first identifier is `"00000001"`.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(0),
        }
    }

    /// Returns the next identifier and atomically advances the counter.
    ///
    /// `Ordering::Relaxed` is enough: the value is only used as a lookup
    /// key, never to publish other memory.
    pub fn next(&self) -> String {
        let n = self.inner.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        format!("{n:0width$}", width = MIN_WIDTH)
    }

    /// Returns how many identifiers have been handed out, without advancing.
    pub fn issued(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
