//! Pending-call table that routes responses back to their callers.
//!
//! Each in-flight request owns one entry keyed by its `requestId`.  The
//! entry is a one-shot sender; the caller holds the receiver and awaits it
//! with a timeout.  An entry is removed exactly once, by whichever happens
//! first:
//!
//! - the matching response arrives ([`PendingCalls::resolve`]),
//! - the caller gives up after its timeout ([`PendingCalls::forget`]),
//! - the connection is torn down ([`PendingCalls::fail_all`]).
//!
//! The table has its own lock, independent of the connection lock, so a
//! response can be delivered while another task is writing a frame.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use obs_core::protocol::RequestResponse;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::ClientError;

/// What a waiting caller eventually receives.
pub type CallOutcome = Result<RequestResponse, ClientError>;

/// Thread-safe table of requests awaiting their response.
#[derive(Debug, Default)]
pub struct PendingCalls {
    calls: Mutex<HashMap<String, oneshot::Sender<CallOutcome>>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `request_id` and returns the receiver its caller awaits.
    ///
    /// Returns `None` if the identifier is already live.
    pub fn register(&self, request_id: &str) -> Option<oneshot::Receiver<CallOutcome>> {
        let mut calls = self.lock();
        if calls.contains_key(request_id) {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        calls.insert(request_id.to_string(), tx);
        Some(rx)
    }

    /// Hands `response` to the caller waiting on its `requestId`.
    ///
    /// Returns `false` (and drops the response) if nobody is waiting, which
    /// happens when the caller already timed out.
    pub fn resolve(&self, response: RequestResponse) -> bool {
        let Some(tx) = self.lock().remove(&response.request_id) else {
            debug!(
                "dropping response for unknown request id '{}'",
                response.request_id
            );
            return false;
        };
        // The receiver may have been dropped between the timeout and the
        // removal above; nothing to do in that case.
        let _ = tx.send(Ok(response));
        true
    }

    /// Removes `request_id` without notifying anyone.
    pub fn forget(&self, request_id: &str) -> bool {
        self.lock().remove(request_id).is_some()
    }

    /// Fails every waiting caller with the error built by `make_error`.
    ///
    /// Returns how many callers were notified.
    pub fn fail_all(&self, make_error: impl Fn() -> ClientError) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.send(Err(make_error()));
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<CallOutcome>>> {
        // A panic while holding this lock cannot leave the map half-updated,
        // so a poisoned lock is still usable.
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn response(id: &str) -> RequestResponse {
        RequestResponse {
            request_id: id.to_string(),
            ..RequestResponse::default()
        }
    }

    #[test]
    fn test_register_then_resolve_delivers_response() {
        // Arrange
        let calls = PendingCalls::new();
        let mut rx = calls.register("00000001").expect("fresh id");

        // Act
        let delivered = calls.resolve(response("00000001"));

        // Assert
        assert!(delivered);
        assert!(calls.is_empty());
        let outcome = rx.try_recv().expect("response sent");
        assert_eq!(outcome.unwrap().request_id, "00000001");
    }

    #[test]
    fn test_duplicate_registration_is_refused() {
        let calls = PendingCalls::new();
        let _rx = calls.register("a").unwrap();

        assert!(calls.register("a").is_none());
        assert_eq!(calls.len(), 1);
    }

    #[test]
    fn test_unknown_response_is_dropped() {
        let calls = PendingCalls::new();
        let _rx = calls.register("a").unwrap();

        assert!(!calls.resolve(response("zzz")));
        assert_eq!(calls.len(), 1);
    }

    #[test]
    fn test_responses_route_by_id_regardless_of_order() {
        // Arrange
        let calls = PendingCalls::new();
        let mut first = calls.register("1").unwrap();
        let mut second = calls.register("2").unwrap();

        // Act – the server answers the second request first
        calls.resolve(response("2"));
        calls.resolve(response("1"));

        // Assert
        assert_eq!(first.try_recv().unwrap().unwrap().request_id, "1");
        assert_eq!(second.try_recv().unwrap().unwrap().request_id, "2");
    }

    #[test]
    fn test_forget_makes_late_response_a_no_op() {
        let calls = PendingCalls::new();
        let _rx = calls.register("late").unwrap();

        assert!(calls.forget("late"));
        assert!(!calls.resolve(response("late")));
        assert!(!calls.forget("late"));
    }

    #[test]
    fn test_fail_all_notifies_every_waiter() {
        // Arrange
        let calls = PendingCalls::new();
        let mut a = calls.register("a").unwrap();
        let mut b = calls.register("b").unwrap();

        // Act
        let failed = calls.fail_all(|| ClientError::ConnectionClosed);

        // Assert
        assert_eq!(failed, 2);
        assert!(calls.is_empty());
        assert!(matches!(a.try_recv().unwrap(), Err(ClientError::ConnectionClosed)));
        assert!(matches!(b.try_recv().unwrap(), Err(ClientError::ConnectionClosed)));
    }

    #[test]
    fn test_resolve_after_receiver_dropped_still_removes_entry() {
        let calls = PendingCalls::new();
        drop(calls.register("gone").unwrap());

        assert!(calls.resolve(response("gone")));
        assert!(calls.is_empty());
    }
}
