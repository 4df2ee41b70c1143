//! Single-flight reconnect scheduling.
//!
//! After a dial failure or a lost connection the client asks the
//! supervisor to try again later.  At most one retry is ever pending: a
//! second request while one is already scheduled is ignored, so failures
//! reported from several places at once still produce one dial.
//!
//! A retry vacates its slot when its delay expires, just before it runs the
//! reconnect attempt.  If that attempt fails it can therefore schedule the
//! next retry itself.  [`ReconnectSupervisor::cancel`] aborts a retry that
//! is still sleeping; an attempt already past its delay is stopped by the
//! client's connection generation check instead.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::application::backoff::BackoffPolicy;

#[derive(Debug, Default)]
struct Slot {
    /// The sleeping retry, if any.
    pending: Option<JoinHandle<()>>,
    /// Identifies `pending`, so a retry can tell whether it was replaced.
    ticket: u64,
    /// Consecutive retries since the last successful handshake.
    attempts: u32,
    /// Retries scheduled over the supervisor's lifetime.
    scheduled: u64,
}

#[derive(Debug)]
pub struct ReconnectSupervisor {
    policy: BackoffPolicy,
    slot: Arc<Mutex<Slot>>,
}

impl ReconnectSupervisor {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Runs `attempt` after the next backoff delay, unless a retry is
    /// already pending.
    ///
    /// Must be called from within a Tokio runtime.  Returns `true` if a new
    /// retry was scheduled.
    pub fn schedule<F, Fut>(&self, attempt: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // The lock is held until the handle is stored, so the spawned task
        // cannot observe the slot before it is filled in.
        let mut slot = lock(&self.slot);
        if slot.pending.is_some() {
            debug!("reconnect already pending; not scheduling another");
            return false;
        }

        let delay = self.policy.delay_for(slot.attempts);
        slot.attempts = slot.attempts.saturating_add(1);
        slot.scheduled += 1;
        slot.ticket = slot.ticket.wrapping_add(1);
        let ticket = slot.ticket;
        info!("reconnecting in {delay:?} (attempt {})", slot.attempts);

        let shared_slot = Arc::clone(&self.slot);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slot = lock(&shared_slot);
                if slot.ticket != ticket || slot.pending.is_none() {
                    return;
                }
                slot.pending = None;
            }
            attempt().await;
        });
        slot.pending = Some(handle);
        true
    }

    /// Aborts a retry that has not fired yet.  Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut slot = lock(&self.slot);
        slot.attempts = 0;
        match slot.pending.take() {
            Some(handle) => {
                handle.abort();
                debug!("cancelled pending reconnect");
                true
            }
            None => false,
        }
    }

    /// Restarts the backoff schedule; called once a handshake succeeds.
    pub fn reset_backoff(&self) {
        lock(&self.slot).attempts = 0;
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.slot).pending.is_some()
    }

    /// Number of retries scheduled so far.
    pub fn scheduled_total(&self) -> u64 {
        lock(&self.slot).scheduled
    }
}

impl Drop for ReconnectSupervisor {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.slot).pending.take() {
            handle.abort();
        }
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn supervisor(initial_ms: u64) -> ReconnectSupervisor {
        ReconnectSupervisor::new(BackoffPolicy {
            initial: Duration::from_millis(initial_ms),
            max: Duration::from_millis(initial_ms * 8),
            factor: 2,
        })
    }

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> std::future::Ready<()> + Send {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test]
    async fn test_second_schedule_while_pending_is_ignored() {
        // Arrange
        let sup = supervisor(50);
        let runs = Arc::new(AtomicUsize::new(0));

        // Act
        let first = sup.schedule(counting(&runs));
        let second = sup.schedule(counting(&runs));
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(sup.scheduled_total(), 1);
    }

    #[tokio::test]
    async fn test_cancel_prevents_attempt() {
        let sup = supervisor(50);
        let runs = Arc::new(AtomicUsize::new(0));

        sup.schedule(counting(&runs));
        assert!(sup.is_pending());
        assert!(sup.cancel());
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(!sup.is_pending());
        assert!(!sup.cancel());
    }

    #[tokio::test]
    async fn test_slot_is_vacated_when_retry_fires() {
        // Arrange
        let sup = Arc::new(supervisor(20));
        let runs = Arc::new(AtomicUsize::new(0));

        // Act – the attempt itself schedules the next retry, as a failed
        // dial does.
        let inner = Arc::clone(&sup);
        let inner_runs = Arc::clone(&runs);
        sup.schedule(move || async move {
            inner_runs.fetch_add(1, Ordering::SeqCst);
            let again = inner.schedule(counting(&inner_runs));
            assert!(again, "slot should be free while the attempt runs");
        });
        tokio::time::sleep(Duration::from_millis(300)).await;

        // Assert
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(sup.scheduled_total(), 2);
        assert!(!sup.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_back_off_until_reset() {
        // Arrange
        let sup = supervisor(100);
        let runs = Arc::new(AtomicUsize::new(0));

        // Act – first retry waits 100 ms
        sup.schedule(counting(&runs));
        tokio::time::sleep(Duration::from_millis(110)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // second consecutive retry waits 200 ms
        sup.schedule(counting(&runs));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // after a reset the schedule starts over at 100 ms
        sup.reset_backoff();
        sup.schedule(counting(&runs));
        tokio::time::sleep(Duration::from_millis(110)).await;

        // Assert
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
