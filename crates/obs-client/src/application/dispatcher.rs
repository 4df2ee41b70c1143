//! Event-type → handler registry.
//!
//! At most one handler is registered per event type; registering again
//! replaces the previous one.  The registry belongs to the client, not to a
//! connection, so handlers survive reconnects.
//!
//! Handlers are plain synchronous closures.  They run on the client's event
//! task in arrival order, so a slow handler delays later events but never
//! blocks the socket reader.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use obs_core::protocol::Event;
use serde_json::Value;
use tracing::{debug, error};

/// A callback invoked with an event's `eventData`.
pub type EventHandler = Arc<dyn Fn(Value) + Send + Sync + 'static>;

#[derive(Default)]
pub struct EventHandlers {
    table: RwLock<HashMap<String, EventHandler>>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `event_type`.
    ///
    /// Returns `true` if a previous handler was replaced.
    pub fn set(&self, event_type: impl Into<String>, handler: EventHandler) -> bool {
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event_type.into(), handler)
            .is_some()
    }

    /// Unregisters the handler for `event_type`, returning whether one existed.
    pub fn remove(&self, event_type: &str) -> bool {
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(event_type)
            .is_some()
    }

    pub fn contains(&self, event_type: &str) -> bool {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(event_type)
    }

    /// Invokes the handler registered for `event.event_type`, if any.
    ///
    /// The lookup happens now, so a handler registered after the event was
    /// received still sees it.  The lock is released before the handler
    /// runs, letting a handler (un)register handlers itself.  A panicking
    /// handler is logged and does not stop later dispatches.
    ///
    /// Returns `true` if a handler ran to completion.
    pub fn dispatch(&self, event: Event) -> bool {
        if event.event_type.is_empty() {
            debug!("ignoring event without an eventType");
            return false;
        }

        let handler = self
            .table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event.event_type)
            .cloned();

        let Some(handler) = handler else {
            debug!("no handler for event '{}'", event.event_type);
            return false;
        };

        let Event {
            event_type,
            event_data,
        } = event;
        match panic::catch_unwind(AssertUnwindSafe(|| handler(event_data))) {
            Ok(()) => true,
            Err(_) => {
                error!("handler for event '{event_type}' panicked");
                false
            }
        }
    }
}

impl std::fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_set().entries(table.keys()).finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn event(event_type: &str, data: Value) -> Event {
        Event {
            event_type: event_type.to_string(),
            event_data: data,
        }
    }

    #[test]
    fn test_dispatch_invokes_matching_handler_with_event_data() {
        // Arrange
        let handlers = EventHandlers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        handlers.set(
            "RecordStateChanged",
            Arc::new(move |data: Value| sink.lock().unwrap().push(data)),
        );

        // Act
        let ran = handlers.dispatch(event("RecordStateChanged", json!({"outputActive": true})));

        // Assert
        assert!(ran);
        assert_eq!(*seen.lock().unwrap(), vec![json!({"outputActive": true})]);
    }

    #[test]
    fn test_dispatch_without_handler_is_a_no_op() {
        let handlers = EventHandlers::new();
        assert!(!handlers.dispatch(event("SceneCreated", json!({}))));
    }

    #[test]
    fn test_empty_event_type_is_ignored() {
        let handlers = EventHandlers::new();
        handlers.set("", Arc::new(|_: Value| panic!("must not run")));

        assert!(!handlers.dispatch(event("", json!({}))));
    }

    #[test]
    fn test_second_registration_replaces_first() {
        // Arrange
        let handlers = EventHandlers::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&first);
        let s = Arc::clone(&second);

        // Act
        assert!(!handlers.set("ExitStarted", Arc::new(move |_: Value| {
            f.fetch_add(1, Ordering::SeqCst);
        })));
        assert!(handlers.set("ExitStarted", Arc::new(move |_: Value| {
            s.fetch_add(1, Ordering::SeqCst);
        })));
        handlers.dispatch(event("ExitStarted", json!({})));

        // Assert
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_unregisters_handler() {
        let handlers = EventHandlers::new();
        handlers.set("ExitStarted", Arc::new(|_: Value| {}));

        assert!(handlers.remove("ExitStarted"));
        assert!(!handlers.contains("ExitStarted"));
        assert!(!handlers.remove("ExitStarted"));
    }

    #[test]
    fn test_panicking_handler_does_not_poison_registry() {
        // Arrange
        let handlers = EventHandlers::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        handlers.set("Boom", Arc::new(|_: Value| panic!("handler failure")));
        handlers.set("Fine", Arc::new(move |_: Value| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        // Act
        let boom = handlers.dispatch(event("Boom", json!({})));
        let fine = handlers.dispatch(event("Fine", json!({})));

        // Assert
        assert!(!boom);
        assert!(fine);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_unregister_itself() {
        let handlers = Arc::new(EventHandlers::new());
        let registry = Arc::clone(&handlers);
        handlers.set(
            "Once",
            Arc::new(move |_: Value| {
                registry.remove("Once");
            }),
        );

        assert!(handlers.dispatch(event("Once", json!({}))));
        assert!(!handlers.contains("Once"));
    }
}
