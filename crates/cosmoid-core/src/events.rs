//! Listener registry and client notifications.
//!
//! [`ListenerRegistry`] is a synchronous fan-out: `notify` calls every
//! subscriber in registration order on the caller's thread. Each pass
//! iterates over a snapshot taken when it starts, so subscribing or
//! unsubscribing from inside a listener never disturbs the pass in flight. A
//! panicking listener is caught and logged, and the remaining listeners
//! still run.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tracing::error;

use cosmoid_types::{ConnectionState, Inbound};

use crate::error::ErrorKind;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Inner<E> {
    next_id: u64,
    listeners: Vec<(u64, Listener<E>)>,
}

/// Multi-subscriber event fan-out.
///
/// Cloning a registry yields another handle to the same subscriber list.
pub struct ListenerRegistry<E> {
    inner: Arc<Mutex<Inner<E>>>,
}

impl<E> Clone for ListenerRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> Default for ListenerRegistry<E> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }
}

impl<E: 'static> std::fmt::Debug for ListenerRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl<E: 'static> ListenerRegistry<E> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<E>> {
        // Listeners never run under the lock, so a poisoned lock still holds a consistent list.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener. It stays registered until [`Subscription::unsubscribe`]
    /// is called; dropping the handle does not remove it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));

        let registry: Weak<dyn Unsubscribe> = Arc::downgrade(&self.inner) as Weak<dyn Unsubscribe>;
        Subscription { id, registry }
    }

    /// Deliver `event` to every listener registered when the call began.
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                error!(
                    panic = panic_message(payload.as_ref()),
                    "Listener panicked during notification"
                );
            }
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

trait Unsubscribe: Send + Sync {
    fn remove(&self, id: u64) -> bool;
}

impl<E: 'static> Unsubscribe for Mutex<Inner<E>> {
    fn remove(&self, id: u64) -> bool {
        let mut inner = self.lock().unwrap_or_else(PoisonError::into_inner);
        let before = inner.listeners.len();
        inner.listeners.retain(|(existing, _)| *existing != id);
        inner.listeners.len() != before
    }
}

/// Handle returned by [`ListenerRegistry::subscribe`].
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Unsubscribe>,
}

impl Subscription {
    /// Remove the listener. Returns `false` if it was already gone or the
    /// registry has been dropped.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Why an open connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DisconnectReason {
    /// `disconnect()` was called.
    UserRequested,
    /// The socket closed or timed out on its own.
    ConnectionLost(String),
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserRequested => write!(f, "disconnected by user"),
            Self::ConnectionLost(reason) => write!(f, "connection lost: {reason}"),
        }
    }
}

/// Notifications published by the transport client.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ClientEvent {
    /// The connection state moved along one edge.
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// The socket opened and the outbound queue was flushed.
    Connected,
    /// The client left `Open`, or was closed by the user.
    Disconnected { reason: DisconnectReason },
    /// Reconnect attempts are exhausted. Emitted once per failure.
    ConnectionFailed { reason: String },
    /// A reconnect attempt will be made after `delay`.
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// A decoded frame from the bridge, delivered verbatim.
    Message(Inbound),
    /// A non-fatal error.
    Error { kind: ErrorKind, message: String },
}

impl ClientEvent {
    /// The inbound frame carried by this event, if any.
    pub fn message(&self) -> Option<&Inbound> {
        match self {
            ClientEvent::Message(inbound) => Some(inbound),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_notify_in_registration_order() {
        let registry = ListenerRegistry::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            registry.subscribe(move |value: &u32| seen.lock().unwrap().push((tag, *value)));
        }

        registry.notify(&7);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let registry = ListenerRegistry::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let before = Arc::clone(&calls);
        registry.subscribe(move |_| {
            before.fetch_add(1, Ordering::SeqCst);
        });
        registry.subscribe(|_| panic!("listener failure"));
        let after = Arc::clone(&calls);
        registry.subscribe(move |_| {
            after.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify(&1);
        registry.notify(&2);

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_debug_reports_listener_count() {
        let registry = ListenerRegistry::<String>::new();
        registry.subscribe(|_: &String| {});
        registry.subscribe(|_: &String| {});
        assert_eq!(format!("{registry:?}"), "ListenerRegistry { listeners: 2 }");
    }

    #[test]
    fn test_unsubscribe() {
        let registry = ListenerRegistry::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = registry.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify(&1);
        assert!(subscription.unsubscribe());
        registry.notify(&2);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_subscribe_during_notify_waits_for_next_pass() {
        let registry = ListenerRegistry::<u32>::new();
        let late_calls = Arc::new(AtomicUsize::new(0));

        let handle = registry.clone();
        let late = Arc::clone(&late_calls);
        registry.subscribe(move |_| {
            let late = Arc::clone(&late);
            handle.subscribe(move |_| {
                late.fetch_add(1, Ordering::SeqCst);
            });
        });

        registry.notify(&1);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len(), 2);

        registry.notify(&2);
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_during_notify_keeps_current_pass() {
        let registry = ListenerRegistry::<u32>::new();
        let second_calls = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let remover = Arc::clone(&slot);
        registry.subscribe(move |_| {
            if let Some(subscription) = remover.lock().unwrap().take() {
                subscription.unsubscribe();
            }
        });
        let counter = Arc::clone(&second_calls);
        let second = registry.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        *slot.lock().unwrap() = Some(second);

        registry.notify(&1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);

        registry.notify(&2);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unsubscribe_after_registry_dropped() {
        let registry = ListenerRegistry::<u32>::new();
        let subscription = registry.subscribe(|_| {});
        drop(registry);
        assert!(!subscription.unsubscribe());
    }

    #[test]
    fn test_client_event_message_accessor() {
        let event = ClientEvent::Message(Inbound::Connected { device_id: None });
        assert_eq!(event.message().map(Inbound::kind), Some("connected"));
        assert!(ClientEvent::Connected.message().is_none());
    }
}
