//! Typed publish/subscribe broker.
//!
//! [`EventManager<E>`] fans an event out to every subscriber registered for
//! the event's kind. It is built on one [`Signal`] per kind, so delivery is
//! synchronous and follows subscription order.
//!
//! A subscriber that panics is isolated: the panic is caught, logged at
//! `error` level, and the remaining subscribers still run.
//!
//! # Example
//!
//! ```
//! use macrokit_core::{Event, EventManager};
//!
//! #[derive(Clone, Debug)]
//! enum DocEvent {
//!     Saved(String),
//!     Closed,
//! }
//!
//! #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
//! enum DocEventKind {
//!     Saved,
//!     Closed,
//! }
//!
//! impl Event for DocEvent {
//!     type Kind = DocEventKind;
//!
//!     fn kind(&self) -> DocEventKind {
//!         match self {
//!             DocEvent::Saved(_) => DocEventKind::Saved,
//!             DocEvent::Closed => DocEventKind::Closed,
//!         }
//!     }
//! }
//!
//! let events = EventManager::<DocEvent>::new();
//! let id = events.subscribe(DocEventKind::Saved, |event| println!("{:?}", event));
//! events.notify(DocEvent::Saved("notes.txt".into()));
//! events.unsubscribe(DocEventKind::Saved, id);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::logging::targets;
use crate::signal::{ConnectionId, Signal};

/// An event that can be routed through an [`EventManager`].
pub trait Event: Clone + Send + Sync + 'static {
    /// The closed set of event kinds subscribers register for.
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// Returns the kind this event is delivered under.
    fn kind(&self) -> Self::Kind;
}

struct Channels<E: Event> {
    by_kind: Mutex<HashMap<E::Kind, Arc<Signal<E>>>>,
    blocked: AtomicBool,
}

/// A typed broker delivering events to per-kind subscribers.
///
/// Cloning an `EventManager` yields another handle to the same broker.
pub struct EventManager<E: Event> {
    channels: Arc<Channels<E>>,
}

impl<E: Event> Clone for EventManager<E> {
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
        }
    }
}

impl<E: Event> Default for EventManager<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> EventManager<E> {
    /// Creates a broker with no subscribers.
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Channels {
                by_kind: Mutex::new(HashMap::new()),
                blocked: AtomicBool::new(false),
            }),
        }
    }

    fn channel(&self, kind: E::Kind) -> Arc<Signal<E>> {
        Arc::clone(
            self.channels
                .by_kind
                .lock()
                .entry(kind)
                .or_insert_with(|| Arc::new(Signal::new())),
        )
    }

    /// Registers `callback` for events of `kind`.
    ///
    /// Subscribing the same callback twice registers it twice; it will then
    /// be invoked twice per event.
    pub fn subscribe<F>(&self, kind: E::Kind, callback: F) -> ConnectionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.channel(kind).connect(move |event: &E| {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                tracing::error!(
                    target: targets::EVENT,
                    kind = ?event.kind(),
                    "event subscriber panicked; continuing with remaining subscribers"
                );
            }
        })
    }

    /// Removes one subscription. Returns `true` if it existed.
    pub fn unsubscribe(&self, kind: E::Kind, id: ConnectionId) -> bool {
        let channel = self.channels.by_kind.lock().get(&kind).cloned();
        channel.is_some_and(|signal| signal.disconnect(id))
    }

    /// Removes every subscription for `kind`.
    pub fn unsubscribe_all(&self, kind: E::Kind) {
        if let Some(signal) = self.channels.by_kind.lock().get(&kind) {
            signal.disconnect_all();
        }
    }

    /// Number of subscriptions currently registered for `kind`.
    pub fn subscriber_count(&self, kind: E::Kind) -> usize {
        self.channels
            .by_kind
            .lock()
            .get(&kind)
            .map_or(0, |signal| signal.connection_count())
    }

    /// Suppresses (or resumes) all deliveries from this broker.
    pub fn set_blocked(&self, blocked: bool) {
        self.channels.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Whether deliveries are currently suppressed.
    pub fn is_blocked(&self) -> bool {
        self.channels.blocked.load(Ordering::SeqCst)
    }

    /// Delivers `event` to every subscriber of its kind, in subscription order.
    ///
    /// Notifying a kind with no subscribers is a no-op.
    pub fn notify(&self, event: E) {
        let kind = event.kind();
        if self.is_blocked() {
            tracing::trace!(target: targets::EVENT, ?kind, "event manager blocked, dropping event");
            return;
        }

        let channel = self.channels.by_kind.lock().get(&kind).cloned();
        match channel {
            Some(signal) => {
                let _span = tracing::trace_span!(target: targets::EVENT, "notify", ?kind).entered();
                signal.emit_ref(&event);
            }
            None => tracing::trace!(target: targets::EVENT, ?kind, "no subscribers"),
        }
    }

    /// Returns `true` if both handles refer to the same broker.
    pub fn same_broker(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.channels, &other.channels)
    }
}

impl<E: Event> fmt::Debug for EventManager<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds = self.channels.by_kind.lock().len();
        f.debug_struct("EventManager")
            .field("kinds", &kinds)
            .field("blocked", &self.is_blocked())
            .finish()
    }
}
