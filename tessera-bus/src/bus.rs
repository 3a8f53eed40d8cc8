//! EventBus - synchronous topic-based publish/subscribe
//!
//! Handlers are invoked in registration order on the caller's thread. Each
//! dispatch works on a snapshot of the topic's listeners taken when `emit`
//! starts, so handlers may freely subscribe, unsubscribe, or emit from inside
//! a callback.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::{BusError, HandlerError};

/// Topic on which handler failures are reported as `{topic, error}`.
pub const ERROR_TOPIC: &str = "core.eventbus.error";

/// A subscribed callback. Identity is the `Arc` allocation.
pub type Handler = Arc<dyn Fn(&Value) -> Result<(), HandlerError> + Send + Sync>;

/// Wrap a closure as a [`Handler`].
///
/// Keep the returned value around to subscribe or remove the same handler
/// later; wrapping the closure again yields a distinct handler.
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
{
    Arc::new(f)
}

struct Listener {
    id: u64,
    handler: Handler,
    active: AtomicBool,
}

#[derive(Default)]
struct BusInner {
    topics: RwLock<HashMap<String, Vec<Arc<Listener>>>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn remove_listener(&self, topic: &str, id: u64) -> bool {
        let mut topics = self.topics.write();
        let Some(listeners) = topics.get_mut(topic) else {
            return false;
        };

        let Some(pos) = listeners.iter().position(|l| l.id == id) else {
            return false;
        };

        let removed = listeners.remove(pos);
        removed.active.store(false, Ordering::Release);

        if listeners.is_empty() {
            topics.remove(topic);
        }
        true
    }
}

/// In-process event bus.
///
/// Cloning is cheap and every clone publishes to the same set of listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `topic`.
    ///
    /// Subscribing the same handler twice to one topic keeps a single
    /// registration; both returned subscriptions refer to it.
    pub fn on(&self, topic: impl Into<String>, handler: Handler) -> Subscription {
        let topic = topic.into();
        let mut topics = self.inner.topics.write();
        let listeners = topics.entry(topic.clone()).or_default();

        let id = match listeners
            .iter()
            .find(|l| Arc::ptr_eq(&l.handler, &handler))
        {
            Some(existing) => {
                tracing::trace!(topic = %topic, "Handler already subscribed");
                existing.id
            }
            None => {
                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                listeners.push(Arc::new(Listener {
                    id,
                    handler,
                    active: AtomicBool::new(true),
                }));
                tracing::trace!(topic = %topic, listener = id, "Handler subscribed");
                id
            }
        };

        Subscription {
            bus: Arc::downgrade(&self.inner),
            topic,
            id,
            done: AtomicBool::new(false),
        }
    }

    /// Subscribe a closure to `topic`. Every call creates a new subscription.
    pub fn on_fn<F>(&self, topic: impl Into<String>, f: F) -> Subscription
    where
        F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.on(topic, handler(f))
    }

    /// Remove `handler` from `topic`. Returns true if it was subscribed.
    pub fn off(&self, topic: &str, handler: &Handler) -> bool {
        let id = {
            let topics = self.inner.topics.read();
            topics.get(topic).and_then(|listeners| {
                listeners
                    .iter()
                    .find(|l| Arc::ptr_eq(&l.handler, handler))
                    .map(|l| l.id)
            })
        };

        match id {
            Some(id) => self.inner.remove_listener(topic, id),
            None => false,
        }
    }

    /// Invoke every handler subscribed to `topic` with `payload`.
    ///
    /// Never fails: a handler that errors or panics is reported on
    /// [`ERROR_TOPIC`] and the remaining handlers still run.
    pub fn emit(&self, topic: &str, payload: Value) {
        let snapshot = match self.inner.topics.read().get(topic) {
            Some(listeners) => listeners.clone(),
            None => {
                tracing::trace!(topic = %topic, "No subscribers");
                return;
            }
        };

        for listener in snapshot {
            // Unsubscribed after the snapshot was taken
            if !listener.active.load(Ordering::Acquire) {
                continue;
            }

            let result =
                std::panic::catch_unwind(AssertUnwindSafe(|| (listener.handler)(&payload)));

            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(panic) => HandlerError::Panicked(panic_message(panic.as_ref())),
            };
            self.report_handler_error(topic, &error);
        }
    }

    /// Serialize `payload` and emit it on `topic`
    pub fn emit_json<T: Serialize>(&self, topic: &str, payload: &T) -> Result<(), BusError> {
        let value = serde_json::to_value(payload).map_err(|source| BusError::Serialize {
            topic: topic.to_string(),
            source,
        })?;
        self.emit(topic, value);
        Ok(())
    }

    /// Remove every handler subscribed to `topic`
    pub fn remove_all_listeners(&self, topic: &str) {
        if let Some(listeners) = self.inner.topics.write().remove(topic) {
            for listener in &listeners {
                listener.active.store(false, Ordering::Release);
            }
            tracing::debug!(topic = %topic, count = listeners.len(), "Removed all listeners");
        }
    }

    /// Remove every handler on every topic
    pub fn clear(&self) {
        let drained: Vec<_> = self.inner.topics.write().drain().collect();
        for (_, listeners) in &drained {
            for listener in listeners {
                listener.active.store(false, Ordering::Release);
            }
        }
        tracing::debug!(topics = drained.len(), "Event bus cleared");
    }

    /// Number of handlers currently subscribed to `topic`
    pub fn listener_count(&self, topic: &str) -> usize {
        self.inner.topics.read().get(topic).map_or(0, Vec::len)
    }

    /// Topics that currently have at least one handler, sorted
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.inner.topics.read().keys().cloned().collect();
        topics.sort();
        topics
    }

    fn report_handler_error(&self, topic: &str, error: &HandlerError) {
        tracing::warn!(topic = %topic, error = %error, "Event handler failed");

        // Failures while reporting a failure stop here
        if topic == ERROR_TOPIC {
            return;
        }

        self.emit(
            ERROR_TOPIC,
            json!({ "topic": topic, "error": error.to_string() }),
        );
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.topics())
            .finish()
    }
}

/// Handle returned by [`EventBus::on`].
///
/// Dropping the handle keeps the handler subscribed; call
/// [`unsubscribe`](Subscription::unsubscribe) to remove it.
pub struct Subscription {
    bus: Weak<BusInner>,
    topic: String,
    id: u64,
    done: AtomicBool,
}

impl Subscription {
    /// Remove the handler. Calls after the first are no-ops.
    pub fn unsubscribe(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(inner) = self.bus.upgrade() {
            inner.remove_listener(&self.topic, self.id);
        }
    }

    /// Topic this subscription belongs to
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// True once `unsubscribe` has been called
    pub fn is_unsubscribed(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .field("unsubscribed", &self.is_unsubscribed())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
