//! Replay-latest pub/sub bus.
//!
//! Like [`crate::InMemoryEventBus`], but the bus remembers the last published
//! message and delivers it to every new subscriber before anything else. A view
//! that subscribes late can render straight away instead of waiting for the next
//! change.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak, mpsc};

use crate::bus::{EventBus, Subscription};
use crate::in_memory_bus::InMemoryBusError;

/// A callback subscription.
struct Listener<M> {
    id: u64,
    /// Version of the newest message handed to `handler`. Held while it runs.
    seen: Mutex<u64>,
    handler: Box<dyn Fn(&M) + Send + Sync>,
}

impl<M> Listener<M> {
    /// Call the handler unless it already got `version` or a newer message.
    ///
    /// A panicking handler is logged and skipped; it stays subscribed.
    fn deliver(&self, version: u64, message: &M) {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if *seen >= version {
            return;
        }
        *seen = version;

        if panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(message))).is_err() {
            tracing::error!(subscription = self.id, version, "subscriber panicked; message skipped");
        }
    }
}

struct Registry<M> {
    latest: Option<M>,
    /// Bumped on every publish; 0 while nothing has been published.
    version: u64,
    channels: Vec<mpsc::Sender<M>>,
    listeners: Vec<Arc<Listener<M>>>,
    next_id: u64,
}

struct Inner<M> {
    /// Serialises publishes so handlers see messages in publication order.
    delivery: Mutex<()>,
    registry: Mutex<Registry<M>>,
}

impl<M> Inner<M> {
    fn registry(&self) -> MutexGuard<'_, Registry<M>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Broadcast bus with replay of the latest message.
///
/// Two ways to subscribe:
/// - [`EventBus::subscribe`]: a channel [`Subscription`] (pull style)
/// - [`ReplayBus::subscribe_with`]: a callback invoked synchronously on publish
///
/// Handlers run on the publishing thread. They may read [`ReplayBus::latest`]
/// and subscribe or unsubscribe, but must not publish to the same bus. A handler
/// never receives a message older than one it has already seen.
pub struct ReplayBus<M> {
    inner: Arc<Inner<M>>,
}

impl<M> core::fmt::Debug for ReplayBus<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let registry = self.inner.registry();
        f.debug_struct("ReplayBus")
            .field("version", &registry.version)
            .field("channels", &registry.channels.len())
            .field("handlers", &registry.listeners.len())
            .finish()
    }
}

impl<M> Default for ReplayBus<M> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Inner {
                delivery: Mutex::new(()),
                registry: Mutex::new(Registry {
                    latest: None,
                    version: 0,
                    channels: Vec::new(),
                    listeners: Vec::new(),
                    next_id: 0,
                }),
            }),
        }
    }
}

impl<M> ReplayBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus that already holds `initial` as its latest message.
    pub fn with_initial(initial: M) -> Self {
        let bus = Self::new();
        {
            let mut registry = bus.inner.registry();
            registry.latest = Some(initial);
            registry.version = 1;
        }
        bus
    }

    /// Number of live callback subscriptions.
    pub fn handler_count(&self) -> usize {
        self.inner.registry().listeners.len()
    }
}

impl<M> ReplayBus<M>
where
    M: Clone + Send + 'static,
{
    /// The most recently published message, if any.
    pub fn latest(&self) -> Option<M> {
        self.inner.registry().latest.clone()
    }

    /// Register a callback. It is called once immediately with the latest
    /// message (when there is one), then on every publish until the returned
    /// handle is dropped or [`SubscriptionHandle::unsubscribe`]d.
    pub fn subscribe_with<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(&M) + Send + Sync + 'static,
    {
        let (listener, replay) = {
            let mut registry = self.inner.registry();
            let listener = Arc::new(Listener {
                id: registry.next_id,
                seen: Mutex::new(0),
                handler: Box::new(handler),
            });
            registry.next_id += 1;
            registry.listeners.push(listener.clone());
            let version = registry.version;
            let replay = registry.latest.clone().map(|m| (version, m));
            (listener, replay)
        };

        // A publish racing with this replay may already have delivered
        // something newer, in which case `deliver` drops the replay.
        if let Some((version, message)) = replay {
            listener.deliver(version, &message);
        }

        let id = listener.id;
        let weak: Weak<Inner<M>> = Arc::downgrade(&self.inner);
        SubscriptionHandle {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.registry().listeners.retain(|l| l.id != id);
                }
            })),
        }
    }
}

impl<M> EventBus<M> for ReplayBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let _delivering = self
            .inner
            .delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let (version, listeners) = {
            let mut registry = self.inner.registry();
            registry.version += 1;
            registry.latest = Some(message.clone());
            registry.channels.retain(|tx| tx.send(message.clone()).is_ok());
            (registry.version, registry.listeners.clone())
        };

        for listener in listeners {
            listener.deliver(version, &message);
        }

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        let mut registry = self.inner.registry();
        let replayed = match &registry.latest {
            Some(latest) => tx.send(latest.clone()).is_ok(),
            None => true,
        };
        if replayed {
            registry.channels.push(tx);
        }

        Subscription::new(rx)
    }
}

/// Keeps a callback subscription alive. Dropping it unsubscribes.
#[must_use = "dropping the handle unsubscribes immediately"]
pub struct SubscriptionHandle {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    /// Stop receiving messages.
    pub fn unsubscribe(mut self) {
        self.detach_now();
    }

    fn detach_now(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl core::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("active", &self.detach.is_some())
            .finish()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.detach_now();
    }
}
