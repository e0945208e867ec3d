//! Event publishing/subscription abstraction (mechanics only).
//!
//! This module provides the **pub/sub pattern** used to distribute ledger state
//! to any number of observers (views, background sync, other components).
//!
//! ## Design Philosophy
//!
//! The bus is intentionally **lightweight**:
//!
//! - **Transport-agnostic**: in-memory channels today, anything else tomorrow
//! - **Broadcast semantics**: every subscriber gets its own copy of each message
//! - **No persistence**: the bus distributes, storage is the source of truth
//!
//! Publishers persist first and publish second, so a subscriber never observes a
//! message describing state that was not durably written.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};

/// A channel subscription to a bus.
///
/// ## Usage Pattern
///
/// ```ignore
/// let subscription = bus.subscribe();
///
/// // On each tick of the owning loop:
/// if let Some(latest) = subscription.drain().pop() {
///     render(latest);
/// }
/// ```
///
/// Messages arrive in publication order. A subscription is meant to be consumed
/// by one thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Take every message that is already queued, without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Domain-agnostic pub/sub abstraction.
///
/// ## Error Handling
///
/// `publish()` can fail (e.g. a poisoned lock). Failures are surfaced to the
/// caller, which decides whether the originating operation still counts as done.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync` so a single bus can be shared through
/// an `Arc` by the store and every observer.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
