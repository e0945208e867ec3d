//! `bankledger-events`: publish/subscribe mechanics.
//!
//! Two flavours of bus live here:
//! - [`InMemoryEventBus`]: plain fan-out of every published message (used for
//!   the process-wide [`LedgerUpdated`] signal).
//! - [`ReplayBus`]: fan-out that remembers the latest message and hands it to
//!   every new subscriber first (used for ledger snapshots).

pub mod bus;
pub mod in_memory_bus;
pub mod notification;
pub mod replay_bus;

pub use bus::{EventBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use notification::LedgerUpdated;
pub use replay_bus::{ReplayBus, SubscriptionHandle};
