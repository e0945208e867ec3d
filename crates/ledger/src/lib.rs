//! `bankledger-ledger`: the ledger engine.
//!
//! Owns account balances and the movement history of the active user, refuses
//! debits that would overdraw an account, persists every accepted change, and
//! republishes the resulting snapshot to any number of observers.
//!
//! ```text
//! caller ─► LedgerStore (validate) ─► new LedgerSnapshot ─► SnapshotRepository::save
//!                                                              │
//!                                   subscribers ◄─ ReplayBus ◄─┘ (only after a durable write)
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod persistence;
pub mod reference;
pub mod seed;
pub mod session;
pub mod store;

pub use config::{ConfigError, LedgerConfig};
pub use error::LedgerError;
pub use model::{Account, LedgerSnapshot, Movement};
pub use persistence::{
    FileStorage, InMemoryStorage, KeyValueStorage, PersistenceError, SnapshotRepository,
    StorageError, derive_key,
};
pub use reference::{ReferenceGenerator, SequentialReferences, UuidReferences};
pub use seed::{OpeningMovement, SeedPlan};
pub use session::{SessionProvider, StaticSession};
pub use store::{LedgerStore, LedgerStoreBuilder, MovementOptions};
