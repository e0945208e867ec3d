//! Persistence adapter: per-user snapshot storage over a key/value backend.
//!
//! Pure I/O. The only "logic" here is key derivation and treating unreadable
//! payloads as absent.

mod file;
mod in_memory;
mod repository;
mod storage;

pub use file::FileStorage;
pub use in_memory::InMemoryStorage;
pub use repository::{PersistenceError, SnapshotRepository, derive_key};
pub use storage::{KeyValueStorage, StorageError};
