use std::sync::Arc;

use thiserror::Error;

use bankledger_core::UserIdentity;
use bankledger_events::{EventBus, InMemoryEventBus, LedgerUpdated, Subscription};

use super::storage::{KeyValueStorage, StorageError};
use crate::model::LedgerSnapshot;

const STORAGE_PREFIX: &str = "ledgerState:";

/// Storage key for a user's snapshot.
///
/// [`UserIdentity`] is already case-normalised, so distinct identities always
/// yield distinct keys.
pub fn derive_key(user: &UserIdentity) -> String {
    format!("{STORAGE_PREFIX}{}", user.as_str())
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Loads and saves per-user [`LedgerSnapshot`]s.
///
/// After every successful write a [`LedgerUpdated`] signal is published on the
/// notification bus, for collaborators that watch storage rather than
/// subscribing to snapshots.
pub struct SnapshotRepository<S> {
    storage: S,
    notifications: Arc<InMemoryEventBus<LedgerUpdated>>,
}

impl<S> SnapshotRepository<S> {
    pub fn new(storage: S) -> Self {
        Self::with_notifications(storage, Arc::new(InMemoryEventBus::new()))
    }

    /// Share an existing notification bus (e.g. one process-wide bus).
    pub fn with_notifications(storage: S, notifications: Arc<InMemoryEventBus<LedgerUpdated>>) -> Self {
        Self {
            storage,
            notifications,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S> SnapshotRepository<S>
where
    S: KeyValueStorage,
{
    /// Last persisted snapshot for `user`.
    ///
    /// Missing, unreadable and unparseable payloads all come back as `None`.
    pub fn load(&self, user: &UserIdentity) -> Option<LedgerSnapshot> {
        let key = derive_key(user);
        let raw = match self.storage.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(%key, error = %err, "failed to read persisted ledger; treating as absent");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(%key, error = %err, "persisted ledger is corrupt; treating as absent");
                None
            }
        }
    }

    /// Overwrite `user`'s snapshot, then signal [`LedgerUpdated`].
    pub fn save(&self, user: &UserIdentity, snapshot: &LedgerSnapshot) -> Result<(), PersistenceError> {
        let key = derive_key(user);
        let payload = serde_json::to_string(snapshot)?;
        self.storage.set(&key, &payload)?;

        // The write is durable at this point; a failed signal is not worth failing over.
        if let Err(err) = self.notifications.publish(LedgerUpdated) {
            tracing::warn!(%key, error = ?err, "failed to publish {}", LedgerUpdated::NAME);
        }
        Ok(())
    }

    /// Listen for the process-wide "ledger updated" signal.
    pub fn watch(&self) -> Subscription<LedgerUpdated> {
        self.notifications.subscribe()
    }
}
