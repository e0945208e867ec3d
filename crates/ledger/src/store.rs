//! The ledger store: authoritative in-memory snapshot + mutation API.
//!
//! ## Mutation Flow
//!
//! ```text
//! call
//!   ↓
//! 1. Validate (guarded path only: would this debit overdraw?)
//!   ↓
//! 2. Build the next immutable snapshot
//!   ↓
//! 3. Persist it (SnapshotRepository::save → LedgerUpdated signal)
//!   ↓
//! 4. Swap it in as current
//!   ↓
//! 5. Broadcast it to every subscriber
//! ```
//!
//! A failure at step 3 aborts the mutation: the current snapshot is left as it
//! was and nothing is broadcast, so subscribers only ever see persisted state.
//!
//! ## Concurrency
//!
//! Mutations are serialised on one lock and run to completion before the call
//! returns, so broadcasts happen in mutation order. The current snapshot sits
//! behind a second, short-lived lock that readers never wait on for long.
//! Subscriber callbacks run on the mutating thread: they may read from the
//! store and subscribe to it, but they must not mutate it. A callback that
//! panics is logged and skipped; the mutation that triggered it still succeeds.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bankledger_core::{AccountKind, Amount, Clock, SystemClock, UserIdentity};
use bankledger_events::{
    EventBus, InMemoryEventBus, LedgerUpdated, ReplayBus, Subscription, SubscriptionHandle,
};

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::model::{LedgerSnapshot, Movement};
use crate::persistence::{KeyValueStorage, SnapshotRepository};
use crate::reference::{DOCUMENT_PREFIX, MOVEMENT_PREFIX, ReferenceGenerator, UuidReferences};
use crate::seed::SeedPlan;
use crate::session::SessionProvider;

/// Optional parameters of a movement.
///
/// Anything left unset is filled in by the store: the primary account, a
/// generated reference/document, and the clock's "now".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovementOptions {
    pub account: Option<AccountKind>,
    pub reference: Option<String>,
    pub document: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl MovementOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(mut self, kind: AccountKind) -> Self {
        self.account = Some(kind);
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }
}

#[derive(Debug, Clone)]
struct ActiveLedger {
    user: UserIdentity,
    snapshot: Arc<LedgerSnapshot>,
}

/// Ledger of the active user.
///
/// Construct one per session with [`LedgerStore::builder`] and hand it (usually
/// as `Arc<LedgerStore<_>>`) to every view that needs it.
pub struct LedgerStore<S> {
    repository: SnapshotRepository<S>,
    session: Arc<dyn SessionProvider>,
    clock: Arc<dyn Clock>,
    references: Arc<dyn ReferenceGenerator>,
    seed: SeedPlan,
    primary_account: AccountKind,
    /// Held for the whole of every mutation.
    mutating: Mutex<()>,
    state: Mutex<ActiveLedger>,
    snapshots: ReplayBus<Arc<LedgerSnapshot>>,
}

impl<S> core::fmt::Debug for LedgerStore<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LedgerStore")
            .field("primary_account", &self.primary_account)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Configures and opens a [`LedgerStore`].
pub struct LedgerStoreBuilder<S> {
    storage: S,
    session: Arc<dyn SessionProvider>,
    clock: Arc<dyn Clock>,
    references: Arc<dyn ReferenceGenerator>,
    seed: SeedPlan,
    primary_account: AccountKind,
    notifications: Option<Arc<InMemoryEventBus<LedgerUpdated>>>,
}

impl<S> LedgerStoreBuilder<S>
where
    S: KeyValueStorage,
{
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn references(mut self, references: impl ReferenceGenerator + 'static) -> Self {
        self.references = Arc::new(references);
        self
    }

    pub fn seed(mut self, seed: SeedPlan) -> Self {
        self.seed = seed;
        self
    }

    /// Account used when a movement does not name one.
    pub fn primary_account(mut self, kind: AccountKind) -> Self {
        self.primary_account = kind;
        self
    }

    /// Apply the settings carried by `config`.
    pub fn config(self, config: &LedgerConfig) -> Self {
        self.primary_account(config.primary_account.clone())
    }

    /// Publish [`LedgerUpdated`] on a shared bus instead of a private one.
    pub fn notifications(mut self, bus: Arc<InMemoryEventBus<LedgerUpdated>>) -> Self {
        self.notifications = Some(bus);
        self
    }

    /// Load (or seed) the active user's ledger, persist it and make it current.
    pub fn open(self) -> Result<LedgerStore<S>, LedgerError> {
        if !self.seed.contains(&self.primary_account) {
            return Err(LedgerError::UnknownAccount(self.primary_account));
        }

        let repository = match self.notifications {
            Some(bus) => SnapshotRepository::with_notifications(self.storage, bus),
            None => SnapshotRepository::new(self.storage),
        };

        let user = self.session.active_user();
        let snapshot = repository
            .load(&user)
            .unwrap_or_else(|| self.seed.build(self.clock.now()));
        repository.save(&user, &snapshot)?;

        tracing::info!(%user, movements = snapshot.movements().len(), "ledger opened");

        let snapshot = Arc::new(snapshot);
        Ok(LedgerStore {
            repository,
            session: self.session,
            clock: self.clock,
            references: self.references,
            seed: self.seed,
            primary_account: self.primary_account,
            mutating: Mutex::new(()),
            state: Mutex::new(ActiveLedger {
                user,
                snapshot: snapshot.clone(),
            }),
            snapshots: ReplayBus::with_initial(snapshot),
        })
    }
}

impl<S> LedgerStore<S>
where
    S: KeyValueStorage,
{
    pub fn builder(storage: S, session: impl SessionProvider + 'static) -> LedgerStoreBuilder<S> {
        LedgerStoreBuilder {
            storage,
            session: Arc::new(session),
            clock: Arc::new(SystemClock),
            references: Arc::new(UuidReferences),
            seed: SeedPlan::standard(),
            primary_account: AccountKind::savings(),
            notifications: None,
        }
    }

    /// The canonical seed snapshot, stamped with the current time.
    pub fn initialize_default(&self) -> LedgerSnapshot {
        self.seed.build(self.clock.now())
    }

    /// Switch to the session's active user: load their ledger (or seed a new
    /// one), persist it and broadcast it.
    ///
    /// Call on every login so a new identity never inherits the previous one's
    /// in-memory ledger.
    pub fn reload_for_active_user(&self) -> Result<(), LedgerError> {
        let _mutating = self.begin();
        let user = self.session.active_user();

        let snapshot = match self.repository.load(&user) {
            Some(snapshot) => snapshot,
            None => {
                tracing::info!(%user, "no persisted ledger; starting from seed");
                self.initialize_default()
            }
        };

        self.commit(user.clone(), snapshot)?;
        tracing::info!(%user, "ledger reloaded");
        Ok(())
    }

    /// Replace the current ledger with the seed snapshot ("restore balance").
    pub fn reset_to_seed(&self) -> Result<(), LedgerError> {
        let _mutating = self.begin();
        let user = self.active().user;
        let seed = self.initialize_default();

        self.commit(user.clone(), seed)?;
        tracing::info!(%user, "ledger reset to seed");
        Ok(())
    }

    /// Does the account of `kind` hold at least `amount`?
    ///
    /// `amount` is a magnitude: negative amounts and unknown kinds give `false`.
    pub fn can_debit(&self, amount: Amount, kind: &AccountKind) -> bool {
        covers(&self.current_snapshot(), amount, kind)
    }

    /// Record a movement unless it is a debit the account cannot cover.
    ///
    /// Returns `Ok(false)` when funds are insufficient (or the account does not
    /// exist for a debit); in that case nothing is changed, persisted or
    /// broadcast. Credits are never blocked.
    pub fn try_record_movement(
        &self,
        description: impl Into<String>,
        amount: Amount,
        options: MovementOptions,
    ) -> Result<bool, LedgerError> {
        let kind = self.resolve_account(&options);
        let _mutating = self.begin();
        let active = self.active();

        if amount < Decimal::ZERO && !covers(&active.snapshot, amount.abs(), &kind) {
            tracing::warn!(
                user = %active.user,
                %kind,
                %amount,
                "debit rejected: insufficient funds"
            );
            return Ok(false);
        }

        self.record(active, description.into(), amount, kind, options)?;
        Ok(true)
    }

    /// Record a movement without any balance check.
    ///
    /// Overdraft protection is the caller's business here; use
    /// [`LedgerStore::try_record_movement`] for that. Fails with
    /// [`LedgerError::UnknownAccount`] if the account does not exist.
    pub fn record_movement(
        &self,
        description: impl Into<String>,
        amount: Amount,
        options: MovementOptions,
    ) -> Result<Movement, LedgerError> {
        let kind = self.resolve_account(&options);
        let _mutating = self.begin();
        let active = self.active();
        self.record(active, description.into(), amount, kind, options)
    }

    /// The latest snapshot.
    pub fn current_snapshot(&self) -> Arc<LedgerSnapshot> {
        self.active().snapshot
    }

    /// Identity the current snapshot belongs to.
    pub fn active_user(&self) -> UserIdentity {
        self.active().user
    }

    pub fn primary_account(&self) -> &AccountKind {
        &self.primary_account
    }

    /// Channel of snapshots, starting with the current one.
    pub fn subscribe(&self) -> Subscription<Arc<LedgerSnapshot>> {
        self.snapshots.subscribe()
    }

    /// Call `handler` with the current snapshot now and with every new one
    /// until the handle is dropped.
    pub fn subscribe_with<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Arc<LedgerSnapshot>) + Send + Sync + 'static,
    {
        self.snapshots.subscribe_with(handler)
    }

    /// The process-wide [`LedgerUpdated`] signal fired after each write.
    pub fn watch_storage(&self) -> Subscription<LedgerUpdated> {
        self.repository.watch()
    }

    /// The guarded data is `()`, so a poisoned lock carries no broken state.
    fn begin(&self) -> MutexGuard<'_, ()> {
        self.mutating.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active(&self) -> ActiveLedger {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn resolve_account(&self, options: &MovementOptions) -> AccountKind {
        options
            .account
            .clone()
            .unwrap_or_else(|| self.primary_account.clone())
    }

    /// Caller holds the mutation lock.
    fn record(
        &self,
        active: ActiveLedger,
        description: String,
        amount: Amount,
        kind: AccountKind,
        options: MovementOptions,
    ) -> Result<Movement, LedgerError> {
        let movement = Movement {
            timestamp: options.timestamp.unwrap_or_else(|| self.clock.now()),
            description,
            reference: non_blank(options.reference)
                .unwrap_or_else(|| self.references.next(MOVEMENT_PREFIX)),
            document: non_blank(options.document)
                .unwrap_or_else(|| self.references.next(DOCUMENT_PREFIX)),
            amount,
        };

        let next = active.snapshot.applying(&kind, movement.clone())?;
        let user = active.user;
        self.commit(user.clone(), next)?;

        tracing::info!(
            %user,
            %kind,
            %amount,
            reference = %movement.reference,
            "movement recorded"
        );
        Ok(movement)
    }

    /// Persist `next`, make it current and broadcast it, in that order.
    /// Caller holds the mutation lock.
    fn commit(&self, user: UserIdentity, next: LedgerSnapshot) -> Result<(), LedgerError> {
        if let Err(err) = self.repository.save(&user, &next) {
            tracing::error!(%user, error = %err, "failed to persist ledger; change discarded");
            return Err(err.into());
        }

        let next = Arc::new(next);
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = ActiveLedger {
            user,
            snapshot: next.clone(),
        };

        if let Err(err) = self.snapshots.publish(next) {
            tracing::warn!(error = %err, "failed to broadcast ledger snapshot");
        }
        Ok(())
    }
}

fn covers(snapshot: &LedgerSnapshot, amount: Amount, kind: &AccountKind) -> bool {
    if amount < Decimal::ZERO {
        return false;
    }
    snapshot
        .balance_of(kind)
        .is_some_and(|balance| balance >= amount)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
