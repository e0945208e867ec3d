//! Black-box tests of the ledger engine through its public API.
//!
//! Covers the balance guard, ordering, reload/isolation across identities and
//! durability through file storage.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bankledger_core::{AccountKind, FixedClock, UserIdentity};
use bankledger_ledger::{
    FileStorage, InMemoryStorage, KeyValueStorage, LedgerStore, MovementOptions, SeedPlan,
    SequentialReferences, StaticSession, derive_key,
};

fn fixed_clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap())
}

fn open_store<S: KeyValueStorage>(storage: S, session: Arc<StaticSession>) -> LedgerStore<S> {
    LedgerStore::builder(storage, session)
        .clock(fixed_clock())
        .references(SequentialReferences::new())
        .open()
        .unwrap()
}

fn fresh_store(user: &str) -> LedgerStore<InMemoryStorage> {
    open_store(InMemoryStorage::new(), Arc::new(StaticSession::new(user)))
}

fn savings() -> MovementOptions {
    MovementOptions::new().account(AccountKind::savings())
}

/// Whole-unit amounts up to 2,000,000 with two decimal places.
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..200_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

#[test]
fn bill_payment_scenario() {
    let store = fresh_store("alice");
    let seed_len = store.current_snapshot().movements().len();

    assert!(store.try_record_movement("bill", dec!(-45000), savings()).unwrap());
    let snap = store.current_snapshot();
    assert_eq!(snap.balance_of(&AccountKind::savings()), Some(dec!(955000)));
    assert_eq!(snap.movements().len(), seed_len + 1);

    assert!(!store.try_record_movement("bill2", dec!(-2000000), savings()).unwrap());
    let snap = store.current_snapshot();
    assert_eq!(snap.balance_of(&AccountKind::savings()), Some(dec!(955000)));
    assert_eq!(snap.movements().len(), seed_len + 1);
}

#[test]
fn initialize_default_matches_the_documented_seed() {
    let store = fresh_store("alice");
    let seed = store.initialize_default();

    assert_eq!(seed.accounts().len(), 3);
    assert_eq!(seed.movements().len(), 1);
    assert_eq!(seed.movements()[0].amount, Decimal::ZERO);
    assert_eq!(seed.total_balance(), dec!(1000000));
    assert_eq!(seed.total_balance(), SeedPlan::standard().total());
}

#[test]
fn reloading_twice_yields_identical_snapshots() {
    let storage = Arc::new(InMemoryStorage::new());
    let store = open_store(storage.clone(), Arc::new(StaticSession::new("alice")));
    store.record_movement("deposit", dec!(12.34), savings()).unwrap();
    let key = derive_key(&UserIdentity::new("alice"));

    store.reload_for_active_user().unwrap();
    let first = serde_json::to_string(&*store.current_snapshot()).unwrap();
    let first_stored = storage.get(&key).unwrap();

    store.reload_for_active_user().unwrap();
    let second = serde_json::to_string(&*store.current_snapshot()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_stored, storage.get(&key).unwrap());
}

#[test]
fn identities_never_see_each_others_ledgers() {
    let session = Arc::new(StaticSession::new("alice"));
    let store = open_store(InMemoryStorage::new(), session.clone());
    store.try_record_movement("alice rent", dec!(-900), savings()).unwrap();

    session.login("bob");
    store.reload_for_active_user().unwrap();
    let bob = store.current_snapshot();
    assert!(bob.movements().iter().all(|m| m.description != "alice rent"));
    assert_eq!(bob.balance_of(&AccountKind::savings()), Some(dec!(1000000)));

    store.record_movement("bob salary", dec!(50), savings()).unwrap();

    session.login("ALICE");
    store.reload_for_active_user().unwrap();
    let alice = store.current_snapshot();
    assert_eq!(alice.movements()[0].description, "alice rent");
    assert!(alice.movements().iter().all(|m| m.description != "bob salary"));
}

#[test]
fn corrupt_persisted_ledger_falls_back_to_seed() {
    let storage = Arc::new(InMemoryStorage::new());
    storage
        .set(&derive_key(&UserIdentity::new("alice")), "[garbage")
        .unwrap();

    let store = open_store(storage, Arc::new(StaticSession::new("alice")));

    assert_eq!(*store.current_snapshot(), SeedPlan::standard().build(fixed_clock().0));
}

#[test]
fn file_storage_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = open_store(
            FileStorage::open(dir.path()).unwrap(),
            Arc::new(StaticSession::new("alice")),
        );
        store
            .try_record_movement("Top-up Claro 3001234567", dec!(-20000), savings().document("RCG"))
            .unwrap();
    }

    let reopened = open_store(
        FileStorage::open(dir.path()).unwrap(),
        Arc::new(StaticSession::new("alice")),
    );
    let snap = reopened.current_snapshot();
    assert_eq!(snap.balance_of(&AccountKind::savings()), Some(dec!(980000)));
    assert_eq!(snap.movements()[0].document, "RCG");
}

#[test]
fn every_write_fires_the_storage_signal() {
    let store = fresh_store("alice");
    let watcher = store.watch_storage();

    store.record_movement("a", dec!(1), savings()).unwrap();
    store.reset_to_seed().unwrap();
    store.try_record_movement("too much", dec!(-5000000), savings()).unwrap();

    assert_eq!(watcher.drain().len(), 2);
}

#[test]
fn late_subscriber_starts_from_the_current_snapshot() {
    let store = fresh_store("alice");
    store.record_movement("a", dec!(1), savings()).unwrap();

    let sub = store.subscribe();
    let first = sub.try_recv().unwrap();

    assert_eq!(first, store.current_snapshot());
    assert_eq!(first.movements().len(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    })]

    /// Property: a debit larger than the balance is refused and leaves the
    /// snapshot byte-for-byte unchanged.
    #[test]
    fn overdraft_is_refused(excess in 1i64..100_000_000) {
        let store = fresh_store("alice");
        let before = serde_json::to_string(&*store.current_snapshot()).unwrap();
        let balance = store.current_snapshot().balance_of(&AccountKind::savings()).unwrap();
        let debit = balance + Decimal::new(excess, 2);

        let accepted = store.try_record_movement("bill", -debit, savings()).unwrap();

        prop_assert!(!accepted);
        prop_assert_eq!(serde_json::to_string(&*store.current_snapshot()).unwrap(), before);
    }

    /// Property: a covered debit lowers the balance by exactly the amount and
    /// lands at the front of the history.
    #[test]
    fn covered_debit_is_exact(m in amount()) {
        let store = fresh_store("alice");
        let balance = store.current_snapshot().balance_of(&AccountKind::savings()).unwrap();
        prop_assume!(m <= balance);
        let count = store.current_snapshot().movements().len();

        prop_assert!(store.try_record_movement("bill", -m, savings()).unwrap());

        let snap = store.current_snapshot();
        prop_assert_eq!(snap.balance_of(&AccountKind::savings()), Some(balance - m));
        prop_assert_eq!(snap.movements().len(), count + 1);
        prop_assert_eq!(snap.movements()[0].amount, -m);
    }

    /// Property: credits always go through.
    #[test]
    fn credits_always_apply(m in amount(), kind in prop::sample::select(vec!["checking", "savings", "credit-card"])) {
        let store = fresh_store("alice");
        let kind = AccountKind::new(kind).unwrap();
        let balance = store.current_snapshot().balance_of(&kind).unwrap();

        prop_assert!(store.try_record_movement("deposit", m, MovementOptions::new().account(kind.clone())).unwrap());
        prop_assert_eq!(store.current_snapshot().balance_of(&kind), Some(balance + m));
    }

    /// Property: after N movements the history is newest-first with the seed
    /// movement last.
    #[test]
    fn history_is_newest_first(amounts in prop::collection::vec(amount(), 1..20)) {
        let store = fresh_store("alice");

        for (i, m) in amounts.iter().enumerate() {
            store.record_movement(format!("m{i}"), *m, savings()).unwrap();
        }

        let snap = store.current_snapshot();
        let n = amounts.len();
        prop_assert_eq!(snap.movements().len(), n + 1);
        prop_assert_eq!(&snap.movements()[0].description, &format!("m{}", n - 1));
        prop_assert_eq!(&snap.movements()[n - 1].description, "m0");
        prop_assert_eq!(&snap.movements()[n].reference, "INIT");
    }
}
