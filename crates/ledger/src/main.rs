use std::sync::Arc;

use anyhow::Context;
use rust_decimal::Decimal;

use bankledger_core::AccountKind;
use bankledger_ledger::{
    FileStorage, InMemoryStorage, KeyValueStorage, LedgerConfig, LedgerSnapshot, LedgerStore,
    MovementOptions, StaticSession,
};

fn main() -> anyhow::Result<()> {
    bankledger_observability::init();

    let config = LedgerConfig::from_env().context("invalid ledger configuration")?;
    let session = Arc::new(StaticSession::new(config.user.as_deref().unwrap_or_default()));

    match &config.data_dir {
        Some(dir) => {
            let storage = FileStorage::open(dir)
                .with_context(|| format!("failed to open ledger storage at {}", dir.display()))?;
            run(storage, session, &config)
        }
        None => {
            tracing::warn!(
                "{} not set; ledgers are kept in memory",
                LedgerConfig::DATA_DIR_VAR
            );
            run(InMemoryStorage::new(), session, &config)
        }
    }
}

/// Pay one bill the savings account can cover, then one it cannot.
fn run<S: KeyValueStorage>(
    storage: S,
    session: Arc<StaticSession>,
    config: &LedgerConfig,
) -> anyhow::Result<()> {
    let store = LedgerStore::builder(storage, session)
        .config(config)
        .open()
        .context("failed to open ledger")?;

    let _view = store.subscribe_with(|snapshot: &Arc<LedgerSnapshot>| {
        tracing::info!(
            total = %snapshot.total_balance(),
            movements = snapshot.movements().len(),
            "balance view refreshed"
        );
    });

    store.reset_to_seed()?;

    let savings = MovementOptions::new().account(AccountKind::savings());

    let paid = store.try_record_movement("Bill payment", Decimal::new(-45_000, 0), savings.clone())?;
    tracing::info!(paid, "first bill");

    let paid = store.try_record_movement("Bill payment", Decimal::new(-2_000_000, 0), savings)?;
    if !paid {
        tracing::warn!("second bill refused: insufficient funds");
    }

    let snapshot = store.current_snapshot();
    tracing::info!(
        user = %store.active_user(),
        savings = ?snapshot.balance_of(&AccountKind::savings()),
        movements = snapshot.movements().len(),
        "done"
    );
    Ok(())
}
