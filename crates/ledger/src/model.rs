//! Ledger data model: accounts, movements and the immutable snapshot.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bankledger_core::{AccountKind, Amount, DomainError, Entity, ValueObject};

use crate::error::LedgerError;

/// One account of the active user. At most one per [`AccountKind`] per snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub kind: AccountKind,
    /// Masked identifier (e.g. `****8932`). Display only, never a lookup key.
    pub display_number: String,
    pub balance: Amount,
    /// UI hint (icon class). No effect on the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Account {
    pub fn new(kind: AccountKind, display_number: impl Into<String>, balance: Amount) -> Self {
        Self {
            kind,
            display_number: display_number.into(),
            balance,
            icon: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

impl Entity for Account {
    type Id = AccountKind;

    fn id(&self) -> &Self::Id {
        &self.kind
    }
}

/// A recorded balance-affecting event (immutable, append-only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub reference: String,
    pub document: String,
    /// Negative = debit (money leaving the account), positive = credit.
    pub amount: Amount,
}

impl ValueObject for Movement {}

/// Complete state of one user's ledger at one point in time.
///
/// Never mutated after construction: every accepted change produces a new
/// snapshot. Movements are ordered newest-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot")]
pub struct LedgerSnapshot {
    accounts: Vec<Account>,
    movements: Vec<Movement>,
}

/// Wire shape; validated into [`LedgerSnapshot`] on the way in.
#[derive(Deserialize)]
struct RawSnapshot {
    accounts: Vec<Account>,
    #[serde(default)]
    movements: Vec<Movement>,
}

impl TryFrom<RawSnapshot> for LedgerSnapshot {
    type Error = DomainError;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        Self::new(raw.accounts, raw.movements)
    }
}

impl LedgerSnapshot {
    /// Build a snapshot, enforcing one account per kind.
    ///
    /// `movements` must already be newest-first.
    pub fn new(accounts: Vec<Account>, movements: Vec<Movement>) -> Result<Self, DomainError> {
        ensure_unique_kinds(&accounts)?;
        Ok(Self {
            accounts,
            movements,
        })
    }

    /// Caller guarantees kinds are unique.
    pub(crate) fn from_validated(accounts: Vec<Account>, movements: Vec<Movement>) -> Self {
        Self {
            accounts,
            movements,
        }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Newest first.
    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub fn account(&self, kind: &AccountKind) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id() == kind)
    }

    pub fn balance_of(&self, kind: &AccountKind) -> Option<Amount> {
        self.account(kind).map(|a| a.balance)
    }

    pub fn total_balance(&self) -> Amount {
        self.accounts.iter().map(|a| a.balance).sum()
    }

    /// The `n` most recent movements (fewer if the history is shorter).
    pub fn recent_movements(&self, n: usize) -> &[Movement] {
        &self.movements[..n.min(self.movements.len())]
    }

    /// New snapshot with `movement` applied to the account of `kind` and
    /// prepended to the history.
    pub(crate) fn applying(
        &self,
        kind: &AccountKind,
        movement: Movement,
    ) -> Result<Self, LedgerError> {
        let idx = self
            .accounts
            .iter()
            .position(|a| a.id() == kind)
            .ok_or_else(|| LedgerError::UnknownAccount(kind.clone()))?;

        let mut accounts = self.accounts.clone();
        let account = &mut accounts[idx];
        account.balance = account
            .balance
            .checked_add(movement.amount)
            .ok_or_else(|| DomainError::invariant(format!("balance overflow on '{kind}'")))?;

        let mut movements = Vec::with_capacity(self.movements.len() + 1);
        movements.push(movement);
        movements.extend(self.movements.iter().cloned());

        Ok(Self {
            accounts,
            movements,
        })
    }
}

pub(crate) fn ensure_unique_kinds(accounts: &[Account]) -> Result<(), DomainError> {
    let mut seen = HashSet::with_capacity(accounts.len());
    for account in accounts {
        if !seen.insert(account.id()) {
            return Err(DomainError::invariant(format!(
                "duplicate account kind '{}'",
                account.kind
            )));
        }
    }
    Ok(())
}
