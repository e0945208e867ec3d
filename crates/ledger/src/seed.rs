//! Canonical seed snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bankledger_core::{AccountKind, Amount, DomainError};

use crate::model::{Account, LedgerSnapshot, Movement, ensure_unique_kinds};

/// The synthetic zero-amount movement every seed snapshot starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpeningMovement {
    pub description: String,
    pub reference: String,
    pub document: String,
}

impl Default for OpeningMovement {
    fn default() -> Self {
        Self {
            description: "Opening balance".to_string(),
            reference: "INIT".to_string(),
            document: "INIT".to_string(),
        }
    }
}

/// Accounts and opening movement used for new users and for resets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPlan {
    accounts: Vec<Account>,
    opening: OpeningMovement,
}

impl SeedPlan {
    pub fn new(accounts: Vec<Account>, opening: OpeningMovement) -> Result<Self, DomainError> {
        if accounts.is_empty() {
            return Err(DomainError::validation("seed plan needs at least one account"));
        }
        ensure_unique_kinds(&accounts)?;
        Ok(Self { accounts, opening })
    }

    /// Checking and credit card at zero, savings pre-funded with 1,000,000.
    pub fn standard() -> Self {
        Self {
            accounts: vec![
                Account::new(AccountKind::checking(), "****4521", Decimal::ZERO)
                    .with_icon("bi bi-wallet2"),
                Account::new(AccountKind::savings(), "****8932", Decimal::new(1_000_000, 0))
                    .with_icon("bi bi-piggy-bank"),
                Account::new(AccountKind::credit_card(), "****3456", Decimal::ZERO)
                    .with_icon("bi bi-credit-card-2-front"),
            ],
            opening: OpeningMovement::default(),
        }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn contains(&self, kind: &AccountKind) -> bool {
        self.accounts.iter().any(|a| &a.kind == kind)
    }

    /// Sum of the seeded balances.
    pub fn total(&self) -> Amount {
        self.accounts.iter().map(|a| a.balance).sum()
    }

    /// Materialise the seed snapshot, stamping the opening movement at `at`.
    pub fn build(&self, at: DateTime<Utc>) -> LedgerSnapshot {
        let opening = Movement {
            timestamp: at,
            description: self.opening.description.clone(),
            reference: self.opening.reference.clone(),
            document: self.opening.document.clone(),
            amount: Decimal::ZERO,
        };
        LedgerSnapshot::from_validated(self.accounts.clone(), vec![opening])
    }
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self::standard()
    }
}
