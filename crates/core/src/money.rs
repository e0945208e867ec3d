//! Monetary amounts.
//!
//! Balances and movement amounts are exact decimals in the ledger's base
//! currency unit. Floats never appear on the money path.

/// Signed decimal amount. Negative = money leaving an account.
pub type Amount = rust_decimal::Decimal;
