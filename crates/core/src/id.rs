//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_object::ValueObject;

/// Identity of the active user (partition key for persisted ledgers).
///
/// Identities are case-insensitive: the value is trimmed and lower-cased on
/// construction, so `" Alice "` and `"alice"` name the same ledger. A blank
/// identity collapses to the anonymous sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserIdentity(String);

impl UserIdentity {
    /// Sentinel used when no user is logged in.
    pub const ANONYMOUS: &'static str = "anon";

    pub fn new(raw: impl AsRef<str>) -> Self {
        let normalized = raw.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            Self::anonymous()
        } else {
            Self(normalized)
        }
    }

    pub fn anonymous() -> Self {
        Self(Self::ANONYMOUS.to_string())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0 == Self::ANONYMOUS
    }
}

impl Default for UserIdentity {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// Category tag of an account (e.g. `checking`, `savings`, `credit-card`).
///
/// This is an open set: new kinds need no engine changes. The only rule is that
/// the tag is non-blank once trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountKind(String);

impl AccountKind {
    pub const CHECKING: &'static str = "checking";
    pub const SAVINGS: &'static str = "savings";
    pub const CREDIT_CARD: &'static str = "credit-card";

    pub fn new(raw: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("account kind must not be blank"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn checking() -> Self {
        Self(Self::CHECKING.to_string())
    }

    pub fn savings() -> Self {
        Self(Self::SAVINGS.to_string())
    }

    pub fn credit_card() -> Self {
        Self(Self::CREDIT_CARD.to_string())
    }
}

impl TryFrom<String> for AccountKind {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountKind> for String {
    fn from(value: AccountKind) -> Self {
        value.0
    }
}

macro_rules! impl_string_newtype {
    ($t:ty) => {
        impl $t {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $t {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ValueObject for $t {}
    };
}

impl_string_newtype!(UserIdentity);
impl_string_newtype!(AccountKind);

impl FromStr for UserIdentity {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl FromStr for AccountKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
