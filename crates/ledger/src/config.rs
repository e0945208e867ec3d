//! Configuration loading from the environment.

use std::path::PathBuf;

use thiserror::Error;

use bankledger_core::{AccountKind, DomainError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var}: {source}")]
    Invalid {
        var: &'static str,
        #[source]
        source: DomainError,
    },
}

/// Runtime settings of the ledger engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Directory for file-backed storage. `None` = keep ledgers in memory.
    pub data_dir: Option<PathBuf>,
    /// Account used when a movement does not name one.
    pub primary_account: AccountKind,
    /// Identity to start the session with (demo/CLI use).
    pub user: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            primary_account: AccountKind::savings(),
            user: None,
        }
    }
}

impl LedgerConfig {
    pub const DATA_DIR_VAR: &'static str = "BANKLEDGER_DATA_DIR";
    pub const PRIMARY_ACCOUNT_VAR: &'static str = "BANKLEDGER_PRIMARY_ACCOUNT";
    pub const USER_VAR: &'static str = "BANKLEDGER_USER";

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// Blank paths and users count as unset; a set-but-blank primary account is
    /// an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get(Self::DATA_DIR_VAR) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(kind) = lookup(Self::PRIMARY_ACCOUNT_VAR) {
            config.primary_account = AccountKind::new(kind).map_err(|source| ConfigError::Invalid {
                var: Self::PRIMARY_ACCOUNT_VAR,
                source,
            })?;
        }
        config.user = get(Self::USER_VAR);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.primary_account, AccountKind::savings());
    }

    #[test]
    fn reads_all_variables() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("BANKLEDGER_DATA_DIR", "/tmp/ledgers"),
            ("BANKLEDGER_PRIMARY_ACCOUNT", "checking"),
            ("BANKLEDGER_USER", "alice"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/ledgers")));
        assert_eq!(config.primary_account, AccountKind::checking());
        assert_eq!(config.user.as_deref(), Some("alice"));
    }

    #[test]
    fn blank_path_and_user_are_ignored() {
        let config = LedgerConfig::from_lookup(lookup(&[
            ("BANKLEDGER_DATA_DIR", " "),
            ("BANKLEDGER_USER", ""),
        ]))
        .unwrap();
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn blank_primary_account_is_rejected() {
        let err = LedgerConfig::from_lookup(lookup(&[("BANKLEDGER_PRIMARY_ACCOUNT", "  ")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                var: "BANKLEDGER_PRIMARY_ACCOUNT",
                ..
            }
        ));
    }
}
