//! Active-user lookup.
//!
//! Authentication lives elsewhere; the ledger only needs to know whose ledger
//! is active.

use std::sync::{Arc, RwLock};

use bankledger_core::UserIdentity;

/// "Who is logged in right now?"
pub trait SessionProvider: Send + Sync {
    /// The active identity, or [`UserIdentity::anonymous`] when nobody is.
    fn active_user(&self) -> UserIdentity;
}

impl<S> SessionProvider for Arc<S>
where
    S: SessionProvider + ?Sized,
{
    fn active_user(&self) -> UserIdentity {
        (**self).active_user()
    }
}

/// Session held in memory, switched explicitly by login/logout.
#[derive(Debug, Default)]
pub struct StaticSession {
    user: RwLock<UserIdentity>,
}

impl StaticSession {
    pub fn new(user: impl AsRef<str>) -> Self {
        Self {
            user: RwLock::new(UserIdentity::new(user)),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn login(&self, user: impl AsRef<str>) {
        if let Ok(mut current) = self.user.write() {
            *current = UserIdentity::new(user);
        }
    }

    pub fn logout(&self) {
        if let Ok(mut current) = self.user.write() {
            *current = UserIdentity::anonymous();
        }
    }
}

impl SessionProvider for StaticSession {
    fn active_user(&self) -> UserIdentity {
        self.user
            .read()
            .map(|u| u.clone())
            .unwrap_or_else(|_| UserIdentity::anonymous())
    }
}
