//! Process-wide change signals.

/// "Something changed in ledger storage, re-read it."
///
/// Published after every successful persistence write. Carries no payload:
/// consumers that are not direct snapshot subscribers use it purely as a cue to
/// reload from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerUpdated;

impl LedgerUpdated {
    pub const NAME: &'static str = "app:ledger-updated";
}
