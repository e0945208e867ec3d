//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Within a ledger snapshot an account is identified by its kind, so lookups go
/// through `id()` rather than any display-only field.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
