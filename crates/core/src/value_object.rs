//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two movements with
/// the same fields are the same movement as far as any reader is concerned. To
/// "modify" one, build a new value.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Tag(String);
///
/// impl ValueObject for Tag {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
