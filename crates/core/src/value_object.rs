//! Value object trait: equality by value, not identity.
//!
//! Value objects have **no identity**: two value objects with the same
//! attributes are equal. A movement quantity is one; a movement is not.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// construct a new one. Constructors are the place to enforce their invariants
/// (e.g. a quantity that can never be zero).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
