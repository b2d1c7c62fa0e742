//! Append-only movement store boundary.
//!
//! Defines the read/write API the ledger consumes for product movement
//! streams, without making any storage assumptions.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryMovementStore;
pub use r#trait::{MovementStore, MovementStoreError, StoredMovement};
