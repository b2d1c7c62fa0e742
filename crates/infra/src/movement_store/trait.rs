use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockbook_core::{Entity, ExpectedVersion, MovementId, ProductId};
use stockbook_stock::StockMovement;
use std::sync::Arc;

/// A movement persisted in a product stream (assigned a sequence number).
///
/// Sequence numbers are stream-scoped (one stream per product), start at 1,
/// increase by exactly 1 per append and never change once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMovement {
    /// Position in the product stream.
    pub sequence_number: u64,
    pub movement: StockMovement,
}

impl StoredMovement {
    pub fn stream_version(&self) -> u64 {
        self.sequence_number
    }
}

impl Entity for StoredMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.movement.id
    }
}

/// Movement store operation error.
///
/// These are **infrastructure errors** (storage, concurrency, isolation) as
/// opposed to domain errors (validation, insufficient stock).
#[derive(Debug, Error)]
pub enum MovementStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("owner isolation violation: {0}")]
    OwnerIsolation(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),
}

/// Append-only store of product movement streams.
///
/// ## Append semantics
///
/// `append()`:
/// - checks optimistic concurrency against the stream's current version
/// - rejects a movement whose owner differs from the stream's owner
/// - assigns `sequence_number = current_version + 1`
///
/// Appending with `ExpectedVersion::Exact(v)` where `v` is the version the
/// caller based its balance check on is what serializes concurrent writers of
/// the same product.
///
/// ## Load semantics
///
/// `load_stream()` returns the full stream in sequence order, or an empty
/// vector for a product without movements.
pub trait MovementStore: Send + Sync {
    /// Append one validated movement to its product stream.
    fn append(
        &self,
        movement: StockMovement,
        expected_version: ExpectedVersion,
    ) -> Result<StoredMovement, MovementStoreError>;

    /// Load the full stream for a product.
    fn load_stream(&self, product_id: ProductId) -> Result<Vec<StoredMovement>, MovementStoreError>;

    /// Sequence number of the last movement (0 for an empty stream).
    fn current_version(&self, product_id: ProductId) -> Result<u64, MovementStoreError>;
}

impl<S> MovementStore for Arc<S>
where
    S: MovementStore + ?Sized,
{
    fn append(
        &self,
        movement: StockMovement,
        expected_version: ExpectedVersion,
    ) -> Result<StoredMovement, MovementStoreError> {
        (**self).append(movement, expected_version)
    }

    fn load_stream(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StoredMovement>, MovementStoreError> {
        (**self).load_stream(product_id)
    }

    fn current_version(&self, product_id: ProductId) -> Result<u64, MovementStoreError> {
        (**self).current_version(product_id)
    }
}
