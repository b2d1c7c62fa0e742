use std::collections::HashMap;
use std::sync::RwLock;

use stockbook_core::{ExpectedVersion, ProductId};
use stockbook_stock::StockMovement;

use super::r#trait::{MovementStore, MovementStoreError, StoredMovement};

/// In-memory append-only movement store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryMovementStore {
    streams: RwLock<HashMap<ProductId, Vec<StoredMovement>>>,
}

impl InMemoryMovementStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream_version(stream: &[StoredMovement]) -> u64 {
        stream.last().map_or(0, StoredMovement::stream_version)
    }
}

impl MovementStore for InMemoryMovementStore {
    fn append(
        &self,
        movement: StockMovement,
        expected_version: ExpectedVersion,
    ) -> Result<StoredMovement, MovementStoreError> {
        let mut streams = self
            .streams
            .write()
            .map_err(|_| MovementStoreError::InvalidAppend("lock poisoned".to_string()))?;

        let stream = streams.entry(movement.product_id).or_default();
        let current = Self::stream_version(stream);

        expected_version
            .check(current)
            .map_err(|e| MovementStoreError::Concurrency(e.to_string()))?;

        // Every movement of a product belongs to the product's owner.
        if let Some(first) = stream.first() {
            if first.movement.owner_id != movement.owner_id {
                return Err(MovementStoreError::OwnerIsolation(format!(
                    "stream owner is '{}', attempted append by '{}'",
                    first.movement.owner_id, movement.owner_id
                )));
            }
        }

        let stored = StoredMovement {
            sequence_number: current + 1,
            movement,
        };
        stream.push(stored.clone());

        Ok(stored)
    }

    fn load_stream(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<StoredMovement>, MovementStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| MovementStoreError::InvalidAppend("lock poisoned".to_string()))?;

        Ok(streams.get(&product_id).cloned().unwrap_or_default())
    }

    fn current_version(&self, product_id: ProductId) -> Result<u64, MovementStoreError> {
        let streams = self
            .streams
            .read()
            .map_err(|_| MovementStoreError::InvalidAppend("lock poisoned".to_string()))?;

        Ok(streams
            .get(&product_id)
            .map(|s| Self::stream_version(s))
            .unwrap_or(0))
    }
}
