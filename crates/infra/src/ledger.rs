//! Stock ledger service (application-level orchestration).
//!
//! Owner-scoped write path for stock movements plus the read views of the
//! stock screen (per-product summaries, movement history, movement detail).
//!
//! ## Write flow
//!
//! ```text
//! NewMovement + caller
//!   ↓
//! 1. Resolve product, check caller owns it
//!   ↓
//! 2. Bind owner, stamp timestamps, default date
//!   ↓
//! 3. Load stream + rehydrate ProductStock (or reuse running total)
//!   ↓
//! 4. Decide (pure; InsufficientStock short-circuits, nothing persisted)
//!   ↓
//! 5. Append with ExpectedVersion::Exact(version); on conflict reload and retry
//! ```
//!
//! Step 5 is the per-product serialization point: a balance check is only
//! ever committed against the exact stream version it was computed from.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use stockbook_core::entity::find_by_id;
use stockbook_core::{
    Aggregate, AggregateRoot, DomainError, ExpectedVersion, MovementId, OwnerId, ProductId,
};
use stockbook_stock::{NewMovement, ProductStock, RecordMovement, StockCommand, compute_balance};

use crate::catalog::{Product, ProductCatalog};
use crate::config::{BalanceMode, LedgerConfig};
use crate::movement_store::{MovementStore, MovementStoreError, StoredMovement};

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Outgoing movement exceeds stock on hand; nothing was recorded.
    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i64, requested: u32 },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Caller does not own the product.
    #[error("unauthorized")]
    Unauthorized,

    /// Unknown product or movement.
    #[error("not found")]
    NotFound,

    /// Concurrent appends kept winning after all retries.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    #[error("owner isolation violation: {0}")]
    OwnerIsolation(String),

    /// A loaded stream failed validation.
    #[error("corrupted movement stream: {0}")]
    Corrupted(String),

    #[error("movement store failure: {0}")]
    Store(#[source] MovementStoreError),
}

impl LedgerError {
    /// Stock available at the time of an `InsufficientStock` rejection.
    pub fn available_stock(&self) -> Option<i64> {
        match self {
            LedgerError::InsufficientStock { available, .. } => Some(*available),
            _ => None,
        }
    }
}

impl From<MovementStoreError> for LedgerError {
    fn from(value: MovementStoreError) -> Self {
        match value {
            MovementStoreError::Concurrency(msg) => LedgerError::Concurrency(msg),
            MovementStoreError::OwnerIsolation(msg) => LedgerError::OwnerIsolation(msg),
            other => LedgerError::Store(other),
        }
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => LedgerError::Validation(msg),
            DomainError::InvalidId(msg) => LedgerError::Validation(msg),
            DomainError::InvariantViolation(msg) => LedgerError::InvariantViolation(msg),
            DomainError::Conflict(msg) => LedgerError::Concurrency(msg),
            DomainError::Unauthorized => LedgerError::Unauthorized,
            DomainError::NotFound => LedgerError::NotFound,
            DomainError::InsufficientStock {
                available,
                requested,
            } => LedgerError::InsufficientStock {
                available,
                requested,
            },
        }
    }
}

/// Outcome of an accepted movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedMovement {
    pub movement: StoredMovement,
    /// Product balance right after the append.
    pub balance: i64,
}

/// One row of the stock overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockSummary {
    pub product_id: ProductId,
    pub name: String,
    pub price: Option<u64>,
    pub available: i64,
    /// Latest `updated_at` among the product's movements.
    pub last_updated: Option<DateTime<Utc>>,
}

/// A single movement with its product context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementDetail {
    pub movement: StoredMovement,
    pub product_name: String,
    /// Current balance of the product (not the balance at the movement).
    pub available: i64,
}

/// Folded position of one product, as kept by the running-total cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunningTotal {
    owner_id: Option<OwnerId>,
    balance: i64,
    version: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl RunningTotal {
    fn of(stock: &ProductStock) -> Self {
        Self {
            owner_id: stock.owner_id(),
            balance: stock.balance(),
            version: stock.version(),
            last_updated: stock.last_updated(),
        }
    }

    fn resume(self, product_id: ProductId) -> ProductStock {
        ProductStock::from_snapshot(
            product_id,
            self.owner_id,
            self.balance,
            self.version,
            self.last_updated,
        )
    }
}

/// Stock ledger over a movement store and a product catalog.
#[derive(Debug)]
pub struct StockLedger<S, C> {
    store: S,
    catalog: C,
    config: LedgerConfig,
    running_totals: RwLock<HashMap<ProductId, RunningTotal>>,
}

impl<S, C> StockLedger<S, C> {
    pub fn new(store: S, catalog: C, config: LedgerConfig) -> Self {
        Self {
            store,
            catalog,
            config,
            running_totals: RwLock::new(HashMap::new()),
        }
    }
}

impl<S, C> StockLedger<S, C>
where
    S: MovementStore,
    C: ProductCatalog,
{
    /// Record a movement on behalf of `caller`.
    ///
    /// The movement's owner is always `caller`. An outgoing movement larger
    /// than the current balance returns [`LedgerError::InsufficientStock`]
    /// and leaves the stream unchanged.
    pub fn record_movement(
        &self,
        caller: OwnerId,
        draft: NewMovement,
    ) -> Result<RecordedMovement, LedgerError> {
        let product = self.owned_product(caller, draft.product_id)?;
        let direction = draft.direction;
        let quantity = draft.quantity.get();
        let command = StockCommand::RecordMovement(RecordMovement {
            movement: draft.into_movement(caller, Utc::now()),
        });

        let mut retries = 0u32;
        loop {
            let stock = self.load_stock(product.id)?;

            let decided = match stock.handle(&command) {
                Ok(events) => events,
                Err(DomainError::InsufficientStock {
                    available,
                    requested,
                }) => {
                    tracing::warn!(
                        product_id = %product.id,
                        owner_id = %caller,
                        available,
                        requested,
                        "insufficient stock; movement not recorded"
                    );
                    return Err(LedgerError::InsufficientStock {
                        available,
                        requested,
                    });
                }
                Err(e) => return Err(e.into()),
            };

            let Some(event) = decided.into_iter().next() else {
                return Err(LedgerError::InvariantViolation(
                    "no movement decided".to_string(),
                ));
            };

            let expected = ExpectedVersion::Exact(stock.version());
            match self.store.append(event.clone().into_movement(), expected) {
                Ok(stored) => {
                    let mut next = stock;
                    next.apply(&event);
                    let balance = next.balance();
                    self.remember(&next);

                    tracing::info!(
                        product_id = %product.id,
                        owner_id = %caller,
                        direction = %direction,
                        quantity,
                        balance,
                        sequence_number = stored.sequence_number,
                        event_type = event.event_type(),
                        occurred_at = %event.occurred_at(),
                        "stock movement recorded"
                    );
                    return Ok(RecordedMovement {
                        movement: stored,
                        balance,
                    });
                }
                Err(MovementStoreError::Concurrency(msg))
                    if retries < self.config.max_conflict_retries =>
                {
                    retries += 1;
                    self.forget(product.id);
                    tracing::debug!(
                        product_id = %product.id,
                        retries,
                        "concurrent append detected, retrying: {msg}"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Current stock of one of `caller`'s products.
    pub fn balance(&self, caller: OwnerId, product_id: ProductId) -> Result<i64, LedgerError> {
        let product = self.owned_product(caller, product_id)?;
        match self.config.balance_mode {
            BalanceMode::Recompute => {
                let stream = self.load_validated(product.id)?;
                Ok(compute_balance(
                    product.id,
                    stream.iter().map(|s| &s.movement),
                ))
            }
            BalanceMode::RunningTotal => Ok(self.load_stock(product.id)?.balance()),
        }
    }

    /// Movement history of one of `caller`'s products, in sequence order.
    pub fn movements(
        &self,
        caller: OwnerId,
        product_id: ProductId,
    ) -> Result<Vec<StoredMovement>, LedgerError> {
        let product = self.owned_product(caller, product_id)?;
        self.load_validated(product.id)
    }

    /// Stock overview of every product owned by `caller`, ordered by name.
    pub fn list_stock(&self, caller: OwnerId) -> Result<Vec<StockSummary>, LedgerError> {
        self.catalog
            .list_for_owner(caller)
            .into_iter()
            .map(|product| {
                let stock = self.load_stock(product.id)?;
                Ok::<_, LedgerError>(StockSummary {
                    product_id: product.id,
                    name: product.name,
                    price: product.price,
                    available: stock.balance(),
                    last_updated: stock.last_updated(),
                })
            })
            .collect()
    }

    /// A single movement of one of `caller`'s products.
    pub fn movement_detail(
        &self,
        caller: OwnerId,
        product_id: ProductId,
        movement_id: MovementId,
    ) -> Result<MovementDetail, LedgerError> {
        let product = self.owned_product(caller, product_id)?;
        let stream = self.load_validated(product.id)?;
        let available = compute_balance(product.id, stream.iter().map(|s| &s.movement));
        let movement = find_by_id(&stream, &movement_id)
            .cloned()
            .ok_or(LedgerError::NotFound)?;

        Ok(MovementDetail {
            movement,
            product_name: product.name,
            available,
        })
    }

    fn owned_product(
        &self,
        caller: OwnerId,
        product_id: ProductId,
    ) -> Result<Product, LedgerError> {
        let product = self.catalog.get(product_id).ok_or(LedgerError::NotFound)?;
        if product.owner_id != caller {
            tracing::warn!(
                product_id = %product_id,
                owner_id = %caller,
                "access to a product owned by another account"
            );
            return Err(LedgerError::Unauthorized);
        }
        Ok(product)
    }

    fn load_validated(&self, product_id: ProductId) -> Result<Vec<StoredMovement>, LedgerError> {
        let stream = self.store.load_stream(product_id)?;
        validate_loaded_stream(product_id, &stream)?;
        Ok(stream)
    }

    fn load_stock(&self, product_id: ProductId) -> Result<ProductStock, LedgerError> {
        if self.config.balance_mode == BalanceMode::RunningTotal {
            let current = self.store.current_version(product_id)?;
            if let Some(position) = self.cached(product_id) {
                if position.version == current {
                    return Ok(position.resume(product_id));
                }
            }
        }

        let stream = self.load_validated(product_id)?;
        let stock = ProductStock::rehydrate(product_id, stream.iter().map(|s| &s.movement));
        self.remember(&stock);
        Ok(stock)
    }

    fn cached(&self, product_id: ProductId) -> Option<RunningTotal> {
        let map = self.running_totals.read().ok()?;
        map.get(&product_id).copied()
    }

    fn remember(&self, stock: &ProductStock) {
        if self.config.balance_mode != BalanceMode::RunningTotal {
            return;
        }
        if let Ok(mut map) = self.running_totals.write() {
            // Never replace a newer position with an older one.
            let newer_known = map
                .get(&stock.product_id())
                .is_some_and(|known| known.version > stock.version());
            if !newer_known {
                map.insert(stock.product_id(), RunningTotal::of(stock));
            }
        }
    }

    fn forget(&self, product_id: ProductId) {
        if let Ok(mut map) = self.running_totals.write() {
            map.remove(&product_id);
        }
    }
}

fn validate_loaded_stream(
    product_id: ProductId,
    stream: &[StoredMovement],
) -> Result<(), LedgerError> {
    // A buggy backend must not leak another product's or owner's movements.
    let owner = stream.first().map(|s| s.movement.owner_id);
    let mut last = 0u64;
    for (idx, stored) in stream.iter().enumerate() {
        if stored.movement.product_id != product_id {
            return Err(LedgerError::Corrupted(format!(
                "loaded stream contains wrong product_id at index {idx}"
            )));
        }
        if Some(stored.movement.owner_id) != owner {
            return Err(LedgerError::OwnerIsolation(format!(
                "loaded stream mixes owners at index {idx}"
            )));
        }
        if stored.sequence_number <= last {
            return Err(LedgerError::Corrupted(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                stored.sequence_number
            )));
        }
        last = stored.sequence_number;
    }
    Ok(())
}
