//! Infrastructure layer: movement storage, product catalog, ledger service,
//! configuration.

pub mod catalog;
pub mod config;
pub mod ledger;
pub mod movement_store;

mod integration_tests;

pub use catalog::{InMemoryProductCatalog, Product, ProductCatalog};
pub use config::{BalanceMode, ConfigError, LedgerConfig};
pub use ledger::{LedgerError, MovementDetail, RecordedMovement, StockLedger, StockSummary};
pub use movement_store::{InMemoryMovementStore, MovementStore, MovementStoreError, StoredMovement};
