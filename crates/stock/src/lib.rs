//! Stock ledger domain module.
//!
//! Business rules for product stock movements, implemented purely as
//! deterministic domain logic (no IO, no storage). A product's stock level is
//! never stored; it is derived from its movement history.

pub mod balance;
pub mod movement;
pub mod product_stock;

pub use balance::{compute_balance, record_movement};
pub use movement::{Direction, NewMovement, Quantity, StockMovement, TransactionType};
pub use product_stock::{MovementRecorded, ProductStock, RecordMovement, StockCommand, StockEvent};
