//! Owner-scoped product catalog consumed by the ledger.

pub mod product_catalog;

pub use product_catalog::{InMemoryProductCatalog, Product, ProductCatalog};
