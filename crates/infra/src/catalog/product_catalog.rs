use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use stockbook_core::{OwnerId, ProductId};

/// Product as seen by the stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub owner_id: OwnerId,
    pub name: String,
    /// Unit price in the smallest currency unit.
    pub price: Option<u64>,
}

/// Read access to products, scoped by owner.
pub trait ProductCatalog: Send + Sync {
    fn get(&self, product_id: ProductId) -> Option<Product>;
    /// All products of `owner_id`, ordered by name.
    fn list_for_owner(&self, owner_id: OwnerId) -> Vec<Product>;
}

impl<S> ProductCatalog for Arc<S>
where
    S: ProductCatalog + ?Sized,
{
    fn get(&self, product_id: ProductId) -> Option<Product> {
        (**self).get(product_id)
    }

    fn list_for_owner(&self, owner_id: OwnerId) -> Vec<Product> {
        (**self).list_for_owner(owner_id)
    }
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryProductCatalog {
    inner: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product.
    pub fn register(&self, product: Product) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(product.id, product);
        }
    }
}

impl ProductCatalog for InMemoryProductCatalog {
    fn get(&self, product_id: ProductId) -> Option<Product> {
        let map = self.inner.read().ok()?;
        map.get(&product_id).cloned()
    }

    fn list_for_owner(&self, owner_id: OwnerId) -> Vec<Product> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        let mut products: Vec<Product> = map
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        products
    }
}
