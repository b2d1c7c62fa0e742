//! Integration tests for the full write/read pipeline.
//!
//! Tests: NewMovement → StockLedger → MovementStore → summaries/detail
//!
//! Verifies:
//! - Concurrent outgoing movements never overdraw a product
//! - Owners only ever see their own products
//! - Read views serialize for presentation layers

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use stockbook_core::{ExpectedVersion, OwnerId, ProductId};
    use stockbook_stock::{Direction, NewMovement, Quantity, StockMovement, TransactionType};

    use crate::catalog::{InMemoryProductCatalog, Product};
    use crate::config::{BalanceMode, LedgerConfig};
    use crate::ledger::{LedgerError, StockLedger};
    use crate::movement_store::{
        InMemoryMovementStore, MovementStore, MovementStoreError, StoredMovement,
    };

    type SharedLedger = Arc<StockLedger<Arc<InMemoryMovementStore>, Arc<InMemoryProductCatalog>>>;

    fn setup(
        config: LedgerConfig,
    ) -> (SharedLedger, Arc<InMemoryMovementStore>, Arc<InMemoryProductCatalog>) {
        stockbook_observability::init();
        let store = Arc::new(InMemoryMovementStore::new());
        let catalog = Arc::new(InMemoryProductCatalog::new());
        let ledger = Arc::new(StockLedger::new(store.clone(), catalog.clone(), config));
        (ledger, store, catalog)
    }

    fn register(
        catalog: &InMemoryProductCatalog,
        owner: OwnerId,
        name: &str,
        price: u64,
    ) -> ProductId {
        let id = ProductId::new();
        catalog.register(Product {
            id,
            owner_id: owner,
            name: name.to_string(),
            price: Some(price),
        });
        id
    }

    fn draft(
        product_id: ProductId,
        direction: Direction,
        qty: u32,
        kind: TransactionType,
    ) -> NewMovement {
        NewMovement {
            product_id,
            quantity: Quantity::new(qty).unwrap(),
            direction,
            transaction_type: kind,
            date: None,
        }
    }

    fn concurrent_outs_never_overdraw(mode: BalanceMode) {
        const WORKERS: usize = 20;

        let (ledger, store, catalog) = setup(LedgerConfig {
            balance_mode: mode,
            // Each loss means another worker committed; bounded by WORKERS.
            max_conflict_retries: WORKERS as u32,
        });
        let owner = OwnerId::new();
        let p = register(&catalog, owner, "Minyak Goreng", 18_000);
        ledger
            .record_movement(owner, draft(p, Direction::In, 100, TransactionType::Purchase))
            .unwrap();

        let barrier = Arc::new(Barrier::new(WORKERS));
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                let ledger = ledger.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let movement = draft(p, Direction::Out, 10, TransactionType::Sale);
                    ledger.record_movement(owner, movement)
                })
            })
            .collect();

        let mut accepted = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(recorded) => {
                    assert!(recorded.balance >= 0);
                    accepted += 1;
                }
                Err(LedgerError::InsufficientStock { available, .. }) => {
                    assert_eq!(available, 0);
                    rejected += 1;
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(accepted, 10);
        assert_eq!(rejected, WORKERS - 10);
        assert_eq!(ledger.balance(owner, p).unwrap(), 0);
        assert_eq!(store.current_version(p).unwrap(), 11);
    }

    #[test]
    fn concurrent_outs_never_overdraw_with_recompute() {
        concurrent_outs_never_overdraw(BalanceMode::Recompute);
    }

    #[test]
    fn concurrent_outs_never_overdraw_with_running_total() {
        concurrent_outs_never_overdraw(BalanceMode::RunningTotal);
    }

    #[test]
    fn concurrent_ins_are_all_recorded() {
        let (ledger, _, catalog) = setup(LedgerConfig {
            balance_mode: BalanceMode::RunningTotal,
            max_conflict_retries: 16,
        });
        let owner = OwnerId::new();
        let p = register(&catalog, owner, "Beras", 65_000);

        let handles: Vec<_> = (1..=8u32)
            .map(|qty| {
                let ledger = ledger.clone();
                thread::spawn(move || {
                    let movement = draft(p, Direction::In, qty, TransactionType::Return);
                    ledger.record_movement(owner, movement)
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(ledger.balance(owner, p).unwrap(), (1..=8).sum::<i64>());
        assert_eq!(ledger.movements(owner, p).unwrap().len(), 8);
    }

    #[test]
    fn exhausted_retries_surface_a_conflict() {
        // A store that always reports a concurrent writer.
        #[derive(Debug, Default)]
        struct AlwaysStale(InMemoryMovementStore);

        impl MovementStore for AlwaysStale {
            fn append(
                &self,
                _movement: StockMovement,
                _expected_version: ExpectedVersion,
            ) -> Result<StoredMovement, MovementStoreError> {
                Err(MovementStoreError::Concurrency("stream moved".to_string()))
            }

            fn load_stream(
                &self,
                product_id: ProductId,
            ) -> Result<Vec<StoredMovement>, MovementStoreError> {
                self.0.load_stream(product_id)
            }

            fn current_version(&self, product_id: ProductId) -> Result<u64, MovementStoreError> {
                self.0.current_version(product_id)
            }
        }

        let catalog = Arc::new(InMemoryProductCatalog::new());
        let owner = OwnerId::new();
        let p = register(&catalog, owner, "Garam", 4_000);
        let ledger = StockLedger::new(AlwaysStale::default(), catalog, LedgerConfig::default());

        let err = ledger
            .record_movement(owner, draft(p, Direction::In, 1, TransactionType::Adjustment))
            .unwrap_err();

        assert!(matches!(err, LedgerError::Concurrency(_)));
    }

    #[test]
    fn owners_are_isolated_end_to_end() {
        let (ledger, _, catalog) = setup(LedgerConfig::default());
        let alice = OwnerId::new();
        let bob = OwnerId::new();
        let alice_product = register(&catalog, alice, "Sabun", 3_500);
        let bob_product = register(&catalog, bob, "Sampo", 22_000);

        let stock_in = draft(alice_product, Direction::In, 9, TransactionType::Purchase);
        ledger.record_movement(alice, stock_in).unwrap();
        let stock_in = draft(bob_product, Direction::In, 4, TransactionType::Purchase);
        ledger.record_movement(bob, stock_in).unwrap();

        let alice_rows = ledger.list_stock(alice).unwrap();
        assert_eq!(alice_rows.len(), 1);
        assert_eq!(alice_rows[0].product_id, alice_product);
        assert_eq!(alice_rows[0].available, 9);

        let foreign_out = draft(alice_product, Direction::Out, 1, TransactionType::Sale);
        assert!(matches!(
            ledger.record_movement(bob, foreign_out),
            Err(LedgerError::Unauthorized)
        ));
        assert_eq!(ledger.balance(alice, alice_product).unwrap(), 9);
    }

    #[test]
    fn read_views_serialize() {
        let (ledger, _, catalog) = setup(LedgerConfig::default());
        let owner = OwnerId::new();
        let p = register(&catalog, owner, "Kecap", 9_000);
        let recorded = ledger
            .record_movement(owner, draft(p, Direction::In, 12, TransactionType::Purchase))
            .unwrap();

        let rows = serde_json::to_value(ledger.list_stock(owner).unwrap()).unwrap();
        assert_eq!(rows[0]["name"], "Kecap");
        assert_eq!(rows[0]["available"], 12);
        assert_eq!(rows[0]["price"], 9_000);

        let detail = ledger
            .movement_detail(owner, p, recorded.movement.movement.id)
            .unwrap();
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["movement"]["sequence_number"], 1);
        assert_eq!(json["movement"]["movement"]["direction"], "In");
        assert_eq!(json["movement"]["movement"]["transaction_type"], "Purchase");
        assert_eq!(json["movement"]["movement"]["quantity"], 12);
    }
}
