//! Ledger balance engine: derive stock from movement history and guard
//! outgoing movements.

use stockbook_core::{DomainError, DomainResult, ProductId};

use crate::movement::{Direction, StockMovement};

/// Current stock of `product_id`: Σ inbound − Σ outbound quantities.
///
/// Order-independent. Movements of other products are ignored; an empty
/// history yields 0.
pub fn compute_balance<'a, I>(product_id: ProductId, movements: I) -> i64
where
    I: IntoIterator<Item = &'a StockMovement>,
{
    movements
        .into_iter()
        .filter(|m| m.product_id == product_id)
        .map(StockMovement::signed_quantity)
        .sum()
}

/// Validate `candidate` against `existing` and append it when allowed.
///
/// Inbound movements are always accepted. An outbound movement larger than the
/// current balance is rejected with [`DomainError::InsufficientStock`] and
/// `existing` is left untouched. Returns the balance after the append.
///
/// `candidate.owner_id` must already be bound to the caller.
pub fn record_movement(
    candidate: StockMovement,
    existing: &mut Vec<StockMovement>,
) -> DomainResult<i64> {
    let current = compute_balance(candidate.product_id, existing.iter());
    let requested = candidate.quantity.get();

    if candidate.direction == Direction::Out && current < i64::from(requested) {
        return Err(DomainError::insufficient_stock(current, requested));
    }

    let next = current + candidate.signed_quantity();
    existing.push(candidate);
    Ok(next)
}
