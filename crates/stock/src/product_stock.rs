use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{Aggregate, AggregateRoot, DomainError, OwnerId, ProductId};

use crate::movement::{Direction, StockMovement};

/// Aggregate root: the stock position of one product, folded from its
/// movement stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductStock {
    product_id: ProductId,
    owner_id: Option<OwnerId>,
    balance: i64,
    version: u64,
    last_updated: Option<DateTime<Utc>>,
}

impl ProductStock {
    /// A product with no recorded movements.
    pub fn empty(product_id: ProductId) -> Self {
        Self {
            product_id,
            owner_id: None,
            balance: 0,
            version: 0,
            last_updated: None,
        }
    }

    /// Resume from a previously folded position without replaying the
    /// stream.
    pub fn from_snapshot(
        product_id: ProductId,
        owner_id: Option<OwnerId>,
        balance: i64,
        version: u64,
        last_updated: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            product_id,
            owner_id,
            balance,
            version,
            last_updated,
        }
    }

    /// Fold a movement history into a fresh aggregate.
    pub fn rehydrate<'a>(
        product_id: ProductId,
        movements: impl IntoIterator<Item = &'a StockMovement>,
    ) -> Self {
        let mut stock = Self::empty(product_id);
        for movement in movements {
            stock.apply(&StockEvent::MovementRecorded(MovementRecorded {
                movement: movement.clone(),
            }));
        }
        stock
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn owner_id(&self) -> Option<OwnerId> {
        self.owner_id
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }
}

impl AggregateRoot for ProductStock {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.product_id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RecordMovement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMovement {
    /// Candidate with `owner_id` already bound to the caller.
    pub movement: StockMovement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    RecordMovement(RecordMovement),
}

/// Event: MovementRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecorded {
    pub movement: StockMovement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockEvent {
    MovementRecorded(MovementRecorded),
}

impl StockEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            StockEvent::MovementRecorded(_) => "stock.movement.recorded",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockEvent::MovementRecorded(e) => e.movement.created_at,
        }
    }

    pub fn into_movement(self) -> StockMovement {
        match self {
            StockEvent::MovementRecorded(e) => e.movement,
        }
    }
}

impl Aggregate for ProductStock {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::MovementRecorded(e) => {
                let m = &e.movement;
                if self.owner_id.is_none() {
                    self.owner_id = Some(m.owner_id);
                }
                self.balance += m.signed_quantity();
                self.last_updated = Some(match self.last_updated {
                    Some(t) if t > m.updated_at => t,
                    _ => m.updated_at,
                });
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::RecordMovement(cmd) => self.handle_record(cmd),
        }
    }
}

impl ProductStock {
    fn ensure_product(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.product_id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn ensure_owner(&self, owner_id: OwnerId) -> Result<(), DomainError> {
        match self.owner_id {
            Some(existing) if existing != owner_id => Err(DomainError::Unauthorized),
            _ => Ok(()),
        }
    }

    fn handle_record(&self, cmd: &RecordMovement) -> Result<Vec<StockEvent>, DomainError> {
        let movement = &cmd.movement;
        self.ensure_product(movement.product_id)?;
        self.ensure_owner(movement.owner_id)?;

        let requested = movement.quantity.get();
        if movement.direction == Direction::Out && self.balance < i64::from(requested) {
            return Err(DomainError::insufficient_stock(self.balance, requested));
        }

        Ok(vec![StockEvent::MovementRecorded(MovementRecorded {
            movement: movement.clone(),
        })])
    }
}
