use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockbook_core::{
    DomainError, DomainResult, Entity, MovementId, OwnerId, ProductId, ValueObject,
};

/// Whether a movement adds stock (`In`) or removes it (`Out`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::In => "In",
            Direction::Out => "Out",
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business reason for a movement. Audit metadata only; never affects balance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Purchase,
    Sale,
    Return,
    Adjustment,
}

/// Magnitude of a movement. Always strictly positive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> DomainResult<Self> {
        if value == 0 {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl ValueObject for Quantity {}

impl TryFrom<u32> for Quantity {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

/// One recorded stock change for a product.
///
/// The sign lives in `direction`; `quantity` is always positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub owner_id: OwnerId,
    pub quantity: Quantity,
    pub direction: Direction,
    pub transaction_type: TransactionType,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockMovement {
    /// Contribution of this movement to the product balance.
    pub fn signed_quantity(&self) -> i64 {
        let q = i64::from(self.quantity.get());
        match self.direction {
            Direction::In => q,
            Direction::Out => -q,
        }
    }
}

impl Entity for StockMovement {
    type Id = MovementId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input of the write path: a movement as submitted, before the owner is
/// bound and timestamps are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub direction: Direction,
    pub transaction_type: TransactionType,
    /// Defaults to the UTC date of `now` when absent.
    pub date: Option<NaiveDate>,
}

impl NewMovement {
    /// Bind the movement to its owner and stamp it at `now`.
    pub fn into_movement(self, owner_id: OwnerId, now: DateTime<Utc>) -> StockMovement {
        StockMovement {
            id: MovementId::new(),
            product_id: self.product_id,
            owner_id,
            quantity: self.quantity,
            direction: self.direction,
            transaction_type: self.transaction_type,
            date: self.date.unwrap_or_else(|| now.date_naive()),
            created_at: now,
            updated_at: now,
        }
    }
}
