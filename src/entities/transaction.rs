//! Transaction entity - One stock movement in a branch's append-only log.
//!
//! Inputs carry a supplier and the purchase price paid per unit. Outputs carry the
//! destination customer, the sale price frozen when the line was staged, and the latest
//! purchase price stamped at commit time for margin reporting.

use super::enums::{MovementKind, Unit};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Store-assigned identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Branch the movement belongs to
    pub branch: String,
    /// Input (received) or output (shipped)
    pub kind: MovementKind,
    /// Canonical (trimmed, upper-case) product name; the join key for aggregation
    pub product_name: String,
    /// Canonical supplier name; required on inputs
    pub supplier_name: Option<String>,
    /// Moved quantity, never negative
    pub quantity: Decimal,
    pub unit: Unit,
    /// Price paid per unit (inputs), or latest purchase price stamped on outputs
    pub unit_purchase_price: Option<Decimal>,
    /// Price charged per unit (outputs)
    pub unit_sale_price: Option<Decimal>,
    /// Customer the goods were shipped to (outputs)
    pub destination_customer: Option<String>,
    /// Date the goods arrived, as entered by the operator (inputs)
    pub entry_date: Option<Date>,
    /// Store-assigned timestamp; `None` on records without a resolvable time
    pub recorded_at: Option<DateTimeUtc>,
    /// Operator who recorded the movement
    pub recorded_by: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Quantity with its sign: positive for inputs, negative for outputs.
    #[must_use]
    pub fn signed_quantity(&self) -> Decimal {
        match self.kind {
            MovementKind::Input => self.quantity,
            MovementKind::Output => -self.quantity,
        }
    }
}
