//! Supplier entity - Master data for the parties stock is bought from.
//!
//! The last-known purchase price is denormalized here and overwritten by every input
//! that references the supplier.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Supplier database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "suppliers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub branch: String,
    /// Canonical (upper-case) name, unique per branch
    pub name: String,
    pub contact: String,
    pub address: String,
    /// Kind of goods usually supplied
    pub goods_type: String,
    /// Free-text note on the largest delivery the supplier can make
    pub max_delivery: String,
    /// Unit purchase price from the most recent input referencing this supplier
    pub last_purchase_price: Option<Decimal>,
    pub created_at: DateTimeUtc,
    pub created_by: String,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
