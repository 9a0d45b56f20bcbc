//! Product price entity - The configured sale price per canonical product name.
//!
//! Outputs are valued with this price, and a product without one cannot be staged in a cart.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product price database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_prices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub branch: String,
    /// Canonical product name
    pub product_name: String,
    /// Configured sale price per unit
    pub unit_sale_price: Decimal,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
