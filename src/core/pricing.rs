//! Product sale prices - The configured price per canonical product name.
//!
//! A product has at most one configured sale price per branch. Setting a price replaces the
//! previous one; outputs already written keep the price captured when they were staged.

use crate::{
    core::reconcile::canonicalize,
    entities::{ProductPrice, product_price},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{Set, prelude::*};
use std::collections::BTreeMap;
use tracing::info;

/// Configured sale prices keyed by canonical product name.
pub type PriceBook = BTreeMap<String, Decimal>;

/// Gets the configured sale price of a product, if any.
pub async fn get_sale_price(
    db: &DatabaseConnection,
    branch: &str,
    product_name: &str,
) -> Result<Option<Decimal>> {
    let record = ProductPrice::find()
        .filter(product_price::Column::Branch.eq(branch))
        .filter(product_price::Column::ProductName.eq(canonicalize(product_name)))
        .one(db)
        .await?;
    Ok(record.map(|r| r.unit_sale_price))
}

/// Sets (or replaces) the sale price of a product. The price must be greater than zero.
pub async fn set_sale_price(
    db: &DatabaseConnection,
    branch: &str,
    product_name: &str,
    price: Decimal,
) -> Result<product_price::Model> {
    let name = canonicalize(product_name);
    if name.is_empty() {
        return Err(Error::MissingField {
            field: "product_name",
        });
    }
    if price <= Decimal::ZERO {
        return Err(Error::InvalidPrice { price });
    }

    let existing = ProductPrice::find()
        .filter(product_price::Column::Branch.eq(branch))
        .filter(product_price::Column::ProductName.eq(name.as_str()))
        .one(db)
        .await?;

    let saved = match existing {
        Some(record) => {
            let mut record: product_price::ActiveModel = record.into();
            record.unit_sale_price = Set(price);
            record.updated_at = Set(Utc::now());
            record.update(db).await?
        }
        None => {
            product_price::ActiveModel {
                branch: Set(branch.to_string()),
                product_name: Set(name),
                unit_sale_price: Set(price),
                updated_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };
    info!("Sale price of {} set to {}", saved.product_name, saved.unit_sale_price);
    Ok(saved)
}

/// Loads every configured sale price of a branch.
pub async fn list_sale_prices(db: &DatabaseConnection, branch: &str) -> Result<PriceBook> {
    let records = ProductPrice::find()
        .filter(product_price::Column::Branch.eq(branch))
        .all(db)
        .await?;
    Ok(records
        .into_iter()
        .map(|r| (r.product_name, r.unit_sale_price))
        .collect())
}
