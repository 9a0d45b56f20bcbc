//! Shared test utilities for the ledger core.
//!
//! Provides an in-memory store, a default branch context, and builders for transaction
//! records so tests can describe a log in one line per movement.

use crate::{
    core::{
        context::BranchContext,
        ledger::{self, NewInput, NewOutput},
        pricing::{self, PriceBook},
        reconcile::{StockPositions, reduce},
    },
    entities::{MovementKind, Unit, supplier, transaction},
    errors::Result,
};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;

/// Branch used by every test unless a test builds its own context.
pub const TEST_BRANCH: &str = "PUSAT";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all store tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Context for branch `PUSAT` operated by `andi`.
pub fn test_context() -> BranchContext {
    BranchContext::new(TEST_BRANCH, "andi")
}

/// Sets up an empty store together with the default test context.
/// Returns (db, ctx) for common test scenarios.
pub async fn setup_ledger() -> Result<(DatabaseConnection, BranchContext)> {
    Ok((setup_test_db().await?, test_context()))
}

/// Whole-number decimal.
pub fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

/// Timestamp `secs` seconds after the epoch, for ordering records in tests.
pub fn at(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// An input form as an operator would fill it in, measured in KG.
pub fn new_input(product: &str, supplier: &str, quantity: i64, price: i64) -> NewInput {
    NewInput {
        product_name: product.to_string(),
        supplier_name: supplier.to_string(),
        quantity: dec(quantity),
        unit: Unit::Kg,
        unit_purchase_price: dec(price),
        entry_date: None,
    }
}

/// An input record as it would come back from the store. Names are kept as given.
pub fn input_tx(
    id: i64,
    product: &str,
    supplier: &str,
    quantity: i64,
    price: i64,
    recorded_at: Option<DateTime<Utc>>,
) -> transaction::Model {
    transaction::Model {
        id,
        branch: TEST_BRANCH.to_string(),
        kind: MovementKind::Input,
        product_name: product.to_string(),
        supplier_name: Some(supplier.to_string()),
        quantity: dec(quantity),
        unit: Unit::Kg,
        unit_purchase_price: Some(dec(price)),
        unit_sale_price: None,
        destination_customer: None,
        entry_date: None,
        recorded_at,
        recorded_by: "andi".to_string(),
    }
}

/// An output record as it would come back from the store.
pub fn output_tx(
    id: i64,
    product: &str,
    customer: &str,
    quantity: i64,
    sale_price: Option<i64>,
    recorded_at: Option<DateTime<Utc>>,
) -> transaction::Model {
    transaction::Model {
        id,
        branch: TEST_BRANCH.to_string(),
        kind: MovementKind::Output,
        product_name: product.to_string(),
        supplier_name: None,
        quantity: dec(quantity),
        unit: Unit::Kg,
        unit_purchase_price: None,
        unit_sale_price: sale_price.map(dec),
        destination_customer: Some(customer.to_string()),
        entry_date: None,
        recorded_at,
        recorded_by: "andi".to_string(),
    }
}

/// Supplier master record with a given last purchase price.
pub fn test_supplier(name: &str, last_purchase_price: Option<Decimal>) -> supplier::Model {
    supplier::Model {
        id: 1,
        branch: TEST_BRANCH.to_string(),
        name: name.trim().to_uppercase(),
        contact: "-".to_string(),
        address: "-".to_string(),
        goods_type: String::new(),
        max_delivery: String::new(),
        last_purchase_price,
        created_at: Utc::now(),
        created_by: "andi".to_string(),
        updated_at: None,
    }
}

/// Records an input through the ledger.
pub async fn seed_input(
    db: &DatabaseConnection,
    ctx: &BranchContext,
    product: &str,
    supplier: &str,
    quantity: i64,
    price: i64,
) -> Result<transaction::Model> {
    ledger::record_input(db, ctx, new_input(product, supplier, quantity, price)).await
}

/// Writes an output straight to the log, bypassing the cart's stock checks.
pub async fn seed_output(
    db: &DatabaseConnection,
    ctx: &BranchContext,
    product: &str,
    customer: &str,
    quantity: i64,
    sale_price: i64,
) -> Result<transaction::Model> {
    let output = NewOutput {
        product_name: product.to_string(),
        quantity: dec(quantity),
        unit: Unit::Kg,
        unit_sale_price: dec(sale_price),
        unit_purchase_price: Decimal::ZERO,
        destination_customer: customer.to_string(),
    };
    ledger::append(db, output.into_active_model(ctx)).await
}

/// Current stock positions and price book of the context's branch.
pub async fn load_view(
    db: &DatabaseConnection,
    ctx: &BranchContext,
) -> Result<(StockPositions, PriceBook)> {
    let positions = reduce(&ledger::list_transactions(db, &ctx.branch).await?);
    let prices = pricing::list_sale_prices(db, &ctx.branch).await?;
    Ok((positions, prices))
}
