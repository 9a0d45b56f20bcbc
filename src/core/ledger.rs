//! Transaction log operations - Append, list and delete stock movements.
//!
//! The log is append-only: records are never edited, only deleted by an operator. Recording an
//! input also maintains supplier master data (auto-creating the supplier and refreshing its
//! last purchase price), but those side writes are best-effort and never block the input itself.

use crate::{
    core::{context::BranchContext, reconcile::canonicalize, supplier},
    entities::{MovementKind, Transaction, Unit, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{Order, QueryOrder, Select, Set, prelude::*, sea_query::NullOrdering};
use tracing::{info, instrument, warn};

/// A stock receipt as entered by an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInput {
    pub product_name: String,
    pub supplier_name: String,
    pub quantity: Decimal,
    pub unit: Unit,
    pub unit_purchase_price: Decimal,
    /// Day the goods arrived, if the operator entered one
    pub entry_date: Option<NaiveDate>,
}

/// A stock shipment ready to be written, produced by cart checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOutput {
    pub product_name: String,
    pub quantity: Decimal,
    pub unit: Unit,
    pub unit_sale_price: Decimal,
    /// Latest purchase price at commit time, kept for margin reporting
    pub unit_purchase_price: Decimal,
    pub destination_customer: String,
}

impl NewInput {
    /// Checks required fields and numeric ranges.
    pub fn validate(&self) -> Result<()> {
        if self.product_name.trim().is_empty() {
            return Err(Error::MissingField {
                field: "product_name",
            });
        }
        if self.supplier_name.trim().is_empty() {
            return Err(Error::MissingField {
                field: "supplier_name",
            });
        }
        if self.quantity <= Decimal::ZERO {
            return Err(Error::InvalidQuantity {
                quantity: self.quantity,
            });
        }
        if self.unit_purchase_price < Decimal::ZERO {
            return Err(Error::InvalidPrice {
                price: self.unit_purchase_price,
            });
        }
        Ok(())
    }

    fn into_active_model(self, ctx: &BranchContext) -> transaction::ActiveModel {
        transaction::ActiveModel {
            branch: Set(ctx.branch.clone()),
            kind: Set(MovementKind::Input),
            product_name: Set(canonicalize(&self.product_name)),
            supplier_name: Set(Some(canonicalize(&self.supplier_name))),
            quantity: Set(self.quantity),
            unit: Set(self.unit),
            unit_purchase_price: Set(Some(self.unit_purchase_price)),
            unit_sale_price: Set(None),
            destination_customer: Set(None),
            entry_date: Set(self.entry_date),
            recorded_at: Set(Some(Utc::now())),
            recorded_by: Set(ctx.operator.clone()),
            ..Default::default()
        }
    }
}

impl NewOutput {
    pub(crate) fn into_active_model(self, ctx: &BranchContext) -> transaction::ActiveModel {
        transaction::ActiveModel {
            branch: Set(ctx.branch.clone()),
            kind: Set(MovementKind::Output),
            product_name: Set(canonicalize(&self.product_name)),
            supplier_name: Set(None),
            quantity: Set(self.quantity),
            unit: Set(self.unit),
            unit_purchase_price: Set(Some(self.unit_purchase_price)),
            unit_sale_price: Set(Some(self.unit_sale_price)),
            destination_customer: Set(Some(canonicalize(&self.destination_customer))),
            entry_date: Set(None),
            recorded_at: Set(Some(Utc::now())),
            recorded_by: Set(ctx.operator.clone()),
            ..Default::default()
        }
    }
}

/// Appends one record to the log and returns it with its store-assigned id.
pub async fn append<C>(db: &C, record: transaction::ActiveModel) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    record.insert(db).await.map_err(Into::into)
}

/// Records incoming stock.
///
/// Before the input is written the supplier is auto-created if unknown and its last purchase
/// price is refreshed. Failures of either side write are logged and ignored.
#[instrument(skip(db, input), fields(branch = %ctx.branch, product = %input.product_name))]
pub async fn record_input(
    db: &DatabaseConnection,
    ctx: &BranchContext,
    input: NewInput,
) -> Result<transaction::Model> {
    input.validate()?;

    match supplier::ensure_supplier(db, ctx, &input.supplier_name).await {
        Ok(true) => info!("Supplier {} created on first use", canonicalize(&input.supplier_name)),
        Ok(false) => {}
        Err(e) => warn!("Could not auto-create supplier {}: {}", input.supplier_name, e),
    }
    if let Err(e) = supplier::update_purchase_price(
        db,
        &ctx.branch,
        &input.supplier_name,
        input.unit_purchase_price,
    )
    .await
    {
        warn!(
            "Could not refresh purchase price of supplier {}: {}",
            input.supplier_name, e
        );
    }

    let record = append(db, input.into_active_model(ctx)).await?;
    info!("Recorded input #{} ({} {})", record.id, record.quantity, record.unit);
    Ok(record)
}

// Backends disagree on where NULLs sort under DESC, so the position is spelled out.
fn log_query(branch: &str) -> Select<Transaction> {
    Transaction::find()
        .filter(transaction::Column::Branch.eq(branch))
        .order_by_with_nulls(transaction::Column::RecordedAt, Order::Desc, NullOrdering::Last)
        .order_by_desc(transaction::Column::Id)
}

/// Retrieves a branch's full transaction log, newest first. Records without a timestamp come last.
pub async fn list_transactions<C>(db: &C, branch: &str) -> Result<Vec<transaction::Model>>
where
    C: ConnectionTrait,
{
    log_query(branch).all(db).await.map_err(Into::into)
}

/// Retrieves a specific transaction of a branch by id.
pub async fn get_transaction_by_id(
    db: &DatabaseConnection,
    branch: &str,
    transaction_id: i64,
) -> Result<Option<transaction::Model>> {
    Transaction::find_by_id(transaction_id)
        .filter(transaction::Column::Branch.eq(branch))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Deletes a transaction. Irreversible; stock derived from the log changes accordingly.
#[instrument(skip(db))]
pub async fn delete_transaction(
    db: &DatabaseConnection,
    branch: &str,
    transaction_id: i64,
) -> Result<()> {
    let result = Transaction::delete_many()
        .filter(transaction::Column::Id.eq(transaction_id))
        .filter(transaction::Column::Branch.eq(branch))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            collection: "transactions",
            id: transaction_id,
        });
    }
    info!("Deleted transaction #{}", transaction_id);
    Ok(())
}
