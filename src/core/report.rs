//! Report generation - Folds the transaction log over a period into exportable tables.
//!
//! Three reports are produced from the same in-range records: a per-product summary, a
//! per-(product, supplier) breakdown of inputs, and the raw transaction history. Amounts are
//! kept exact while aggregating and only rounded to whole currency units when a row is turned
//! into cells.

use crate::{
    core::{
        ledger,
        pricing::{self, PriceBook},
        reconcile::{UNKNOWN_SUPPLIER, canonicalize, latest_purchase_price, reduce},
        supplier,
    },
    entities::{MovementKind, Unit, supplier as supplier_entity, transaction},
    errors::{Error, Result},
};
use chrono::{DateTime, Months, NaiveDate, NaiveTime, TimeDelta, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Inclusive time interval a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportPeriod {
    /// Interval between two instants, both included. Reversed bounds are swapped.
    #[must_use]
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// One calendar day (UTC).
    #[must_use]
    pub fn day(date: NaiveDate) -> Self {
        Self::range(date, date)
    }

    /// From the start of `first` to the end of `last`, both days included. Reversed days are
    /// swapped.
    #[must_use]
    pub fn range(first: NaiveDate, last: NaiveDate) -> Self {
        let (first, last) = if first <= last { (first, last) } else { (last, first) };
        Self::between(start_of_day(first), end_of_day(last))
    }

    /// One calendar month.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| Error::InvalidPeriod {
            reason: format!("no such month {year}-{month:02}"),
        })?;
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| Error::InvalidPeriod {
                reason: format!("month {year}-{month:02} is out of range"),
            })?;
        Ok(Self::range(first, last))
    }

    /// One calendar year.
    pub fn year(year: i32) -> Result<Self> {
        let first = NaiveDate::from_ymd_opt(year, 1, 1);
        let last = NaiveDate::from_ymd_opt(year, 12, 31);
        match (first, last) {
            (Some(first), Some(last)) => Ok(Self::range(first, last)),
            _ => Err(Error::InvalidPeriod {
                reason: format!("year {year} is out of range"),
            }),
        }
    }

    /// Everything ever recorded.
    #[must_use]
    pub const fn all_time() -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
        }
    }

    /// Whether a record stamped at `recorded_at` falls in the period. Unstamped records never do.
    #[must_use]
    pub fn contains(&self, recorded_at: Option<DateTime<Utc>>) -> bool {
        recorded_at.is_some_and(|at| self.start <= at && at <= self.end)
    }

    /// Records of `transactions` that fall in the period, in their original order.
    #[must_use]
    pub fn filter(&self, transactions: &[transaction::Model]) -> Vec<transaction::Model> {
        transactions
            .iter()
            .filter(|tx| self.contains(tx.recorded_at))
            .cloned()
            .collect()
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.succ_opt()
        .map_or(DateTime::<Utc>::MAX_UTC, |next| {
            start_of_day(next) - TimeDelta::nanoseconds(1)
        })
}

/// Rounds a money amount to whole currency units, halves away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

fn money_cell(amount: Decimal) -> String {
    round_money(amount).to_string()
}

fn quantity_cell(quantity: Decimal) -> String {
    quantity.normalize().to_string()
}

/// A report row that can be laid out as table cells.
pub trait TableRow {
    /// Column headers, in cell order
    fn headers() -> &'static [&'static str];
    /// Cell values for this row; money is rounded to whole units
    fn cells(&self) -> Vec<String>;
}

/// Plain tabular export handed to spreadsheet formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    #[must_use]
    pub fn from_rows<R: TableRow>(rows: &[R]) -> Self {
        Self {
            headers: R::headers().iter().map(ToString::to_string).collect(),
            rows: rows.iter().map(TableRow::cells).collect(),
        }
    }
}

/// In-period totals for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSummary {
    pub product_name: String,
    pub unit: Unit,
    pub quantity_in: Decimal,
    pub quantity_out: Decimal,
    /// Σ input quantity × purchase price
    pub total_cost: Decimal,
    /// Σ output quantity × effective sale price
    pub total_revenue: Decimal,
    /// `total_cost / quantity_in`, zero without inputs
    pub average_purchase_price: Decimal,
    /// `total_revenue - total_cost`
    pub gross_profit: Decimal,
}

impl TableRow for ProductSummary {
    fn headers() -> &'static [&'static str] {
        &[
            "Product",
            "Unit",
            "Quantity In",
            "Quantity Out",
            "Total Cost",
            "Total Revenue",
            "Average Purchase Price",
            "Gross Profit",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.product_name.clone(),
            self.unit.to_string(),
            quantity_cell(self.quantity_in),
            quantity_cell(self.quantity_out),
            money_cell(self.total_cost),
            money_cell(self.total_revenue),
            money_cell(self.average_purchase_price),
            money_cell(self.gross_profit),
        ]
    }
}

/// Inputs of one product from one supplier within the period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierBreakdownRow {
    pub product_name: String,
    /// Canonical supplier name, `-` for inputs without one
    pub supplier_name: String,
    pub quantity: Decimal,
    pub unit: Unit,
    /// Latest in-period purchase price from this supplier, else the supplier's last known price
    pub representative_price: Decimal,
    /// Configured sale price, zero when none is set
    pub sale_price: Decimal,
    pub margin_per_unit: Decimal,
}

impl TableRow for SupplierBreakdownRow {
    fn headers() -> &'static [&'static str] {
        &[
            "Product",
            "Supplier",
            "Quantity",
            "Unit",
            "Purchase Price",
            "Sale Price",
            "Margin per Unit",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.product_name.clone(),
            self.supplier_name.clone(),
            quantity_cell(self.quantity),
            self.unit.to_string(),
            money_cell(self.representative_price),
            money_cell(self.sale_price),
            money_cell(self.margin_per_unit),
        ]
    }
}

/// One record of the transaction history export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRow {
    pub recorded_at: Option<DateTime<Utc>>,
    pub kind: MovementKind,
    pub product_name: String,
    pub supplier_name: Option<String>,
    pub destination_customer: Option<String>,
    pub quantity: Decimal,
    pub unit: Unit,
    pub unit_purchase_price: Option<Decimal>,
    pub unit_sale_price: Option<Decimal>,
    pub recorded_by: String,
}

impl From<&transaction::Model> for HistoryRow {
    fn from(tx: &transaction::Model) -> Self {
        Self {
            recorded_at: tx.recorded_at,
            kind: tx.kind,
            product_name: tx.product_name.clone(),
            supplier_name: tx.supplier_name.clone(),
            destination_customer: tx.destination_customer.clone(),
            quantity: tx.quantity,
            unit: tx.unit,
            unit_purchase_price: tx.unit_purchase_price,
            unit_sale_price: tx.unit_sale_price,
            recorded_by: tx.recorded_by.clone(),
        }
    }
}

impl TableRow for HistoryRow {
    fn headers() -> &'static [&'static str] {
        &[
            "Time",
            "Type",
            "Product",
            "Supplier",
            "Customer",
            "Quantity",
            "Unit",
            "Purchase Price",
            "Sale Price",
            "Operator",
        ]
    }

    fn cells(&self) -> Vec<String> {
        let optional = |value: Option<&String>| value.cloned().unwrap_or_else(|| "-".to_string());
        let price = |value: Option<Decimal>| value.map_or_else(|| "-".to_string(), money_cell);
        vec![
            self.recorded_at
                .map_or_else(|| "-".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string()),
            self.kind.label().to_string(),
            self.product_name.clone(),
            optional(self.supplier_name.as_ref()),
            optional(self.destination_customer.as_ref()),
            quantity_cell(self.quantity),
            self.unit.to_string(),
            price(self.unit_purchase_price),
            price(self.unit_sale_price),
            self.recorded_by.clone(),
        ]
    }
}

/// Per-product totals over the in-period records, sorted by product name.
///
/// Revenue uses the sale price stamped on each output, falling back to the currently
/// configured price only for outputs with no stamped price. A stamped zero is kept.
#[must_use]
pub fn product_summary(
    transactions: &[transaction::Model],
    period: &ReportPeriod,
    prices: &PriceBook,
) -> Vec<ProductSummary> {
    let in_range = period.filter(transactions);
    let positions = reduce(&in_range);

    let mut rows: BTreeMap<String, ProductSummary> = BTreeMap::new();
    for tx in &in_range {
        let name = canonicalize(&tx.product_name);
        let Some(position) = positions.get(&name) else {
            continue;
        };
        let row = rows.entry(name.clone()).or_insert_with(|| ProductSummary {
            product_name: name.clone(),
            unit: position.unit,
            quantity_in: Decimal::ZERO,
            quantity_out: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            total_revenue: Decimal::ZERO,
            average_purchase_price: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
        });

        match tx.kind {
            MovementKind::Input => {
                row.quantity_in += tx.quantity;
                row.total_cost += tx.quantity * tx.unit_purchase_price.unwrap_or(Decimal::ZERO);
            }
            MovementKind::Output => {
                let sale_price = tx
                    .unit_sale_price
                    .or_else(|| prices.get(&name).copied())
                    .unwrap_or(Decimal::ZERO);
                row.quantity_out += tx.quantity;
                row.total_revenue += tx.quantity * sale_price;
            }
        }
    }

    rows.into_values()
        .map(|mut row| {
            if row.quantity_in > Decimal::ZERO {
                row.average_purchase_price = row.total_cost / row.quantity_in;
            }
            row.gross_profit = row.total_revenue - row.total_cost;
            row
        })
        .collect()
}

/// Per-(product, supplier) input quantities over the period, sorted by product then supplier.
///
/// The representative price is the latest in-period purchase price from that supplier; when
/// that is zero the supplier's last known price from master data is used instead.
#[must_use]
pub fn supplier_breakdown(
    transactions: &[transaction::Model],
    period: &ReportPeriod,
    prices: &PriceBook,
    suppliers: &[supplier_entity::Model],
) -> Vec<SupplierBreakdownRow> {
    let in_range = period.filter(transactions);
    let positions = reduce(&in_range);

    let mut rows = Vec::new();
    for (product, position) in &positions {
        let sale_price = prices.get(product).copied().unwrap_or(Decimal::ZERO);
        for (supplier_name, quantity) in &position.supplier_breakdown {
            let mut representative_price =
                latest_purchase_price(&in_range, product, Some(supplier_name.as_str()));
            if representative_price.is_zero() && supplier_name != UNKNOWN_SUPPLIER {
                representative_price = suppliers
                    .iter()
                    .find(|s| canonicalize(&s.name) == *supplier_name)
                    .and_then(|s| s.last_purchase_price)
                    .unwrap_or(Decimal::ZERO);
            }
            rows.push(SupplierBreakdownRow {
                product_name: product.clone(),
                supplier_name: supplier_name.clone(),
                quantity: *quantity,
                unit: position.unit,
                representative_price,
                sale_price,
                margin_per_unit: sale_price - representative_price,
            });
        }
    }
    rows
}

/// Every in-period record, newest first. Records sharing a timestamp keep their log order.
#[must_use]
pub fn transaction_history(
    transactions: &[transaction::Model],
    period: &ReportPeriod,
) -> Vec<HistoryRow> {
    let mut in_range = period.filter(transactions);
    in_range.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
    in_range.iter().map(HistoryRow::from).collect()
}

/// All three reports of a branch for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerReport {
    pub branch: String,
    pub period: ReportPeriod,
    pub products: Vec<ProductSummary>,
    pub suppliers: Vec<SupplierBreakdownRow>,
    pub history: Vec<HistoryRow>,
}

impl LedgerReport {
    #[must_use]
    pub fn product_table(&self) -> Table {
        Table::from_rows(&self.products)
    }

    #[must_use]
    pub fn supplier_table(&self) -> Table {
        Table::from_rows(&self.suppliers)
    }

    #[must_use]
    pub fn history_table(&self) -> Table {
        Table::from_rows(&self.history)
    }
}

/// Loads a branch's log, price book and suppliers and builds every report for `period`.
#[instrument(skip(db))]
pub async fn generate_report(
    db: &DatabaseConnection,
    branch: &str,
    period: ReportPeriod,
) -> Result<LedgerReport> {
    let log = ledger::list_transactions(db, branch).await?;
    let prices = pricing::list_sale_prices(db, branch).await?;
    let suppliers = supplier::list_suppliers(db, branch).await?;

    let report = LedgerReport {
        branch: branch.to_string(),
        products: product_summary(&log, &period, &prices),
        suppliers: supplier_breakdown(&log, &period, &prices, &suppliers),
        history: transaction_history(&log, &period),
        period,
    };
    debug!(
        "Report for {}: {} products, {} supplier rows, {} records",
        branch,
        report.products.len(),
        report.suppliers.len(),
        report.history.len()
    );
    Ok(report)
}
