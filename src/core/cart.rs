//! Cart and checkout - Stages outgoing stock and commits it as one batch.
//!
//! The cart lives only in the operator's session. Lines are validated against the reconciled
//! stock view when they are staged, and the whole cart is validated again at checkout against
//! a fresh read of the log. Checkout writes every line inside one store transaction, so a cart
//! is either written completely or not at all.
//!
//! Staged quantities reserve stock for this session only. Two sessions can both stage the last
//! units of a product; the second checkout then fails the commit-time stock check, because the
//! check re-reads the log inside the same store transaction that performs the writes.

use crate::{
    core::{
        context::BranchContext,
        ledger::{self, NewOutput},
        pricing::PriceBook,
        reconcile::{StockPositions, available_for_sale, canonicalize, latest_purchase_price, reduce},
    },
    entities::{Unit, transaction},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Checkout lifecycle of a cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum CartState {
    #[default]
    Empty,
    /// Lines are being added or removed
    Staging,
    /// Checkout is re-checking stock
    Validating,
    /// Checkout is writing the batch
    Committing,
}

/// One proposed output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Canonical product name
    pub product_name: String,
    pub quantity: Decimal,
    pub unit: Unit,
    /// Sale price frozen when the line was staged
    pub unit_sale_price: Decimal,
}

impl LineItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.quantity * self.unit_sale_price
    }
}

/// Snapshot of a committed cart, handed to receipt printing. Never read back as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    /// Generated receipt number, `<prefix>-<unix millis>`
    pub number: String,
    pub branch: String,
    pub operator: String,
    pub destination_customer: String,
    pub issued_at: DateTime<Utc>,
    pub items: Vec<LineItem>,
    /// Ids of the output records written for the items, in item order
    pub transaction_ids: Vec<i64>,
}

impl Receipt {
    /// Sum of all line totals, unrounded.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Total rounded to whole currency units for display.
    #[must_use]
    pub fn display_total(&self) -> Decimal {
        crate::core::report::round_money(self.total())
    }
}

/// Session-local staging area for outgoing stock.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<LineItem>,
    state: CartState,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> CartState {
        self.state
    }

    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total value of the staged lines, unrounded.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Quantity of a product already staged across all lines.
    #[must_use]
    pub fn staged_quantity(&self, product_name: &str) -> Decimal {
        let name = canonicalize(product_name);
        self.items
            .iter()
            .filter(|item| item.product_name == name)
            .map(|item| item.quantity)
            .sum()
    }

    /// Quantity of a product that can still be staged in this cart.
    #[must_use]
    pub fn available_for(&self, positions: &StockPositions, product_name: &str) -> Decimal {
        available_for_sale(positions, product_name, self.staged_quantity(product_name))
    }

    /// Stages an output line.
    ///
    /// Fails when the quantity is not positive, the product has no stock position or no
    /// configured sale price, or the quantity exceeds what is still available after the lines
    /// already staged. The configured sale price is frozen into the line. The line takes the
    /// unit of the stock position; `unit` is only used when they disagree for logging.
    pub fn add_line_item(
        &mut self,
        positions: &StockPositions,
        prices: &PriceBook,
        product_name: &str,
        quantity: Decimal,
        unit: Unit,
    ) -> Result<&LineItem> {
        self.recover_interrupted_checkout();

        if quantity <= Decimal::ZERO {
            return Err(Error::InvalidQuantity { quantity });
        }

        let name = canonicalize(product_name);
        let position = positions
            .get(&name)
            .ok_or_else(|| Error::ProductNotInStock { name: name.clone() })?;

        let unit_sale_price = prices
            .get(&name)
            .copied()
            .filter(|price| *price > Decimal::ZERO)
            .ok_or_else(|| Error::MissingSalePrice { name: name.clone() })?;

        let available = self.available_for(positions, &name);
        if quantity > available {
            return Err(Error::InsufficientStock {
                name,
                available,
                requested: quantity,
            });
        }

        if unit != position.unit {
            debug!(
                "Staging {} in stock unit {} instead of requested {}",
                name, position.unit, unit
            );
        }

        self.items.push(LineItem {
            product_name: name,
            quantity,
            unit: position.unit,
            unit_sale_price,
        });
        self.state = CartState::Staging;

        let index = self.items.len() - 1;
        Ok(&self.items[index])
    }

    /// Removes the line at `index`. Remaining lines are not re-validated.
    pub fn remove_line_item(&mut self, index: usize) -> Result<LineItem> {
        self.recover_interrupted_checkout();

        if index >= self.items.len() {
            return Err(Error::CartLineOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        let removed = self.items.remove(index);
        if self.items.is_empty() {
            self.state = CartState::Empty;
        }
        Ok(removed)
    }

    /// Discards every staged line.
    pub fn clear(&mut self) {
        self.items.clear();
        self.state = CartState::Empty;
    }

    /// Checks the staged quantities, summed per product, against stock totals.
    ///
    /// Compares with the full position total rather than the cart-adjusted figure, since the
    /// cart itself is what is about to be consumed.
    pub fn check_against(&self, positions: &StockPositions) -> Result<()> {
        let mut per_product: BTreeMap<&str, Decimal> = BTreeMap::new();
        for item in &self.items {
            *per_product
                .entry(item.product_name.as_str())
                .or_insert(Decimal::ZERO) += item.quantity;
        }

        for (name, requested) in per_product {
            let available = positions
                .get(name)
                .map_or(Decimal::ZERO, |p| p.total_quantity);
            if requested > available {
                return Err(Error::InsufficientStock {
                    name: name.to_string(),
                    available,
                    requested,
                });
            }
        }
        Ok(())
    }

    /// Commits the cart as outputs to `destination_customer` and returns the receipt.
    ///
    /// The branch log is re-read and stock re-derived inside a store transaction; any shortfall
    /// aborts before anything is written. Each line is stamped with the product's latest
    /// purchase price. On success the cart is cleared; on failure it keeps its lines so the
    /// operator can correct them and retry.
    #[instrument(skip(self, db), fields(branch = %ctx.branch, lines = self.items.len()))]
    pub async fn commit(
        &mut self,
        db: &DatabaseConnection,
        ctx: &BranchContext,
        destination_customer: &str,
        receipt_prefix: &str,
    ) -> Result<Receipt> {
        self.recover_interrupted_checkout();

        if self.items.is_empty() {
            return Err(Error::EmptyCart);
        }
        let destination = canonicalize(destination_customer);
        if destination.is_empty() {
            return Err(Error::MissingField {
                field: "destination_customer",
            });
        }

        self.state = CartState::Validating;
        match self.write_batch(db, ctx, &destination).await {
            Ok(written) => {
                let issued_at = Utc::now();
                let receipt = Receipt {
                    number: format!("{receipt_prefix}-{}", issued_at.timestamp_millis()),
                    branch: ctx.branch.clone(),
                    operator: ctx.operator.clone(),
                    destination_customer: destination,
                    issued_at,
                    items: std::mem::take(&mut self.items),
                    transaction_ids: written.iter().map(|tx| tx.id).collect(),
                };
                self.state = CartState::Empty;
                info!(
                    "Checkout {} wrote {} outputs",
                    receipt.number,
                    receipt.transaction_ids.len()
                );
                Ok(receipt)
            }
            Err(e) => {
                self.state = CartState::Staging;
                warn!("Checkout aborted, nothing written: {}", e);
                Err(e)
            }
        }
    }

    async fn write_batch(
        &mut self,
        db: &DatabaseConnection,
        ctx: &BranchContext,
        destination: &str,
    ) -> Result<Vec<transaction::Model>> {
        let txn = db.begin().await?;

        let log = ledger::list_transactions(&txn, &ctx.branch).await?;
        self.check_against(&reduce(&log))?;

        self.state = CartState::Committing;
        let mut written = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let output = NewOutput {
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit: item.unit,
                unit_sale_price: item.unit_sale_price,
                unit_purchase_price: latest_purchase_price(&log, &item.product_name, None),
                destination_customer: destination.to_string(),
            };
            written.push(ledger::append(&txn, output.into_active_model(ctx)).await?);
        }

        txn.commit().await?;
        Ok(written)
    }

    // A checkout future dropped mid-flight leaves the store transaction rolled back and the
    // cart in a checkout state; fall back to the state its lines imply.
    fn recover_interrupted_checkout(&mut self) {
        if matches!(self.state, CartState::Validating | CartState::Committing) {
            warn!("Previous checkout was interrupted; cart kept as staged");
        }
        self.state = if self.items.is_empty() {
            CartState::Empty
        } else {
            CartState::Staging
        };
    }
}
