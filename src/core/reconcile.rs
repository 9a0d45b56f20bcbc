//! Stock reconciliation - Derives the current stock view from the transaction log.
//!
//! Stock is never stored. Every time the log changes the whole branch log is folded again
//! with [`reduce`], so the result does not depend on the order in which records arrive or on
//! how many writers produced them. Product and supplier names are joined through
//! [`canonicalize`]; there is no separate product identity table.

use crate::entities::{MovementKind, Unit, transaction};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Supplier key used for inputs that carry no supplier name.
pub const UNKNOWN_SUPPLIER: &str = "-";

/// Canonical form of a product, supplier or customer name: trimmed and upper-cased.
#[must_use]
pub fn canonicalize(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Derived stock level of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockPosition {
    /// Canonical product name
    pub product_name: String,
    /// Sum of input quantities minus sum of output quantities; may be negative
    pub total_quantity: Decimal,
    /// Unit of the latest input, or of any movement when the product has no input
    pub unit: Unit,
    /// Cumulative input quantity per canonical supplier name; outputs never decrement it
    pub supplier_breakdown: BTreeMap<String, Decimal>,
}

impl StockPosition {
    /// True when outputs recorded in the log exceed recorded inputs.
    #[must_use]
    pub fn is_overdrawn(&self) -> bool {
        self.total_quantity < Decimal::ZERO
    }
}

/// Stock positions keyed by canonical product name.
pub type StockPositions = BTreeMap<String, StockPosition>;

/// Folds a branch's full transaction set into stock positions.
///
/// Quantities are summed with their sign (+input, -output), inputs add to the supplier
/// breakdown, and the unit follows the input with the latest `recorded_at`. Records whose
/// product name is blank after canonicalization are skipped.
#[must_use]
pub fn reduce(transactions: &[transaction::Model]) -> StockPositions {
    // Timestamp of the input that currently decides each product's unit
    let mut unit_source: BTreeMap<String, Option<chrono::DateTime<chrono::Utc>>> =
        BTreeMap::new();
    let mut positions = StockPositions::new();

    for tx in transactions {
        let name = canonicalize(&tx.product_name);
        if name.is_empty() {
            continue;
        }

        let position = positions
            .entry(name.clone())
            .or_insert_with(|| StockPosition {
                product_name: name.clone(),
                total_quantity: Decimal::ZERO,
                unit: tx.unit,
                supplier_breakdown: BTreeMap::new(),
            });

        position.total_quantity += tx.signed_quantity();

        if tx.kind == MovementKind::Input {
            let replace_unit = match unit_source.get(&name) {
                Some(seen_at) => tx.recorded_at > *seen_at,
                None => true,
            };
            if replace_unit {
                position.unit = tx.unit;
                unit_source.insert(name.clone(), tx.recorded_at);
            }

            let supplier = supplier_key(tx.supplier_name.as_deref());
            *position
                .supplier_breakdown
                .entry(supplier)
                .or_insert(Decimal::ZERO) += tx.quantity;
        }
    }

    for position in positions.values().filter(|p| p.is_overdrawn()) {
        warn!(
            product = %position.product_name,
            quantity = %position.total_quantity,
            "Stock position is negative: outputs exceed recorded inputs"
        );
    }
    debug!(
        "Reduced {} transactions into {} stock positions",
        transactions.len(),
        positions.len()
    );

    positions
}

/// Quantity that can still be staged for sale: the product's total minus what is already
/// staged in the local cart. Products without a position have nothing available.
///
/// This is a per-session reservation only. Other sessions staging the same product are not
/// visible here.
#[must_use]
pub fn available_for_sale(positions: &StockPositions, product_name: &str, staged: Decimal) -> Decimal {
    positions
        .get(&canonicalize(product_name))
        .map_or(Decimal::ZERO, |p| p.total_quantity - staged)
}

/// Finds the input that defines the latest purchase price for a product, optionally scoped to
/// one supplier.
///
/// Inputs are ranked by `recorded_at` descending with missing timestamps ranked last. When
/// several inputs share the top rank (including several without a timestamp) the first one
/// encountered wins.
#[must_use]
pub fn latest_input<'a>(
    transactions: &'a [transaction::Model],
    product_name: &str,
    supplier_name: Option<&str>,
) -> Option<&'a transaction::Model> {
    let product = canonicalize(product_name);
    let supplier = supplier_name.map(canonicalize);

    transactions
        .iter()
        .filter(|tx| tx.kind == MovementKind::Input)
        .filter(|tx| canonicalize(&tx.product_name) == product)
        .filter(|tx| {
            supplier
                .as_deref()
                .is_none_or(|s| supplier_key(tx.supplier_name.as_deref()) == s)
        })
        .fold(None, |best: Option<&transaction::Model>, tx| match best {
            Some(current) if tx.recorded_at <= current.recorded_at => Some(current),
            _ => Some(tx),
        })
}

/// Latest unit purchase price for a product (optionally per supplier), or zero when no
/// matching input exists.
#[must_use]
pub fn latest_purchase_price(
    transactions: &[transaction::Model],
    product_name: &str,
    supplier_name: Option<&str>,
) -> Decimal {
    latest_input(transactions, product_name, supplier_name)
        .and_then(|tx| tx.unit_purchase_price)
        .unwrap_or(Decimal::ZERO)
}

/// Canonical product names containing `fragment` (case-insensitive), in sorted order.
#[must_use]
pub fn suggest_product_names(positions: &StockPositions, fragment: &str) -> Vec<String> {
    let needle = canonicalize(fragment);
    positions
        .keys()
        .filter(|name| name.contains(&needle))
        .cloned()
        .collect()
}

fn supplier_key(supplier_name: Option<&str>) -> String {
    supplier_name
        .map(canonicalize)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_SUPPLIER.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use proptest::prelude::*;

    fn telur_log() -> Vec<transaction::Model> {
        vec![
            input_tx(1, "Telur", "Supplier A", 100, 1000, at(1_000)),
            output_tx(2, "Telur", "Customer X", 30, Some(1500), at(2_000)),
        ]
    }

    #[test]
    fn test_reduce_telur_scenario() {
        let positions = reduce(&telur_log());

        let telur = positions.get("TELUR").unwrap();
        assert_eq!(telur.total_quantity, dec(70));
        assert_eq!(telur.unit, Unit::Kg);
        assert_eq!(telur.supplier_breakdown.len(), 1);
        assert_eq!(telur.supplier_breakdown.get("SUPPLIER A"), Some(&dec(100)));
    }

    #[test]
    fn test_reduce_groups_by_canonical_name() {
        let log = vec![
            input_tx(1, " telur ", "Supplier A", 10, 1000, at(1)),
            input_tx(2, "TELUR", "supplier a", 5, 1000, at(2)),
            input_tx(3, "Beras", "Supplier B", 7, 9000, at(3)),
        ];
        let positions = reduce(&log);

        assert_eq!(positions.len(), 2);
        assert_eq!(positions["TELUR"].total_quantity, dec(15));
        assert_eq!(positions["TELUR"].supplier_breakdown["SUPPLIER A"], dec(15));
        assert_eq!(positions["BERAS"].total_quantity, dec(7));
    }

    #[test]
    fn test_reduce_outputs_never_touch_supplier_breakdown() {
        let mut log = telur_log();
        log.push(output_tx(3, "telur", "Customer Y", 50, Some(1500), at(3_000)));
        let positions = reduce(&log);

        assert_eq!(positions["TELUR"].total_quantity, dec(20));
        assert_eq!(positions["TELUR"].supplier_breakdown["SUPPLIER A"], dec(100));
    }

    #[test]
    fn test_reduce_allows_negative_stock() {
        let log = vec![output_tx(1, "Gula", "Customer X", 5, Some(100), at(1))];
        let positions = reduce(&log);

        let gula = &positions["GULA"];
        assert_eq!(gula.total_quantity, dec(-5));
        assert!(gula.is_overdrawn());
        assert!(gula.supplier_breakdown.is_empty());
    }

    #[test]
    fn test_reduce_unit_follows_latest_input() {
        let mut older = input_tx(1, "Minyak", "Supplier A", 10, 100, at(10));
        older.unit = Unit::Liter;
        let mut newer = input_tx(2, "Minyak", "Supplier A", 2, 100, at(20));
        newer.unit = Unit::Box;
        let mut output = output_tx(3, "Minyak", "Customer X", 1, Some(200), at(30));
        output.unit = Unit::Pcs;

        let forward = reduce(&[newer.clone(), older.clone(), output.clone()]);
        let backward = reduce(&[output, older, newer]);
        assert_eq!(forward["MINYAK"].unit, Unit::Box);
        assert_eq!(backward["MINYAK"].unit, Unit::Box);
    }

    #[test]
    fn test_reduce_unit_falls_back_to_any_movement() {
        let mut output = output_tx(1, "Garam", "Customer X", 1, Some(200), at(1));
        output.unit = Unit::Pack;
        assert_eq!(reduce(&[output])["GARAM"].unit, Unit::Pack);
    }

    #[test]
    fn test_reduce_skips_blank_product_names() {
        let log = vec![input_tx(1, "   ", "Supplier A", 10, 100, at(1))];
        assert!(reduce(&log).is_empty());
    }

    #[test]
    fn test_input_without_supplier_uses_placeholder() {
        let mut tx = input_tx(1, "Telur", "x", 10, 100, at(1));
        tx.supplier_name = None;
        let positions = reduce(&[tx]);
        assert_eq!(positions["TELUR"].supplier_breakdown[UNKNOWN_SUPPLIER], dec(10));
    }

    #[test]
    fn test_available_for_sale_subtracts_staged() {
        let positions = reduce(&telur_log());
        assert_eq!(available_for_sale(&positions, "telur", dec(0)), dec(70));
        assert_eq!(available_for_sale(&positions, "TELUR", dec(20)), dec(50));
        assert_eq!(available_for_sale(&positions, "Beras", dec(0)), dec(0));
    }

    #[test]
    fn test_latest_purchase_price_zero_without_inputs() {
        assert_eq!(latest_purchase_price(&[], "Telur", None), dec(0));

        let log = telur_log();
        assert_eq!(latest_purchase_price(&log, "Beras", None), dec(0));
        assert_eq!(latest_purchase_price(&log, "Telur", Some("Supplier Z")), dec(0));
    }

    #[test]
    fn test_latest_purchase_price_picks_newest() {
        let log = vec![
            input_tx(1, "Telur", "Supplier A", 10, 1000, at(100)),
            input_tx(2, "Telur", "Supplier B", 10, 1200, at(300)),
            input_tx(3, "Telur", "Supplier A", 10, 1100, at(200)),
        ];
        assert_eq!(latest_purchase_price(&log, "telur", None), dec(1200));
        assert_eq!(latest_purchase_price(&log, "telur", Some("supplier a")), dec(1100));
    }

    #[test]
    fn test_latest_purchase_price_ranks_missing_timestamps_last() {
        let log = vec![
            input_tx(1, "Telur", "Supplier A", 10, 900, None),
            input_tx(2, "Telur", "Supplier A", 10, 1000, at(1)),
        ];
        assert_eq!(latest_purchase_price(&log, "Telur", None), dec(1000));
    }

    #[test]
    fn test_latest_purchase_price_without_timestamps_is_first_encountered() {
        let log = vec![
            input_tx(1, "Telur", "Supplier A", 10, 900, None),
            input_tx(2, "Telur", "Supplier A", 10, 950, None),
        ];
        assert_eq!(latest_input(&log, "Telur", None).unwrap().id, 1);
        assert_eq!(latest_purchase_price(&log, "Telur", None), dec(900));
    }

    #[test]
    fn test_suggest_product_names() {
        let log = vec![
            input_tx(1, "Telur Ayam", "Supplier A", 1, 1, at(1)),
            input_tx(2, "Telur Bebek", "Supplier A", 1, 1, at(2)),
            input_tx(3, "Beras", "Supplier A", 1, 1, at(3)),
        ];
        let positions = reduce(&log);
        assert_eq!(
            suggest_product_names(&positions, "telur"),
            vec!["TELUR AYAM".to_string(), "TELUR BEBEK".to_string()]
        );
    }

    fn arb_log() -> impl Strategy<Value = Vec<transaction::Model>> {
        prop::collection::vec(
            (any::<bool>(), 0usize..3, 0i64..500, 0i64..5_000, prop::option::of(0i64..1_000)),
            0..40,
        )
        .prop_map(|rows| {
            let products = ["Telur", " beras", "GULA "];
            rows.into_iter()
                .enumerate()
                .map(|(i, (is_input, p, qty, price, secs))| {
                    let id = i64::try_from(i).unwrap();
                    if is_input {
                        input_tx(id, products[p], "Supplier A", qty, price, secs.and_then(at))
                    } else {
                        output_tx(id, products[p], "Customer X", qty, Some(price), secs.and_then(at))
                    }
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_totals_are_order_invariant(log in arb_log(), seed in any::<u64>()) {
            let mut shuffled = log.clone();
            let len = shuffled.len();
            if len > 1 {
                let mut state = seed;
                for i in (1..len).rev() {
                    state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                    let j = usize::try_from(state >> 33).unwrap() % (i + 1);
                    shuffled.swap(i, j);
                }
            }

            let a = reduce(&log);
            let b = reduce(&shuffled);
            prop_assert_eq!(a.len(), b.len());
            for (name, position) in &a {
                prop_assert_eq!(position.total_quantity, b[name].total_quantity);
                prop_assert_eq!(&position.supplier_breakdown, &b[name].supplier_breakdown);
            }
        }

        #[test]
        fn prop_totals_match_signed_sums(log in arb_log()) {
            let positions = reduce(&log);
            for (name, position) in &positions {
                let expected: Decimal = log
                    .iter()
                    .filter(|tx| canonicalize(&tx.product_name) == *name)
                    .map(transaction::Model::signed_quantity)
                    .sum();
                prop_assert_eq!(position.total_quantity, expected);
            }
        }

        #[test]
        fn prop_canonicalize_is_idempotent(name in "[a-zA-Z0-9 \\t.-]{0,24}") {
            let once = canonicalize(&name);
            prop_assert_eq!(canonicalize(&once), once);
        }

        #[test]
        fn prop_canonicalize_ignores_case_and_padding(name in "[a-zA-Z ]{0,12}", pad in 0usize..4) {
            let padded = format!("{}{}{}", " ".repeat(pad), name.to_lowercase(), " ".repeat(pad));
            prop_assert_eq!(canonicalize(&padded), canonicalize(&name.to_uppercase()));
        }
    }

    #[test]
    fn test_canonicalize_examples() {
        assert_eq!(canonicalize(" telur "), "TELUR");
        assert_eq!(canonicalize(" telur "), canonicalize("TELUR"));
    }
}
