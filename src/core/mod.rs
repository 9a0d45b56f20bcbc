//! Core ledger logic - Framework-agnostic operations over the transaction log and master data.
//! Nothing here knows about sessions, page shells or file formats; callers pass a
//! [`context::BranchContext`] and receive plain data back.

/// Checkout staging area and receipts
pub mod cart;
/// Branch and operator identity
pub mod context;
/// Customer master data
pub mod customer;
/// Live snapshots and the stock cache
pub mod feed;
/// Append, list and delete stock movements
pub mod ledger;
/// Configured sale prices
pub mod pricing;
/// Stock reconciliation engine
pub mod reconcile;
/// Period reports and tabular exports
pub mod report;
/// Supplier master data
pub mod supplier;

pub use cart::{Cart, CartState, LineItem, Receipt};
pub use context::BranchContext;
pub use feed::{LedgerFeed, LedgerSnapshot};
pub use reconcile::{StockPosition, StockPositions, canonicalize, reduce};
pub use report::{ReportPeriod, Table};
