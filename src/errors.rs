//! Unified error types for the ledger core.
//!
//! Every failure falls into one of three classes (see [`ErrorKind`]): user-correctable
//! validation problems, store failures coming from the database layer, and configuration
//! problems raised while the embedding application starts up.

use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse classification of an [`Error`], used by callers to decide how to surface it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input problem the operator can correct; never retried automatically.
    Validation,
    /// Connectivity or permission failure from the store; retried manually.
    Store,
    /// Startup configuration problem.
    Config,
}

/// All errors produced by the ledger core.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Required field is missing: {field}")]
    MissingField { field: &'static str },

    #[error("Quantity must be greater than zero (got {quantity})")]
    InvalidQuantity { quantity: Decimal },

    #[error("Invalid price: {price}")]
    InvalidPrice { price: Decimal },

    #[error("Unknown unit: {unit}")]
    UnknownUnit { unit: String },

    #[error("Product is not in stock: {name}")]
    ProductNotInStock { name: String },

    #[error("No sale price configured for product: {name}")]
    MissingSalePrice { name: String },

    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("No cart line at position {index} (cart has {len} lines)")]
    CartLineOutOfRange { index: usize, len: usize },

    #[error("Invalid report period: {reason}")]
    InvalidPeriod { reason: String },

    #[error("Branch is not served by this installation: {branch}")]
    BranchNotServed { branch: String },

    #[error("Customer already exists: {name}")]
    DuplicateCustomer { name: String },

    #[error("No record {id} in {collection}")]
    NotFound { collection: &'static str, id: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Classifies this error into validation, store or configuration failures.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Database(_) | Self::NotFound { .. } => ErrorKind::Store,
            Self::Config { .. } => ErrorKind::Config,
            _ => ErrorKind::Validation,
        }
    }

    /// Returns true for user-correctable input problems.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation)
    }

    /// Returns true for failures reported by the store.
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self.kind(), ErrorKind::Store)
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
