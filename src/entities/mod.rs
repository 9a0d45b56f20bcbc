//! Entity module - Contains all SeaORM entity definitions for the database.
//! Every table is scoped per branch through its `branch` column.

pub mod customer;
pub mod enums;
pub mod product_price;
pub mod supplier;
pub mod transaction;

pub use customer::{Column as CustomerColumn, Entity as Customer, Model as CustomerModel};
pub use enums::{MovementKind, Unit};
pub use product_price::{
    Column as ProductPriceColumn, Entity as ProductPrice, Model as ProductPriceModel,
};
pub use supplier::{Column as SupplierColumn, Entity as Supplier, Model as SupplierModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
