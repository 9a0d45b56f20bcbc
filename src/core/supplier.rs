//! Supplier master data.
//!
//! Suppliers are keyed by canonical name per branch. They are created explicitly from the
//! supplier list, or implicitly the first time an input names them.

use crate::{
    core::{context::BranchContext, reconcile::canonicalize},
    entities::{Supplier, supplier},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};

/// Placeholder used for contact details that are not known yet.
const UNKNOWN_DETAIL: &str = "-";

/// Editable supplier details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplierDetails {
    pub name: String,
    pub contact: String,
    pub address: String,
    pub goods_type: String,
    pub max_delivery: String,
}

impl SupplierDetails {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::MissingField { field: "name" });
        }
        if self.contact.trim().is_empty() {
            return Err(Error::MissingField { field: "contact" });
        }
        Ok(())
    }
}

/// Retrieves every supplier of a branch, ordered by name.
pub async fn list_suppliers(db: &DatabaseConnection, branch: &str) -> Result<Vec<supplier::Model>> {
    Supplier::find()
        .filter(supplier::Column::Branch.eq(branch))
        .order_by_asc(supplier::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a supplier by name (compared in canonical form).
pub async fn find_by_name<C>(db: &C, branch: &str, name: &str) -> Result<Option<supplier::Model>>
where
    C: ConnectionTrait,
{
    Supplier::find()
        .filter(supplier::Column::Branch.eq(branch))
        .filter(supplier::Column::Name.eq(canonicalize(name)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a supplier from the supplier list. Name and contact are required.
pub async fn create_supplier(
    db: &DatabaseConnection,
    ctx: &BranchContext,
    details: SupplierDetails,
) -> Result<supplier::Model> {
    details.validate()?;

    let record = supplier::ActiveModel {
        branch: Set(ctx.branch.clone()),
        name: Set(canonicalize(&details.name)),
        contact: Set(details.contact.trim().to_string()),
        address: Set(canonicalize(&details.address)),
        goods_type: Set(canonicalize(&details.goods_type)),
        max_delivery: Set(canonicalize(&details.max_delivery)),
        last_purchase_price: Set(None),
        created_at: Set(Utc::now()),
        created_by: Set(ctx.operator.clone()),
        updated_at: Set(None),
        ..Default::default()
    };
    record.insert(db).await.map_err(Into::into)
}

/// Creates a placeholder supplier record if none with this name exists.
///
/// Returns true when a record was created.
pub async fn ensure_supplier<C>(db: &C, ctx: &BranchContext, name: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    if find_by_name(db, &ctx.branch, name).await?.is_some() {
        return Ok(false);
    }

    let record = supplier::ActiveModel {
        branch: Set(ctx.branch.clone()),
        name: Set(canonicalize(name)),
        contact: Set(UNKNOWN_DETAIL.to_string()),
        address: Set(UNKNOWN_DETAIL.to_string()),
        goods_type: Set(String::new()),
        max_delivery: Set(String::new()),
        last_purchase_price: Set(None),
        created_at: Set(Utc::now()),
        created_by: Set(ctx.operator.clone()),
        updated_at: Set(None),
        ..Default::default()
    };
    record.insert(db).await?;
    Ok(true)
}

/// Overwrites the denormalized last purchase price of every supplier record with this name.
///
/// Returns the number of records updated.
pub async fn update_purchase_price<C>(
    db: &C,
    branch: &str,
    name: &str,
    price: Decimal,
) -> Result<u64>
where
    C: ConnectionTrait,
{
    if price < Decimal::ZERO {
        return Err(Error::InvalidPrice { price });
    }

    let result = Supplier::update_many()
        .col_expr(supplier::Column::LastPurchasePrice, Expr::value(Some(price)))
        .col_expr(supplier::Column::UpdatedAt, Expr::value(Some(Utc::now())))
        .filter(supplier::Column::Branch.eq(branch))
        .filter(supplier::Column::Name.eq(canonicalize(name)))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Updates the editable details of a supplier.
pub async fn update_supplier(
    db: &DatabaseConnection,
    branch: &str,
    supplier_id: i64,
    details: SupplierDetails,
) -> Result<supplier::Model> {
    details.validate()?;

    let mut record: supplier::ActiveModel = Supplier::find_by_id(supplier_id)
        .filter(supplier::Column::Branch.eq(branch))
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            collection: "suppliers",
            id: supplier_id,
        })?
        .into();

    record.name = Set(canonicalize(&details.name));
    record.contact = Set(details.contact.trim().to_string());
    record.address = Set(canonicalize(&details.address));
    record.goods_type = Set(canonicalize(&details.goods_type));
    record.max_delivery = Set(canonicalize(&details.max_delivery));
    record.updated_at = Set(Some(Utc::now()));

    record.update(db).await.map_err(Into::into)
}

/// Deletes a supplier record. Inputs that name the supplier are unaffected.
pub async fn delete_supplier(db: &DatabaseConnection, branch: &str, supplier_id: i64) -> Result<bool> {
    let result = Supplier::delete_many()
        .filter(supplier::Column::Id.eq(supplier_id))
        .filter(supplier::Column::Branch.eq(branch))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn details(name: &str, contact: &str) -> SupplierDetails {
        SupplierDetails {
            name: name.to_string(),
            contact: contact.to_string(),
            address: "jl. pasar 1".to_string(),
            goods_type: "telur".to_string(),
            max_delivery: "500 kg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_supplier_validation() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let ctx = test_context();

        let err = create_supplier(&db, &ctx, details(" ", "0812")).await.unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "name" }));

        let err = create_supplier(&db, &ctx, details("Supplier A", "")).await.unwrap_err();
        assert!(matches!(err, Error::MissingField { field: "contact" }));
    }

    #[tokio::test]
    async fn test_create_and_find_supplier() -> Result<()> {
        let (db, ctx) = setup_ledger().await?;

        let created = create_supplier(&db, &ctx, details("Supplier A", " 0812 ")).await?;
        assert_eq!(created.name, "SUPPLIER A");
        assert_eq!(created.contact, "0812");
        assert_eq!(created.address, "JL. PASAR 1");

        let found = find_by_name(&db, &ctx.branch, "  supplier a").await?.unwrap();
        assert_eq!(found.id, created.id);
        assert!(find_by_name(&db, "CABANG-2", "Supplier A").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_supplier_only_creates_once() -> Result<()> {
        let (db, ctx) = setup_ledger().await?;

        assert!(ensure_supplier(&db, &ctx, "Supplier B").await?);
        assert!(!ensure_supplier(&db, &ctx, "SUPPLIER B ").await?);
        assert_eq!(list_suppliers(&db, &ctx.branch).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_purchase_price_overwrites() -> Result<()> {
        let (db, ctx) = setup_ledger().await?;
        ensure_supplier(&db, &ctx, "Supplier A").await?;

        assert_eq!(update_purchase_price(&db, &ctx.branch, "supplier a", dec(1000)).await?, 1);
        assert_eq!(update_purchase_price(&db, &ctx.branch, "supplier a", dec(900)).await?, 1);
        assert_eq!(update_purchase_price(&db, &ctx.branch, "Nobody", dec(900)).await?, 0);

        let supplier = find_by_name(&db, &ctx.branch, "Supplier A").await?.unwrap();
        assert_eq!(supplier.last_purchase_price, Some(dec(900)));
        assert!(supplier.updated_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_supplier() -> Result<()> {
        let (db, ctx) = setup_ledger().await?;
        let created = create_supplier(&db, &ctx, details("Supplier A", "0812")).await?;

        let updated = update_supplier(&db, &ctx.branch, created.id, details("Supplier AA", "0813")).await?;
        assert_eq!(updated.name, "SUPPLIER AA");
        assert_eq!(updated.contact, "0813");

        assert!(delete_supplier(&db, &ctx.branch, created.id).await?);
        assert!(!delete_supplier(&db, &ctx.branch, created.id).await?);
        assert!(list_suppliers(&db, &ctx.branch).await?.is_empty());
        Ok(())
    }
}
