//! Customer master data - Destinations for outgoing stock.
//!
//! Names are canonical and unique per branch, so checkout can refer to a customer by name.

use crate::{
    core::reconcile::canonicalize,
    entities::{Customer, customer},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Editable customer details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerDetails {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub needed_products: String,
    pub notes: String,
}

impl CustomerDetails {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::MissingField { field: "name" });
        }
        if self.phone.trim().is_empty() {
            return Err(Error::MissingField { field: "phone" });
        }
        Ok(())
    }
}

/// Retrieves every customer of a branch, ordered by name.
pub async fn list_all(db: &DatabaseConnection, branch: &str) -> Result<Vec<customer::Model>> {
    Customer::find()
        .filter(customer::Column::Branch.eq(branch))
        .order_by_asc(customer::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a customer by name (compared in canonical form).
pub async fn find_by_name(
    db: &DatabaseConnection,
    branch: &str,
    name: &str,
) -> Result<Option<customer::Model>> {
    Customer::find()
        .filter(customer::Column::Branch.eq(branch))
        .filter(customer::Column::Name.eq(canonicalize(name)))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a customer. Name and phone are required and the canonical name must be unused.
pub async fn create_customer(
    db: &DatabaseConnection,
    branch: &str,
    details: CustomerDetails,
) -> Result<customer::Model> {
    details.validate()?;

    let name = canonicalize(&details.name);
    if find_by_name(db, branch, &name).await?.is_some() {
        return Err(Error::DuplicateCustomer { name });
    }

    let record = customer::ActiveModel {
        branch: Set(branch.to_string()),
        name: Set(name),
        address: Set(canonicalize(&details.address)),
        phone: Set(details.phone.trim().to_string()),
        needed_products: Set(canonicalize(&details.needed_products)),
        notes: Set(details.notes.trim().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    record.insert(db).await.map_err(Into::into)
}

/// Updates a customer. Renaming onto another customer's name is rejected.
pub async fn update_customer(
    db: &DatabaseConnection,
    branch: &str,
    customer_id: i64,
    details: CustomerDetails,
) -> Result<customer::Model> {
    details.validate()?;

    let name = canonicalize(&details.name);
    if let Some(existing) = find_by_name(db, branch, &name).await? {
        if existing.id != customer_id {
            return Err(Error::DuplicateCustomer { name });
        }
    }

    let mut record: customer::ActiveModel = Customer::find_by_id(customer_id)
        .filter(customer::Column::Branch.eq(branch))
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            collection: "customers",
            id: customer_id,
        })?
        .into();

    record.name = Set(name);
    record.address = Set(canonicalize(&details.address));
    record.phone = Set(details.phone.trim().to_string());
    record.needed_products = Set(canonicalize(&details.needed_products));
    record.notes = Set(details.notes.trim().to_string());

    record.update(db).await.map_err(Into::into)
}

/// Deletes a customer record. Past outputs keep the customer name they were shipped to.
pub async fn delete_customer(db: &DatabaseConnection, branch: &str, customer_id: i64) -> Result<bool> {
    let result = Customer::delete_many()
        .filter(customer::Column::Id.eq(customer_id))
        .filter(customer::Column::Branch.eq(branch))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}
