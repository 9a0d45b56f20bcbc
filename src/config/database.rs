//! Database configuration module.
//!
//! Handles the store connection and table creation using `SeaORM`. Tables are generated with
//! `Schema::create_table_from_entity` so the schema always matches the entity definitions.

use crate::entities::{Customer, ProductPrice, Supplier, Transaction};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info, instrument};

/// Default store location when neither the config file nor the environment names one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/branch_ledger.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back to
/// the given default.
#[must_use]
pub fn database_url_or(default: &str) -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| default.to_string())
}

/// Establishes a connection to the store at `database_url` and makes sure every table exists.
#[instrument]
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Opening ledger store");
    let db = Database::connect(database_url).await?;
    create_tables(&db).await?;
    info!("Ledger store ready");
    Ok(db)
}

/// Creates the transaction log and master data tables if they do not exist yet.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut tables = [
        schema.create_table_from_entity(Transaction),
        schema.create_table_from_entity(Supplier),
        schema.create_table_from_entity(Customer),
        schema.create_table_from_entity(ProductPrice),
    ];

    for table in &mut tables {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    Ok(())
}
