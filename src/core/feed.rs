//! Live ledger feed - Publishes full branch snapshots and caches the derived stock view.
//!
//! Each branch gets one `watch` channel carrying the latest full transaction snapshot. Writes
//! made through the feed re-read the branch log afterwards and publish it, and the memoized
//! stock positions of that branch are dropped so the next reader reduces the new snapshot.
//!
//! Re-reads of one branch are serialized: the log is read and published while holding the
//! branch's refresh lock, so a slower re-read can never overwrite a newer snapshot.

use crate::{
    config::LedgerConfig,
    core::{
        cart::{Cart, Receipt},
        context::BranchContext,
        ledger::{self, NewInput},
        reconcile::{StockPositions, reduce},
    },
    entities::transaction,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, info, warn};

/// Full transaction set of one branch at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSnapshot {
    pub branch: String,
    /// Increases by one with every published snapshot of the branch
    pub version: u64,
    /// Newest first
    pub transactions: Vec<transaction::Model>,
}

#[derive(Debug)]
struct BranchFeed {
    sender: watch::Sender<Arc<LedgerSnapshot>>,
    stock: Option<Arc<StockPositions>>,
}

/// Per-branch snapshot publisher with a stock cache.
///
/// Only branches served by the configuration are accepted. Cloning is cheap and every clone
/// shares the same channels and cache.
#[derive(Debug, Clone, Default)]
pub struct LedgerFeed {
    branches: Arc<RwLock<HashMap<String, BranchFeed>>>,
    refresh_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
    config: Arc<LedgerConfig>,
}

impl LedgerFeed {
    /// Feed with default settings: every branch is served and receipts use the `OUT` prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed restricted to the configured branches, numbering receipts with the configured
    /// prefix.
    #[must_use]
    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            config: Arc::new(config),
            ..Self::default()
        }
    }

    /// Subscribes to a branch. The receiver holds the current snapshot immediately, loading it
    /// from the store if nobody subscribed to the branch before.
    pub async fn subscribe(
        &self,
        db: &DatabaseConnection,
        branch: &str,
    ) -> Result<watch::Receiver<Arc<LedgerSnapshot>>> {
        self.ensure_served(branch)?;
        if let Some(feed) = self.branches.read().await.get(branch) {
            return Ok(feed.sender.subscribe());
        }
        self.refresh(db, branch).await?;

        let branches = self.branches.read().await;
        let receiver = branches.get(branch).map_or_else(
            || watch::channel(Arc::new(LedgerSnapshot::default())).1,
            |feed| feed.sender.subscribe(),
        );
        Ok(receiver)
    }

    /// Re-reads a branch log and publishes it to every subscriber.
    pub async fn refresh(&self, db: &DatabaseConnection, branch: &str) -> Result<Arc<LedgerSnapshot>> {
        self.ensure_served(branch)?;
        let lock = self.refresh_lock(branch).await;
        let _guard = lock.lock().await;

        let transactions = ledger::list_transactions(db, branch).await?;

        let mut branches = self.branches.write().await;
        let feed = branches.entry(branch.to_string()).or_insert_with(|| BranchFeed {
            sender: watch::Sender::new(Arc::new(LedgerSnapshot {
                branch: branch.to_string(),
                ..Default::default()
            })),
            stock: None,
        });

        let snapshot = Arc::new(LedgerSnapshot {
            branch: branch.to_string(),
            version: feed.sender.borrow().version + 1,
            transactions,
        });
        feed.sender.send_replace(Arc::clone(&snapshot));
        feed.stock = None;

        info!(
            "Published snapshot v{} of {} with {} records",
            snapshot.version,
            branch,
            snapshot.transactions.len()
        );
        Ok(snapshot)
    }

    /// Current stock positions of a branch, reduced at most once per snapshot.
    pub async fn stock(&self, db: &DatabaseConnection, branch: &str) -> Result<Arc<StockPositions>> {
        self.ensure_served(branch)?;
        if let Some(stock) = self
            .branches
            .read()
            .await
            .get(branch)
            .and_then(|feed| feed.stock.clone())
        {
            return Ok(stock);
        }

        let known = self.branches.read().await.contains_key(branch);
        if !known {
            self.refresh(db, branch).await?;
        }

        let mut branches = self.branches.write().await;
        let Some(feed) = branches.get_mut(branch) else {
            return Ok(Arc::new(StockPositions::new()));
        };
        let positions = Arc::new(reduce(&feed.sender.borrow().transactions));
        feed.stock = Some(Arc::clone(&positions));
        debug!("Stock cache of {} rebuilt with {} products", branch, positions.len());
        Ok(positions)
    }

    /// Records an input and publishes the branch.
    pub async fn record_input(
        &self,
        db: &DatabaseConnection,
        ctx: &BranchContext,
        input: NewInput,
    ) -> Result<transaction::Model> {
        self.ensure_served(&ctx.branch)?;
        let record = ledger::record_input(db, ctx, input).await?;
        self.publish_after_write(db, &ctx.branch).await;
        Ok(record)
    }

    /// Deletes a transaction and publishes the branch.
    pub async fn delete_transaction(
        &self,
        db: &DatabaseConnection,
        branch: &str,
        transaction_id: i64,
    ) -> Result<()> {
        self.ensure_served(branch)?;
        ledger::delete_transaction(db, branch, transaction_id).await?;
        self.publish_after_write(db, branch).await;
        Ok(())
    }

    /// Commits a cart with the configured receipt prefix and publishes the branch.
    pub async fn checkout(
        &self,
        db: &DatabaseConnection,
        ctx: &BranchContext,
        cart: &mut Cart,
        destination_customer: &str,
    ) -> Result<Receipt> {
        self.ensure_served(&ctx.branch)?;
        let receipt = cart
            .commit(db, ctx, destination_customer, &self.config.receipt_prefix)
            .await?;
        self.publish_after_write(db, &ctx.branch).await;
        Ok(receipt)
    }

    fn ensure_served(&self, branch: &str) -> Result<()> {
        if self.config.serves_branch(branch) {
            Ok(())
        } else {
            Err(Error::BranchNotServed {
                branch: branch.to_string(),
            })
        }
    }

    async fn refresh_lock(&self, branch: &str) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        Arc::clone(locks.entry(branch.to_string()).or_default())
    }

    // The write is already durable; a failed re-read only delays subscribers until the next one.
    async fn publish_after_write(&self, db: &DatabaseConnection, branch: &str) {
        if let Err(e) = self.refresh(db, branch).await {
            warn!("Write to {} succeeded but snapshot refresh failed: {}", branch, e);
        }
    }
}
