use std::path::PathBuf;

use order_desk_core::{
    CustomerDraft, CustomerId, CustomerPatch, CustomerRecord, Entity, ItemDraft, ItemId,
    ItemPatch, ItemRecord, OrderDraft, OrderId, OrderPatch, OrderRecord, OrderView,
};
use order_desk_store_sqlite::{IntegrityReport, SchemaStatus, SqliteStore, StoreError};
use serde::{Deserialize, Serialize};

pub const API_CONTRACT_VERSION: &str = "api.v1";

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrateResult {
    pub dry_run: bool,
    pub current_version: i64,
    pub target_version: i64,
    pub would_apply_versions: Vec<i64>,
    pub after_version: Option<i64>,
    pub up_to_date: Option<bool>,
}

/// Operation surface over one `SQLite` database path. Each operation opens a
/// store scoped to the call and ensures the schema is current.
#[derive(Debug, Clone)]
pub struct OrderDeskApi {
    db_path: PathBuf,
}

impl OrderDeskApi {
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    fn open_store(&self) -> Result<SqliteStore> {
        let mut store = SqliteStore::open(&self.db_path)?;
        store.migrate()?;
        Ok(store)
    }

    /// Inspect schema status without mutating data.
    ///
    /// # Errors
    /// Returns an error when the `SQLite` database cannot be opened or queried.
    pub fn schema_status(&self) -> Result<SchemaStatus> {
        let store = SqliteStore::open(&self.db_path)?;
        store.schema_status()
    }

    /// Apply pending migrations, or return planned versions for dry-run mode.
    ///
    /// # Errors
    /// Returns an error when migration planning or execution fails.
    pub fn migrate(&self, dry_run: bool) -> Result<MigrateResult> {
        let mut store = SqliteStore::open(&self.db_path)?;
        let before = store.schema_status()?;
        if dry_run {
            return Ok(MigrateResult {
                dry_run: true,
                current_version: before.current_version,
                target_version: before.target_version,
                would_apply_versions: before.pending_versions,
                after_version: None,
                up_to_date: None,
            });
        }

        let planned_versions = before.pending_versions;
        store.migrate()?;
        let after = store.schema_status()?;
        Ok(MigrateResult {
            dry_run: false,
            current_version: before.current_version,
            target_version: before.target_version,
            would_apply_versions: planned_versions,
            after_version: Some(after.current_version),
            up_to_date: Some(after.pending_versions.is_empty()),
        })
    }

    /// Run database health probes.
    ///
    /// # Errors
    /// Returns an error when any integrity probe query fails.
    pub fn integrity_check(&self) -> Result<IntegrityReport> {
        let store = self.open_store()?;
        store.integrity_check()
    }

    /// Create one customer.
    ///
    /// # Errors
    /// Returns an error when persistence fails.
    pub fn create_customer(&self, draft: CustomerDraft) -> Result<CustomerRecord> {
        let mut store = self.open_store()?;
        store.insert_customer(&draft)
    }

    /// Fetch one customer.
    ///
    /// # Errors
    /// Returns a not-found error when the customer does not exist.
    pub fn get_customer(&self, id: CustomerId) -> Result<CustomerRecord> {
        let store = self.open_store()?;
        store.get_customer(id)?.ok_or_else(|| StoreError::not_found(Entity::Customer, id.0))
    }

    /// Apply a partial update to one customer.
    ///
    /// # Errors
    /// Returns a not-found error when the customer does not exist.
    pub fn update_customer(&self, id: CustomerId, patch: CustomerPatch) -> Result<()> {
        let mut store = self.open_store()?;
        store.update_customer(id, &patch)
    }

    /// Delete one customer.
    ///
    /// # Errors
    /// Returns a not-found error when the customer does not exist.
    pub fn delete_customer(&self, id: CustomerId) -> Result<()> {
        let mut store = self.open_store()?;
        store.delete_customer(id)
    }

    /// Create one catalog item.
    ///
    /// # Errors
    /// Returns an error when persistence fails.
    pub fn create_item(&self, draft: ItemDraft) -> Result<ItemRecord> {
        let mut store = self.open_store()?;
        store.insert_item(&draft)
    }

    /// Fetch one catalog item.
    ///
    /// # Errors
    /// Returns a not-found error when the item does not exist.
    pub fn get_item(&self, id: ItemId) -> Result<ItemRecord> {
        let store = self.open_store()?;
        store.get_item(id)?.ok_or_else(|| StoreError::not_found(Entity::Item, id.0))
    }

    /// Apply a partial update to one catalog item.
    ///
    /// # Errors
    /// Returns a not-found error when the item does not exist.
    pub fn update_item(&self, id: ItemId, patch: ItemPatch) -> Result<()> {
        let mut store = self.open_store()?;
        store.update_item(id, &patch)
    }

    /// Delete one catalog item.
    ///
    /// # Errors
    /// Returns a not-found error when the item does not exist.
    pub fn delete_item(&self, id: ItemId) -> Result<()> {
        let mut store = self.open_store()?;
        store.delete_item(id)
    }

    /// Compose one order from a customer reference and item references.
    ///
    /// # Errors
    /// Returns a not-found error for a missing customer or item; a failed
    /// create leaves no order or association rows behind.
    pub fn create_order(&self, draft: OrderDraft) -> Result<OrderRecord> {
        let mut store = self.open_store()?;
        store.create_order(&draft)
    }

    /// Read one order joined with its customer and item projections.
    ///
    /// # Errors
    /// Returns a not-found error when the order does not exist.
    pub fn get_order(&self, id: OrderId) -> Result<OrderView> {
        let store = self.open_store()?;
        store.order_view(id)
    }

    /// Apply a partial update to one order; a present item list fully
    /// replaces the existing associations.
    ///
    /// # Errors
    /// Returns a not-found error for a missing order, customer, or item; a
    /// failed update leaves the order unchanged.
    pub fn update_order(&self, id: OrderId, patch: OrderPatch) -> Result<()> {
        let mut store = self.open_store()?;
        store.update_order(id, &patch)
    }

    /// Delete one order and its association rows.
    ///
    /// # Errors
    /// Returns a not-found error when the order does not exist.
    pub fn delete_order(&self, id: OrderId) -> Result<()> {
        let mut store = self.open_store()?;
        store.delete_order(id)
    }
}
