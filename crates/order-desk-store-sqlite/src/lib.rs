use std::path::Path;

use order_desk_core::{
    CustomerDraft, CustomerId, CustomerPatch, CustomerRecord, CustomerSummary, DeskError, Entity,
    ItemDraft, ItemId, ItemPatch, ItemRecord, ItemReference, ItemSummary, OrderDraft, OrderId,
    OrderPatch, OrderRecord, OrderView,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

const LATEST_SCHEMA_VERSION: i64 = 1;

const CREATE_SCHEMA_MIGRATIONS_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at TEXT NOT NULL
);
";

const MIGRATION_001_SQL: &str = r"
CREATE TABLE IF NOT EXISTS customers (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT,
  phone TEXT
);

CREATE TABLE IF NOT EXISTS items (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT,
  price REAL
);

CREATE TABLE IF NOT EXISTS orders (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  cust_id INTEGER NOT NULL,
  notes TEXT,
  timestamp TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS item_list (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  order_id INTEGER NOT NULL,
  item_id INTEGER NOT NULL,
  FOREIGN KEY (order_id) REFERENCES orders(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_orders_cust_id ON orders(cust_id);
CREATE INDEX IF NOT EXISTS idx_item_list_order ON item_list(order_id);
CREATE INDEX IF NOT EXISTS idx_item_list_item ON item_list(item_id);
";

/// Errors surfaced by the `SQLite` record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Desk(#[from] DeskError),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("migration error: {0}")]
    Migration(String),
    #[error("stored data is invalid: {0}")]
    Corrupt(String),
}

impl StoreError {
    #[must_use]
    pub fn not_found(entity: Entity, id: i64) -> Self {
        Self::Desk(DeskError::not_found(entity, id))
    }

    /// The missing entity and identifier, when this error is a not-found.
    #[must_use]
    pub fn not_found_entity(&self) -> Option<(Entity, i64)> {
        match self {
            Self::Desk(DeskError::NotFound { entity, id }) => Some((*entity, *id)),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaStatus {
    pub current_version: i64,
    pub target_version: i64,
    pub pending_versions: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKeyViolation {
    pub table: String,
    pub rowid: i64,
    pub parent: String,
    pub fk_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IntegrityReport {
    pub quick_check_ok: bool,
    pub quick_check_message: String,
    pub foreign_key_violations: Vec<ForeignKeyViolation>,
    pub schema_status: SchemaStatus,
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a `SQLite`-backed order store and configure required runtime pragmas.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or pragmas cannot be applied.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(Self { conn })
    }

    /// Report current and target schema versions plus pending migrations.
    ///
    /// # Errors
    /// Returns an error when schema metadata cannot be read or initialized.
    pub fn schema_status(&self) -> Result<SchemaStatus> {
        self.conn.execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)?;
        let current_version = current_schema_version(&self.conn)?;
        let pending_versions = if current_version < LATEST_SCHEMA_VERSION {
            ((current_version + 1)..=LATEST_SCHEMA_VERSION).collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        Ok(SchemaStatus {
            current_version,
            target_version: LATEST_SCHEMA_VERSION,
            pending_versions,
        })
    }

    /// Apply all forward migrations up to the latest supported schema version.
    ///
    /// # Errors
    /// Returns an error when migration bootstrapping or any migration step fails.
    pub fn migrate(&mut self) -> Result<()> {
        self.conn.execute_batch(CREATE_SCHEMA_MIGRATIONS_SQL)?;

        let version = current_schema_version(&self.conn)?;
        if version == 0 {
            apply_migration_1(&self.conn)?;
            return Ok(());
        }

        if version != LATEST_SCHEMA_VERSION {
            return Err(StoreError::Migration(format!(
                "unsupported schema version {version}; expected {LATEST_SCHEMA_VERSION}"
            )));
        }

        Ok(())
    }

    /// Run quick-check, foreign-key-check, and schema status health probes.
    ///
    /// # Errors
    /// Returns an error when any integrity probe query fails.
    pub fn integrity_check(&self) -> Result<IntegrityReport> {
        let quick_check_message: String =
            self.conn.query_row("PRAGMA quick_check", [], |row| row.get::<_, String>(0))?;

        let mut stmt = self.conn.prepare("PRAGMA foreign_key_check")?;
        let rows = stmt.query_map([], |row| {
            Ok(ForeignKeyViolation {
                table: row.get(0)?,
                rowid: row.get(1)?,
                parent: row.get(2)?,
                fk_index: row.get(3)?,
            })
        })?;

        let mut foreign_key_violations = Vec::new();
        for row in rows {
            foreign_key_violations.push(row?);
        }

        let schema_status = self.schema_status()?;
        Ok(IntegrityReport {
            quick_check_ok: quick_check_message == "ok",
            quick_check_message,
            foreign_key_violations,
            schema_status,
        })
    }

    /// Insert one customer row and return the stored record.
    ///
    /// # Errors
    /// Returns an error when the insert fails.
    pub fn insert_customer(&mut self, draft: &CustomerDraft) -> Result<CustomerRecord> {
        self.conn.execute(
            "INSERT INTO customers (name, phone) VALUES (?1, ?2)",
            params![draft.name, draft.phone],
        )?;
        let id = CustomerId(self.conn.last_insert_rowid());
        Ok(CustomerRecord { id, name: draft.name.clone(), phone: draft.phone.clone() })
    }

    /// Point lookup of one customer.
    ///
    /// # Errors
    /// Returns an error when the lookup fails.
    pub fn get_customer(&self, id: CustomerId) -> Result<Option<CustomerRecord>> {
        let mut stmt =
            self.conn.prepare("SELECT id, name, phone FROM customers WHERE id = ?1")?;
        let record = stmt
            .query_row(params![id.0], |row| {
                Ok(CustomerRecord {
                    id: CustomerId(row.get(0)?),
                    name: row.get(1)?,
                    phone: row.get(2)?,
                })
            })
            .optional()?;
        Ok(record)
    }

    /// Apply the present patch fields to one customer, field by field.
    ///
    /// # Errors
    /// Returns [`StoreError::Desk`] not-found when the customer does not exist,
    /// or an error when a write fails.
    pub fn update_customer(&mut self, id: CustomerId, patch: &CustomerPatch) -> Result<()> {
        let tx = self.conn.transaction()?;
        if !customer_exists(&tx, id)? {
            return Err(StoreError::not_found(Entity::Customer, id.0));
        }

        if let Some(name) = &patch.name {
            tx.execute("UPDATE customers SET name = ?1 WHERE id = ?2", params![name, id.0])?;
        }
        if let Some(phone) = &patch.phone {
            tx.execute("UPDATE customers SET phone = ?1 WHERE id = ?2", params![phone, id.0])?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Delete one customer row. Orders referencing it are left untouched.
    ///
    /// # Errors
    /// Returns [`StoreError::Desk`] not-found when the customer does not exist.
    pub fn delete_customer(&mut self, id: CustomerId) -> Result<()> {
        let deleted = self.conn.execute("DELETE FROM customers WHERE id = ?1", params![id.0])?;
        if deleted == 0 {
            return Err(StoreError::not_found(Entity::Customer, id.0));
        }
        Ok(())
    }

    /// Insert one catalog item row and return the stored record.
    ///
    /// # Errors
    /// Returns an error when the insert fails.
    pub fn insert_item(&mut self, draft: &ItemDraft) -> Result<ItemRecord> {
        self.conn.execute(
            "INSERT INTO items (name, price) VALUES (?1, ?2)",
            params![draft.name, draft.price],
        )?;
        let id = ItemId(self.conn.last_insert_rowid());
        Ok(ItemRecord { id, name: draft.name.clone(), price: draft.price })
    }

    /// Point lookup of one catalog item.
    ///
    /// # Errors
    /// Returns an error when the lookup fails.
    pub fn get_item(&self, id: ItemId) -> Result<Option<ItemRecord>> {
        let mut stmt = self.conn.prepare("SELECT id, name, price FROM items WHERE id = ?1")?;
        let record = stmt
            .query_row(params![id.0], |row| {
                Ok(ItemRecord { id: ItemId(row.get(0)?), name: row.get(1)?, price: row.get(2)? })
            })
            .optional()?;
        Ok(record)
    }

    /// Apply the present patch fields to one catalog item, field by field.
    ///
    /// # Errors
    /// Returns [`StoreError::Desk`] not-found when the item does not exist,
    /// or an error when a write fails.
    pub fn update_item(&mut self, id: ItemId, patch: &ItemPatch) -> Result<()> {
        let tx = self.conn.transaction()?;
        if !item_exists(&tx, id)? {
            return Err(StoreError::not_found(Entity::Item, id.0));
        }

        if let Some(name) = &patch.name {
            tx.execute("UPDATE items SET name = ?1 WHERE id = ?2", params![name, id.0])?;
        }
        if let Some(price) = patch.price {
            tx.execute("UPDATE items SET price = ?1 WHERE id = ?2", params![price, id.0])?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Delete one catalog item row. Association rows referencing it are left
    /// untouched and drop out of order views.
    ///
    /// # Errors
    /// Returns [`StoreError::Desk`] not-found when the item does not exist.
    pub fn delete_item(&mut self, id: ItemId) -> Result<()> {
        let deleted = self.conn.execute("DELETE FROM items WHERE id = ?1", params![id.0])?;
        if deleted == 0 {
            return Err(StoreError::not_found(Entity::Item, id.0));
        }
        Ok(())
    }

    /// Compose a new order from a customer reference and a list of item
    /// references, in one transaction.
    ///
    /// The customer is resolved first, then every item reference in the given
    /// order; the first missing identifier fails the whole operation before
    /// the order row is inserted. On success the order row and one
    /// association row per reference (duplicates included) are committed
    /// together, so a failed create leaves no partial state behind.
    ///
    /// # Errors
    /// Returns [`StoreError::Desk`] not-found for a missing customer or item,
    /// or an error when a write fails.
    pub fn create_order(&mut self, draft: &OrderDraft) -> Result<OrderRecord> {
        let tx = self.conn.transaction()?;

        if !customer_exists(&tx, draft.cust_id)? {
            return Err(StoreError::not_found(Entity::Customer, draft.cust_id.0));
        }
        validate_item_refs(&tx, &draft.items)?;

        let created_at = OffsetDateTime::now_utc();
        tx.execute(
            "INSERT INTO orders (cust_id, notes, timestamp) VALUES (?1, ?2, ?3)",
            params![draft.cust_id.0, draft.notes, rfc3339(created_at)?],
        )?;
        let order_id = OrderId(tx.last_insert_rowid());
        insert_item_refs(&tx, order_id, &draft.items)?;

        tx.commit()?;
        Ok(OrderRecord {
            id: order_id,
            cust_id: draft.cust_id,
            notes: draft.notes.clone(),
            created_at,
        })
    }

    /// Point lookup of one order row.
    ///
    /// # Errors
    /// Returns an error when the lookup fails or the stored timestamp is invalid.
    pub fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let mut stmt =
            self.conn.prepare("SELECT id, cust_id, notes, timestamp FROM orders WHERE id = ?1")?;
        let row = stmt
            .query_row(params![id.0], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .optional()?;

        match row {
            Some((order_id, cust_id, notes, timestamp)) => Ok(Some(OrderRecord {
                id: OrderId(order_id),
                cust_id: CustomerId(cust_id),
                notes,
                created_at: parse_rfc3339(&timestamp)?,
            })),
            None => Ok(None),
        }
    }

    /// Read one order joined with its customer and item projections.
    ///
    /// A dangling customer reference yields `customer: None`; association
    /// rows whose item has since been deleted are omitted.
    ///
    /// # Errors
    /// Returns [`StoreError::Desk`] not-found when the order does not exist.
    pub fn order_view(&self, id: OrderId) -> Result<OrderView> {
        let order =
            self.get_order(id)?.ok_or_else(|| StoreError::not_found(Entity::Order, id.0))?;

        let customer = self
            .get_customer(order.cust_id)?
            .map(|record| CustomerSummary { name: record.name, phone: record.phone });
        let items = self.order_items(id)?;

        Ok(OrderView {
            id: order.id,
            cust_id: order.cust_id,
            created_at: order.created_at,
            notes: order.notes,
            customer,
            items,
        })
    }

    /// Apply a partial update to one order, in one transaction.
    ///
    /// Present fields apply independently: `notes` overwrites, `cust_id` is
    /// re-validated and overwrites, and `items` fully replaces the existing
    /// associations (delete then re-validate and re-insert, exactly as in
    /// create). Any failure rolls the whole update back, including the
    /// association delete.
    ///
    /// # Errors
    /// Returns [`StoreError::Desk`] not-found for a missing order, customer,
    /// or item, or an error when a write fails.
    pub fn update_order(&mut self, id: OrderId, patch: &OrderPatch) -> Result<()> {
        let tx = self.conn.transaction()?;

        if !order_exists(&tx, id)? {
            return Err(StoreError::not_found(Entity::Order, id.0));
        }

        if let Some(cust_id) = patch.cust_id {
            if !customer_exists(&tx, cust_id)? {
                return Err(StoreError::not_found(Entity::Customer, cust_id.0));
            }
            tx.execute("UPDATE orders SET cust_id = ?1 WHERE id = ?2", params![cust_id.0, id.0])?;
        }

        if let Some(notes) = &patch.notes {
            tx.execute("UPDATE orders SET notes = ?1 WHERE id = ?2", params![notes, id.0])?;
        }

        if let Some(items) = &patch.items {
            validate_item_refs(&tx, items)?;
            tx.execute("DELETE FROM item_list WHERE order_id = ?1", params![id.0])?;
            insert_item_refs(&tx, id, items)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Delete one order and all of its association rows, in one transaction.
    ///
    /// # Errors
    /// Returns [`StoreError::Desk`] not-found when the order does not exist.
    pub fn delete_order(&mut self, id: OrderId) -> Result<()> {
        let tx = self.conn.transaction()?;

        if !order_exists(&tx, id)? {
            return Err(StoreError::not_found(Entity::Order, id.0));
        }

        tx.execute("DELETE FROM item_list WHERE order_id = ?1", params![id.0])?;
        tx.execute("DELETE FROM orders WHERE id = ?1", params![id.0])?;

        tx.commit()?;
        Ok(())
    }

    fn order_items(&self, id: OrderId) -> Result<Vec<ItemSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT items.name, items.price FROM item_list
             JOIN items ON items.id = item_list.item_id
             WHERE item_list.order_id = ?1
             ORDER BY item_list.id ASC",
        )?;
        let rows = stmt.query_map(params![id.0], |row| {
            Ok(ItemSummary { name: row.get(0)?, price: row.get(1)? })
        })?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(MIGRATION_001_SQL)?;
    record_schema_version(conn, 1)?;
    Ok(())
}

fn record_schema_version(conn: &Connection, version: i64) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations(version, applied_at) VALUES (?1, ?2)",
        params![version, now_rfc3339()?],
    )?;
    Ok(())
}

fn current_schema_version(conn: &Connection) -> Result<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(version)
}

fn customer_exists(conn: &Connection, id: CustomerId) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM customers WHERE id = ?1)",
        params![id.0],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(exists == 1)
}

fn item_exists(conn: &Connection, id: ItemId) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1)",
        params![id.0],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(exists == 1)
}

fn order_exists(conn: &Connection, id: OrderId) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM orders WHERE id = ?1)",
        params![id.0],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(exists == 1)
}

// Resolution happens in the given order so the first missing identifier is
// the one reported.
fn validate_item_refs(conn: &Connection, refs: &[ItemReference]) -> Result<()> {
    for item in refs {
        if !item_exists(conn, item.id)? {
            return Err(StoreError::not_found(Entity::Item, item.id.0));
        }
    }
    Ok(())
}

fn insert_item_refs(conn: &Connection, order_id: OrderId, refs: &[ItemReference]) -> Result<()> {
    for item in refs {
        conn.execute(
            "INSERT INTO item_list (order_id, item_id) VALUES (?1, ?2)",
            params![order_id.0, item.id.0],
        )?;
    }
    Ok(())
}

fn now_rfc3339() -> Result<String> {
    rfc3339(OffsetDateTime::now_utc())
}

fn rfc3339(value: OffsetDateTime) -> Result<String> {
    value
        .format(&time::format_description::well_known::Rfc3339)
        .map_err(|err| StoreError::Corrupt(format!("failed to format RFC3339 timestamp: {err}")))
}

fn parse_rfc3339(value: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339)
        .map_err(|_| StoreError::Corrupt(format!("invalid RFC3339 timestamp: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> Result<SqliteStore> {
        let mut store = SqliteStore::open(Path::new(":memory:"))?;
        store.migrate()?;
        Ok(store)
    }

    fn seed_customer(store: &mut SqliteStore, name: &str) -> Result<CustomerId> {
        let record = store.insert_customer(&CustomerDraft {
            name: Some(name.to_string()),
            phone: Some("555-0100".to_string()),
        })?;
        Ok(record.id)
    }

    fn seed_item(store: &mut SqliteStore, name: &str, price: f64) -> Result<ItemId> {
        let record = store
            .insert_item(&ItemDraft { name: Some(name.to_string()), price: Some(price) })?;
        Ok(record.id)
    }

    fn table_count(store: &SqliteStore, table: &str) -> Result<i64> {
        let query = format!("SELECT COUNT(*) FROM {table}");
        let count = store.conn.query_row(&query, [], |row| row.get::<_, i64>(0))?;
        Ok(count)
    }

    fn refs(ids: &[ItemId]) -> Vec<ItemReference> {
        ids.iter().map(|id| ItemReference { id: *id }).collect()
    }

    #[test]
    fn migrate_initializes_schema_and_is_idempotent() -> Result<()> {
        let mut store = SqliteStore::open(Path::new(":memory:"))?;

        let before = store.schema_status()?;
        assert_eq!(before.current_version, 0);
        assert_eq!(before.pending_versions, vec![1]);

        store.migrate()?;
        store.migrate()?;

        let after = store.schema_status()?;
        assert_eq!(after.current_version, LATEST_SCHEMA_VERSION);
        assert!(after.pending_versions.is_empty());
        assert_eq!(table_count(&store, "customers")?, 0);
        Ok(())
    }

    #[test]
    fn integrity_check_reports_clean_database() -> Result<()> {
        let store = open_store()?;
        let report = store.integrity_check()?;
        assert!(report.quick_check_ok);
        assert!(report.foreign_key_violations.is_empty());
        Ok(())
    }

    #[test]
    fn customer_crud_round_trip() -> Result<()> {
        let mut store = open_store()?;

        let created = store.insert_customer(&CustomerDraft {
            name: Some("Ada".to_string()),
            phone: None,
        })?;
        assert_eq!(store.get_customer(created.id)?, Some(created.clone()));

        store.update_customer(
            created.id,
            &CustomerPatch { phone: Some("555-0199".to_string()), ..CustomerPatch::default() },
        )?;
        let updated = store.get_customer(created.id)?;
        assert_eq!(
            updated,
            Some(CustomerRecord {
                id: created.id,
                name: Some("Ada".to_string()),
                phone: Some("555-0199".to_string()),
            })
        );

        store.delete_customer(created.id)?;
        assert_eq!(store.get_customer(created.id)?, None);
        Ok(())
    }

    #[test]
    fn customer_update_with_empty_patch_changes_nothing() -> Result<()> {
        let mut store = open_store()?;
        let id = seed_customer(&mut store, "Ada")?;

        store.update_customer(id, &CustomerPatch::default())?;

        let record = store.get_customer(id)?;
        assert_eq!(record.and_then(|record| record.name).as_deref(), Some("Ada"));
        Ok(())
    }

    #[test]
    fn customer_mutations_on_missing_row_report_not_found() -> Result<()> {
        let mut store = open_store()?;

        let err = match store.update_customer(CustomerId(42), &CustomerPatch::default()) {
            Ok(()) => panic!("update of missing customer should fail"),
            Err(err) => err,
        };
        assert_eq!(err.not_found_entity(), Some((Entity::Customer, 42)));

        let err = match store.delete_customer(CustomerId(42)) {
            Ok(()) => panic!("delete of missing customer should fail"),
            Err(err) => err,
        };
        assert_eq!(err.not_found_entity(), Some((Entity::Customer, 42)));
        Ok(())
    }

    #[test]
    fn item_crud_round_trip() -> Result<()> {
        let mut store = open_store()?;

        let created = store
            .insert_item(&ItemDraft { name: Some("widget".to_string()), price: Some(5.0) })?;
        assert_eq!(store.get_item(created.id)?, Some(created.clone()));

        store.update_item(
            created.id,
            &ItemPatch { price: Some(6.25), ..ItemPatch::default() },
        )?;
        let updated = store.get_item(created.id)?;
        assert_eq!(updated.and_then(|record| record.price), Some(6.25));

        store.delete_item(created.id)?;
        assert_eq!(store.get_item(created.id)?, None);

        let err = match store.delete_item(created.id) {
            Ok(()) => panic!("second delete should fail"),
            Err(err) => err,
        };
        assert_eq!(err.not_found_entity(), Some((Entity::Item, created.id.0)));
        Ok(())
    }

    #[test]
    fn create_order_composes_customer_and_items() -> Result<()> {
        let mut store = open_store()?;
        let cust_id = seed_customer(&mut store, "Ada")?;
        let first = seed_item(&mut store, "widget", 5.0)?;
        let second = seed_item(&mut store, "gadget", 7.5)?;

        let order = store.create_order(&OrderDraft {
            cust_id,
            items: refs(&[first, second]),
            notes: Some("rush".to_string()),
        })?;

        let view = store.order_view(order.id)?;
        assert_eq!(view.cust_id, cust_id);
        assert_eq!(view.notes.as_deref(), Some("rush"));
        assert_eq!(view.created_at, order.created_at);
        assert_eq!(
            view.customer,
            Some(CustomerSummary {
                name: Some("Ada".to_string()),
                phone: Some("555-0100".to_string()),
            })
        );
        assert_eq!(
            view.items,
            vec![
                ItemSummary { name: Some("widget".to_string()), price: Some(5.0) },
                ItemSummary { name: Some("gadget".to_string()), price: Some(7.5) },
            ]
        );
        Ok(())
    }

    #[test]
    fn create_order_with_missing_customer_leaves_no_rows() -> Result<()> {
        let mut store = open_store()?;
        let item = seed_item(&mut store, "widget", 5.0)?;

        let err = match store.create_order(&OrderDraft {
            cust_id: CustomerId(99),
            items: refs(&[item]),
            notes: None,
        }) {
            Ok(_) => panic!("create with missing customer should fail"),
            Err(err) => err,
        };

        assert_eq!(err.not_found_entity(), Some((Entity::Customer, 99)));
        assert_eq!(table_count(&store, "orders")?, 0);
        assert_eq!(table_count(&store, "item_list")?, 0);
        Ok(())
    }

    #[test]
    fn create_order_with_one_missing_item_leaves_no_rows() -> Result<()> {
        let mut store = open_store()?;
        let cust_id = seed_customer(&mut store, "Ada")?;
        let valid = seed_item(&mut store, "widget", 5.0)?;

        let err = match store.create_order(&OrderDraft {
            cust_id,
            items: vec![ItemReference { id: valid }, ItemReference { id: ItemId(404) }],
            notes: None,
        }) {
            Ok(_) => panic!("create with missing item should fail"),
            Err(err) => err,
        };

        assert_eq!(err.not_found_entity(), Some((Entity::Item, 404)));
        assert_eq!(table_count(&store, "orders")?, 0);
        assert_eq!(table_count(&store, "item_list")?, 0);
        Ok(())
    }

    #[test]
    fn create_order_inserts_duplicate_references_as_given() -> Result<()> {
        let mut store = open_store()?;
        let cust_id = seed_customer(&mut store, "Ada")?;
        let item = seed_item(&mut store, "widget", 5.0)?;

        let order = store.create_order(&OrderDraft {
            cust_id,
            items: refs(&[item, item]),
            notes: None,
        })?;

        let view = store.order_view(order.id)?;
        assert_eq!(view.items.len(), 2);
        assert_eq!(table_count(&store, "item_list")?, 2);
        Ok(())
    }

    #[test]
    fn create_order_with_empty_item_list_is_allowed() -> Result<()> {
        let mut store = open_store()?;
        let cust_id = seed_customer(&mut store, "Ada")?;

        let order =
            store.create_order(&OrderDraft { cust_id, items: Vec::new(), notes: None })?;

        let view = store.order_view(order.id)?;
        assert!(view.items.is_empty());
        Ok(())
    }

    #[test]
    fn order_view_of_missing_order_reports_not_found() -> Result<()> {
        let store = open_store()?;
        let err = match store.order_view(OrderId(5)) {
            Ok(_) => panic!("missing order should fail"),
            Err(err) => err,
        };
        assert_eq!(err.not_found_entity(), Some((Entity::Order, 5)));
        Ok(())
    }

    #[test]
    fn order_view_survives_deleted_customer() -> Result<()> {
        let mut store = open_store()?;
        let cust_id = seed_customer(&mut store, "Ada")?;
        let item = seed_item(&mut store, "widget", 5.0)?;
        let order =
            store.create_order(&OrderDraft { cust_id, items: refs(&[item]), notes: None })?;

        store.delete_customer(cust_id)?;

        let view = store.order_view(order.id)?;
        assert_eq!(view.cust_id, cust_id);
        assert_eq!(view.customer, None);
        assert_eq!(view.items.len(), 1);
        Ok(())
    }

    #[test]
    fn order_view_omits_deleted_items() -> Result<()> {
        let mut store = open_store()?;
        let cust_id = seed_customer(&mut store, "Ada")?;
        let kept = seed_item(&mut store, "widget", 5.0)?;
        let dropped = seed_item(&mut store, "gadget", 7.5)?;
        let order = store.create_order(&OrderDraft {
            cust_id,
            items: refs(&[kept, dropped]),
            notes: None,
        })?;

        store.delete_item(dropped)?;

        let view = store.order_view(order.id)?;
        assert_eq!(view.items, vec![ItemSummary {
            name: Some("widget".to_string()),
            price: Some(5.0),
        }]);
        // The dangling association row itself survives; only the view drops it.
        assert_eq!(table_count(&store, "item_list")?, 2);
        Ok(())
    }

    #[test]
    fn update_notes_only_leaves_items_and_customer_unchanged() -> Result<()> {
        let mut store = open_store()?;
        let cust_id = seed_customer(&mut store, "Ada")?;
        let item = seed_item(&mut store, "widget", 5.0)?;
        let order = store.create_order(&OrderDraft {
            cust_id,
            items: refs(&[item]),
            notes: Some("rush".to_string()),
        })?;

        store.update_order(
            order.id,
            &OrderPatch { notes: Some("hold at desk".to_string()), ..OrderPatch::default() },
        )?;

        let view = store.order_view(order.id)?;
        assert_eq!(view.notes.as_deref(), Some("hold at desk"));
        assert_eq!(view.cust_id, cust_id);
        assert_eq!(view.items.len(), 1);
        Ok(())
    }

    #[test]
    fn update_items_fully_replaces_associations() -> Result<()> {
        let mut store = open_store()?;
        let cust_id = seed_customer(&mut store, "Ada")?;
        let old = seed_item(&mut store, "widget", 5.0)?;
        let new = seed_item(&mut store, "gadget", 7.5)?;
        let order =
            store.create_order(&OrderDraft { cust_id, items: refs(&[old]), notes: None })?;

        store.update_order(
            order.id,
            &OrderPatch { items: Some(refs(&[new])), ..OrderPatch::default() },
        )?;

        let view = store.order_view(order.id)?;
        assert_eq!(view.items, vec![ItemSummary {
            name: Some("gadget".to_string()),
            price: Some(7.5),
        }]);
        assert_eq!(table_count(&store, "item_list")?, 1);
        Ok(())
    }

    #[test]
    fn update_items_with_missing_item_rolls_back_replacement() -> Result<()> {
        let mut store = open_store()?;
        let cust_id = seed_customer(&mut store, "Ada")?;
        let kept = seed_item(&mut store, "widget", 5.0)?;
        let order =
            store.create_order(&OrderDraft { cust_id, items: refs(&[kept]), notes: None })?;

        let err = match store.update_order(
            order.id,
            &OrderPatch {
                items: Some(vec![ItemReference { id: ItemId(404) }]),
                ..OrderPatch::default()
            },
        ) {
            Ok(()) => panic!("replacement with missing item should fail"),
            Err(err) => err,
        };

        assert_eq!(err.not_found_entity(), Some((Entity::Item, 404)));
        // Prior associations survive the failed replacement.
        let view = store.order_view(order.id)?;
        assert_eq!(view.items.len(), 1);
        assert_eq!(table_count(&store, "item_list")?, 1);
        Ok(())
    }

    #[test]
    fn update_customer_reference_requires_existing_customer() -> Result<()> {
        let mut store = open_store()?;
        let cust_id = seed_customer(&mut store, "Ada")?;
        let other = seed_customer(&mut store, "Grace")?;
        let order =
            store.create_order(&OrderDraft { cust_id, items: Vec::new(), notes: None })?;

        let err = match store.update_order(
            order.id,
            &OrderPatch { cust_id: Some(CustomerId(99)), ..OrderPatch::default() },
        ) {
            Ok(()) => panic!("reassignment to missing customer should fail"),
            Err(err) => err,
        };
        assert_eq!(err.not_found_entity(), Some((Entity::Customer, 99)));

        store.update_order(
            order.id,
            &OrderPatch { cust_id: Some(other), ..OrderPatch::default() },
        )?;
        let view = store.order_view(order.id)?;
        assert_eq!(view.cust_id, other);
        Ok(())
    }

    #[test]
    fn update_missing_order_reports_not_found() -> Result<()> {
        let mut store = open_store()?;
        let err = match store.update_order(OrderId(9), &OrderPatch::default()) {
            Ok(()) => panic!("update of missing order should fail"),
            Err(err) => err,
        };
        assert_eq!(err.not_found_entity(), Some((Entity::Order, 9)));
        Ok(())
    }

    #[test]
    fn delete_order_removes_row_and_associations() -> Result<()> {
        let mut store = open_store()?;
        let cust_id = seed_customer(&mut store, "Ada")?;
        let first = seed_item(&mut store, "widget", 5.0)?;
        let second = seed_item(&mut store, "gadget", 7.5)?;
        let order = store.create_order(&OrderDraft {
            cust_id,
            items: refs(&[first, second]),
            notes: None,
        })?;

        store.delete_order(order.id)?;

        let err = match store.order_view(order.id) {
            Ok(_) => panic!("deleted order should not resolve"),
            Err(err) => err,
        };
        assert_eq!(err.not_found_entity(), Some((Entity::Order, order.id.0)));
        assert_eq!(table_count(&store, "item_list")?, 0);

        let err = match store.delete_order(order.id) {
            Ok(()) => panic!("second delete should fail"),
            Err(err) => err,
        };
        assert_eq!(err.not_found_entity(), Some((Entity::Order, order.id.0)));
        Ok(())
    }
}
