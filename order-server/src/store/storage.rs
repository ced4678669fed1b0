//! redb-based Order Store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `item_meta` | `(collection, item_id)` | `ItemMeta` | 排序值 + 父节点 |
//! | `group_orders` | `(taxonomy, group_id)` | `Vec<ItemId>` | 分组内的成员顺序 |
//!
//! # Write model
//!
//! Every setter commits its own write transaction. A reorder submission is
//! therefore a sequence of independent per-item writes: a failure halfway
//! leaves earlier items updated (no rollback). Re-applying the same
//! submission converges to the same state.

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use shared::models::{ItemId, ROOT_PARENT};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Per-item metadata: key = (collection, item_id), value = JSON-serialized ItemMeta
const ITEM_META_TABLE: TableDefinition<(&str, i64), &[u8]> = TableDefinition::new("item_meta");

/// Per-group order lists: key = (taxonomy, group_id), value = JSON-serialized Vec<ItemId>
const GROUP_ORDERS_TABLE: TableDefinition<(&str, i64), &[u8]> =
    TableDefinition::new("group_orders");

/// 单个 item 的排序元数据
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMeta {
    /// None = 从未设置 (列表时按 0 处理)
    #[serde(default)]
    pub order_value: Option<i64>,
    #[serde(default)]
    pub parent_id: ItemId,
}

impl ItemMeta {
    pub fn effective_order(&self) -> i64 {
        self.order_value.unwrap_or(0)
    }
}

/// Result of [`OrderStore::purge`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeSummary {
    pub item_meta: u64,
    pub group_orders: u64,
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Open or create the database file at the given path
///
/// redb uses `Durability::Immediate` by default: commits are persistent as
/// soon as `commit()` returns.
pub fn open_database(path: impl AsRef<Path>) -> StorageResult<Arc<Database>> {
    Ok(Arc::new(Database::create(path)?))
}

/// Open an in-memory database (tests, ephemeral runs)
pub fn open_in_memory() -> StorageResult<Arc<Database>> {
    let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
    Ok(Arc::new(db))
}

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStore").finish_non_exhaustive()
    }
}

impl OrderStore {
    /// Wrap a database handle, creating the tables if they don't exist
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ITEM_META_TABLE)?;
            let _ = write_txn.open_table(GROUP_ORDERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // ========== Item Metadata ==========

    /// Read the metadata of one item
    pub fn get_meta(&self, collection: &str, id: ItemId) -> StorageResult<Option<ItemMeta>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ITEM_META_TABLE)?;
        match table.get((collection, id))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Read the metadata of every item in a collection
    pub fn meta_for_collection(&self, collection: &str) -> StorageResult<HashMap<ItemId, ItemMeta>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ITEM_META_TABLE)?;

        let mut metas = HashMap::new();
        for result in table.range((collection, i64::MIN)..=(collection, i64::MAX))? {
            let (key, value) = result?;
            let (_, id) = key.value();
            metas.insert(id, serde_json::from_slice(value.value())?);
        }
        Ok(metas)
    }

    /// Set `order_value` of one item (own transaction)
    pub fn set_order_value(&self, collection: &str, id: ItemId, value: i64) -> StorageResult<()> {
        self.update_meta(collection, id, |meta| meta.order_value = Some(value))
            .map(|_| ())
    }

    /// Set `parent_id` of one item (own transaction)
    pub fn set_parent(&self, collection: &str, id: ItemId, parent_id: ItemId) -> StorageResult<()> {
        self.update_meta(collection, id, |meta| meta.parent_id = parent_id)
            .map(|_| ())
    }

    /// Seed `order_value` only if none is stored yet
    ///
    /// Returns `true` when the value was written.
    pub fn seed_order_value(&self, collection: &str, id: ItemId, value: i64) -> StorageResult<bool> {
        let mut seeded = false;
        self.update_meta(collection, id, |meta| {
            if meta.order_value.is_none() {
                meta.order_value = Some(value);
                seeded = true;
            }
        })?;
        Ok(seeded)
    }

    /// Remove the metadata of one item
    pub fn remove_meta(&self, collection: &str, id: ItemId) -> StorageResult<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(ITEM_META_TABLE)?;
            table.remove((collection, id))?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    fn update_meta(
        &self,
        collection: &str,
        id: ItemId,
        apply: impl FnOnce(&mut ItemMeta),
    ) -> StorageResult<ItemMeta> {
        let txn = self.db.begin_write()?;
        let meta = {
            let mut table = txn.open_table(ITEM_META_TABLE)?;
            let existing = table.get((collection, id))?.map(|guard| guard.value().to_vec());
            let mut meta = match existing {
                Some(bytes) => serde_json::from_slice(&bytes)?,
                None => ItemMeta {
                    order_value: None,
                    parent_id: ROOT_PARENT,
                },
            };
            apply(&mut meta);
            let bytes = serde_json::to_vec(&meta)?;
            table.insert((collection, id), bytes.as_slice())?;
            meta
        };
        txn.commit()?;
        Ok(meta)
    }

    // ========== Group Order Lists ==========

    /// Read the stored order list of one group (empty if none)
    pub fn get_group_order(&self, taxonomy: &str, group_id: ItemId) -> StorageResult<Vec<ItemId>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(GROUP_ORDERS_TABLE)?;
        match table.get((taxonomy, group_id))? {
            Some(guard) => Ok(serde_json::from_slice(guard.value())?),
            None => Ok(Vec::new()),
        }
    }

    /// Store the order list of one group verbatim
    pub fn set_group_order(
        &self,
        taxonomy: &str,
        group_id: ItemId,
        order: &[ItemId],
    ) -> StorageResult<()> {
        let bytes = serde_json::to_vec(order)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(GROUP_ORDERS_TABLE)?;
            table.insert((taxonomy, group_id), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Remove the order list of one group (e.g. the group itself was deleted)
    pub fn remove_group_order(&self, taxonomy: &str, group_id: ItemId) -> StorageResult<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut table = txn.open_table(GROUP_ORDERS_TABLE)?;
            table.remove((taxonomy, group_id))?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    // ========== Maintenance ==========

    /// Delete all ordering data (item metadata and group order lists)
    pub fn purge(&self) -> StorageResult<PurgeSummary> {
        let txn = self.db.begin_write()?;
        let summary = {
            let item_meta = txn.open_table(ITEM_META_TABLE)?.len()?;
            let group_orders = txn.open_table(GROUP_ORDERS_TABLE)?.len()?;
            PurgeSummary {
                item_meta,
                group_orders,
            }
        };
        txn.delete_table(ITEM_META_TABLE)?;
        txn.delete_table(GROUP_ORDERS_TABLE)?;
        {
            let _ = txn.open_table(ITEM_META_TABLE)?;
            let _ = txn.open_table(GROUP_ORDERS_TABLE)?;
        }
        txn.commit()?;

        tracing::info!(
            item_meta = summary.item_meta,
            group_orders = summary.group_orders,
            "Ordering data purged"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> OrderStore {
        OrderStore::new(open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn test_missing_meta_is_none() {
        let store = create_test_store();
        assert_eq!(store.get_meta("article", 1).unwrap(), None);
        assert!(store.meta_for_collection("article").unwrap().is_empty());
    }

    #[test]
    fn test_set_order_value_keeps_parent() {
        let store = create_test_store();
        store.set_parent("page", 5, 2).unwrap();
        store.set_order_value("page", 5, 7).unwrap();

        let meta = store.get_meta("page", 5).unwrap().unwrap();
        assert_eq!(meta.order_value, Some(7));
        assert_eq!(meta.parent_id, 2);
    }

    #[test]
    fn test_meta_is_scoped_per_collection() {
        let store = create_test_store();
        store.set_order_value("article", 1, 3).unwrap();
        store.set_order_value("category", 1, 9).unwrap();
        store.set_order_value("article", 2, 4).unwrap();

        let metas = store.meta_for_collection("article").unwrap();
        assert_eq!(metas.len(), 2);
        assert_eq!(metas[&1].effective_order(), 3);
        assert_eq!(metas[&2].effective_order(), 4);
        assert_eq!(
            store.get_meta("category", 1).unwrap().unwrap().order_value,
            Some(9)
        );
    }

    #[test]
    fn test_seed_only_when_absent() {
        let store = create_test_store();
        assert!(store.seed_order_value("category", 4, 4).unwrap());
        assert!(!store.seed_order_value("category", 4, 100).unwrap());
        assert_eq!(
            store.get_meta("category", 4).unwrap().unwrap().order_value,
            Some(4)
        );
    }

    #[test]
    fn test_seed_after_parent_only_meta() {
        let store = create_test_store();
        store.set_parent("category", 8, 3).unwrap();
        assert!(store.seed_order_value("category", 8, 8).unwrap());

        let meta = store.get_meta("category", 8).unwrap().unwrap();
        assert_eq!(meta.order_value, Some(8));
        assert_eq!(meta.parent_id, 3);
    }

    #[test]
    fn test_remove_meta() {
        let store = create_test_store();
        store.set_order_value("article", 1, 0).unwrap();
        assert!(store.remove_meta("article", 1).unwrap());
        assert!(!store.remove_meta("article", 1).unwrap());
        assert_eq!(store.get_meta("article", 1).unwrap(), None);
    }

    #[test]
    fn test_group_order_roundtrip_verbatim() {
        let store = create_test_store();
        assert!(store.get_group_order("category", 3).unwrap().is_empty());

        store.set_group_order("category", 3, &[12, 10, 99]).unwrap();
        assert_eq!(store.get_group_order("category", 3).unwrap(), vec![12, 10, 99]);

        store.set_group_order("category", 3, &[10]).unwrap();
        assert_eq!(store.get_group_order("category", 3).unwrap(), vec![10]);

        assert!(store.remove_group_order("category", 3).unwrap());
        assert!(store.get_group_order("category", 3).unwrap().is_empty());
    }

    #[test]
    fn test_purge_clears_everything() {
        let store = create_test_store();
        store.set_order_value("article", 1, 0).unwrap();
        store.set_order_value("article", 2, 1).unwrap();
        store.set_group_order("category", 3, &[2, 1]).unwrap();

        let summary = store.purge().unwrap();
        assert_eq!(
            summary,
            PurgeSummary {
                item_meta: 2,
                group_orders: 1
            }
        );
        assert!(store.meta_for_collection("article").unwrap().is_empty());
        assert!(store.get_group_order("category", 3).unwrap().is_empty());

        // Tables remain usable after purge
        store.set_order_value("article", 1, 5).unwrap();
        assert_eq!(
            store.get_meta("article", 1).unwrap().unwrap().order_value,
            Some(5)
        );
    }
}
