//! redb-based content store
//!
//! Stand-in for the host content system: item records, group memberships and
//! the listing executor. Ordering metadata (`order_value`, `parent_id`) lives
//! in the [`OrderStore`] and is joined in when items are read.
//!
//! # Tables
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `items` | `(collection, item_id)` | `ItemRecord` (JSON) |
//! | `item_index` | `item_id` | `collection` |
//! | `group_members` | `(taxonomy, group_id, item_id)` | `()` |
//! | `sequences` | `name` | `u64` |

use super::query::sort_items;
use super::{ItemCreatedHook, ListingQuery, QueryFilter};
use crate::registry::Registry;
use crate::store::{ItemMeta, OrderStore, StorageError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use shared::models::{CollectionKind, Item, ItemCreate, ItemId, ROOT_PARENT};
use shared::{AppError, ErrorCode};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

const ITEMS_TABLE: TableDefinition<(&str, i64), &[u8]> = TableDefinition::new("items");
const ITEM_INDEX_TABLE: TableDefinition<i64, &str> = TableDefinition::new("item_index");
const GROUP_MEMBERS_TABLE: TableDefinition<(&str, i64, i64), ()> =
    TableDefinition::new("group_members");
const SEQUENCES_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequences");

const ITEM_SEQUENCE: &str = "item_id";

/// Stored part of an item (ordering metadata excluded)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ItemRecord {
    title: String,
}

/// Content errors
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Collection not found: {0}")]
    UnknownCollection(String),

    #[error("{0} is not a taxonomy")]
    NotATaxonomy(String),

    #[error("Item {id} not found in {collection}")]
    ItemNotFound { collection: String, id: ItemId },

    #[error("Item {0} not found")]
    UnknownItem(ItemId),

    #[error("Parent {parent_id} is not an item of {collection}")]
    InvalidParent { collection: String, parent_id: ItemId },

    #[error("Items of {collection} cannot be grouped by {taxonomy}")]
    NotGroupable { taxonomy: String, collection: String },

    #[error("Title must not be empty")]
    EmptyTitle,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

macro_rules! content_error_from_redb {
    ($($t:ty),*) => {
        $(impl From<$t> for ContentError {
            fn from(e: $t) -> Self {
                Self::Storage(e.into())
            }
        })*
    };
}

content_error_from_redb!(
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
    serde_json::Error
);

pub type ContentResult<T> = Result<T, ContentError>;

impl From<ContentError> for AppError {
    fn from(err: ContentError) -> Self {
        let message = err.to_string();
        match err {
            ContentError::UnknownCollection(name) => {
                AppError::with_message(ErrorCode::CollectionNotFound, message)
                    .with_detail("collection", name)
            }
            ContentError::ItemNotFound { id, .. } | ContentError::UnknownItem(id) => {
                AppError::with_message(ErrorCode::ItemNotFound, message).with_detail("id", id)
            }
            ContentError::InvalidParent { parent_id, .. } => {
                AppError::with_message(ErrorCode::UnknownParent, message)
                    .with_detail("parent_id", parent_id)
            }
            ContentError::NotATaxonomy(_) | ContentError::NotGroupable { .. } => {
                AppError::invalid_request(message)
            }
            ContentError::EmptyTitle => {
                AppError::with_message(ErrorCode::RequiredField, message)
                    .with_detail("field", "title")
            }
            ContentError::Storage(e) => AppError::database(e.to_string()),
        }
    }
}

/// Content store backed by redb
#[derive(Clone)]
pub struct ContentStore {
    db: Arc<Database>,
    orders: OrderStore,
    registry: Arc<Registry>,
    filters: Vec<Arc<dyn QueryFilter>>,
    hooks: Vec<Arc<dyn ItemCreatedHook>>,
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("filters", &self.filters.len())
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl ContentStore {
    /// Wrap a database handle, creating the tables if they don't exist
    pub fn new(
        db: Arc<Database>,
        orders: OrderStore,
        registry: Arc<Registry>,
    ) -> ContentResult<Self> {
        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(ITEMS_TABLE)?;
            let _ = txn.open_table(ITEM_INDEX_TABLE)?;
            let _ = txn.open_table(GROUP_MEMBERS_TABLE)?;
            let _ = txn.open_table(SEQUENCES_TABLE)?;
        }
        txn.commit()?;

        Ok(Self {
            db,
            orders,
            registry,
            filters: Vec::new(),
            hooks: Vec::new(),
        })
    }

    /// Register a listing query filter
    pub fn with_filter(mut self, filter: Arc<dyn QueryFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Register an item-created hook
    pub fn with_hook(mut self, hook: Arc<dyn ItemCreatedHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ========== Items ==========

    /// Create an item, then run the item-created hooks
    pub fn create_item(&self, collection: &str, data: ItemCreate) -> ContentResult<Item> {
        let hierarchical = self
            .registry
            .get(collection)
            .ok_or_else(|| ContentError::UnknownCollection(collection.to_string()))?
            .hierarchical;
        let title = data.title.trim();
        if title.is_empty() {
            return Err(ContentError::EmptyTitle);
        }

        // 非层级集合没有父节点，与排序提交的处理一致
        let parent_id = if hierarchical {
            data.parent_id
        } else {
            if data.parent_id != ROOT_PARENT {
                tracing::debug!(collection = %collection, parent_id = data.parent_id, "Parent ignored for flat collection");
            }
            ROOT_PARENT
        };
        if parent_id != ROOT_PARENT && !self.item_exists(collection, parent_id)? {
            return Err(ContentError::InvalidParent {
                collection: collection.to_string(),
                parent_id,
            });
        }

        let record = ItemRecord {
            title: title.to_string(),
        };
        let bytes = serde_json::to_vec(&record)?;

        let txn = self.db.begin_write()?;
        let id = {
            let mut sequences = txn.open_table(SEQUENCES_TABLE)?;
            let next = sequences.get(ITEM_SEQUENCE)?.map(|g| g.value()).unwrap_or(0) + 1;
            sequences.insert(ITEM_SEQUENCE, next)?;
            let id = next as ItemId;

            let mut items = txn.open_table(ITEMS_TABLE)?;
            items.insert((collection, id), bytes.as_slice())?;
            let mut index = txn.open_table(ITEM_INDEX_TABLE)?;
            index.insert(id, collection)?;
            id
        };
        txn.commit()?;

        self.orders.set_parent(collection, id, parent_id)?;

        let item = Item {
            id,
            collection: collection.to_string(),
            title: record.title,
            parent_id,
            order_value: 0,
        };
        for hook in &self.hooks {
            hook.on_item_created(&item);
        }

        tracing::info!(collection = %collection, item_id = id, "Item created");

        // 重新读取，带上 hook 写入的排序值
        Ok(self.get_item(collection, id)?.unwrap_or(item))
    }

    /// Delete an item with its ordering metadata and group memberships
    pub fn delete_item(&self, collection: &str, id: ItemId) -> ContentResult<()> {
        let is_taxonomy = self
            .registry
            .get(collection)
            .is_some_and(|c| c.kind == CollectionKind::Taxonomy);

        let txn = self.db.begin_write()?;
        let removed_memberships = {
            let mut items = txn.open_table(ITEMS_TABLE)?;
            if items.remove((collection, id))?.is_none() {
                return Err(ContentError::ItemNotFound {
                    collection: collection.to_string(),
                    id,
                });
            }
            let mut index = txn.open_table(ITEM_INDEX_TABLE)?;
            index.remove(id)?;

            let mut members = txn.open_table(GROUP_MEMBERS_TABLE)?;
            let mut stale: Vec<(String, i64, i64)> = Vec::new();
            for entry in members.iter()? {
                let (key, _) = entry?;
                let (taxonomy, group_id, item_id) = key.value();
                let group_deleted = is_taxonomy && taxonomy == collection && group_id == id;
                if item_id == id || group_deleted {
                    stale.push((taxonomy.to_string(), group_id, item_id));
                }
            }
            for (taxonomy, group_id, item_id) in &stale {
                members.remove((taxonomy.as_str(), *group_id, *item_id))?;
            }
            stale.len()
        };
        txn.commit()?;

        self.orders.remove_meta(collection, id)?;
        if is_taxonomy {
            self.orders.remove_group_order(collection, id)?;
        }

        tracing::info!(
            collection = %collection,
            item_id = id,
            memberships = removed_memberships,
            "Item deleted"
        );
        Ok(())
    }

    /// Read one item with its ordering metadata
    pub fn get_item(&self, collection: &str, id: ItemId) -> ContentResult<Option<Item>> {
        let bytes = {
            let txn = self.db.begin_read()?;
            let items = txn.open_table(ITEMS_TABLE)?;
            let bytes = items.get((collection, id))?.map(|guard| guard.value().to_vec());
            bytes
        };
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        let record: ItemRecord = serde_json::from_slice(&bytes)?;
        let meta = self.orders.get_meta(collection, id)?.unwrap_or_default();
        Ok(Some(join(collection, id, record, &meta)))
    }

    /// Ids of every item in a collection, ascending
    pub fn item_ids(&self, collection: &str) -> ContentResult<Vec<ItemId>> {
        let txn = self.db.begin_read()?;
        let items = txn.open_table(ITEMS_TABLE)?;

        let mut ids = Vec::new();
        for entry in items.range((collection, i64::MIN)..=(collection, i64::MAX))? {
            let (key, _) = entry?;
            ids.push(key.value().1);
        }
        Ok(ids)
    }

    /// Every item of a collection with its ordering metadata, by id ascending
    pub fn items(&self, collection: &str) -> ContentResult<Vec<Item>> {
        let records = {
            let txn = self.db.begin_read()?;
            let items = txn.open_table(ITEMS_TABLE)?;
            let mut records = Vec::new();
            for entry in items.range((collection, i64::MIN)..=(collection, i64::MAX))? {
                let (key, value) = entry?;
                let record: ItemRecord = serde_json::from_slice(value.value())?;
                records.push((key.value().1, record));
            }
            records
        };

        let metas = self.orders.meta_for_collection(collection)?;
        Ok(records
            .into_iter()
            .map(|(id, record)| {
                let meta = metas.get(&id).copied().unwrap_or_default();
                join(collection, id, record, &meta)
            })
            .collect())
    }

    fn item_exists(&self, collection: &str, id: ItemId) -> ContentResult<bool> {
        let txn = self.db.begin_read()?;
        let items = txn.open_table(ITEMS_TABLE)?;
        Ok(items.get((collection, id))?.is_some())
    }

    fn collection_of(&self, id: ItemId) -> ContentResult<Option<String>> {
        let txn = self.db.begin_read()?;
        let index = txn.open_table(ITEM_INDEX_TABLE)?;
        Ok(index.get(id)?.map(|g| g.value().to_string()))
    }

    // ========== Group Memberships ==========

    /// Make an item a member of a group; returns `false` if it already was
    pub fn add_to_group(&self, taxonomy: &str, group_id: ItemId, item_id: ItemId) -> ContentResult<bool> {
        let tax = self
            .registry
            .get(taxonomy)
            .ok_or_else(|| ContentError::UnknownCollection(taxonomy.to_string()))?;
        if !tax.is_taxonomy() {
            return Err(ContentError::NotATaxonomy(taxonomy.to_string()));
        }
        if !self.item_exists(taxonomy, group_id)? {
            return Err(ContentError::ItemNotFound {
                collection: taxonomy.to_string(),
                id: group_id,
            });
        }
        let collection = self
            .collection_of(item_id)?
            .ok_or(ContentError::UnknownItem(item_id))?;
        if !tax.object_types.iter().any(|t| *t == collection) {
            return Err(ContentError::NotGroupable {
                taxonomy: taxonomy.to_string(),
                collection,
            });
        }

        let txn = self.db.begin_write()?;
        let added = {
            let mut members = txn.open_table(GROUP_MEMBERS_TABLE)?;
            members.insert((taxonomy, group_id, item_id), ())?.is_none()
        };
        txn.commit()?;

        tracing::debug!(taxonomy = %taxonomy, group_id, item_id, added, "Group membership set");
        Ok(added)
    }

    /// Remove an item from a group; returns `false` if it was not a member
    pub fn remove_from_group(&self, taxonomy: &str, group_id: ItemId, item_id: ItemId) -> ContentResult<bool> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut members = txn.open_table(GROUP_MEMBERS_TABLE)?;
            members.remove((taxonomy, group_id, item_id))?.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    /// Member ids of one group, ascending
    pub fn group_members(&self, taxonomy: &str, group_id: ItemId) -> ContentResult<Vec<ItemId>> {
        let txn = self.db.begin_read()?;
        let members = txn.open_table(GROUP_MEMBERS_TABLE)?;

        let mut ids = Vec::new();
        for entry in members.range((taxonomy, group_id, i64::MIN)..=(taxonomy, group_id, i64::MAX))? {
            let (key, _) = entry?;
            ids.push(key.value().2);
        }
        Ok(ids)
    }

    // ========== Listing ==========

    /// Finalise a listing query through the registered filters, then run it
    pub fn list(&self, mut query: ListingQuery) -> ContentResult<Vec<Item>> {
        for filter in &self.filters {
            filter.filter(&mut query);
        }
        tracing::debug!(
            collections = ?query.collections,
            groups = query.group_id_count(),
            sort = ?query.sort,
            direction = ?query.direction,
            "Listing query finalised"
        );
        self.execute(&query)
    }

    /// Run a query as-is, without the filters
    pub fn execute(&self, query: &ListingQuery) -> ContentResult<Vec<Item>> {
        // 每个分组过滤条件取并集，多个过滤条件之间取交集
        let mut allowed: Option<HashSet<ItemId>> = None;
        for filter in &query.groups {
            let mut members = HashSet::new();
            for group_id in &filter.group_ids {
                members.extend(self.group_members(&filter.taxonomy, *group_id)?);
            }
            allowed = Some(match allowed {
                Some(prev) => prev.intersection(&members).copied().collect(),
                None => members,
            });
        }

        let mut items = Vec::new();
        for collection in &query.collections {
            items.extend(
                self.items(collection)?
                    .into_iter()
                    .filter(|item| allowed.as_ref().is_none_or(|set| set.contains(&item.id))),
            );
        }

        sort_items(&mut items, query.sort.as_ref(), query.direction);
        Ok(items)
    }

    /// Current `parent_id` of every item in a collection
    pub fn parents(&self, collection: &str) -> ContentResult<HashMap<ItemId, ItemId>> {
        Ok(self
            .items(collection)?
            .into_iter()
            .map(|item| (item.id, item.parent_id))
            .collect())
    }
}

fn join(collection: &str, id: ItemId, record: ItemRecord, meta: &ItemMeta) -> Item {
    Item {
        id,
        collection: collection.to_string(),
        title: record.title,
        parent_id: meta.parent_id,
        order_value: meta.effective_order(),
    }
}
