//! Order Store - 持久化排序值、父节点和分组顺序

mod storage;

pub use storage::{
    ItemMeta, OrderStore, PurgeSummary, StorageError, StorageResult, open_database,
    open_in_memory,
};
