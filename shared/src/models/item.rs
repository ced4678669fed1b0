//! Item Model

use serde::{Deserialize, Serialize};

/// Item ID
pub type ItemId = i64;

/// 根节点标记 (`parent_id == 0` 表示无父节点)
pub const ROOT_PARENT: ItemId = 0;

/// Item entity (a post-like or term-like unit of content)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// 所属集合类型名称
    pub collection: String,
    pub title: String,
    /// 0 = root
    #[serde(default)]
    pub parent_id: ItemId,
    /// 手动排序值，不要求唯一或连续
    #[serde(default)]
    pub order_value: i64,
}

impl Item {
    pub fn is_root(&self) -> bool {
        self.parent_id == ROOT_PARENT
    }
}

/// Create item payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCreate {
    pub title: String,
    #[serde(default)]
    pub parent_id: ItemId,
}
