//! Ordering permissions
//!
//! | 权限 | 范围 |
//! |------|------|
//! | `ordering:manage` | 所有集合 |
//! | `ordering:<collection>` | 单个集合 (含其分组) |
//! | `ordering:*` / `all` / admin 角色 | 所有 |
//!
//! 清除全部排序数据仅限 admin 角色。

use super::CurrentUser;

/// 管理所有集合排序的权限
pub const ORDERING_MANAGE: &str = "ordering:manage";

/// Per-collection permission name
pub fn collection_permission(collection: &str) -> String {
    format!("ordering:{collection}")
}

/// Can the user modify the ordering of a collection (or one of its groups)
pub fn can_manage_order(user: &CurrentUser, collection: &str) -> bool {
    user.has_permission(ORDERING_MANAGE) || user.has_permission(&collection_permission(collection))
}
