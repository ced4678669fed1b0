//! Query Order Injector
//!
//! 列表查询的排序改写，按以下顺序判断：
//!
//! 1. 调用方指定了排序 → 不处理
//! 2. 多个集合或多个分组 → 不处理
//! 3. 单个分组，taxonomy 开启了分组排序且存有非空列表 → 按列表位置排序
//! 4. 单个分组，taxonomy 开启了分组查询覆盖 → 按 order_value 排序
//! 5. 集合开启了查询覆盖 → 按 order_value 排序
//!
//! 方向只在调用方未指定时由执行层取默认升序。只读取 Order Store，不写入。

use crate::content::{ListingQuery, QueryFilter, SortKey};
use crate::registry::Registry;
use crate::store::OrderStore;
use shared::models::Support;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct OrderInjector {
    registry: Arc<Registry>,
    orders: OrderStore,
}

impl OrderInjector {
    pub fn new(registry: Arc<Registry>, orders: OrderStore) -> Self {
        Self { registry, orders }
    }

    /// The sort key this injector would apply, if any
    pub fn decide(&self, query: &ListingQuery) -> Option<SortKey> {
        if query.sort.is_some() {
            return None;
        }
        let collection = query.single_collection()?;
        if query.group_id_count() > 1 {
            return None;
        }

        if let Some((taxonomy, group_id)) = query.single_group() {
            if self.registry.is_supported(taxonomy, Support::PerGroupOrder) {
                match self.orders.get_group_order(taxonomy, group_id) {
                    Ok(list) if !list.is_empty() => return Some(SortKey::Positional(list)),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(
                            taxonomy = %taxonomy,
                            group_id,
                            error = %e,
                            "Failed to read group order, leaving query untouched"
                        );
                        return None;
                    }
                }
            }
            if self.registry.is_supported(taxonomy, Support::GroupQueryOverride) {
                return Some(SortKey::OrderValue);
            }
        }

        self.registry
            .is_supported(collection, Support::QueryOverride)
            .then_some(SortKey::OrderValue)
    }
}

impl QueryFilter for OrderInjector {
    fn filter(&self, query: &mut ListingQuery) {
        if let Some(sort) = self.decide(query) {
            tracing::debug!(collections = ?query.collections, sort = ?sort, "Stored order injected");
            query.sort = Some(sort);
        }
    }
}
