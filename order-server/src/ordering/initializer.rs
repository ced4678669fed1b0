//! Default order for new items
//!
//! 新建 item 的 order_value 初始化为自身 id，排在已手动排序的 item 之后。

use crate::content::ItemCreatedHook;
use crate::registry::Registry;
use crate::store::OrderStore;
use shared::models::{Item, Support};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DefaultOrderInitializer {
    registry: Arc<Registry>,
    orders: OrderStore,
}

impl DefaultOrderInitializer {
    pub fn new(registry: Arc<Registry>, orders: OrderStore) -> Self {
        Self { registry, orders }
    }
}

impl ItemCreatedHook for DefaultOrderInitializer {
    fn on_item_created(&self, item: &Item) {
        if !self.registry.is_supported(&item.collection, Support::OrderManager) {
            return;
        }

        match self.orders.seed_order_value(&item.collection, item.id, item.id) {
            Ok(true) => {
                tracing::debug!(collection = %item.collection, item_id = item.id, "Default order seeded")
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(
                collection = %item.collection,
                item_id = item.id,
                error = %e,
                "Failed to seed default order"
            ),
        }
    }
}
