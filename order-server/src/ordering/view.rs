//! Manager views: what the drag-and-drop UI renders before a submission

use super::error::OrderingResult;
use super::hierarchy::{TreeNode, build_forest, render_outline};
use super::reorder::{ReorderHandler, ReorderTarget};
use crate::content::{GroupFilter, ListingQuery, SortKey};
use serde::Serialize;
use shared::models::{Item, ItemId};

/// A collection's items as a forest, sorted by stored order
#[derive(Debug, Clone, Serialize)]
pub struct CollectionView {
    pub collection: String,
    pub hierarchical: bool,
    pub items: Vec<TreeNode>,
}

/// A group's members in their effective order
#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    pub taxonomy: String,
    pub group_id: ItemId,
    /// Stored list, verbatim (may contain stale ids)
    pub order: Vec<ItemId>,
    pub items: Vec<Item>,
}

impl ReorderHandler {
    pub fn collection_view(&self, collection: &str) -> OrderingResult<CollectionView> {
        let target = ReorderTarget::Collection(collection.to_string());
        let hierarchical = self.resolve(&target)?.hierarchical;

        // 显式排序，不会被查询过滤器改写
        let items = self
            .content
            .list(ListingQuery::for_collection(collection).with_sort(SortKey::OrderValue))?;

        Ok(CollectionView {
            collection: collection.to_string(),
            hierarchical,
            items: build_forest(&items),
        })
    }

    pub fn collection_outline(&self, collection: &str) -> OrderingResult<String> {
        Ok(render_outline(&self.collection_view(collection)?.items))
    }

    pub fn group_view(&self, taxonomy: &str, group_id: ItemId) -> OrderingResult<GroupView> {
        let target = ReorderTarget::Group {
            taxonomy: taxonomy.to_string(),
            group_id,
        };
        let object_types = self.resolve(&target)?.object_types.clone();

        let order = self.orders.get_group_order(taxonomy, group_id)?;
        let sort = if order.is_empty() {
            SortKey::OrderValue
        } else {
            SortKey::Positional(order.clone())
        };
        let items = self.content.list(ListingQuery {
            collections: object_types,
            groups: vec![GroupFilter::new(taxonomy, vec![group_id])],
            sort: Some(sort),
            direction: None,
        })?;

        Ok(GroupView {
            taxonomy: taxonomy.to_string(),
            group_id,
            order,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentStore;
    use crate::registry::Registry;
    use crate::store::{OrderStore, open_in_memory};
    use shared::models::{CollectionSupports, ItemCreate};
    use std::sync::Arc;

    fn setup() -> (ReorderHandler, ContentStore, OrderStore) {
        let supports = CollectionSupports {
            order_manager: true,
            per_group_order: true,
            ..Default::default()
        };
        let registry = Arc::new(
            Registry::builder()
                .register_post_type("page", true, supports)
                .unwrap()
                .register_post_type("article", false, supports)
                .unwrap()
                .register_taxonomy("category", true, supports, &["article"])
                .unwrap()
                .build(),
        );
        let db = open_in_memory().unwrap();
        let orders = OrderStore::new(db.clone()).unwrap();
        let content = ContentStore::new(db, orders.clone(), registry.clone()).unwrap();
        (
            ReorderHandler::new(registry, orders.clone(), content.clone()),
            content,
            orders,
        )
    }

    fn create(content: &ContentStore, collection: &str, title: &str, parent_id: ItemId) -> ItemId {
        content
            .create_item(
                collection,
                ItemCreate {
                    title: title.to_string(),
                    parent_id,
                },
            )
            .unwrap()
            .id
    }

    #[test]
    fn test_collection_view_is_forest_by_order_value() {
        let (handler, content, orders) = setup();
        let home = create(&content, "page", "Home", 0);
        let about = create(&content, "page", "About", home);
        let blog = create(&content, "page", "Blog", 0);
        orders.set_order_value("page", blog, 0).unwrap();
        orders.set_order_value("page", home, 1).unwrap();
        orders.set_order_value("page", about, 0).unwrap();

        let view = handler.collection_view("page").unwrap();
        assert!(view.hierarchical);
        let roots: Vec<_> = view.items.iter().map(|n| n.item.id).collect();
        assert_eq!(roots, vec![blog, home]);
        assert_eq!(view.items[1].children[0].item.id, about);

        let outline = handler.collection_outline("page").unwrap();
        assert_eq!(
            outline,
            format!("- Blog (#{blog})\n- Home (#{home})\n  - About (#{about})\n")
        );
    }

    #[test]
    fn test_group_view_follows_stored_list() {
        let (handler, content, orders) = setup();
        let news = create(&content, "category", "News", 0);
        let a = create(&content, "article", "A", 0);
        let b = create(&content, "article", "B", 0);
        let c = create(&content, "article", "C", 0);
        content.add_to_group("category", news, a).unwrap();
        content.add_to_group("category", news, b).unwrap();

        orders.set_group_order("category", news, &[c, b, a]).unwrap();
        let view = handler.group_view("category", news).unwrap();

        // c 不是成员，只保留在原始列表中
        assert_eq!(view.order, vec![c, b, a]);
        let ids: Vec<_> = view.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![b, a]);
    }
}
