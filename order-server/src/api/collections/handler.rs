//! Collection / Item API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::content::{ContentError, ListingQuery};
use crate::core::ServerState;
use crate::utils::{ApiResponse, AppError, AppResult};
use shared::models::{CollectionType, Item, ItemCreate, ItemId};

/// GET /api/collections - 已注册的集合及其排序能力
pub async fn list_collections(State(state): State<ServerState>) -> Json<Vec<CollectionType>> {
    Json(state.registry.collections().cloned().collect())
}

/// GET /api/collections/{collection}/items - 列表查询
///
/// 查询参数 (可重复 `group`)：
///
/// - `group=category:3` / `group=category:3,4`
/// - `orderby=id|title|order_value`
/// - `order=asc|desc`
///
/// 未指定 `orderby` 时由查询过滤器决定排序。
pub async fn list_items(
    State(state): State<ServerState>,
    Path(collection): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<Vec<Item>>> {
    if state.registry.get(&collection).is_none() {
        return Err(ContentError::UnknownCollection(collection).into());
    }

    let query = listing_query(collection, &params)?;
    let items = state.content.list(query)?;
    tracing::debug!(count = items.len(), "Items listed");
    Ok(Json(items))
}

fn listing_query(collection: String, params: &[(String, String)]) -> AppResult<ListingQuery> {
    let mut query = ListingQuery::for_collection(collection);
    for (key, value) in params {
        match key.as_str() {
            "group" => query.groups.push(value.parse().map_err(AppError::validation)?),
            "orderby" => query.sort = Some(value.parse().map_err(AppError::validation)?),
            "order" => query.direction = Some(value.parse().map_err(AppError::validation)?),
            _ => {}
        }
    }
    Ok(query)
}

/// POST /api/collections/{collection}/items - 创建 item
pub async fn create_item(
    State(state): State<ServerState>,
    Path(collection): Path<String>,
    Json(payload): Json<ItemCreate>,
) -> AppResult<Json<Item>> {
    let item = state.content.create_item(&collection, payload)?;
    Ok(Json(item))
}

/// DELETE /api/collections/{collection}/items/{id} - 删除 item
pub async fn delete_item(
    State(state): State<ServerState>,
    Path((collection, id)): Path<(String, ItemId)>,
) -> AppResult<ApiResponse<()>> {
    state.content.delete_item(&collection, id)?;
    Ok(ApiResponse::ok())
}

/// PUT /api/collections/{taxonomy}/groups/{group_id}/members/{item_id} - 加入分组
pub async fn add_member(
    State(state): State<ServerState>,
    Path((taxonomy, group_id, item_id)): Path<(String, ItemId, ItemId)>,
) -> AppResult<ApiResponse<bool>> {
    let added = state.content.add_to_group(&taxonomy, group_id, item_id)?;
    Ok(ApiResponse::success(added))
}

/// DELETE /api/collections/{taxonomy}/groups/{group_id}/members/{item_id} - 移出分组
pub async fn remove_member(
    State(state): State<ServerState>,
    Path((taxonomy, group_id, item_id)): Path<(String, ItemId, ItemId)>,
) -> AppResult<ApiResponse<bool>> {
    let removed = state.content.remove_from_group(&taxonomy, group_id, item_id)?;
    Ok(ApiResponse::success(removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Direction, GroupFilter, SortKey};

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_listing_query_from_params() {
        let query = listing_query(
            "article".into(),
            &params(&[
                ("group", "category:3"),
                ("group", "tag:4,5"),
                ("orderby", "title"),
                ("order", "desc"),
                ("page", "2"),
            ]),
        )
        .unwrap();

        assert_eq!(query.collections, vec!["article".to_string()]);
        assert_eq!(
            query.groups,
            vec![
                GroupFilter::new("category", vec![3]),
                GroupFilter::new("tag", vec![4, 5])
            ]
        );
        assert_eq!(query.sort, Some(SortKey::Title));
        assert_eq!(query.direction, Some(Direction::Desc));
    }

    #[test]
    fn test_listing_query_rejects_bad_params() {
        assert!(listing_query("article".into(), &params(&[("group", "category")])).is_err());
        assert!(listing_query("article".into(), &params(&[("orderby", "date")])).is_err());
        assert!(listing_query("article".into(), &params(&[("order", "up")])).is_err());
    }
}
