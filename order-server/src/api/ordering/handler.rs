//! Ordering API Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
};

use crate::auth::CurrentUser;
use crate::auth::permissions::can_manage_order;
use crate::core::ServerState;
use crate::ordering::{CollectionView, GroupView, ReorderOutcome, ReorderTarget};
use crate::security_log;
use crate::store::PurgeSummary;
use crate::utils::{ApiResponse, AppError, AppResult};
use shared::models::ItemId;

const ORDER_SAVED: &str = "Order saved.";

fn ensure_can_manage(user: &CurrentUser, collection: &str) -> AppResult<()> {
    if can_manage_order(user, collection) {
        return Ok(());
    }
    security_log!(
        "WARN",
        "ordering_view_forbidden",
        user_id = user.id.clone(),
        collection = collection.to_string()
    );
    Err(AppError::permission_denied())
}

/// GET /api/ordering/{collection} - 排序管理视图
pub async fn collection_view(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(collection): Path<String>,
) -> AppResult<Json<CollectionView>> {
    ensure_can_manage(&user, &collection)?;
    Ok(Json(state.reorder.collection_view(&collection)?))
}

/// GET /api/ordering/{collection}/outline - 文本大纲
pub async fn collection_outline(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(collection): Path<String>,
) -> AppResult<String> {
    ensure_can_manage(&user, &collection)?;
    Ok(state.reorder.collection_outline(&collection)?)
}

/// PUT /api/ordering/{collection} - 提交集合排序
///
/// Body: `{ "order": [ids...], "parents": { "<id>": <parent id> } }`
pub async fn reorder_collection(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(collection): Path<String>,
    body: Bytes,
) -> AppResult<ApiResponse<ReorderOutcome>> {
    let target = ReorderTarget::Collection(collection);
    let outcome = state.reorder.apply_json(&user, &target, &body)?;
    Ok(ApiResponse::success_with_message(ORDER_SAVED, outcome))
}

/// GET /api/ordering/{taxonomy}/groups/{group_id} - 分组排序视图
pub async fn group_view(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path((taxonomy, group_id)): Path<(String, ItemId)>,
) -> AppResult<Json<GroupView>> {
    ensure_can_manage(&user, &taxonomy)?;
    Ok(Json(state.reorder.group_view(&taxonomy, group_id)?))
}

/// PUT /api/ordering/{taxonomy}/groups/{group_id} - 提交分组排序
pub async fn reorder_group(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path((taxonomy, group_id)): Path<(String, ItemId)>,
    body: Bytes,
) -> AppResult<ApiResponse<ReorderOutcome>> {
    let target = ReorderTarget::Group { taxonomy, group_id };
    let outcome = state.reorder.apply_json(&user, &target, &body)?;
    Ok(ApiResponse::success_with_message(ORDER_SAVED, outcome))
}

/// DELETE /api/ordering - 清除全部排序数据 (admin)
pub async fn purge(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<ApiResponse<PurgeSummary>> {
    let summary = state
        .orders
        .purge()
        .map_err(|e| AppError::database(e.to_string()))?;

    security_log!(
        "INFO",
        "ordering_purged",
        user_id = user.id.clone(),
        item_meta = summary.item_meta,
        group_orders = summary.group_orders
    );
    Ok(ApiResponse::success(summary))
}
