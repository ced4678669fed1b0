//! Ordering API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/ordering | DELETE | 清除全部排序数据 (admin) |
//! | /api/ordering/{collection} | GET | 排序管理视图 (森林) |
//! | /api/ordering/{collection} | PUT | 提交集合排序 |
//! | /api/ordering/{collection}/outline | GET | 文本大纲 |
//! | /api/ordering/{taxonomy}/groups/{group_id} | GET | 分组排序视图 |
//! | /api/ordering/{taxonomy}/groups/{group_id} | PUT | 提交分组排序 |

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/ordering", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route(
            "/",
            delete(handler::purge).route_layer(middleware::from_fn(require_admin)),
        )
        .route(
            "/{collection}",
            get(handler::collection_view).put(handler::reorder_collection),
        )
        .route("/{collection}/outline", get(handler::collection_outline))
        // 路径参数名需与上面保持一致，这里的 collection 即 taxonomy
        .route(
            "/{collection}/groups/{group_id}",
            get(handler::group_view).put(handler::reorder_group),
        )
}
