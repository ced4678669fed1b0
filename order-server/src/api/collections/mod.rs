//! Collection / Item API 模块
//!
//! 内容系统的最小 HTTP 接口：集合列表、item 增删、分组成员、列表查询。
//! 列表查询经过查询过滤器 (排序注入)。

mod handler;

use axum::{
    Router,
    routing::{delete, get, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/collections", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list_collections))
        .route(
            "/{collection}/items",
            get(handler::list_items).post(handler::create_item),
        )
        .route("/{collection}/items/{id}", delete(handler::delete_item))
        .route(
            "/{collection}/groups/{group_id}/members/{item_id}",
            put(handler::add_member).delete(handler::remove_member),
        )
}
