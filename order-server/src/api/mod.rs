//! API 路由模块
//!
//! - [`health`] - 健康检查
//! - [`collections`] - 集合、item、分组成员、列表查询
//! - [`ordering`] - 排序管理视图和排序提交

pub mod collections;
pub mod health;
pub mod ordering;
