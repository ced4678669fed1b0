//! Order Management Engine
//!
//! - [`hierarchy`] - 扁平列表 → 森林，拍平，文本大纲
//! - [`ReorderHandler`] - 校验并应用排序提交
//! - [`OrderInjector`] - 列表查询排序改写 (实现 [`QueryFilter`](crate::content::QueryFilter))
//! - [`DefaultOrderInitializer`] - 新建 item 的默认排序值
//!
//! 数据流：
//!
//! ```text
//! 提交 → ReorderHandler → OrderStore
//! 列表 → ContentStore::list → OrderInjector (读 OrderStore) → 执行
//! ```

mod error;
pub mod hierarchy;
mod initializer;
mod injector;
mod reorder;
mod view;

pub use error::{ConfigurationError, OrderingError, OrderingResult, ValidationError};
pub use hierarchy::{TreeNode, build_forest, flatten, render_outline};
pub use initializer::DefaultOrderInitializer;
pub use injector::OrderInjector;
pub use reorder::{
    ParsedSubmission, RawId, ReorderHandler, ReorderOutcome, ReorderSubmission, ReorderTarget,
};
pub use view::{CollectionView, GroupView};
