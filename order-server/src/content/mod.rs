//! Content system collaborator
//!
//! - [`ContentStore`] - item records, group memberships and listings
//! - [`ListingQuery`] - what a listing filter sees and may rewrite
//! - [`QueryFilter`] / [`ItemCreatedHook`] - extension points

mod hooks;
mod query;
mod store;

pub use hooks::{ItemCreatedHook, QueryFilter};
pub use query::{Direction, GroupFilter, ListingQuery, SortKey, sort_items};
pub use store::{ContentError, ContentResult, ContentStore};
