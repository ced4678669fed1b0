//! Extension points of the content system
//!
//! Components plug into the listing pipeline and the item lifecycle by
//! implementing these traits; [`ContentStore`](super::ContentStore) invokes
//! them synchronously.

use super::ListingQuery;
use shared::models::Item;

/// Invoked whenever a listing request is being finalised
pub trait QueryFilter: Send + Sync {
    fn filter(&self, query: &mut ListingQuery);
}

/// Invoked after an item has been stored
///
/// Hooks are best-effort: a failing hook logs and never fails the creation.
pub trait ItemCreatedHook: Send + Sync {
    fn on_item_created(&self, item: &Item);
}
