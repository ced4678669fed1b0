//! Data models
//!
//! Shared between order-server and frontend (via API).
//! All IDs are `i64`.

pub mod collection;
pub mod item;

// Re-exports
pub use collection::*;
pub use item::*;
