//! Ordering engine errors
//!
//! Every variant except [`OrderingError::Storage`] is raised before the first
//! write of a submission.

use crate::content::ContentError;
use crate::store::StorageError;
use shared::models::ItemId;
use shared::{AppError, ErrorCode};
use thiserror::Error;

/// Target unspecified, unknown or not enabled for ordering
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Collection not found: {0}")]
    UnknownCollection(String),

    #[error("Manual ordering is not enabled for {0}")]
    NotEnabled(String),

    #[error("Per-group ordering is not enabled for {0}")]
    GroupOrderNotEnabled(String),

    #[error("Group {group_id} not found in {taxonomy}")]
    GroupNotFound { taxonomy: String, group_id: ItemId },
}

/// Submission missing, empty or malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid order payload: {0}")]
    Malformed(String),

    #[error("No items submitted")]
    Empty,

    #[error("Non-numeric item id: {0}")]
    NonNumeric(String),

    #[error("Item {0} submitted more than once")]
    Duplicate(ItemId),

    #[error("Item {0} does not belong to the collection")]
    UnknownItem(ItemId),

    #[error("Parent given for item {0} which is not in the submitted order")]
    ParentWithoutItem(ItemId),

    #[error("Parent {parent_id} of item {item_id} is not an item of the collection")]
    UnknownParent { item_id: ItemId, parent_id: ItemId },

    #[error("Item {0} would become its own ancestor")]
    ParentCycle(ItemId),
}

/// Ordering engine error taxonomy
#[derive(Debug, Error)]
pub enum OrderingError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// 伪造或越权的提交
    #[error("Cheatin' uh?")]
    Authorization,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Content(#[from] ContentError),
}

pub type OrderingResult<T> = Result<T, OrderingError>;

impl From<OrderingError> for AppError {
    fn from(err: OrderingError) -> Self {
        match err {
            OrderingError::Configuration(e) => {
                let message = e.to_string();
                match e {
                    ConfigurationError::UnknownCollection(name) => {
                        AppError::with_message(ErrorCode::CollectionNotFound, message)
                            .with_detail("collection", name)
                    }
                    ConfigurationError::NotEnabled(name)
                    | ConfigurationError::GroupOrderNotEnabled(name) => {
                        AppError::with_message(ErrorCode::OrderingNotEnabled, message)
                            .with_detail("collection", name)
                    }
                    ConfigurationError::GroupNotFound { taxonomy, group_id } => {
                        AppError::with_message(ErrorCode::GroupNotFound, message)
                            .with_detail("taxonomy", taxonomy)
                            .with_detail("group_id", group_id)
                    }
                }
            }
            OrderingError::Validation(e) => {
                let code = match &e {
                    ValidationError::Malformed(_)
                    | ValidationError::Empty
                    | ValidationError::NonNumeric(_)
                    | ValidationError::ParentWithoutItem(_) => ErrorCode::InvalidOrderPayload,
                    ValidationError::Duplicate(_) => ErrorCode::DuplicateItem,
                    ValidationError::UnknownItem(_) => ErrorCode::ValidationFailed,
                    ValidationError::UnknownParent { .. } => ErrorCode::UnknownParent,
                    ValidationError::ParentCycle(_) => ErrorCode::ParentCycle,
                };
                AppError::with_message(code, e.to_string())
            }
            OrderingError::Authorization => AppError::permission_denied(),
            OrderingError::Storage(e) => AppError::database(e.to_string()),
            OrderingError::Content(e) => e.into(),
        }
    }
}
