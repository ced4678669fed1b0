use crate::auth::JwtError;
use crate::content::ContentError;
use crate::registry::RegistryError;
use crate::store::StorageError;
use thiserror::Error;

/// 启动和运行期间的服务器错误
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(#[from] JwtError),

    #[error("注册表错误: {0}")]
    Registry(#[from] RegistryError),

    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),

    #[error("内容存储错误: {0}")]
    Content(#[from] ContentError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
