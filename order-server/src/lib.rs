//! Order Server - 内容集合的手动排序服务
//!
//! # 架构概述
//!
//! - **注册表** (`registry`): 集合类型及其排序能力，启动时加载
//! - **排序存储** (`store`): redb 中的排序值、父节点、分组顺序
//! - **内容系统** (`content`): item、分组成员、列表查询及扩展点
//! - **排序引擎** (`ordering`): 层级构建、排序提交、查询排序注入
//! - **认证** (`auth`): JWT 认证、排序权限
//! - **HTTP API** (`api`): RESTful 接口
//!
//! # 模块结构
//!
//! ```text
//! order-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 认证、权限
//! ├── registry/      # 集合注册表
//! ├── store/         # 排序存储 (redb)
//! ├── content/       # 内容系统
//! ├── ordering/      # 排序引擎
//! ├── api/           # HTTP 路由和处理器
//! └── utils/         # 日志、错误类型
//! ```

pub mod api;
pub mod auth;
pub mod content;
pub mod core;
pub mod ordering;
pub mod registry;
pub mod store;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use registry::Registry;
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境：加载 `.env`，初始化日志
pub fn setup_environment() {
    if let Err(e) = dotenv::dotenv() {
        // .env 是可选的
        eprintln!("No .env file loaded: {e}");
    }

    utils::logger::LogSettings::from_env().init();
}
