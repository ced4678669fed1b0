use crate::auth::{JwtConfig, JwtError};
use std::path::PathBuf;

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/order-server | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | REGISTRY_FILE | `<WORK_DIR>/ordering.json` | 集合排序能力配置 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 关闭超时(毫秒) |
///
/// JWT 相关见 [`JwtConfig::from_env`]。日志 (`LOG_LEVEL` / `LOG_DIR` / `LOG_JSON`)
/// 在配置加载之前由 [`crate::setup_environment`] 初始化。
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    pub http_port: u16,
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// None = `<work_dir>/ordering.json`
    pub registry_file: Option<String>,
    pub request_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
}

impl Config {
    /// 从环境变量加载配置，未设置时使用默认值
    pub fn from_env() -> Result<Self, JwtError> {
        Ok(Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/order-server".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            jwt: JwtConfig::from_env()?,
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            registry_file: std::env::var("REGISTRY_FILE").ok(),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30000),
            shutdown_timeout_ms: std::env::var("SHUTDOWN_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
        })
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Result<Self, JwtError> {
        let mut config = Self::from_env()?;
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config.registry_file = None;
        Ok(config)
    }

    pub fn registry_path(&self) -> PathBuf {
        match &self.registry_file {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.work_dir).join("ordering.json"),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("ordering.redb")
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
