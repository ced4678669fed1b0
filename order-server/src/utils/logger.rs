//! Logging Infrastructure
//!
//! 开发环境输出到终端，`LOG_DIR` 存在时按天滚动写入文件。

use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// 日志设置，唯一来源是 `LOG_*` 环境变量
///
/// | 环境变量 | 默认值 |
/// |----------|--------|
/// | LOG_LEVEL | info |
/// | LOG_JSON | false |
/// | LOG_DIR | `<WORK_DIR>/logs` |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Option<String>,
    pub json: bool,
    pub dir: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            level: get("LOG_LEVEL"),
            json: get("LOG_JSON")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            dir: get("LOG_DIR")
                .map(PathBuf::from)
                .or_else(|| get("WORK_DIR").map(|dir| PathBuf::from(dir).join("logs"))),
        }
    }

    /// Install the global subscriber
    pub fn init(&self) {
        init_logger_with_file(self.level.as_deref(), self.json, self.dir.as_deref());
    }
}

/// Initialize the logger with defaults
pub fn init_logger() {
    init_logger_with_file(None, false, None);
}

/// Initialize the logger with optional JSON format and file output
///
/// `RUST_LOG` overrides `log_level` when set.
pub fn init_logger_with_file(log_level: Option<&str>, json: bool, log_dir: Option<&Path>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true);

    let log_dir = log_dir.filter(|dir| dir.is_dir());

    // try_init: 测试中可能被多次调用
    let result = match (log_dir, json) {
        (Some(dir), true) => builder
            .json()
            .with_writer(tracing_appender::rolling::daily(dir, "order-server"))
            .try_init(),
        (Some(dir), false) => builder
            .with_ansi(false)
            .with_writer(tracing_appender::rolling::daily(dir, "order-server"))
            .try_init(),
        (None, true) => builder.json().try_init(),
        (None, false) => builder.try_init(),
    };

    if let Err(e) = result {
        eprintln!("Logger already initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(settings(&[]), LogSettings::default());
    }

    #[test]
    fn test_log_dir_falls_back_to_work_dir() {
        let s = settings(&[("WORK_DIR", "/srv/order"), ("LOG_JSON", "true")]);
        assert_eq!(s.dir, Some(PathBuf::from("/srv/order/logs")));
        assert!(s.json);

        let s = settings(&[
            ("WORK_DIR", "/srv/order"),
            ("LOG_DIR", "/var/log/order"),
            ("LOG_LEVEL", "debug"),
            ("LOG_JSON", "yes"),
        ]);
        assert_eq!(s.dir, Some(PathBuf::from("/var/log/order")));
        assert_eq!(s.level.as_deref(), Some("debug"));
        assert!(!s.json);
    }
}
