//! 日志系统
//!
//! 控制台输出始终开启；配置了日志文件时追加一个无阻塞文件输出
//! 层，返回的 guard 必须存活到进程结束，否则尾部日志会丢失。

use crate::error::RigError;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: String,
    /// 日志文件路径
    pub file_path: Option<PathBuf>,
    /// 是否启用彩色输出
    pub colored: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            colored: true,
        }
    }
}

/// 初始化日志系统
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, RigError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("capminer_rs={}", config.level)));

    let console_layer = fmt::layer()
        .with_ansi(config.colored)
        .with_target(false);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if let Some(file_path) = &config.file_path {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)
            .map_err(|e| RigError::System(format!("Failed to open log file: {}", e)))?;

        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let file_layer = fmt::layer().with_ansi(false).with_writer(non_blocking);

        registry.with(file_layer).init();
        Ok(Some(guard))
    } else {
        registry.init();
        Ok(None)
    }
}
