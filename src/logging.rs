//! 日志初始化和配置模块
//!
//! 这个模块提供了统一的日志初始化功能，使用 tracing 库。
//! 控制台与按天滚动的日志文件两路输出，级别可被 `RUST_LOG` 覆盖。

use crate::config::LogConfig;
use std::io;
use std::path::Path;
use std::sync::{Once, OnceLock};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::SystemTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// 自动初始化日志系统（仅初始化一次）
static INIT_LOGGER: Once = Once::new();

/// 文件输出的后台写线程守卫，进程结束前一直持有
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// 确保日志系统已初始化
///
/// 错误构造函数在记录日志前调用。首次调用时使用仅控制台的默认配置
/// 初始化日志系统，后续调用不会重复初始化；已被 `init_logging` 初始化时
/// 安静地忽略。
pub(crate) fn ensure_logger_initialized() {
    INIT_LOGGER.call_once(|| {
        let config = LogConfig { enable_file: false, ..LogConfig::default() };
        let _ = init_logging(&config);
    });
}

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),
    #[error("日志配置错误: {0}")]
    Config(String),
}

/// 日志初始化结果
pub type LogResult<T> = Result<T, LogError>;

/// 解析日志级别字符串
///
/// # Errors
/// 级别无法识别时返回 `LogError::Config`
pub fn parse_level(level: &str) -> LogResult<Level> {
    level
        .parse::<Level>()
        .map_err(|_| LogError::Config(format!("无效的日志级别: {level}")))
}

/// 初始化日志系统
///
/// - 控制台输出（`enable_stdout`）
/// - `log_dir` 下按天滚动的日志文件（`enable_file`）
/// - 级别来自配置，`RUST_LOG` 环境变量优先
///
/// 已经初始化过时直接返回成功。
///
/// # Errors
/// 级别无效或日志目录无法创建时返回错误
///
/// # Examples
///
/// ```no_run
/// use dbexport_import::config::LogConfig;
/// use dbexport_import::logging::init_logging;
///
/// let config = LogConfig { level: "debug".to_string(), ..LogConfig::default() };
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LogConfig) -> LogResult<()> {
    let level = parse_level(&config.level)?;
    // 创建环境过滤器，默认使用配置的级别
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    // 控制台输出层
    let console_layer = config.enable_stdout.then(|| {
        fmt::layer()
            .with_timer(SystemTime)
            .with_target(true)
            .with_ansi(true)
            .boxed()
    });

    // 文件输出层 - 按天滚动
    let mut guard = None;
    let file_layer = if config.enable_file {
        let dir = Path::new(&config.log_dir);
        std::fs::create_dir_all(dir)?;
        let file_appender =
            tracing_appender::rolling::daily(dir, &config.file_prefix);
        let (non_blocking, worker_guard) =
            tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);
        Some(
            fmt::layer()
                .with_writer(non_blocking)
                .with_timer(SystemTime)
                .with_target(true)
                .with_ansi(false) // 文件中不使用颜色
                .boxed(),
        )
    } else {
        None
    };

    // 尝试初始化，如果失败说明已经初始化过了
    let result = Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
    if result.is_ok() {
        if let Some(g) = guard {
            let _ = FILE_GUARD.set(g);
        }
        tracing::info!(
            level = %level,
            stdout = config.enable_stdout,
            file = config.enable_file,
            "日志系统初始化完成，日志目录: {}",
            config.log_dir
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_level("WARN").unwrap(), Level::WARN);
        assert!(matches!(parse_level("loud"), Err(LogError::Config(_))));
    }

    #[test]
    fn test_invalid_level_rejected_before_init() {
        let config = LogConfig { level: "nope".to_string(), ..LogConfig::default() };
        assert!(init_logging(&config).is_err());
    }

    #[test]
    fn test_ensure_logger_initialized_is_idempotent() {
        ensure_logger_initialized();
        ensure_logger_initialized();
        tracing::debug!("日志系统可用");
    }
}
