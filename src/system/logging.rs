//! 日志初始化
//!
//! 按配置装配 tracing 订阅器：控制台或文件输出、按天滚动、
//! 文本或 JSON 格式。进程启动时调用一次。

use std::io;
use std::path::Path;

use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;

use crate::config::{LoggingConfig, StaticConfig};

/// 初始化全局日志订阅器
///
/// 返回的 `WorkerGuard` 必须存活到进程结束，否则非阻塞写入的
/// 尾部日志会丢失。
///
/// # Panics
/// 滚动文件创建失败或订阅器重复初始化时 panic。
pub fn init_logging(config: &StaticConfig) -> tracing_appender::non_blocking::WorkerGuard {
    let to_stdout = config
        .logging
        .file
        .as_deref()
        .is_none_or(|f| f.is_empty());

    let (writer, guard) = tracing_appender::non_blocking(make_writer(&config.logging));
    let filter = EnvFilter::new(config.logging.level.clone());

    let builder = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(to_stdout);

    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }

    guard
}

/// 根据配置选择日志输出目标
fn make_writer(logging: &LoggingConfig) -> Box<dyn io::Write + Send + Sync> {
    // 空文件名按未配置处理
    let log_file = match logging.file.as_deref().filter(|f| !f.is_empty()) {
        Some(f) => f,
        None => return Box::new(io::stdout()),
    };

    if logging.enable_rotation {
        let path = Path::new(log_file);
        let dir = path.parent().unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("shortgate.log");
        let appender = rolling::Builder::new()
            .rotation(rolling::Rotation::DAILY)
            .filename_prefix(filename.trim_end_matches(".log"))
            .filename_suffix("log")
            .max_log_files(logging.max_backups as usize)
            .build(dir)
            .expect("Failed to create rolling log appender");
        Box::new(appender)
    } else {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .expect("Failed to open log file");
        Box::new(file)
    }
}
