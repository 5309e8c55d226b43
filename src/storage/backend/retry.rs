//! 数据库写入重试
//!
//! 短码写入和配额事务在并发下会撞上锁冲突，这里统一做指数退避重试。
//! 只有基础设施层面的瞬态错误会被重试；唯一键冲突、记录不存在这类
//! 业务结果必须原样返回给上层。

use std::future::Future;
use std::time::Duration;

use rand::RngExt;
use sea_orm::DbErr;
use tokio::time::sleep;
use tracing::{debug, warn};

/// 各后端的瞬态错误码：MySQL 死锁/锁超时，PostgreSQL 序列化失败/死锁，
/// SQLite BUSY/LOCKED
const TRANSIENT_SQLSTATES: &[&str] = &["1213", "1205", "40001", "40P01", "5", "6"];

/// 判断数据库错误是否可重试
pub fn is_retryable_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(runtime_err) | DbErr::Query(runtime_err) => {
            runtime_err_is_transient(runtime_err)
        }
        _ => false,
    }
}

fn runtime_err_is_transient(err: &sea_orm::error::RuntimeErr) -> bool {
    use sea_orm::error::RuntimeErr;

    match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            use std::ops::Deref;
            match sqlx_err.deref().as_database_error().and_then(|db| db.code()) {
                Some(code) => TRANSIENT_SQLSTATES.contains(&code.as_ref()),
                // 拿不到错误码时退化为消息匹配
                None => message_looks_transient(&sqlx_err.to_string().to_lowercase()),
            }
        }
        RuntimeErr::Internal(msg) => message_looks_transient(&msg.to_lowercase()),
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

fn message_looks_transient(msg: &str) -> bool {
    ["deadlock", "lock wait timeout", "database is locked", "serialization failure"]
        .iter()
        .any(|needle| msg.contains(needle))
}

/// 重试配置（次数与退避窗口来自配置文件）
#[derive(Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// 指数退避重试执行器
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    config: RetryConfig,
    mut operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{}: 第 {} 次重试后成功", operation_name, attempt);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !is_retryable_error(&err) {
            debug!("{}: 不可重试的错误，直接返回: {}", operation_name, err);
            return Err(err);
        }
        if attempt >= config.max_retries {
            warn!(
                "{}: 重试 {} 次后仍失败: {}",
                operation_name, config.max_retries, err
            );
            return Err(err);
        }

        attempt += 1;
        let delay = backoff_delay(attempt, &config);
        warn!(
            "{}: 瞬态错误（第 {}/{} 次尝试）: {}，{} ms 后重试",
            operation_name,
            attempt,
            config.max_retries + 1,
            err,
            delay
        );
        sleep(Duration::from_millis(delay)).await;
    }
}

/// 第 n 次重试的延迟：base * 2^(n-1)，封顶后加 0-25% 抖动错开并发重试
fn backoff_delay(attempt: u32, config: &RetryConfig) -> u64 {
    let factor = 1u64 << (attempt - 1).min(16);
    let capped = config.base_delay_ms.saturating_mul(factor).min(config.max_delay_ms);
    let jitter = rand::rng().random_range(0..=capped / 4);
    capped.saturating_add(jitter)
}
