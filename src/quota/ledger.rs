//! 配额账本
//!
//! reserve 是链接创建的唯一准入闸门：额度检查和计数自增在同一个
//! 数据库事务里完成，靠条件 UPDATE 的行锁在并发下保证不超卖。
//! 进程内不加锁，多进程共享同一个库时语义不变。

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    ExprTrait, TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::{Result, ShortgateError};
use crate::storage::SeaOrmStorage;
use crate::storage::backend::retry::{self, RetryConfig};

use migration::entities::{quota_daily, quota_monthly};

use super::plan::{PlanTier, QuotaLimit};
use super::window::{day_key, month_key};

/// 配额用量快照
///
/// 仅供展示。读到的数字在返回时就可能已经过期，
/// 准入判断永远走 reserve，不要拿这个当闸门。
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub daily_used: i64,
    pub daily_limit: QuotaLimit,
    pub monthly_used: i64,
    pub monthly_limit: QuotaLimit,
    pub can_create_daily: bool,
    pub can_create_monthly: bool,
}

/// 事务内的预占结果（拒绝也是正常返回，不走重试）
enum ReserveOutcome {
    Granted,
    DeniedDaily,
    DeniedMonthly,
}

pub struct QuotaLedger {
    db: DatabaseConnection,
    retry_config: RetryConfig,
}

impl QuotaLedger {
    pub fn new(storage: &SeaOrmStorage) -> Self {
        Self {
            db: storage.get_db().clone(),
            retry_config: storage.retry_config(),
        }
    }

    /// 预占一个创建名额
    ///
    /// 两个窗口都有余量才提交，任何一个不满足就整体回滚。
    /// 先检查月窗口：双超时报月配额（PREMIUM 日窗口不限量，
    /// 月上限才是更严的那道，展示口径与 status 一致）。
    pub async fn reserve(&self, user_id: i64, plan: PlanTier, now: DateTime<Utc>) -> Result<()> {
        let limits = plan.limits();
        let day = day_key(now);
        let month = month_key(now);

        let db = &self.db;
        let day_ref = &day;
        let month_ref = &month;
        let outcome = retry::with_retry("quota_reserve", self.retry_config, || async {
            let txn = db.begin().await?;

            ensure_monthly_row(&txn, user_id, month_ref).await?;
            if !try_increment_monthly(&txn, user_id, month_ref, limits.monthly).await? {
                txn.rollback().await?;
                return Ok(ReserveOutcome::DeniedMonthly);
            }

            ensure_daily_row(&txn, user_id, day_ref).await?;
            if !try_increment_daily(&txn, user_id, day_ref, limits.daily).await? {
                txn.rollback().await?;
                return Ok(ReserveOutcome::DeniedDaily);
            }

            txn.commit().await?;
            Ok(ReserveOutcome::Granted)
        })
        .await
        .map_err(|e| ShortgateError::database_operation(format!("配额预占失败: {}", e)))?;

        match outcome {
            ReserveOutcome::Granted => {
                debug!(
                    "QuotaLedger: reserved slot for user {} (windows {} / {})",
                    user_id, day, month
                );
                Ok(())
            }
            ReserveOutcome::DeniedDaily => {
                info!(
                    "QuotaLedger: daily quota exhausted for user {} (window {})",
                    user_id, day
                );
                Err(ShortgateError::quota_exceeded_daily(format!(
                    "日配额已用完: 窗口 {} 上限 {}",
                    day, limits.daily
                )))
            }
            ReserveOutcome::DeniedMonthly => {
                info!(
                    "QuotaLedger: monthly quota exhausted for user {} (window {})",
                    user_id, month
                );
                Err(ShortgateError::quota_exceeded_monthly(format!(
                    "月配额已用完: 窗口 {} 上限 {}",
                    month, limits.monthly
                )))
            }
        }
    }

    /// 归还一个预占名额（下游创建失败时的补偿动作）
    ///
    /// 地板为 0，重复归还不会把计数减成负数。只在预占的同一窗口内
    /// 有意义；跨午夜归还到新窗口时静默落空并记日志。
    pub async fn release(&self, user_id: i64, now: DateTime<Utc>) -> Result<()> {
        let day = day_key(now);
        let month = month_key(now);

        let db = &self.db;
        let day_ref = &day;
        let month_ref = &month;
        let (daily_rows, monthly_rows) =
            retry::with_retry("quota_release", self.retry_config, || async {
                let txn = db.begin().await?;
                let monthly = decrement_monthly(&txn, user_id, month_ref).await?;
                let daily = decrement_daily(&txn, user_id, day_ref).await?;
                txn.commit().await?;
                Ok((daily, monthly))
            })
            .await
            .map_err(|e| ShortgateError::database_operation(format!("配额归还失败: {}", e)))?;

        if daily_rows == 0 || monthly_rows == 0 {
            warn!(
                "QuotaLedger: release found nothing to decrement for user {} (day {}, month {})",
                user_id, day, month
            );
        } else {
            debug!("QuotaLedger: released slot for user {}", user_id);
        }
        Ok(())
    }

    /// 只读用量快照
    pub async fn status(
        &self,
        user_id: i64,
        plan: PlanTier,
        now: DateTime<Utc>,
    ) -> Result<QuotaStatus> {
        let limits = plan.limits();
        let day = day_key(now);
        let month = month_key(now);

        let db = &self.db;
        let day_ref = &day;
        let month_ref = &month;
        let (daily_used, monthly_used) =
            retry::with_retry("quota_status", self.retry_config, || async {
                let daily = quota_daily::Entity::find_by_id((user_id, day_ref.clone()))
                    .one(db)
                    .await?
                    .map(|m| m.used)
                    .unwrap_or(0);
                let monthly = quota_monthly::Entity::find_by_id((user_id, month_ref.clone()))
                    .one(db)
                    .await?
                    .map(|m| m.used)
                    .unwrap_or(0);
                Ok((daily, monthly))
            })
            .await
            .map_err(|e| ShortgateError::database_operation(format!("配额查询失败: {}", e)))?;

        Ok(QuotaStatus {
            daily_used,
            daily_limit: limits.daily,
            monthly_used,
            monthly_limit: limits.monthly,
            can_create_daily: limits.daily.allows(daily_used),
            can_create_monthly: limits.monthly.allows(monthly_used),
        })
    }
}

/// 确保日窗口计数行存在（insert-or-ignore，首次使用时惰性建行）
async fn ensure_daily_row(
    txn: &DatabaseTransaction,
    user_id: i64,
    day: &str,
) -> std::result::Result<(), DbErr> {
    quota_daily::Entity::insert(quota_daily::ActiveModel {
        user_id: Set(user_id),
        day: Set(day.to_string()),
        used: Set(0),
    })
    .on_conflict(
        OnConflict::columns([quota_daily::Column::UserId, quota_daily::Column::Day])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(txn)
    .await?;
    Ok(())
}

/// 确保月窗口计数行存在
async fn ensure_monthly_row(
    txn: &DatabaseTransaction,
    user_id: i64,
    month: &str,
) -> std::result::Result<(), DbErr> {
    quota_monthly::Entity::insert(quota_monthly::ActiveModel {
        user_id: Set(user_id),
        month: Set(month.to_string()),
        used: Set(0),
    })
    .on_conflict(
        OnConflict::columns([
            quota_monthly::Column::UserId,
            quota_monthly::Column::Month,
        ])
        .do_nothing()
        .to_owned(),
    )
    .exec_without_returning(txn)
    .await?;
    Ok(())
}

/// 日窗口条件自增
///
/// used < limit 时才 +1，判断和写入在一条 UPDATE 里。
/// Unbounded 去掉条件，无脑 +1 只留计数。返回是否真的加上了。
async fn try_increment_daily(
    txn: &DatabaseTransaction,
    user_id: i64,
    day: &str,
    limit: QuotaLimit,
) -> std::result::Result<bool, DbErr> {
    let mut stmt = Query::update()
        .table(quota_daily::Entity)
        .value(
            quota_daily::Column::Used,
            Expr::col(quota_daily::Column::Used).add(1),
        )
        .and_where(Expr::col(quota_daily::Column::UserId).eq(user_id))
        .and_where(Expr::col(quota_daily::Column::Day).eq(Expr::val(day)))
        .to_owned();

    if let QuotaLimit::Limited(n) = limit {
        stmt.and_where(Expr::col(quota_daily::Column::Used).lt(i64::from(n)));
    }

    let result = txn.execute(&stmt).await?;
    Ok(result.rows_affected() == 1)
}

/// 月窗口条件自增
async fn try_increment_monthly(
    txn: &DatabaseTransaction,
    user_id: i64,
    month: &str,
    limit: QuotaLimit,
) -> std::result::Result<bool, DbErr> {
    let mut stmt = Query::update()
        .table(quota_monthly::Entity)
        .value(
            quota_monthly::Column::Used,
            Expr::col(quota_monthly::Column::Used).add(1),
        )
        .and_where(Expr::col(quota_monthly::Column::UserId).eq(user_id))
        .and_where(Expr::col(quota_monthly::Column::Month).eq(Expr::val(month)))
        .to_owned();

    if let QuotaLimit::Limited(n) = limit {
        stmt.and_where(Expr::col(quota_monthly::Column::Used).lt(i64::from(n)));
    }

    let result = txn.execute(&stmt).await?;
    Ok(result.rows_affected() == 1)
}

/// 日窗口补偿扣减（used > 0 才减，地板为 0）
async fn decrement_daily(
    txn: &DatabaseTransaction,
    user_id: i64,
    day: &str,
) -> std::result::Result<u64, DbErr> {
    let stmt = Query::update()
        .table(quota_daily::Entity)
        .value(
            quota_daily::Column::Used,
            Expr::col(quota_daily::Column::Used).sub(1),
        )
        .and_where(Expr::col(quota_daily::Column::UserId).eq(user_id))
        .and_where(Expr::col(quota_daily::Column::Day).eq(Expr::val(day)))
        .and_where(Expr::col(quota_daily::Column::Used).gt(0))
        .to_owned();

    let result = txn.execute(&stmt).await?;
    Ok(result.rows_affected())
}

/// 月窗口补偿扣减
async fn decrement_monthly(
    txn: &DatabaseTransaction,
    user_id: i64,
    month: &str,
) -> std::result::Result<u64, DbErr> {
    let stmt = Query::update()
        .table(quota_monthly::Entity)
        .value(
            quota_monthly::Column::Used,
            Expr::col(quota_monthly::Column::Used).sub(1),
        )
        .and_where(Expr::col(quota_monthly::Column::UserId).eq(user_id))
        .and_where(Expr::col(quota_monthly::Column::Month).eq(Expr::val(month)))
        .and_where(Expr::col(quota_monthly::Column::Used).gt(0))
        .to_owned();

    let result = txn.execute(&stmt).await?;
    Ok(result.rows_affected())
}
