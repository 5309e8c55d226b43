//! Mutation operations for SeaOrmStorage
//!
//! This module contains all write link operations.

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait,
    sea_query::Expr,
};
use tracing::info;

use super::SeaOrmStorage;
use super::converters::{model_to_short_link, new_link_to_active_model, update_to_active_model};
use super::retry;
use crate::errors::{Result, ShortgateError};
use crate::storage::models::{NewLink, ShortLink, UpdateLink};

use migration::entities::{issued_code, short_link};

/// 判断是否是唯一约束冲突错误
pub(crate) fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    use std::ops::Deref;

    match err {
        sea_orm::DbErr::Exec(sea_orm::RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Query(sea_orm::RuntimeErr::SqlxError(sqlx_err)) => {
            if let Some(db_err) = sqlx_err.deref().as_database_error() {
                let code = db_err.code();
                // SQLite: SQLITE_CONSTRAINT_UNIQUE / PRIMARYKEY (code 2067 / 1555)
                // MySQL: ER_DUP_ENTRY (code 1062)
                // PostgreSQL: unique_violation (code 23505)
                return code
                    .as_ref()
                    .map(|c| c == "2067" || c == "1555" || c == "1062" || c == "23505")
                    .unwrap_or(false);
            }
            false
        }
        _ => false,
    }
}

impl SeaOrmStorage {
    /// 插入新链接，返回分配了 id 的完整记录
    ///
    /// 同一事务内写入链接行和短码登记行，登记表主键在并发下兜底。
    /// 短码冲突映射为 CodeTaken，调用方据此区分「换码重试」和「拒绝」。
    pub async fn insert(&self, link: &NewLink) -> Result<ShortLink> {
        let db = &self.db;

        let result = retry::with_retry("insert_link", self.retry_config, || async {
            let txn = db.begin().await?;

            let model = new_link_to_active_model(link).insert(&txn).await?;

            issued_code::Entity::insert(issued_code::ActiveModel {
                code: Set(link.code.clone()),
                link_id: Set(model.id),
                issued_at: Set(link.created_at),
            })
            .exec_without_returning(&txn)
            .await?;

            txn.commit().await?;
            Ok(model)
        })
        .await;

        let model = match result {
            Ok(model) => model,
            Err(e) if is_unique_violation(&e) => {
                return Err(ShortgateError::code_taken(format!(
                    "短码已被占用: {}",
                    link.code
                )));
            }
            Err(e) => {
                return Err(ShortgateError::database_operation(format!(
                    "插入短链接失败: {}",
                    e
                )));
            }
        };

        self.invalidate_count_cache();
        info!(
            "Short link created: {} -> {} (user {})",
            model.short_code, model.target_url, model.user_id
        );
        Ok(model_to_short_link(model))
    }

    /// 白名单字段更新，返回更新后的记录
    pub async fn update(&self, id: i64, update: &UpdateLink) -> Result<ShortLink> {
        if update.is_empty() {
            // 没有可更新的字段，退化为读取
            return self
                .find_by_id(id)
                .await?
                .ok_or_else(|| ShortgateError::not_found(format!("短链接不存在: id={}", id)));
        }

        let db = &self.db;
        let result = retry::with_retry("update_link", self.retry_config, || async {
            update_to_active_model(id, update).update(db).await
        })
        .await;

        let model = match result {
            Ok(model) => model,
            Err(sea_orm::DbErr::RecordNotUpdated) => {
                return Err(ShortgateError::not_found(format!("短链接不存在: id={}", id)));
            }
            Err(e) => {
                return Err(ShortgateError::database_operation(format!(
                    "更新短链接失败: {}",
                    e
                )));
            }
        };

        info!("Short link updated: id={}", id);
        Ok(model_to_short_link(model))
    }

    /// 启用 / 停用链接，不触碰其他字段
    pub async fn set_active(&self, id: i64, active: bool) -> Result<()> {
        let db = &self.db;

        let result = retry::with_retry("set_link_active", self.retry_config, || async {
            short_link::Entity::update_many()
                .col_expr(short_link::Column::IsActive, Expr::value(active))
                .filter(short_link::Column::Id.eq(id))
                .exec(db)
                .await
        })
        .await
        .map_err(|e| ShortgateError::database_operation(format!("更新链接状态失败: {}", e)))?;

        if result.rows_affected == 0 {
            return Err(ShortgateError::not_found(format!("短链接不存在: id={}", id)));
        }

        info!(
            "Short link {}: id={}",
            if active { "activated" } else { "deactivated" },
            id
        );
        Ok(())
    }

    /// 硬删除链接
    ///
    /// 只删行，不回收短码（登记行保留），历史点击事件也保留。
    pub async fn delete(&self, id: i64) -> Result<()> {
        let db = &self.db;

        let result = retry::with_retry("delete_link", self.retry_config, || async {
            short_link::Entity::delete_by_id(id).exec(db).await
        })
        .await
        .map_err(|e| ShortgateError::database_operation(format!("删除短链接失败: {}", e)))?;

        if result.rows_affected == 0 {
            return Err(ShortgateError::not_found(format!("短链接不存在: id={}", id)));
        }

        self.invalidate_count_cache();
        info!("Short link deleted: id={}", id);
        Ok(())
    }
}
