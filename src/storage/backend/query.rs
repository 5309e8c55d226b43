//! Query operations for SeaOrmStorage
//!
//! This module contains all read-only link operations.

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, ExprTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};
use tracing::debug;

use super::{LinkFilter, SeaOrmStorage, retry};
use crate::errors::{Result, ShortgateError};
use crate::storage::ShortLink;
use crate::storage::models::LinkStats;

use migration::entities::{issued_code, short_link};

use super::converters::model_to_short_link;

/// 用于统计查询的结果结构体（DSL 聚合查询）
#[derive(Debug, FromQueryResult)]
struct StatsResult {
    total_links: i64,
    active_links: Option<i64>,
    expired_links: Option<i64>,
}

/// 构建用户维度的过滤条件
fn build_filter_condition(user_id: i64, filter: &LinkFilter, now: DateTime<Utc>) -> Condition {
    let mut condition = Condition::all().add(short_link::Column::UserId.eq(user_id));

    // search: 模糊匹配 target 或 label
    if let Some(ref search) = filter.search {
        condition = condition.add(
            Condition::any()
                .add(short_link::Column::TargetUrl.contains(search))
                .add(short_link::Column::Label.contains(search)),
        );
    }

    // only_expired: 只返回已过期的
    if filter.only_expired {
        condition = condition.add(short_link::Column::ExpiresAt.is_not_null());
        condition = condition.add(short_link::Column::ExpiresAt.lte(now));
    }

    // only_active: 只返回 active 且未过期的（expires_at 为 null 或 > now）
    if filter.only_active {
        condition = condition.add(short_link::Column::IsActive.eq(true));
        condition = condition.add(
            Condition::any()
                .add(short_link::Column::ExpiresAt.is_null())
                .add(short_link::Column::ExpiresAt.gt(now)),
        );
    }

    condition
}

impl SeaOrmStorage {
    /// 按短码精确查找（唯一索引，O(1)）
    pub async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>> {
        let db = &self.db;
        let code_owned = code.to_string();

        let result = retry::with_retry("find_by_code", self.retry_config, || async {
            short_link::Entity::find()
                .filter(short_link::Column::ShortCode.eq(&code_owned))
                .one(db)
                .await
        })
        .await
        .map_err(|e| ShortgateError::database_operation(format!("查询短链接失败: {}", e)))?;

        Ok(result.map(model_to_short_link))
    }

    /// 按内部 id 查找
    pub async fn find_by_id(&self, id: i64) -> Result<Option<ShortLink>> {
        let db = &self.db;

        let result = retry::with_retry("find_by_id", self.retry_config, || async {
            short_link::Entity::find_by_id(id).one(db).await
        })
        .await
        .map_err(|e| ShortgateError::database_operation(format!("查询短链接失败: {}", e)))?;

        Ok(result.map(model_to_short_link))
    }

    /// 链接是否存在（点击记录入库前的前置检查）
    pub async fn link_exists(&self, id: i64) -> Result<bool> {
        let db = &self.db;

        let count = retry::with_retry("link_exists", self.retry_config, || async {
            short_link::Entity::find_by_id(id).count(db).await
        })
        .await
        .map_err(|e| ShortgateError::database_operation(format!("查询短链接失败: {}", e)))?;

        Ok(count > 0)
    }

    /// 短码是否未被占用
    ///
    /// 检查签发登记表而不是 short_links：短码一经签发永久占用，
    /// 链接删除后也不能复用。读检查只用于提前拒绝，
    /// 并发窗口由登记表主键兜底（insert 报冲突）。
    pub async fn is_code_unique(&self, code: &str) -> Result<bool> {
        let db = &self.db;
        let code_owned = code.to_string();

        let count = retry::with_retry("is_code_unique", self.retry_config, || async {
            issued_code::Entity::find_by_id(&code_owned).count(db).await
        })
        .await
        .map_err(|e| ShortgateError::database_operation(format!("短码唯一性检查失败: {}", e)))?;

        Ok(count == 0)
    }

    /// 某用户的链接总数（带 COUNT 缓存）
    pub async fn count_by_user(&self, user_id: i64) -> Result<u64> {
        self.count_filtered(user_id, &LinkFilter::default()).await
    }

    async fn count_filtered(&self, user_id: i64, filter: &LinkFilter) -> Result<u64> {
        let now = Utc::now();

        // 生成缓存 key（基于用户和过滤条件）
        let cache_key = format!(
            "count:u={}:s={:?}:e={}:v={}",
            user_id, filter.search, filter.only_expired, filter.only_active
        );

        if let Some(cached) = self.count_cache.get(&cache_key) {
            debug!("count cache hit: key={}, value={}", cache_key, cached);
            return Ok(cached);
        }

        let db = &self.db;
        let condition = build_filter_condition(user_id, filter, now);
        let count = retry::with_retry("count_links", self.retry_config, || async {
            short_link::Entity::find()
                .filter(condition.clone())
                .count(db)
                .await
        })
        .await
        .map_err(|e| ShortgateError::database_operation(format!("链接计数失败: {}", e)))?;

        self.count_cache.insert(cache_key, count);
        Ok(count)
    }

    /// 按用户分页加载链接，创建时间倒序
    ///
    /// page 从 1 开始。返回 (当前页数据, 过滤后的总数)。
    pub async fn list_by_user(
        &self,
        user_id: i64,
        page: u64,
        page_size: u64,
        filter: LinkFilter,
    ) -> Result<(Vec<ShortLink>, u64)> {
        let now = Utc::now();
        let total = self.count_filtered(user_id, &filter).await?;

        let db = &self.db;
        let condition = build_filter_condition(user_id, &filter, now);
        let page_offset = page.saturating_sub(1);
        let models = retry::with_retry("list_by_user", self.retry_config, || async {
            short_link::Entity::find()
                .filter(condition.clone())
                .order_by_desc(short_link::Column::CreatedAt)
                .paginate(db, page_size)
                .fetch_page(page_offset)
                .await
        })
        .await
        .map_err(|e| ShortgateError::database_operation(format!("分页查询失败: {}", e)))?;

        let links: Vec<ShortLink> = models.into_iter().map(model_to_short_link).collect();
        Ok((links, total))
    }

    /// 按用户加载全部满足条件的链接（不分页）
    pub async fn load_filtered(&self, user_id: i64, filter: LinkFilter) -> Result<Vec<ShortLink>> {
        let now = Utc::now();
        let db = &self.db;
        let condition = build_filter_condition(user_id, &filter, now);

        let models = retry::with_retry("load_filtered", self.retry_config, || async {
            short_link::Entity::find()
                .filter(condition.clone())
                .order_by_desc(short_link::Column::CreatedAt)
                .all(db)
                .await
        })
        .await
        .map_err(|e| ShortgateError::database_operation(format!("加载过滤链接失败: {}", e)))?;

        Ok(models.into_iter().map(model_to_short_link).collect())
    }

    /// 获取用户链接统计信息（SeaORM DSL 聚合查询）
    pub async fn get_stats(&self, user_id: i64) -> Result<LinkStats> {
        let now = Utc::now();

        let result = short_link::Entity::find()
            .filter(short_link::Column::UserId.eq(user_id))
            .select_only()
            // COUNT(*) - 总链接数
            .column_as(short_link::Column::Id.count(), "total_links")
            // SUM(CASE WHEN is_active AND (expires_at IS NULL OR expires_at > now) THEN 1 ELSE 0 END)
            .column_as(
                Expr::case(
                    Condition::all().add(short_link::Column::IsActive.eq(true)).add(
                        Condition::any()
                            .add(short_link::Column::ExpiresAt.is_null())
                            .add(short_link::Column::ExpiresAt.gt(now)),
                    ),
                    1,
                )
                .finally(0)
                .sum(),
                "active_links",
            )
            // SUM(CASE WHEN expires_at IS NOT NULL AND expires_at <= now THEN 1 ELSE 0 END)
            .column_as(
                Expr::case(
                    Condition::all()
                        .add(short_link::Column::ExpiresAt.is_not_null())
                        .add(short_link::Column::ExpiresAt.lte(now)),
                    1,
                )
                .finally(0)
                .sum(),
                "expired_links",
            )
            .into_model::<StatsResult>()
            .one(&self.db)
            .await
            .map_err(|e| ShortgateError::database_operation(format!("统计查询失败: {}", e)))?;

        Ok(match result {
            Some(stats) => LinkStats {
                total_links: stats.total_links as usize,
                active_links: stats.active_links.unwrap_or(0) as usize,
                expired_links: stats.expired_links.unwrap_or(0) as usize,
            },
            None => LinkStats::default(),
        })
    }
}
