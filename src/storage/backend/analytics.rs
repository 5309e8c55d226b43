//! 点击事件的数据库读写
//!
//! 写入一条即一条（append-only），统计查询供 ClickAggregator 调用。

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, sea_query::Expr,
};

use super::retry;
use crate::storage::models::NewClick;

use migration::entities::click_event;

// ============ 查询结果类型 ============

/// 时间分桶查询结果行（日期趋势 / 小时分布共用）
#[derive(Debug, FromQueryResult)]
pub struct TrendRow {
    pub label: String,
    pub count: i64,
}

/// 设备分布查询结果行
#[derive(Debug, FromQueryResult)]
pub struct DeviceRow {
    pub device_type: Option<String>,
    pub count: i64,
}

/// 国家分布查询结果行
#[derive(Debug, FromQueryResult)]
pub struct CountryRow {
    pub country: Option<String>,
    pub count: i64,
}

// ============ SeaOrmStorage 点击事件方法 ============

impl super::SeaOrmStorage {
    /// 追加一条点击事件，返回事件 id
    ///
    /// 事件一经写入不可变更，后续只做聚合读取。
    pub async fn insert_click(&self, click: &NewClick) -> anyhow::Result<i64> {
        let db = &self.db;

        let model = retry::with_retry("insert_click", self.retry_config, || async {
            click_event::ActiveModel {
                id: sea_orm::ActiveValue::NotSet,
                link_id: Set(click.link_id),
                clicked_at: Set(click.clicked_at),
                ip_address: Set(Some(click.ip_address.clone())),
                user_agent: Set(click.user_agent.clone()),
                device_type: Set(click.device_type.clone()),
                country: Set(click.country.clone()),
                referrer: Set(click.referrer.clone()),
            }
            .insert(db)
            .await
        })
        .await?;

        Ok(model.id)
    }

    /// 统计指定链接的累计点击数
    pub async fn count_clicks(&self, link_id: i64) -> anyhow::Result<u64> {
        click_event::Entity::find()
            .filter(click_event::Column::LinkId.eq(link_id))
            .count(&self.db)
            .await
            .map_err(Into::into)
    }

    /// 获取链接点击趋势（按 date_expr 分桶）
    pub async fn get_click_trend(
        &self,
        link_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        date_expr: Expr,
    ) -> anyhow::Result<Vec<TrendRow>> {
        click_event::Entity::find()
            .select_only()
            .column_as(date_expr.clone(), "label")
            .column_as(click_event::Column::Id.count(), "count")
            .filter(click_event::Column::LinkId.eq(link_id))
            .filter(click_event::Column::ClickedAt.gte(start))
            .filter(click_event::Column::ClickedAt.lte(end))
            .group_by(date_expr)
            .order_by_asc(Expr::cust("label"))
            .into_model::<TrendRow>()
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// 获取链接设备分布
    ///
    /// device_type 为空的事件不参与分组（不合成 unknown 桶）。
    pub async fn get_device_breakdown(&self, link_id: i64) -> anyhow::Result<Vec<DeviceRow>> {
        click_event::Entity::find()
            .select_only()
            .column(click_event::Column::DeviceType)
            .column_as(click_event::Column::Id.count(), "count")
            .filter(click_event::Column::LinkId.eq(link_id))
            .filter(click_event::Column::DeviceType.is_not_null())
            .group_by(click_event::Column::DeviceType)
            .order_by_desc(Expr::cust("count"))
            .into_model::<DeviceRow>()
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// 获取链接国家分布
    ///
    /// country 为空的事件不参与分组。
    pub async fn get_country_breakdown(&self, link_id: i64) -> anyhow::Result<Vec<CountryRow>> {
        click_event::Entity::find()
            .select_only()
            .column(click_event::Column::Country)
            .column_as(click_event::Column::Id.count(), "count")
            .filter(click_event::Column::LinkId.eq(link_id))
            .filter(click_event::Column::Country.is_not_null())
            .group_by(click_event::Column::Country)
            .order_by_desc(Expr::cust("count"))
            .into_model::<CountryRow>()
            .all(&self.db)
            .await
            .map_err(Into::into)
    }

    /// 获取链接小时分布（hour_expr 取 00-23）
    pub async fn get_hour_distribution(
        &self,
        link_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        hour_expr: Expr,
    ) -> anyhow::Result<Vec<TrendRow>> {
        click_event::Entity::find()
            .select_only()
            .column_as(hour_expr.clone(), "label")
            .column_as(click_event::Column::Id.count(), "count")
            .filter(click_event::Column::LinkId.eq(link_id))
            .filter(click_event::Column::ClickedAt.gte(start))
            .filter(click_event::Column::ClickedAt.lte(end))
            .group_by(hour_expr)
            .order_by_asc(Expr::cust("label"))
            .into_model::<TrendRow>()
            .all(&self.db)
            .await
            .map_err(Into::into)
    }
}
