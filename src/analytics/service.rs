//! 点击聚合服务
//!
//! 记录是同步的：record 返回时事件一定已经落库（或已报错），
//! 不经过内存缓冲。聚合查询从事件表实时算，按后端方言分桶。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{DbBackend, sea_query::Expr};
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{Result, ShortgateError};
use crate::storage::models::NewClick;
use crate::storage::SeaOrmStorage;

use super::device::classify_device;

/// 聚合查询的时间范围上限（天）
const MAX_WINDOW_DAYS: u32 = 365;

// ============ 公共类型定义 ============

/// 一次点击的输入（事件 id 和时间戳由服务生成）
#[derive(Debug, Clone)]
pub struct ClickRequest {
    pub ip_address: String,
    pub user_agent: Option<String>,
    /// 调用方显式给出的设备类别，优先于 UA 推断
    pub device_type: Option<String>,
    /// ISO 3166-1 alpha-2 国家码
    pub country: Option<String>,
    pub referrer: Option<String>,
}

/// 单日点击数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: String,
    pub clicks: u64,
}

/// 设备维度统计
#[derive(Debug, Clone, Serialize)]
pub struct DeviceCount {
    pub device: String,
    pub clicks: u64,
    pub percentage: f64,
}

/// 国家维度统计
#[derive(Debug, Clone, Serialize)]
pub struct CountryCount {
    pub country: String,
    pub clicks: u64,
    pub percentage: f64,
}

/// 单链接概览（总量 + 日趋势 + 设备 + 国家）
#[derive(Debug, Clone, Serialize)]
pub struct LinkClickOverview {
    pub link_id: i64,
    pub total_clicks: u64,
    pub daily: Vec<DailyCount>,
    pub by_device: Vec<DeviceCount>,
    pub by_country: Vec<CountryCount>,
}

// ============ ClickAggregator ============

/// 点击事件的记录与聚合入口
pub struct ClickAggregator {
    storage: Arc<SeaOrmStorage>,
}

impl ClickAggregator {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// 记录一条点击事件，返回事件 id
    ///
    /// 引用的链接必须存在；设备类别缺省时从 UA 推断，推断不出就留空。
    pub async fn record(&self, link_id: i64, click: ClickRequest) -> Result<i64> {
        if !self.storage.link_exists(link_id).await? {
            return Err(ShortgateError::not_found(format!(
                "链接不存在: id={}",
                link_id
            )));
        }

        let device_type = click.device_type.clone().or_else(|| {
            click
                .user_agent
                .as_deref()
                .and_then(classify_device)
                .map(str::to_string)
        });

        let new_click = NewClick {
            link_id,
            clicked_at: Utc::now(),
            ip_address: click.ip_address,
            user_agent: click.user_agent,
            device_type,
            country: click.country.map(|c| c.to_ascii_uppercase()),
            referrer: click.referrer,
        };

        let event_id = self
            .storage
            .insert_click(&new_click)
            .await
            .map_err(|e| ShortgateError::database_operation(format!("点击事件写入失败: {}", e)))?;

        debug!(
            "ClickAggregator: recorded event {} for link {}",
            event_id, link_id
        );
        Ok(event_id)
    }

    /// 链接累计点击数
    pub async fn totals(&self, link_id: i64) -> Result<u64> {
        self.storage
            .count_clicks(link_id)
            .await
            .map_err(|e| ShortgateError::database_operation(format!("点击计数失败: {}", e)))
    }

    /// 指定日期范围内的按日点击数（只含有点击的日期）
    pub async fn by_date_range(
        &self,
        link_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DailyCount>> {
        if start > end {
            return Err(ShortgateError::validation(
                "起始日期不能晚于结束日期".to_string(),
            ));
        }

        info!(
            "ClickAggregator: by_date_range for link {} from {} to {}",
            link_id, start, end
        );

        let rows = self
            .storage
            .get_click_trend(link_id, start, end, self.day_bucket_expr())
            .await
            .map_err(|e| ShortgateError::database_operation(format!("趋势查询失败: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|r| DailyCount {
                date: r.label,
                clicks: r.count as u64,
            })
            .collect())
    }

    /// 设备分布（desktop / mobile / bot），无设备信息的事件不计入
    pub async fn by_device(&self, link_id: i64) -> Result<Vec<DeviceCount>> {
        let rows = self
            .storage
            .get_device_breakdown(link_id)
            .await
            .map_err(|e| ShortgateError::database_operation(format!("设备分布查询失败: {}", e)))?;

        let total: u64 = rows.iter().map(|r| r.count as u64).sum();
        Ok(rows
            .into_iter()
            .filter_map(|r| r.device_type.map(|d| (d, r.count as u64)))
            .map(|(device, clicks)| DeviceCount {
                device,
                clicks,
                percentage: percentage_of(clicks, total),
            })
            .collect())
    }

    /// 国家分布，无国家信息的事件不计入
    pub async fn by_country(&self, link_id: i64) -> Result<Vec<CountryCount>> {
        let rows = self
            .storage
            .get_country_breakdown(link_id)
            .await
            .map_err(|e| ShortgateError::database_operation(format!("国家分布查询失败: {}", e)))?;

        let total: u64 = rows.iter().map(|r| r.count as u64).sum();
        Ok(rows
            .into_iter()
            .filter_map(|r| r.country.map(|c| (c, r.count as u64)))
            .map(|(country, clicks)| CountryCount {
                country,
                clicks,
                percentage: percentage_of(clicks, total),
            })
            .collect())
    }

    /// 最近 window_days 天的小时分布（24 桶，UTC 小时）
    pub async fn hourly_distribution(
        &self,
        link_id: i64,
        window_days: u32,
    ) -> Result<[u64; 24]> {
        let (start, end) = self.window_range(window_days);
        let rows = self
            .storage
            .get_hour_distribution(link_id, start, end, self.hour_bucket_expr())
            .await
            .map_err(|e| ShortgateError::database_operation(format!("小时分布查询失败: {}", e)))?;

        let mut buckets = [0u64; 24];
        for row in rows {
            if let Ok(hour) = row.label.parse::<usize>() {
                if hour < 24 {
                    buckets[hour] = row.count as u64;
                }
            }
        }
        Ok(buckets)
    }

    /// 最近 window_days 天的按日序列，无点击的日期补零
    pub async fn daily_series(&self, link_id: i64, window_days: u32) -> Result<Vec<DailyCount>> {
        let (start, end) = self.window_range(window_days);
        let rows = self
            .storage
            .get_click_trend(link_id, start, end, self.day_bucket_expr())
            .await
            .map_err(|e| ShortgateError::database_operation(format!("趋势查询失败: {}", e)))?;

        let counts: HashMap<String, u64> = rows
            .into_iter()
            .map(|r| (r.label, r.count as u64))
            .collect();

        let mut series = Vec::new();
        let mut day = start.date_naive();
        let last = end.date_naive();
        while day <= last {
            let key = day.format("%Y-%m-%d").to_string();
            let clicks = counts.get(&key).copied().unwrap_or(0);
            series.push(DailyCount { date: key, clicks });
            day += Duration::days(1);
        }
        Ok(series)
    }

    /// 单链接概览，4 个查询用 `tokio::try_join!` 并发执行
    pub async fn overview(&self, link_id: i64, window_days: u32) -> Result<LinkClickOverview> {
        info!(
            "ClickAggregator: overview for link {} over {} days",
            link_id, window_days
        );

        let (total_clicks, daily, by_device, by_country) = tokio::try_join!(
            self.totals(link_id),
            self.daily_series(link_id, window_days),
            self.by_device(link_id),
            self.by_country(link_id),
        )?;

        Ok(LinkClickOverview {
            link_id,
            total_clicks,
            daily,
            by_device,
            by_country,
        })
    }

    fn window_range(&self, window_days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
        let days = window_days.clamp(1, MAX_WINDOW_DAYS);
        let end = Utc::now();
        // 窗口含今天：回溯 days-1 天的零点起算
        let start = (end - Duration::days(i64::from(days) - 1))
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(end);
        (start, end)
    }

    fn db_backend(&self) -> DbBackend {
        match self.storage.backend_name() {
            "sqlite" => DbBackend::Sqlite,
            "mysql" => DbBackend::MySql,
            _ => DbBackend::Postgres,
        }
    }

    /// 按日分桶表达式（跨后端）
    fn day_bucket_expr(&self) -> Expr {
        match self.db_backend() {
            DbBackend::Sqlite => Expr::cust("strftime('%Y-%m-%d', clicked_at)"),
            DbBackend::MySql => Expr::cust("DATE_FORMAT(clicked_at, '%Y-%m-%d')"),
            _ => Expr::cust("TO_CHAR(clicked_at, 'YYYY-MM-DD')"),
        }
    }

    /// 按小时分桶表达式（00-23）
    fn hour_bucket_expr(&self) -> Expr {
        match self.db_backend() {
            DbBackend::Sqlite => Expr::cust("strftime('%H', clicked_at)"),
            DbBackend::MySql => Expr::cust("DATE_FORMAT(clicked_at, '%H')"),
            _ => Expr::cust("TO_CHAR(clicked_at, 'HH24')"),
        }
    }
}

fn percentage_of(count: u64, total: u64) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}
