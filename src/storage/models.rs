use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 短链接实体（含存储层生成的 id / created_at）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortLink {
    pub id: i64,
    pub user_id: i64,
    pub code: String,
    pub target: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub qr_asset_path: Option<String>,
}

impl ShortLink {
    /// 过期是计算属性（expires_at <= now），不落库
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }

    /// 可被重定向：active 且未过期
    pub fn is_resolvable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }
}

/// 新链接的待持久化属性
///
/// id 由数据库自增分配；短码必须已通过唯一性检查（唯一索引兜底）。
#[derive(Debug, Clone)]
pub struct NewLink {
    pub user_id: i64,
    pub code: String,
    pub target: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub qr_asset_path: Option<String>,
}

/// 白名单字段更新
///
/// 外层 None 表示保持不变；可空字段用 Some(None) 清空。
/// 短码不在白名单内，签发后不可变。
#[derive(Debug, Clone, Default)]
pub struct UpdateLink {
    pub target: Option<String>,
    pub label: Option<Option<String>>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
    pub qr_asset_path: Option<Option<String>>,
}

impl UpdateLink {
    pub fn is_empty(&self) -> bool {
        self.target.is_none()
            && self.label.is_none()
            && self.expires_at.is_none()
            && self.is_active.is_none()
            && self.qr_asset_path.is_none()
    }
}

/// 用户链接统计
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkStats {
    pub total_links: usize,
    pub active_links: usize,
    pub expired_links: usize,
}

/// 待落库的点击事件（id 由数据库分配）
#[derive(Debug, Clone)]
pub struct NewClick {
    pub link_id: i64,
    pub clicked_at: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
    pub country: Option<String>,
    pub referrer: Option<String>,
}
