//! 套餐档位与配额上限
//!
//! 上限是静态映射，不读库。Unbounded 是独立取值，
//! 不要用 0 或 u32::MAX 之类的哨兵值冒充。

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

/// 套餐档位
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum PlanTier {
    #[default]
    Free,
    Premium,
    Enterprise,
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanTier::Free => write!(f, "FREE"),
            PlanTier::Premium => write!(f, "PREMIUM"),
            PlanTier::Enterprise => write!(f, "ENTERPRISE"),
        }
    }
}

impl PlanTier {
    /// 从套餐名解析，大小写不敏感
    ///
    /// 未知套餐名一律按 FREE 处理。这是有意的 fail-safe：
    /// 计费侧写错套餐名时宁可少发配额，不能多发。
    pub fn from_plan_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "premium" => PlanTier::Premium,
            "enterprise" => PlanTier::Enterprise,
            _ => PlanTier::Free,
        }
    }

    /// 该档位的窗口上限
    pub fn limits(&self) -> PlanLimits {
        match self {
            PlanTier::Free => PlanLimits {
                daily: QuotaLimit::Limited(10),
                monthly: QuotaLimit::Limited(200),
            },
            PlanTier::Premium => PlanLimits {
                daily: QuotaLimit::Unbounded,
                monthly: QuotaLimit::Limited(600),
            },
            PlanTier::Enterprise => PlanLimits {
                daily: QuotaLimit::Unbounded,
                monthly: QuotaLimit::Unbounded,
            },
        }
    }

    /// 自定义短码是付费功能
    pub fn allows_custom_code(&self) -> bool {
        !matches!(self, PlanTier::Free)
    }

    /// 过期时间是付费功能
    pub fn allows_expiry(&self) -> bool {
        !matches!(self, PlanTier::Free)
    }
}

/// 单窗口配额上限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuotaLimit {
    /// 本窗口最多创建 n 条
    Limited(u32),
    /// 不限量（序列化为 null）
    Unbounded,
}

impl QuotaLimit {
    /// 当前用量下还能否再创建一条
    pub fn allows(&self, used: i64) -> bool {
        match self {
            QuotaLimit::Limited(n) => used < i64::from(*n),
            QuotaLimit::Unbounded => true,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, QuotaLimit::Unbounded)
    }
}

impl std::fmt::Display for QuotaLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaLimit::Limited(n) => write!(f, "{}", n),
            QuotaLimit::Unbounded => write!(f, "unlimited"),
        }
    }
}

/// 套餐在两个窗口上的上限组合
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanLimits {
    pub daily: QuotaLimit,
    pub monthly: QuotaLimit,
}
