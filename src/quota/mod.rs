//! 配额模块
//!
//! 套餐上限（静态映射）、UTC 窗口 key、以及带补偿的预占账本。

pub mod ledger;
pub mod plan;
pub mod window;

pub use ledger::{QuotaLedger, QuotaStatus};
pub use plan::{PlanLimits, PlanTier, QuotaLimit};
pub use window::{day_key, month_key};
