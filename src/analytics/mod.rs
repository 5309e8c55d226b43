//! 点击分析模块
//!
//! `ClickAggregator` 负责事件记录和聚合查询，`device` 子模块做 UA 设备归类。

pub mod device;
pub mod service;

pub use device::classify_device;
pub use service::{
    ClickAggregator, ClickRequest, CountryCount, DailyCount, DeviceCount, LinkClickOverview,
};
