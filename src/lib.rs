//! Shortgate - 短链签发与配额控制引擎
//!
//! 把长 URL 换成全局唯一的短码，按套餐配额限流创建，
//! 并记录点击事件供聚合分析。对外只暴露库接口，
//! HTTP 路由、会话和计费回调由调用方自带。
//!
//! # Architecture
//! - `services`: 签发编排、短码生成、链接管理
//! - `quota`: 按日/月窗口的配额账本与套餐限额
//! - `storage`: SeaORM 存储层（SQLite/MySQL/PostgreSQL）
//! - `analytics`: 点击事件记录与聚合查询
//! - `config`: 配置加载（TOML + 环境变量）
//! - `system`: 日志初始化

pub mod analytics;
pub mod config;
pub mod errors;
pub mod quota;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
