//! 业务服务层
//!
//! 签发、链接管理和短码生成的统一入口，供上层调用方
//! （Web 处理器、批处理任务）驱动。

mod code_generator;
mod issuance;
mod link_service;

pub use code_generator::CodeGenerator;
pub use issuance::{IssuanceRequest, IssuanceService, IssuedLink, QrAssetProvider, UserContext};
pub use link_service::LinkService;
