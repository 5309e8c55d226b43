//! 短链签发编排
//!
//! 签发是三步串联：配额预留、短码分配、落库。
//! 预留之后任何一步失败都要补偿释放，不能留下被吞掉的配额槽。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::errors::{Result, ShortgateError};
use crate::quota::{PlanTier, QuotaLedger, QuotaStatus};
use crate::storage::{NewLink, SeaOrmStorage, ShortLink};
use crate::utils::url_validator::validate_and_normalize;

use super::code_generator::CodeGenerator;
use super::link_service::LinkService;

// ============ 请求/结果类型 ============

/// 调用方身份（用户 id 和套餐来自外部认证层）
#[derive(Debug, Clone, Copy)]
pub struct UserContext {
    pub user_id: i64,
    pub plan: PlanTier,
}

/// 一次签发请求
#[derive(Debug, Clone, Default)]
pub struct IssuanceRequest {
    pub target_url: String,
    pub label: Option<String>,
    /// 付费套餐专属：自定义短码
    pub custom_code: Option<String>,
    /// 付费套餐专属：过期时间
    pub expires_at: Option<DateTime<Utc>>,
}

/// 签发结果
#[derive(Debug, Clone)]
pub struct IssuedLink {
    pub code: String,
    pub link: ShortLink,
}

/// 二维码资产提供方（外部协作者）
///
/// 返回生成好的资产路径。失败不阻塞签发，路径留空即可。
#[async_trait]
pub trait QrAssetProvider: Send + Sync {
    async fn provide(&self, code: &str) -> anyhow::Result<Option<String>>;
}

// ============ IssuanceService ============

/// 签发服务，"创建短链" 的唯一入口
pub struct IssuanceService {
    links: LinkService,
    generator: CodeGenerator,
    ledger: QuotaLedger,
    qr_provider: Option<Arc<dyn QrAssetProvider>>,
}

impl IssuanceService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self {
            links: LinkService::new(storage.clone()),
            generator: CodeGenerator::new(storage.clone()),
            ledger: QuotaLedger::new(&storage),
            qr_provider: None,
        }
    }

    pub fn with_qr_provider(mut self, provider: Arc<dyn QrAssetProvider>) -> Self {
        self.qr_provider = Some(provider);
        self
    }

    /// 签发一条短链
    ///
    /// 流程：校验（URL、套餐权限、自定义短码）先行，不消耗配额；
    /// 然后配额预留、短码分配、落库。预留成功后的任何失败
    /// 都走补偿释放，原始错误原样上抛。
    pub async fn create(&self, user: UserContext, req: IssuanceRequest) -> Result<IssuedLink> {
        // ---- 校验阶段 ----
        let target = validate_and_normalize(&req.target_url).map_err(|e| {
            info!(
                "IssuanceService: rejected (invalid-url) for user {}: {}",
                user.user_id, e
            );
            ShortgateError::validation(e.to_string())
        })?;

        let now = Utc::now();
        if let Err(e) = self.check_plan_features(&user, &req, now) {
            info!(
                "IssuanceService: rejected (invalid-code) for user {}: {}",
                user.user_id,
                e.message()
            );
            return Err(e);
        }

        // 自定义短码先行校验，格式或占用问题不必走到预留
        let validated_custom = match req.custom_code.as_deref() {
            Some(candidate) => match self.generator.validate_custom(candidate).await {
                Ok(code) => Some(code),
                Err(e) => {
                    info!(
                        "IssuanceService: rejected (invalid-code) for user {}: {}",
                        user.user_id,
                        e.message()
                    );
                    return Err(e);
                }
            },
            None => None,
        };

        // ---- 配额预留 ----
        self.ledger
            .reserve(user.user_id, user.plan, now)
            .await
            .map_err(|e| {
                let tag = match &e {
                    ShortgateError::QuotaExceededDaily(_) => "quota-daily",
                    ShortgateError::QuotaExceededMonthly(_) => "quota-monthly",
                    _ => "storage-error",
                };
                info!("IssuanceService: rejected ({}) for user {}", tag, user.user_id);
                e
            })?;

        // ---- 预留之后：失败必须释放 ----
        let code = match validated_custom {
            Some(code) => code,
            None => match self.generator.next().await {
                Ok(code) => code,
                Err(e) => {
                    let tag = match &e {
                        ShortgateError::CodeSpaceExhausted(_) => "code-exhausted",
                        _ => "storage-error",
                    };
                    info!("IssuanceService: rejected ({}) for user {}", tag, user.user_id);
                    self.release_reservation(user.user_id, now).await;
                    return Err(e);
                }
            },
        };

        let qr_asset_path = self.provide_qr(&code).await;

        let new_link = NewLink {
            user_id: user.user_id,
            code: code.clone(),
            target,
            label: req.label,
            created_at: now,
            expires_at: req.expires_at,
            qr_asset_path,
        };

        let link = match self.links.create_link(&new_link).await {
            Ok(link) => link,
            Err(e) => {
                // 自定义短码被并发抢注会在这里报 CodeTaken
                let tag = match &e {
                    ShortgateError::CodeTaken(_) => "code-taken",
                    _ => "storage-error",
                };
                info!("IssuanceService: rejected ({}) for user {}", tag, user.user_id);
                self.release_reservation(user.user_id, now).await;
                return Err(e);
            }
        };

        info!(
            "IssuanceService: issued '{}' -> '{}' for user {} ({})",
            code, link.target, user.user_id, user.plan
        );
        Ok(IssuedLink { code, link })
    }

    /// 配额用量的只读快照，仅供展示
    ///
    /// 读出来的数字到创建时可能已经过期，放行与否以 reserve 为准。
    pub async fn quota_status(&self, user: UserContext) -> Result<QuotaStatus> {
        self.ledger
            .status(user.user_id, user.plan, Utc::now())
            .await
    }

    /// 套餐权限门禁：自定义短码和过期时间只开放给付费套餐
    fn check_plan_features(
        &self,
        user: &UserContext,
        req: &IssuanceRequest,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if req.custom_code.is_some() && !user.plan.allows_custom_code() {
            return Err(ShortgateError::validation(format!(
                "{} 套餐不支持自定义短码",
                user.plan
            )));
        }
        if let Some(expiry) = req.expires_at {
            if !user.plan.allows_expiry() {
                return Err(ShortgateError::validation(format!(
                    "{} 套餐不支持设置过期时间",
                    user.plan
                )));
            }
            if expiry <= now {
                return Err(ShortgateError::validation(
                    "过期时间必须晚于当前时间".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// 补偿释放已预留的配额槽
    ///
    /// 释放失败只记日志，不能盖过触发补偿的原始错误。
    async fn release_reservation(&self, user_id: i64, now: DateTime<Utc>) {
        if let Err(e) = self.ledger.release(user_id, now).await {
            error!(
                "IssuanceService: failed to release quota reservation for user {}: {}",
                user_id, e
            );
        }
    }

    async fn provide_qr(&self, code: &str) -> Option<String> {
        let provider = self.qr_provider.as_ref()?;
        match provider.provide(code).await {
            Ok(path) => path,
            Err(e) => {
                // 二维码失败不阻塞签发
                warn!(
                    "IssuanceService: QR asset provider failed for '{}': {}",
                    code, e
                );
                None
            }
        }
    }
}
