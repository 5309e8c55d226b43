//! 签发编排测试
//!
//! 覆盖完整签发链路：校验、套餐门禁、配额预留、短码分配、
//! 落库和失败补偿。

use std::sync::{Arc, Once};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tempfile::TempDir;

use shortgate::config::init_config;
use shortgate::errors::ShortgateError;
use shortgate::quota::PlanTier;
use shortgate::services::{IssuanceRequest, IssuanceService, QrAssetProvider, UserContext};
use shortgate::storage::SeaOrmStorage;

// 确保 config 只初始化一次
static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

/// 创建临时 SQLite 数据库的存储实例
async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    init_test_config();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite")
        .await
        .expect("Failed to create storage");

    (Arc::new(storage), temp_dir)
}

fn free_user(id: i64) -> UserContext {
    UserContext {
        user_id: id,
        plan: PlanTier::Free,
    }
}

fn premium_user(id: i64) -> UserContext {
    UserContext {
        user_id: id,
        plan: PlanTier::Premium,
    }
}

fn plain_request(url: &str) -> IssuanceRequest {
    IssuanceRequest {
        target_url: url.to_string(),
        ..Default::default()
    }
}

struct FixedQr;

#[async_trait]
impl QrAssetProvider for FixedQr {
    async fn provide(&self, code: &str) -> anyhow::Result<Option<String>> {
        Ok(Some(format!("qr/{}.svg", code)))
    }
}

struct FailingQr;

#[async_trait]
impl QrAssetProvider for FailingQr {
    async fn provide(&self, _code: &str) -> anyhow::Result<Option<String>> {
        Err(anyhow::anyhow!("renderer offline"))
    }
}

// =============================================================================
// 基本签发测试
// =============================================================================

#[cfg(test)]
mod create_tests {
    use super::*;

    #[tokio::test]
    async fn test_issue_populates_link_and_consumes_quota() {
        let (storage, _td) = create_temp_storage().await;
        let service = IssuanceService::new(storage.clone());
        let user = free_user(1);

        let issued = service
            .create(user, plain_request("https://Example.COM/page"))
            .await
            .unwrap();

        assert_eq!(issued.code.len(), 6);
        assert_eq!(issued.link.code, issued.code);
        assert_eq!(issued.link.user_id, 1);
        // URL 已规范化
        assert_eq!(issued.link.target, "https://example.com/page");
        assert!(issued.link.is_active);
        assert!(issued.link.id > 0);

        // 落库可查
        let stored = storage.find_by_code(&issued.code).await.unwrap().unwrap();
        assert_eq!(stored, issued.link);

        // 消耗一个配额名额
        let status = service.quota_status(user).await.unwrap();
        assert_eq!(status.daily_used, 1);
        assert_eq!(status.monthly_used, 1);
    }

    #[tokio::test]
    async fn test_label_is_stored() {
        let (storage, _td) = create_temp_storage().await;
        let service = IssuanceService::new(storage);

        let issued = service
            .create(
                free_user(1),
                IssuanceRequest {
                    target_url: "https://example.com/".to_string(),
                    label: Some("文档入口".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(issued.link.label.as_deref(), Some("文档入口"));
    }

    #[tokio::test]
    async fn test_invalid_url_rejected_without_consuming_quota() {
        let (storage, _td) = create_temp_storage().await;
        let service = IssuanceService::new(storage);
        let user = free_user(2);

        for bad in ["ftp://example.com", "javascript:alert(1)", "not a url", ""] {
            let err = service.create(user, plain_request(bad)).await.unwrap_err();
            assert!(matches!(err, ShortgateError::Validation(_)), "{}", bad);
        }

        let status = service.quota_status(user).await.unwrap();
        assert_eq!(status.daily_used, 0);
        assert_eq!(status.monthly_used, 0);
    }

    #[tokio::test]
    async fn test_daily_quota_blocks_eleventh_create() {
        let (storage, _td) = create_temp_storage().await;
        let service = IssuanceService::new(storage.clone());
        let user = free_user(3);

        for i in 0..10 {
            service
                .create(user, plain_request(&format!("https://example.com/{}", i)))
                .await
                .unwrap();
        }

        let err = service
            .create(user, plain_request("https://example.com/extra"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShortgateError::QuotaExceededDaily(_)));

        assert_eq!(storage.count_by_user(3).await.unwrap(), 10);
    }
}

// =============================================================================
// 套餐门禁测试
// =============================================================================

#[cfg(test)]
mod plan_gating_tests {
    use super::*;

    #[tokio::test]
    async fn test_free_plan_cannot_use_custom_code() {
        let (storage, _td) = create_temp_storage().await;
        let service = IssuanceService::new(storage);
        let user = free_user(4);

        let err = service
            .create(
                user,
                IssuanceRequest {
                    target_url: "https://example.com/".to_string(),
                    custom_code: Some("mybrand".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShortgateError::Validation(_)));

        let status = service.quota_status(user).await.unwrap();
        assert_eq!(status.daily_used, 0);
    }

    #[tokio::test]
    async fn test_free_plan_cannot_set_expiry() {
        let (storage, _td) = create_temp_storage().await;
        let service = IssuanceService::new(storage);

        let err = service
            .create(
                free_user(4),
                IssuanceRequest {
                    target_url: "https://example.com/".to_string(),
                    expires_at: Some(Utc::now() + Duration::days(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShortgateError::Validation(_)));
    }

    #[tokio::test]
    async fn test_premium_custom_code_and_expiry() {
        let (storage, _td) = create_temp_storage().await;
        let service = IssuanceService::new(storage.clone());
        let expiry = Utc::now() + Duration::days(30);

        let issued = service
            .create(
                premium_user(5),
                IssuanceRequest {
                    target_url: "https://example.com/sale".to_string(),
                    custom_code: Some("promo2024".to_string()),
                    expires_at: Some(expiry),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(issued.code, "promo2024");
        assert!(issued.link.expires_at.is_some());
        assert!(storage.find_by_code("promo2024").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reserved_custom_code_rejected() {
        let (storage, _td) = create_temp_storage().await;
        let service = IssuanceService::new(storage);
        let user = premium_user(5);

        // 保留字拒绝与是否被占用无关
        let err = service
            .create(
                user,
                IssuanceRequest {
                    target_url: "https://example.com/".to_string(),
                    custom_code: Some("admin".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShortgateError::Validation(_)));

        let status = service.quota_status(user).await.unwrap();
        assert_eq!(status.daily_used, 0);
    }

    #[tokio::test]
    async fn test_past_expiry_rejected() {
        let (storage, _td) = create_temp_storage().await;
        let service = IssuanceService::new(storage);

        let err = service
            .create(
                premium_user(5),
                IssuanceRequest {
                    target_url: "https://example.com/".to_string(),
                    expires_at: Some(Utc::now() - Duration::hours(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShortgateError::Validation(_)));
    }
}

// =============================================================================
// 短码冲突与补偿测试
// =============================================================================

#[cfg(test)]
mod conflict_tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_custom_code_sequential() {
        let (storage, _td) = create_temp_storage().await;
        let service = IssuanceService::new(storage);
        let user = premium_user(6);

        let req = IssuanceRequest {
            target_url: "https://example.com/".to_string(),
            custom_code: Some("takenX1".to_string()),
            ..Default::default()
        };
        service.create(user, req.clone()).await.unwrap();

        let err = service.create(user, req).await.unwrap_err();
        assert!(matches!(err, ShortgateError::CodeTaken(_)));

        // 失败的那次不占配额
        let status = service.quota_status(user).await.unwrap();
        assert_eq!(status.daily_used, 1);
        assert_eq!(status.monthly_used, 1);
    }

    #[tokio::test]
    async fn test_concurrent_same_custom_code_single_winner() {
        let (storage, _td) = create_temp_storage().await;
        let service = Arc::new(IssuanceService::new(storage.clone()));
        let user = premium_user(7);

        let mut handles = vec![];
        for _ in 0..2 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .create(
                        user,
                        IssuanceRequest {
                            target_url: "https://example.com/race".to_string(),
                            custom_code: Some("flash99".to_string()),
                            ..Default::default()
                        },
                    )
                    .await
            }));
        }

        let mut won = 0;
        let mut lost = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(issued) => {
                    assert_eq!(issued.code, "flash99");
                    won += 1;
                }
                Err(ShortgateError::CodeTaken(_)) => lost += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(won, 1);
        assert_eq!(lost, 1);

        // 落败方的预留被补偿释放，只留下赢家的一条
        assert_eq!(storage.count_by_user(7).await.unwrap(), 1);
        let status = service.quota_status(user).await.unwrap();
        assert_eq!(status.daily_used, 1);
        assert_eq!(status.monthly_used, 1);
    }
}

// =============================================================================
// 二维码协作方测试
// =============================================================================

#[cfg(test)]
mod qr_provider_tests {
    use super::*;

    #[tokio::test]
    async fn test_qr_path_stored_when_provider_succeeds() {
        let (storage, _td) = create_temp_storage().await;
        let service = IssuanceService::new(storage).with_qr_provider(Arc::new(FixedQr));

        let issued = service
            .create(free_user(8), plain_request("https://example.com/"))
            .await
            .unwrap();

        assert_eq!(
            issued.link.qr_asset_path.as_deref(),
            Some(format!("qr/{}.svg", issued.code).as_str())
        );
    }

    #[tokio::test]
    async fn test_qr_failure_does_not_block_issuance() {
        let (storage, _td) = create_temp_storage().await;
        let service = IssuanceService::new(storage).with_qr_provider(Arc::new(FailingQr));

        let issued = service
            .create(free_user(9), plain_request("https://example.com/"))
            .await
            .unwrap();

        // 签发成功，路径留空
        assert!(issued.link.qr_asset_path.is_none());
    }

    #[tokio::test]
    async fn test_no_provider_leaves_path_empty() {
        let (storage, _td) = create_temp_storage().await;
        let service = IssuanceService::new(storage);

        let issued = service
            .create(free_user(10), plain_request("https://example.com/"))
            .await
            .unwrap();
        assert!(issued.link.qr_asset_path.is_none());
    }
}
