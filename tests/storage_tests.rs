//! 存储层测试
//!
//! 用临时 SQLite 库覆盖链接 CRUD、过滤查询和短码登记的不复用语义。

use std::sync::Once;

use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

use shortgate::config::init_config;
use shortgate::errors::ShortgateError;
use shortgate::storage::backend::{infer_backend_from_url, normalize_backend_name};
use shortgate::storage::{LinkFilter, NewLink, SeaOrmStorage, UpdateLink};

// 确保 config 只初始化一次
static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

/// 创建临时 SQLite 数据库的存储实例
async fn create_temp_storage() -> (SeaOrmStorage, TempDir) {
    init_test_config();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite")
        .await
        .expect("Failed to create storage");

    (storage, temp_dir)
}

/// 整秒时间戳，SQLite 往返不丢精度
fn whole_second_now() -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(Utc::now().timestamp(), 0).unwrap()
}

fn make_link(user_id: i64, code: &str) -> NewLink {
    NewLink {
        user_id,
        code: code.to_string(),
        target: format!("https://{}.example.com/", code.to_lowercase()),
        label: None,
        created_at: whole_second_now(),
        expires_at: None,
        qr_asset_path: None,
    }
}

// =============================================================================
// URL 推断测试
// =============================================================================

#[cfg(test)]
mod url_inference_tests {
    use super::*;

    #[test]
    fn test_infer_sqlite_variants() {
        for url in [
            "sqlite://links.db?mode=rwc",
            "links.db",
            "/var/data/links.sqlite",
            ":memory:",
        ] {
            assert_eq!(infer_backend_from_url(url).unwrap(), "sqlite", "{}", url);
        }
    }

    #[test]
    fn test_infer_server_backends() {
        assert_eq!(
            infer_backend_from_url("mysql://root@db:3306/links").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("mariadb://root@db:3306/links").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgres://app@db/links").unwrap(),
            "postgres"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://app@db/links").unwrap(),
            "postgres"
        );
    }

    #[test]
    fn test_infer_unknown_scheme_fails() {
        assert!(infer_backend_from_url("redis://localhost").is_err());
        assert!(infer_backend_from_url("").is_err());
    }

    #[test]
    fn test_normalize_backend_name() {
        assert_eq!(normalize_backend_name("mariadb"), "mysql");
        assert_eq!(normalize_backend_name("sqlite"), "sqlite");
        assert_eq!(normalize_backend_name("postgres"), "postgres");
    }
}

// =============================================================================
// 链接 CRUD 测试
// =============================================================================

#[cfg(test)]
mod link_crud_tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_find_by_code_round_trip() {
        let (storage, _td) = create_temp_storage().await;

        let new_link = NewLink {
            user_id: 1,
            code: "Abc123".to_string(),
            target: "https://example.com/landing".to_string(),
            label: Some("营销页".to_string()),
            created_at: whole_second_now(),
            expires_at: Some(whole_second_now() + Duration::days(30)),
            qr_asset_path: Some("qr/Abc123.png".to_string()),
        };
        let created = storage.insert(&new_link).await.unwrap();

        assert!(created.id > 0);
        assert!(created.is_active);
        assert_eq!(created.code, new_link.code);

        let found = storage.find_by_code("Abc123").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.user_id, 1);
        assert_eq!(found.target, "https://example.com/landing");
        assert_eq!(found.label.as_deref(), Some("营销页"));
        assert_eq!(found.expires_at, new_link.expires_at);
        assert_eq!(found.qr_asset_path.as_deref(), Some("qr/Abc123.png"));
        assert_eq!(found.created_at, new_link.created_at);
    }

    #[tokio::test]
    async fn test_find_by_code_missing_returns_none() {
        let (storage, _td) = create_temp_storage().await;
        assert!(storage.find_by_code("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_id_and_link_exists() {
        let (storage, _td) = create_temp_storage().await;
        let created = storage.insert(&make_link(1, "byid01")).await.unwrap();

        let found = storage.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.code, "byid01");

        assert!(storage.link_exists(created.id).await.unwrap());
        assert!(!storage.link_exists(created.id + 999).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let (storage, _td) = create_temp_storage().await;
        storage.insert(&make_link(1, "dup001")).await.unwrap();

        // 不同用户也不行，短码全局唯一
        let err = storage.insert(&make_link(2, "dup001")).await.unwrap_err();
        assert!(matches!(err, ShortgateError::CodeTaken(_)));
    }

    #[tokio::test]
    async fn test_update_applies_whitelisted_fields() {
        let (storage, _td) = create_temp_storage().await;
        let created = storage.insert(&make_link(1, "upd001")).await.unwrap();

        let expiry = whole_second_now() + Duration::days(7);
        let update = UpdateLink {
            target: Some("https://new.example.com/".to_string()),
            label: Some(Some("更新后".to_string())),
            expires_at: Some(Some(expiry)),
            is_active: Some(false),
            qr_asset_path: None,
        };
        let updated = storage.update(created.id, &update).await.unwrap();

        assert_eq!(updated.target, "https://new.example.com/");
        assert_eq!(updated.label.as_deref(), Some("更新后"));
        assert_eq!(updated.expires_at, Some(expiry));
        assert!(!updated.is_active);
        // 不可变字段保持原样
        assert_eq!(updated.code, created.code);
        assert_eq!(updated.user_id, created.user_id);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_partial_update_leaves_other_fields() {
        let (storage, _td) = create_temp_storage().await;
        let mut link = make_link(1, "upd002");
        link.label = Some("原标签".to_string());
        let created = storage.insert(&link).await.unwrap();

        let update = UpdateLink {
            target: Some("https://only-target.example.com/".to_string()),
            ..Default::default()
        };
        let updated = storage.update(created.id, &update).await.unwrap();

        assert_eq!(updated.target, "https://only-target.example.com/");
        assert_eq!(updated.label.as_deref(), Some("原标签"));
        assert!(updated.is_active);
    }

    #[tokio::test]
    async fn test_update_can_clear_nullable_fields() {
        let (storage, _td) = create_temp_storage().await;
        let mut link = make_link(1, "upd003");
        link.label = Some("待清空".to_string());
        link.expires_at = Some(whole_second_now() + Duration::days(1));
        let created = storage.insert(&link).await.unwrap();

        let update = UpdateLink {
            label: Some(None),
            expires_at: Some(None),
            ..Default::default()
        };
        let updated = storage.update(created.id, &update).await.unwrap();

        assert!(updated.label.is_none());
        assert!(updated.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_empty_update_returns_current_row() {
        let (storage, _td) = create_temp_storage().await;
        let created = storage.insert(&make_link(1, "upd004")).await.unwrap();

        let updated = storage.update(created.id, &UpdateLink::default()).await.unwrap();
        assert_eq!(updated, created);
    }

    #[tokio::test]
    async fn test_update_missing_link_is_not_found() {
        let (storage, _td) = create_temp_storage().await;
        let update = UpdateLink {
            target: Some("https://example.com/".to_string()),
            ..Default::default()
        };
        let err = storage.update(12345, &update).await.unwrap_err();
        assert!(matches!(err, ShortgateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_set_active_toggles_flag() {
        let (storage, _td) = create_temp_storage().await;
        let created = storage.insert(&make_link(1, "tog001")).await.unwrap();

        storage.set_active(created.id, false).await.unwrap();
        let link = storage.find_by_id(created.id).await.unwrap().unwrap();
        assert!(!link.is_active);

        storage.set_active(created.id, true).await.unwrap();
        let link = storage.find_by_id(created.id).await.unwrap().unwrap();
        assert!(link.is_active);

        let err = storage.set_active(99999, true).await.unwrap_err();
        assert!(matches!(err, ShortgateError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let (storage, _td) = create_temp_storage().await;
        let created = storage.insert(&make_link(1, "del001")).await.unwrap();

        storage.delete(created.id).await.unwrap();
        assert!(storage.find_by_id(created.id).await.unwrap().is_none());
        assert!(storage.find_by_code("del001").await.unwrap().is_none());

        let err = storage.delete(created.id).await.unwrap_err();
        assert!(matches!(err, ShortgateError::NotFound(_)));
    }
}

// =============================================================================
// 短码登记测试（签发后永不复用）
// =============================================================================

#[cfg(test)]
mod code_registry_tests {
    use super::*;

    #[tokio::test]
    async fn test_is_code_unique_tracks_issuance() {
        let (storage, _td) = create_temp_storage().await;

        assert!(storage.is_code_unique("fresh1").await.unwrap());
        storage.insert(&make_link(1, "fresh1")).await.unwrap();
        assert!(!storage.is_code_unique("fresh1").await.unwrap());
    }

    #[tokio::test]
    async fn test_deleted_code_is_never_recycled() {
        let (storage, _td) = create_temp_storage().await;
        let created = storage.insert(&make_link(1, "gone01")).await.unwrap();

        storage.delete(created.id).await.unwrap();
        assert!(storage.find_by_code("gone01").await.unwrap().is_none());

        // 登记保留，旧码不能被重新签发指向新内容
        assert!(!storage.is_code_unique("gone01").await.unwrap());
        let err = storage.insert(&make_link(2, "gone01")).await.unwrap_err();
        assert!(matches!(err, ShortgateError::CodeTaken(_)));
    }
}

// =============================================================================
// 查询与过滤测试
// =============================================================================

#[cfg(test)]
mod query_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_by_user_pages_newest_first() {
        let (storage, _td) = create_temp_storage().await;

        let base = whole_second_now() - Duration::minutes(10);
        for i in 0..5 {
            let mut link = make_link(1, &format!("page{:02}", i));
            link.created_at = base + Duration::minutes(i);
            storage.insert(&link).await.unwrap();
        }
        // 其他用户的行不掺进来
        storage.insert(&make_link(2, "other1")).await.unwrap();

        let (page1, total) = storage
            .list_by_user(1, 1, 2, LinkFilter::default())
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page1.len(), 2);
        assert_eq!(page1[0].code, "page04");
        assert_eq!(page1[1].code, "page03");

        let (page3, _) = storage
            .list_by_user(1, 3, 2, LinkFilter::default())
            .await
            .unwrap();
        assert_eq!(page3.len(), 1);
        assert_eq!(page3[0].code, "page00");
    }

    #[tokio::test]
    async fn test_search_matches_target_and_label() {
        let (storage, _td) = create_temp_storage().await;

        let mut by_target = make_link(1, "srch01");
        by_target.target = "https://docs.example.com/rust-guide".to_string();
        storage.insert(&by_target).await.unwrap();

        let mut by_label = make_link(1, "srch02");
        by_label.label = Some("rust 学习资料".to_string());
        storage.insert(&by_label).await.unwrap();

        storage.insert(&make_link(1, "srch03")).await.unwrap();

        let filter = LinkFilter {
            search: Some("rust".to_string()),
            ..Default::default()
        };
        let (hits, total) = storage.list_by_user(1, 1, 10, filter).await.unwrap();
        assert_eq!(total, 2);
        let codes: Vec<&str> = hits.iter().map(|l| l.code.as_str()).collect();
        assert!(codes.contains(&"srch01"));
        assert!(codes.contains(&"srch02"));
    }

    #[tokio::test]
    async fn test_count_reflects_inserts_and_deletes() {
        let (storage, _td) = create_temp_storage().await;

        assert_eq!(storage.count_by_user(1).await.unwrap(), 0);
        let a = storage.insert(&make_link(1, "cnt001")).await.unwrap();
        storage.insert(&make_link(1, "cnt002")).await.unwrap();
        // 写操作使 COUNT 缓存失效，立刻能看到新值
        assert_eq!(storage.count_by_user(1).await.unwrap(), 2);

        storage.delete(a.id).await.unwrap();
        assert_eq!(storage.count_by_user(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_active_and_expired_partition_links() {
        let (storage, _td) = create_temp_storage().await;
        let now = whole_second_now();

        // 无过期、未来过期、已过期，全部 active
        storage.insert(&make_link(1, "pNull1")).await.unwrap();
        let mut future = make_link(1, "pFut01");
        future.expires_at = Some(now + Duration::days(1));
        storage.insert(&future).await.unwrap();
        let mut past = make_link(1, "pPast1");
        past.expires_at = Some(now - Duration::days(1));
        storage.insert(&past).await.unwrap();

        let active_filter = LinkFilter {
            only_active: true,
            ..Default::default()
        };
        let expired_filter = LinkFilter {
            only_expired: true,
            ..Default::default()
        };
        let active = storage.load_filtered(1, active_filter).await.unwrap();
        let expired = storage.load_filtered(1, expired_filter).await.unwrap();

        let active_codes: Vec<&str> = active.iter().map(|l| l.code.as_str()).collect();
        let expired_codes: Vec<&str> = expired.iter().map(|l| l.code.as_str()).collect();

        // 不重不漏
        assert_eq!(active_codes.len() + expired_codes.len(), 3);
        assert!(active_codes.contains(&"pNull1"));
        assert!(active_codes.contains(&"pFut01"));
        assert!(expired_codes.contains(&"pPast1"));
        assert!(!expired_codes.contains(&"pNull1"));
    }

    #[tokio::test]
    async fn test_deactivated_link_is_not_active_nor_expired() {
        let (storage, _td) = create_temp_storage().await;
        let created = storage.insert(&make_link(1, "off001")).await.unwrap();
        storage.set_active(created.id, false).await.unwrap();

        let active = storage
            .load_filtered(
                1,
                LinkFilter {
                    only_active: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let expired = storage
            .load_filtered(
                1,
                LinkFilter {
                    only_expired: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // 停用不等于过期，过期只看 expires_at
        assert!(active.is_empty());
        assert!(expired.is_empty());
    }

    #[tokio::test]
    async fn test_get_stats_counts_active_and_expired() {
        let (storage, _td) = create_temp_storage().await;
        let now = whole_second_now();

        storage.insert(&make_link(1, "stat01")).await.unwrap();
        let mut past = make_link(1, "stat02");
        past.expires_at = Some(now - Duration::hours(1));
        storage.insert(&past).await.unwrap();
        let off = storage.insert(&make_link(1, "stat03")).await.unwrap();
        storage.set_active(off.id, false).await.unwrap();

        let stats = storage.get_stats(1).await.unwrap();
        assert_eq!(stats.total_links, 3);
        assert_eq!(stats.active_links, 1);
        assert_eq!(stats.expired_links, 1);
    }
}
