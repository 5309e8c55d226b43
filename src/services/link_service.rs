//! 链接管理服务
//!
//! 面向调用方的链接 CRUD 入口。读写都委托给存储层，
//! 这里只做 URL 重校验和分页参数收敛。

use std::sync::Arc;

use crate::errors::{Result, ShortgateError};
use crate::storage::{LinkFilter, LinkStats, NewLink, SeaOrmStorage, ShortLink, UpdateLink};
use crate::utils::url_validator::validate_and_normalize;

/// 每页条数上限
const MAX_PAGE_SIZE: u64 = 100;

/// 链接读写服务
pub struct LinkService {
    storage: Arc<SeaOrmStorage>,
}

impl LinkService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    // ============ 写路径 ============

    /// 持久化一条新链接
    ///
    /// 调用方负责保证 code 已通过唯一性检查；
    /// 并发抢注由存储层唯一约束兜底，冲突报 CodeTaken。
    pub async fn create_link(&self, link: &NewLink) -> Result<ShortLink> {
        self.storage.insert(link).await
    }

    /// 更新链接的可变字段
    ///
    /// 可变白名单：目标 URL、标签、过期时间、激活标志、二维码路径。
    /// 短码、归属用户和创建时间不在白名单里，转换层直接不落字段。
    /// 目标 URL 变更时重新校验并规范化。
    pub async fn update_link(&self, id: i64, mut update: UpdateLink) -> Result<ShortLink> {
        if let Some(target) = update.target.as_deref() {
            let normalized = validate_and_normalize(target)
                .map_err(|e| ShortgateError::validation(e.to_string()))?;
            update.target = Some(normalized);
        }
        self.storage.update(id, &update).await
    }

    /// 激活链接
    pub async fn activate(&self, id: i64) -> Result<()> {
        self.storage.set_active(id, true).await
    }

    /// 停用链接（短码保留，解析方不应再跳转）
    pub async fn deactivate(&self, id: i64) -> Result<()> {
        self.storage.set_active(id, false).await
    }

    /// 硬删除链接
    ///
    /// 短码不回收：签发登记保留，删掉的码不能再注册。
    pub async fn delete_link(&self, id: i64) -> Result<()> {
        self.storage.delete(id).await
    }

    // ============ 读路径 ============

    /// 按短码查询，跳转热路径
    pub async fn get_by_code(&self, code: &str) -> Result<Option<ShortLink>> {
        self.storage.find_by_code(code).await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ShortLink>> {
        self.storage.find_by_id(id).await
    }

    /// 分页列出用户的链接，创建时间倒序
    ///
    /// page 从 1 开始。返回 (当前页数据, 总数)。
    pub async fn list_links(
        &self,
        user_id: i64,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<ShortLink>, u64)> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self.storage
            .list_by_user(user_id, page, page_size, LinkFilter::default())
            .await
    }

    /// 按关键字搜索用户的链接（目标 URL 和标签上的子串匹配）
    pub async fn search_links(
        &self,
        user_id: i64,
        query: &str,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<ShortLink>, u64)> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let filter = LinkFilter {
            search: Some(query.to_string()),
            ..Default::default()
        };
        self.storage
            .list_by_user(user_id, page, page_size, filter)
            .await
    }

    /// 用户的链接总数
    pub async fn count_links(&self, user_id: i64) -> Result<u64> {
        self.storage.count_by_user(user_id).await
    }

    /// 用户当前可解析的链接：激活且未过期
    pub async fn get_active(&self, user_id: i64) -> Result<Vec<ShortLink>> {
        let filter = LinkFilter {
            only_active: true,
            ..Default::default()
        };
        self.storage.load_filtered(user_id, filter).await
    }

    /// 用户已过期的链接
    ///
    /// 过期是查询时由 expires_at 推导出来的，只看设置了过期时间的行。
    pub async fn get_expired(&self, user_id: i64) -> Result<Vec<ShortLink>> {
        let filter = LinkFilter {
            only_expired: true,
            ..Default::default()
        };
        self.storage.load_filtered(user_id, filter).await
    }

    /// 用户的链接统计（总数、激活数、过期数）
    pub async fn get_stats(&self, user_id: i64) -> Result<LinkStats> {
        self.storage.get_stats(user_id).await
    }
}
