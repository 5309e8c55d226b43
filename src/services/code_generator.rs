//! 短码生成服务
//!
//! 随机短码从 62 字符字母表里抽取，和目标 URL 无任何结构关联，
//! 不可从已有短码推测下一个。唯一性通过存储层检查，碰撞重试有上限。

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::get_config;
use crate::errors::{Result, ShortgateError};
use crate::storage::SeaOrmStorage;
use crate::utils::{generate_random_code, is_valid_code_format};

/// 短码生成器
///
/// 长度、重试上限和保留字在启动时从配置里取一次。
pub struct CodeGenerator {
    storage: Arc<SeaOrmStorage>,
    random_length: usize,
    max_attempts: u32,
    custom_min_length: usize,
    custom_max_length: usize,
    reserved: Vec<String>,
}

impl CodeGenerator {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        let codes = get_config().codes.clone();
        Self {
            storage,
            random_length: codes.random_length,
            max_attempts: codes.max_generate_attempts,
            custom_min_length: codes.custom_min_length,
            custom_max_length: codes.custom_max_length,
            reserved: codes.reserved,
        }
    }

    /// 生成一个未被占用的随机短码
    ///
    /// 碰撞时重新抽取，重试有上限。62^6 空间下连续碰撞几乎不可能，
    /// 真发生说明码长配置该调了，按操作异常报错而不是无限循环。
    pub async fn next(&self) -> Result<String> {
        for attempt in 1..=self.max_attempts {
            let candidate = generate_random_code(self.random_length);
            if self.storage.is_code_unique(&candidate).await? {
                return Ok(candidate);
            }
            debug!(
                "CodeGenerator: collision on '{}' (attempt {}/{})",
                candidate, attempt, self.max_attempts
            );
        }

        error!(
            "CodeGenerator: exhausted {} attempts at length {}",
            self.max_attempts, self.random_length
        );
        Err(ShortgateError::code_space_exhausted(format!(
            "连续 {} 次随机短码碰撞，放弃生成",
            self.max_attempts
        )))
    }

    /// 校验自定义短码，通过则返回净化后的短码
    ///
    /// 依次检查：非空、字符集、长度、保留字、是否已被签发。
    /// 保留字检查在唯一性之前，"admin" 这类短码无论有没有被
    /// 注册过都直接拒绝。
    pub async fn validate_custom(&self, candidate: &str) -> Result<String> {
        let code = candidate.trim();

        if code.is_empty() {
            return Err(ShortgateError::validation("自定义短码不能为空"));
        }

        if !is_valid_code_format(code) {
            return Err(ShortgateError::validation(format!(
                "自定义短码 '{}' 含有非法字符，只允许大小写字母和数字",
                code
            )));
        }

        if code.len() < self.custom_min_length || code.len() > self.custom_max_length {
            return Err(ShortgateError::validation(format!(
                "自定义短码长度必须在 {} 到 {} 之间",
                self.custom_min_length, self.custom_max_length
            )));
        }

        if self.is_reserved(code) {
            return Err(ShortgateError::validation(format!(
                "'{}' 是保留字，不能用作短码",
                code
            )));
        }

        if !self.storage.is_code_unique(code).await? {
            return Err(ShortgateError::code_taken(format!(
                "短码 '{}' 已被占用",
                code
            )));
        }

        Ok(code.to_string())
    }

    fn is_reserved(&self, code: &str) -> bool {
        self.reserved.iter().any(|r| r.eq_ignore_ascii_case(code))
    }
}
