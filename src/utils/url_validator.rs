//! 目标 URL 校验与规范化
//!
//! 短链只接受 http/https 目标，拒绝可被用来注入脚本或读取本地
//! 文件的协议，并把通过校验的 URL 规范化后入库。

use url::Url;

/// 危险协议前缀，无条件拒绝
const DANGEROUS_PROTOCOLS: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
];

/// URL 校验错误
#[derive(Debug)]
pub enum UrlValidationError {
    EmptyUrl,
    InvalidProtocol(String),
    DangerousProtocol(String),
    InvalidFormat(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "目标 URL 不能为空"),
            Self::InvalidProtocol(proto) => {
                write!(f, "不支持的协议 {}，只允许 http:// 和 https://", proto)
            }
            Self::DangerousProtocol(proto) => write!(f, "危险协议已拦截: {}", proto),
            Self::InvalidFormat(msg) => write!(f, "URL 格式无效: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// 校验目标 URL 并返回规范化后的形式
///
/// 依次检查非空、危险协议、http(s) 协议、可解析性。
/// 规范化由 `url::Url` 完成：scheme/host 转小写、默认端口折叠、
/// 空路径补全为 "/"。
pub fn validate_and_normalize(url: &str) -> Result<String, UrlValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    let lower = url.to_lowercase();
    if let Some(proto) = DANGEROUS_PROTOCOLS.iter().find(|p| lower.starts_with(**p)) {
        return Err(UrlValidationError::DangerousProtocol((*proto).to_string()));
    }

    let scheme_ok = matches!(lower.split_once("://").map(|(s, _)| s), Some("http" | "https"));
    if !scheme_ok {
        let proto = lower
            .split(':')
            .next()
            .map(|s| format!("{}:", s))
            .unwrap_or_default();
        return Err(UrlValidationError::InvalidProtocol(proto));
    }

    let parsed = Url::parse(url).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;
    Ok(parsed.to_string())
}
