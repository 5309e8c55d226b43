//! User-Agent 设备粗分类
//!
//! 只分 desktop / mobile / bot 三类，拿不准就不分
//! （返回 None 的事件不进设备分组，不造 unknown 桶）。

use woothee::parser::Parser;

/// 从 UA 字符串推断设备类别
pub fn classify_device(ua_string: &str) -> Option<&'static str> {
    if ua_string.trim().is_empty() {
        return None;
    }

    let parser = Parser::new();
    let result = parser.parse(ua_string).unwrap_or_default();

    match result.category {
        "pc" => Some("desktop"),
        "smartphone" | "mobilephone" | "pda" => Some("mobile"),
        "crawler" => Some("bot"),
        // appliance / misc / UNKNOWN 等不强行归类
        _ => None,
    }
}
