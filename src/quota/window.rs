//! 配额窗口 key 的推导
//!
//! 统一用 UTC 墙钟日期。午夜边界前后落在哪个窗口以落库时刻为准，
//! 跨边界的竞争是已接受的行为，不做特殊处理。

use chrono::{DateTime, Utc};

/// 日窗口 key，形如 "2026-08-25"
pub fn day_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// 月窗口 key，形如 "2026-08"
pub fn month_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_keys() {
        let t = Utc.with_ymd_and_hms(2026, 8, 25, 13, 45, 0).unwrap();
        assert_eq!(day_key(t), "2026-08-25");
        assert_eq!(month_key(t), "2026-08");
    }

    #[test]
    fn test_window_keys_zero_padded() {
        let t = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(day_key(t), "2026-01-05");
        assert_eq!(month_key(t), "2026-01");
    }

    #[test]
    fn test_day_rollover_changes_key() {
        let before = Utc.with_ymd_and_hms(2026, 8, 25, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 8, 26, 0, 0, 0).unwrap();
        assert_ne!(day_key(before), day_key(after));
        // 月内翻日不影响月窗口
        assert_eq!(month_key(before), month_key(after));
    }
}
