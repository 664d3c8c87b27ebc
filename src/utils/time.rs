//! 时间工具函数 — 业务时区转换
//!
//! 所有日期→时间戳转换统一在 API handler / service 层完成，
//! repository 层只接收 `i64` Unix millis。

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// 当前 Unix 毫秒时间戳
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 业务时区的今天
pub fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {}", date)))
}

/// 日期开始 (00:00:00) → Unix millis (业务时区)
///
/// DST gap fallback: 如果本地时间不存在，fallback 到 UTC。
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    let naive = date.and_hms_opt(0, 0, 0).unwrap();
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 年度区间 → [start, end) Unix millis (业务时区)
pub fn year_range_millis(year: i32, tz: Tz) -> (i64, i64) {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap();
    (day_start_millis(start, tz), day_start_millis(end, tz))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2025-01-15").is_ok());
        assert!(parse_date("2025/01/15").is_err());
        assert!(parse_date("not-a-date").is_err());
    }

    #[test]
    fn test_year_range_is_contiguous() {
        let tz: Tz = "Asia/Taipei".parse().unwrap();
        let (_, end_2024) = year_range_millis(2024, tz);
        let (start_2025, _) = year_range_millis(2025, tz);
        assert_eq!(end_2024, start_2025);
    }
}
