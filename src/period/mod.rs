//! 发票期别计算
//!
//! 一年分为六个双月期别，期别标签为 `YYYYMMDD`：
//! 前四位是年份，后四位是起讫月份（如 `20250102` = 2025 年 1-2 月）。
//!
//! # 规则
//!
//! - 任一日期落在期别 `ceil(month / 2)` 内
//! - 下一期别在当期日历日 >= 20 号后才开放申请（提前领用下期字轨）
//! - 申请非当期、非（已开放的）下期的期别一律拒绝

use chrono::{Datelike, NaiveDate};

use crate::utils::{AppError, AppResult};

/// 下期开放日：每月 20 号起可申请下一期别
pub const NEXT_PERIOD_OPEN_DAY: u32 = 20;

/// 双月期别（year + 第几期，1..=6）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    pub year: i32,
    /// 期序号，1..=6
    pub index: u32,
}

impl Period {
    /// 期别起始月份 (1, 3, 5, 7, 9, 11)
    pub fn start_month(&self) -> u32 {
        (self.index - 1) * 2 + 1
    }

    /// 期别结束月份 (2, 4, 6, 8, 10, 12)
    pub fn end_month(&self) -> u32 {
        self.index * 2
    }

    /// 期别标签，如 `"20250102"`
    pub fn label(&self) -> String {
        format!(
            "{:04}{:02}{:02}",
            self.year,
            self.start_month(),
            self.end_month()
        )
    }

    /// 号段前缀：期别标签的尾部四位（月份对），如 `"0102"`
    pub fn prefix(&self) -> String {
        format!("{:02}{:02}", self.start_month(), self.end_month())
    }

    /// 下一期别，第 6 期滚动到次年第 1 期
    pub fn next(&self) -> Period {
        if self.index == 6 {
            Period {
                year: self.year + 1,
                index: 1,
            }
        } else {
            Period {
                year: self.year,
                index: self.index + 1,
            }
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 日期所属的当期期别
pub fn current_period(date: NaiveDate) -> Period {
    Period {
        year: date.year(),
        index: date.month().div_ceil(2),
    }
}

/// 日期对应的下一期别
pub fn next_period(date: NaiveDate) -> Period {
    current_period(date).next()
}

/// 解析期别标签
///
/// 标签必须是合法的双月期别（起始月为奇数，结束月 = 起始月 + 1）。
pub fn parse_label(label: &str) -> AppResult<Period> {
    let invalid = || AppError::validation(format!("Invalid period label: {}", label));

    if label.len() != 8 || !label.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let year: i32 = label[..4].parse().map_err(|_| invalid())?;
    let start_month: u32 = label[4..6].parse().map_err(|_| invalid())?;
    let end_month: u32 = label[6..8].parse().map_err(|_| invalid())?;

    if start_month % 2 != 1 || start_month > 11 || end_month != start_month + 1 {
        return Err(invalid());
    }

    Ok(Period {
        year,
        index: start_month.div_ceil(2),
    })
}

/// 校验申请的期别是否可用
///
/// - 当期：总是允许
/// - 下期：仅当日历日 >= [`NEXT_PERIOD_OPEN_DAY`] 时允许
/// - 其余期别：拒绝
pub fn validate_requested(label: &str, today: NaiveDate) -> AppResult<Period> {
    let requested = parse_label(label)?;
    let current = current_period(today);

    if requested == current {
        return Ok(requested);
    }

    if requested == current.next() {
        if today.day() >= NEXT_PERIOD_OPEN_DAY {
            return Ok(requested);
        }
        return Err(AppError::business_rule(format!(
            "Period {} not yet open (opens on day {} of the current period)",
            label, NEXT_PERIOD_OPEN_DAY
        )));
    }

    Err(AppError::business_rule(format!(
        "Period {} is not requestable (current: {}, next: {})",
        label,
        current.label(),
        current.next().label()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_six_period_table() {
        // 显式六期别表：每个月份映射到正确的期别标签
        let expected = [
            (1, "20250102"),
            (2, "20250102"),
            (3, "20250304"),
            (4, "20250304"),
            (5, "20250506"),
            (6, "20250506"),
            (7, "20250708"),
            (8, "20250708"),
            (9, "20250910"),
            (10, "20250910"),
            (11, "20251112"),
            (12, "20251112"),
        ];
        for (month, label) in expected {
            assert_eq!(current_period(date(2025, month, 15)).label(), label);
        }
    }

    #[test]
    fn test_example_from_jan_15() {
        assert_eq!(current_period(date(2025, 1, 15)).label(), "20250102");
        assert_eq!(next_period(date(2025, 1, 15)).label(), "20250304");
    }

    #[test]
    fn test_year_wrap() {
        assert_eq!(next_period(date(2025, 12, 31)).label(), "20260102");
        assert_eq!(next_period(date(2025, 11, 1)).label(), "20260102");
    }

    #[test]
    fn test_prefix_is_trailing_digits() {
        assert_eq!(current_period(date(2025, 1, 15)).prefix(), "0102");
        assert_eq!(current_period(date(2025, 12, 1)).prefix(), "1112");
    }

    #[test]
    fn test_parse_label() {
        assert_eq!(parse_label("20250102").unwrap(), Period { year: 2025, index: 1 });
        assert_eq!(parse_label("20251112").unwrap(), Period { year: 2025, index: 6 });
        // 起始月必须为奇数，结束月必须紧随其后
        assert!(parse_label("20250203").is_err());
        assert!(parse_label("20250104").is_err());
        assert!(parse_label("2025010").is_err());
        assert!(parse_label("2025abcd").is_err());
    }

    #[test]
    fn test_current_period_always_requestable() {
        assert!(validate_requested("20250102", date(2025, 1, 5)).is_ok());
        assert!(validate_requested("20250102", date(2025, 2, 28)).is_ok());
    }

    #[test]
    fn test_next_period_gated_on_day_20() {
        // 20 号前申请下期失败
        assert!(validate_requested("20250304", date(2025, 1, 15)).is_err());
        assert!(validate_requested("20250304", date(2025, 2, 19)).is_err());
        // 20 号当天及以后成功
        assert!(validate_requested("20250304", date(2025, 2, 20)).is_ok());
        assert!(validate_requested("20250304", date(2025, 2, 25)).is_ok());
    }

    #[test]
    fn test_other_periods_rejected() {
        // 跳过一期
        assert!(validate_requested("20250506", date(2025, 1, 25)).is_err());
        // 上一期
        assert!(validate_requested("20250102", date(2025, 3, 25)).is_err());
        // 去年同期
        assert!(validate_requested("20240102", date(2025, 1, 15)).is_err());
    }

    #[test]
    fn test_year_wrap_gating() {
        // 12 月 20 号后可申请次年第一期
        assert!(validate_requested("20260102", date(2025, 12, 20)).is_ok());
        assert!(validate_requested("20260102", date(2025, 12, 19)).is_err());
    }
}
