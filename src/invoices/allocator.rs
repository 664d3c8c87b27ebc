//! 发票号段分配
//!
//! 取得期别的启用号段并从中领取下一个号码。
//! 两个操作都必须在开立发票的事务内执行：
//! 事务失败时游标递增随之回滚，不会浪费号码。

use sqlx::{Sqlite, Transaction};

use crate::db::models::NumberRange;
use crate::db::repository::NumberRangeRepository;
use crate::period::Period;
use crate::utils::{AppError, AppResult};

/// 每期固定配号区块
pub const RANGE_BLOCK_START: i64 = 10_000_001;
pub const RANGE_BLOCK_END: i64 = 10_000_500;

/// 流水号位数（零填充）
pub const SERIAL_WIDTH: usize = 8;

/// 取得期别的启用号段，不存在时配发新号段
pub async fn acquire_range(
    tx: &mut Transaction<'_, Sqlite>,
    period: &Period,
) -> AppResult<NumberRange> {
    let label = period.label();

    if let Some(range) = NumberRangeRepository::find_active(tx, &label).await? {
        return Ok(range);
    }

    let range = NumberRangeRepository::provision(
        tx,
        &label,
        &period.prefix(),
        RANGE_BLOCK_START,
        RANGE_BLOCK_END,
    )
    .await?;

    tracing::info!(
        period = %label,
        range_start = range.range_start,
        range_end = range.range_end,
        "Provisioned invoice number range"
    );

    Ok(range)
}

/// 从号段领取下一个发票号码
///
/// 号段耗尽时失败；成功时返回 `前缀 + 8 位零填充流水号`。
pub async fn allocate(
    tx: &mut Transaction<'_, Sqlite>,
    range: &NumberRange,
) -> AppResult<String> {
    let serial = NumberRangeRepository::allocate_next(tx, range.id)
        .await?
        .ok_or_else(|| {
            AppError::business_rule(format!(
                "Number range for period {} is exhausted",
                range.period
            ))
        })?;

    debug_assert!(serial >= range.range_start && serial <= range.range_end);

    Ok(format_number(&range.prefix, serial))
}

/// 组装发票号码
pub fn format_number(prefix: &str, serial: i64) -> String {
    format!("{prefix}{serial:0width$}", width = SERIAL_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number("0102", 10_000_001), "010210000001");
        assert_eq!(format_number("1112", 10_000_500), "111210000500");
    }

    #[test]
    fn test_block_holds_500_numbers() {
        assert_eq!(RANGE_BLOCK_END - RANGE_BLOCK_START + 1, 500);
    }
}
