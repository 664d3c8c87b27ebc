//! 发票号段模型

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 发票号段（数据库行）
///
/// 不变量：`range_start <= cursor <= range_end + 1`。
/// `cursor > range_end` 表示号段耗尽。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NumberRange {
    pub id: i64,
    /// 所属期别标签
    pub period: String,
    /// 号码前缀（期别尾部四位）
    pub prefix: String,
    pub range_start: i64,
    pub range_end: i64,
    /// 下一个待分配号码
    pub cursor: i64,
    pub is_active: bool,
    pub created_at: i64,
}

impl NumberRange {
    /// 剩余可分配数量
    pub fn remaining(&self) -> i64 {
        (self.range_end - self.cursor + 1).max(0)
    }

    /// 是否已耗尽
    pub fn is_exhausted(&self) -> bool {
        self.cursor > self.range_end
    }
}
