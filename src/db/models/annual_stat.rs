//! 年度累计模型

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 每人每年的累计营收与张数（数据库行）
///
/// 随开立 `+grand_total`、作废 `-grand_total` 同事务维护的派生值，
/// 权威数据以 invoices 表重算为准。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnnualStat {
    pub user_id: String,
    pub year: i64,
    pub total_amount: i64,
    pub invoice_count: i64,
    pub updated_at: i64,
}
