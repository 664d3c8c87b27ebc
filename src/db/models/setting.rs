//! 系统设置模型

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 键值对系统设置（数据库行）
///
/// 存放卖方抬头、统编等开票用资料。
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SystemSetting {
    pub key: String,
    pub value: String,
    pub updated_at: i64,
}
