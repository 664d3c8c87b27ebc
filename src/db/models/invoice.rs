//! 发票模型
//!
//! 状态机：`draft → issued → voided`。
//! 开立即为 `issued`；`voided` 为终态，不可恢复。

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 发票状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// 草稿（保留状态，当前开立流程直接产生 issued）
    Draft,
    /// 已开立
    Issued,
    /// 已作废（终态）
    Voided,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvoiceStatus::Draft => write!(f, "draft"),
            InvoiceStatus::Issued => write!(f, "issued"),
            InvoiceStatus::Voided => write!(f, "voided"),
        }
    }
}

/// 发票（数据库行）
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    /// 发票号码：号段前缀 + 8 位流水号
    pub number: String,
    /// 所属期别标签，如 "20250102"
    pub period: String,
    pub buyer_name: String,
    pub buyer_tax_id: Option<String>,
    /// 销售额（未税）
    pub sales_amount: i64,
    /// 税额
    pub tax_amount: i64,
    /// 总计 = 销售额 + 税额
    pub grand_total: i64,
    pub status: InvoiceStatus,
    pub issued_by: String,
    pub issued_at: i64,
    pub voided_at: Option<i64>,
    pub void_reason: Option<String>,
    /// 上传税务机关的时间（批次上传后设置）
    pub uploaded_at: Option<i64>,
    pub created_at: i64,
}

/// 发票明细行（数据库行）
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: i64,
    pub invoice_id: String,
    pub description: String,
    pub quantity: i64,
    pub unit_price: i64,
    /// quantity * unit_price
    pub amount: i64,
}

/// 发票备注（数据库行）
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InvoiceNote {
    pub id: i64,
    pub invoice_id: String,
    pub note: String,
    pub created_by: String,
    pub created_at: i64,
}

/// 发票 + 明细
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceWithItems {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

/// 开立发票请求
#[derive(Debug, Deserialize)]
pub struct InvoiceCreate {
    /// 期别标签；缺省为当期
    pub period: Option<String>,
    pub buyer_name: String,
    pub buyer_tax_id: Option<String>,
    /// 税额；缺省 0
    #[serde(default)]
    pub tax_amount: i64,
    pub items: Vec<InvoiceItemCreate>,
}

/// 开立发票明细行
#[derive(Debug, Deserialize)]
pub struct InvoiceItemCreate {
    pub description: String,
    pub quantity: i64,
    pub unit_price: i64,
}

impl InvoiceCreate {
    /// 销售额 = Σ quantity × unit_price
    ///
    /// 任一乘积或累加超出 i64 时返回 `None`，由调用方拒绝请求。
    pub fn sales_amount(&self) -> Option<i64> {
        self.items.iter().try_fold(0i64, |acc, i| {
            acc.checked_add(i.quantity.checked_mul(i.unit_price)?)
        })
    }
}
