//! 发票 CSV 导出

use crate::db::models::Invoice;

const HEADER: &str =
    "number,period,buyer_name,buyer_tax_id,sales_amount,tax_amount,grand_total,status,issued_at,voided_at";

/// 渲染发票列表为 CSV 文本
pub fn render_csv(invoices: &[Invoice]) -> String {
    let mut out = String::with_capacity(64 * (invoices.len() + 1));
    out.push_str(HEADER);
    out.push('\n');

    for inv in invoices {
        let fields = [
            inv.number.clone(),
            inv.period.clone(),
            escape(&inv.buyer_name),
            inv.buyer_tax_id.clone().unwrap_or_default(),
            inv.sales_amount.to_string(),
            inv.tax_amount.to_string(),
            inv.grand_total.to_string(),
            inv.status.to_string(),
            inv.issued_at.to_string(),
            inv.voided_at.map(|v| v.to_string()).unwrap_or_default(),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

/// CSV 字段转义：含分隔符/引号/换行时加双引号
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::InvoiceStatus;

    fn sample(number: &str, buyer: &str) -> Invoice {
        Invoice {
            id: "inv-1".to_string(),
            number: number.to_string(),
            period: "20250102".to_string(),
            buyer_name: buyer.to_string(),
            buyer_tax_id: Some("12345678".to_string()),
            sales_amount: 1000,
            tax_amount: 50,
            grand_total: 1050,
            status: InvoiceStatus::Issued,
            issued_by: "u1".to_string(),
            issued_at: 1,
            voided_at: None,
            void_reason: None,
            uploaded_at: None,
            created_at: 1,
        }
    }

    #[test]
    fn test_render_basic() {
        let csv = render_csv(&[sample("010210000001", "測試商行")]);
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), HEADER);
        let row = lines.next().unwrap();
        assert!(row.starts_with("010210000001,20250102,測試商行,12345678,1000,50,1050,issued"));
    }

    #[test]
    fn test_escape_comma_and_quote() {
        let csv = render_csv(&[sample("010210000002", "Foo, \"Bar\" Ltd")]);
        assert!(csv.contains("\"Foo, \"\"Bar\"\" Ltd\""));
    }
}
