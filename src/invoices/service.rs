//! 发票台账服务
//!
//! 开立与作废都是单一数据库事务：
//! 号码分配、发票写入、年度累计增减、审计追加要么全部生效，
//! 要么全部回滚。

use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditService};
use crate::db::models::{AnnualStat, Invoice, InvoiceCreate, InvoiceStatus, InvoiceWithItems};
use crate::db::repository::{AnnualStatRepository, InvoiceRepository};
use crate::period;
use crate::utils::time::{now_millis, year_range_millis};
use crate::utils::{AppError, AppResult};

use super::allocator;

/// 年度营收上限（小规模营业人免用统一发票门槛）
pub const ANNUAL_REVENUE_CEILING: i64 = 4_800_000;

/// 接近上限的告警比例
pub const NEAR_LIMIT_RATIO_PERCENT: i64 = 90;

/// 操作人（从认证上下文提取）
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

/// 年度统计报表
///
/// 合计值从发票行重算（权威）；`cached` 为运行累计行，供比对漂移。
#[derive(Debug, serde::Serialize)]
pub struct AnnualStatsReport {
    pub year: i32,
    /// 从发票行重算的已开立总额
    pub total_amount: i64,
    /// 从发票行重算的已开立张数
    pub invoice_count: i64,
    /// 总额是否超过上限的 90%
    pub is_near_limit: bool,
    pub ceiling: i64,
    /// 缓存的运行累计行（可能漂移，仅供观察）
    pub cached: Vec<AnnualStat>,
}

/// 发票台账服务
#[derive(Clone)]
pub struct LedgerService {
    pool: SqlitePool,
    tz: Tz,
}

impl LedgerService {
    pub fn new(pool: SqlitePool, tz: Tz) -> Self {
        Self { pool, tz }
    }

    /// 开立发票
    ///
    /// 单一事务内完成：期别校验 → 号段取得/领号 → 发票与明细写入
    /// → 年度累计 `+grand_total` → 审计追加。任一步失败全部回滚。
    pub async fn create_invoice(
        &self,
        actor: &Actor,
        req: InvoiceCreate,
        today: NaiveDate,
    ) -> AppResult<InvoiceWithItems> {
        validate_create(&req)?;

        let period_label = match &req.period {
            Some(label) => label.clone(),
            None => period::current_period(today).label(),
        };
        let period = period::validate_requested(&period_label, today)?;

        let sales_amount = req
            .sales_amount()
            .ok_or_else(|| AppError::validation("Invoice amount exceeds the supported range"))?;
        let grand_total = sales_amount
            .checked_add(req.tax_amount)
            .ok_or_else(|| AppError::validation("Invoice amount exceeds the supported range"))?;
        let now = now_millis();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let range = allocator::acquire_range(&mut tx, &period).await?;
        let number = allocator::allocate(&mut tx, &range).await?;

        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            number: number.clone(),
            period: period.label(),
            buyer_name: req.buyer_name.clone(),
            buyer_tax_id: req.buyer_tax_id.clone(),
            sales_amount,
            tax_amount: req.tax_amount,
            grand_total,
            status: InvoiceStatus::Issued,
            issued_by: actor.id.clone(),
            issued_at: now,
            voided_at: None,
            void_reason: None,
            uploaded_at: None,
            created_at: now,
        };

        let items: Vec<(String, i64, i64)> = req
            .items
            .iter()
            .map(|i| (i.description.clone(), i.quantity, i.unit_price))
            .collect();

        InvoiceRepository::insert(&mut tx, &invoice, &items).await?;

        AnnualStatRepository::apply_delta(&mut tx, &actor.id, today.year(), grand_total, 1)
            .await?;

        AuditService::log_tx(
            &mut tx,
            AuditAction::InvoiceIssued,
            "invoice",
            &invoice.id,
            Some(&actor.id),
            Some(&actor.name),
            &serde_json::json!({
                "number": number,
                "period": invoice.period,
                "buyer_name": invoice.buyer_name,
                "grand_total": grand_total,
            }),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {e}")))?;

        tracing::info!(
            invoice_id = %invoice.id,
            number = %invoice.number,
            period = %invoice.period,
            grand_total = invoice.grand_total,
            operator = %actor.name,
            "Invoice issued"
        );

        let item_rows = InvoiceRepository::new(self.pool.clone())
            .find_items(&invoice.id)
            .await?;

        Ok(InvoiceWithItems {
            invoice,
            items: item_rows,
        })
    }

    /// 作废发票
    ///
    /// `voided` 为终态：作废已作废的发票失败。
    /// 年度累计在同一事务内减去原始金额。
    pub async fn void_invoice(
        &self,
        actor: &Actor,
        invoice_id: &str,
        reason: &str,
    ) -> AppResult<Invoice> {
        if reason.trim().is_empty() {
            return Err(AppError::validation("Void reason must not be empty"));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let invoice = InvoiceRepository::find_by_id_tx(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice {} not found", invoice_id)))?;

        match invoice.status {
            InvoiceStatus::Voided => {
                return Err(AppError::business_rule(format!(
                    "Invoice {} is already voided",
                    invoice.number
                )));
            }
            InvoiceStatus::Draft => {
                return Err(AppError::business_rule(format!(
                    "Invoice {} has not been issued",
                    invoice.number
                )));
            }
            InvoiceStatus::Issued => {}
        }

        let affected = InvoiceRepository::mark_voided(&mut tx, invoice_id, reason).await?;
        if affected == 0 {
            // 并发作废在条件更新处落败
            return Err(AppError::business_rule(format!(
                "Invoice {} is already voided",
                invoice.number
            )));
        }

        let issue_year = self.year_of_millis(invoice.issued_at);
        AnnualStatRepository::apply_delta(
            &mut tx,
            &invoice.issued_by,
            issue_year,
            -invoice.grand_total,
            -1,
        )
        .await?;

        AuditService::log_tx(
            &mut tx,
            AuditAction::InvoiceVoided,
            "invoice",
            invoice_id,
            Some(&actor.id),
            Some(&actor.name),
            &serde_json::json!({
                "number": invoice.number,
                "reason": reason,
                "grand_total": invoice.grand_total,
            }),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {e}")))?;

        tracing::info!(
            invoice_id = %invoice_id,
            number = %invoice.number,
            reason = %reason,
            operator = %actor.name,
            "Invoice voided"
        );

        InvoiceRepository::new(self.pool.clone())
            .find_by_id(invoice_id)
            .await?
            .ok_or_else(|| AppError::internal("Voided invoice disappeared".to_string()))
    }

    /// 年度统计
    ///
    /// 合计从发票行重算（status = issued、开立时间落在该年度内），
    /// 不读缓存；缓存行一并返回供漂移比对。
    pub async fn annual_stats(
        &self,
        year: i32,
        user_id: Option<&str>,
    ) -> AppResult<AnnualStatsReport> {
        let (from, to) = year_range_millis(year, self.tz);

        let repo = InvoiceRepository::new(self.pool.clone());
        let totals = repo.issued_totals(from, to, user_id).await?;

        let stat_repo = AnnualStatRepository::new(self.pool.clone());
        let cached = match user_id {
            Some(uid) => stat_repo.find(uid, year).await?.into_iter().collect(),
            None => stat_repo.find_by_year(year).await?,
        };

        Ok(AnnualStatsReport {
            year,
            total_amount: totals.total_amount,
            invoice_count: totals.invoice_count,
            is_near_limit: totals.total_amount * 100 > ANNUAL_REVENUE_CEILING * NEAR_LIMIT_RATIO_PERCENT,
            ceiling: ANNUAL_REVENUE_CEILING,
            cached,
        })
    }

    fn year_of_millis(&self, millis: i64) -> i32 {
        use chrono::TimeZone;
        self.tz
            .timestamp_millis_opt(millis)
            .earliest()
            .map(|dt| dt.year())
            .unwrap_or_else(|| chrono::Utc::now().year())
    }
}

fn validate_create(req: &InvoiceCreate) -> AppResult<()> {
    if req.buyer_name.trim().is_empty() {
        return Err(AppError::validation("Buyer name must not be empty"));
    }
    if req.items.is_empty() {
        return Err(AppError::validation("Invoice must have at least one item"));
    }
    for item in &req.items {
        if item.description.trim().is_empty() {
            return Err(AppError::validation("Item description must not be empty"));
        }
        if item.quantity <= 0 {
            return Err(AppError::validation("Item quantity must be positive"));
        }
        if item.unit_price < 0 {
            return Err(AppError::validation("Item unit price must not be negative"));
        }
    }
    if req.tax_amount < 0 {
        return Err(AppError::validation("Tax amount must not be negative"));
    }
    Ok(())
}
