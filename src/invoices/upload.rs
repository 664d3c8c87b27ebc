//! 批次上传（税务机关申报存根）
//!
//! 真实系统在此调用税务机关 API；目前以固定延迟模拟外部调用。
//! 逐张处理：单张失败计数后继续，不中断整个批次（不自动重试）。

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::time::Duration;

use crate::audit::{AuditAction, AuditService};
use crate::db::models::InvoiceStatus;
use crate::db::repository::InvoiceRepository;
use crate::invoices::Actor;
use crate::utils::AppResult;

/// 模拟外部 API 的单张延迟
const UPLOAD_SIMULATED_DELAY_MS: u64 = 200;

/// 批次上传请求
#[derive(Debug, Deserialize)]
pub struct BatchUploadRequest {
    pub invoice_ids: Vec<String>,
}

/// 单张失败明细
#[derive(Debug, Serialize)]
pub struct UploadFailure {
    pub invoice_id: String,
    pub reason: String,
}

/// 批次上传结果
#[derive(Debug, Serialize)]
pub struct BatchUploadReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<UploadFailure>,
}

/// 批次上传服务
#[derive(Clone)]
pub struct UploadService {
    pool: SqlitePool,
    audit: AuditService,
}

impl UploadService {
    pub fn new(pool: SqlitePool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    /// 逐张上传一批发票
    pub async fn upload_batch(
        &self,
        actor: &Actor,
        invoice_ids: Vec<String>,
    ) -> AppResult<BatchUploadReport> {
        let repo = InvoiceRepository::new(self.pool.clone());
        let total = invoice_ids.len();
        let mut succeeded = 0usize;
        let mut failures = Vec::new();

        for invoice_id in invoice_ids {
            match self.upload_one(&repo, &invoice_id).await {
                Ok(number) => {
                    succeeded += 1;
                    self.audit
                        .log(
                            AuditAction::InvoiceUploaded,
                            "invoice",
                            invoice_id.clone(),
                            Some(actor.id.clone()),
                            Some(actor.name.clone()),
                            serde_json::json!({ "number": number }),
                        )
                        .await;
                }
                Err(reason) => {
                    tracing::warn!(invoice_id = %invoice_id, reason = %reason, "Batch upload item failed");
                    failures.push(UploadFailure { invoice_id, reason });
                }
            }
        }

        let report = BatchUploadReport {
            total,
            succeeded,
            failed: failures.len(),
            failures,
        };

        tracing::info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            operator = %actor.name,
            "Batch upload finished"
        );

        Ok(report)
    }

    /// 上传单张发票，返回发票号码；失败原因以字符串返回
    async fn upload_one(
        &self,
        repo: &InvoiceRepository,
        invoice_id: &str,
    ) -> Result<String, String> {
        let invoice = repo
            .find_by_id(invoice_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("Invoice {} not found", invoice_id))?;

        if invoice.status != InvoiceStatus::Issued {
            return Err(format!("Invoice {} is not issued", invoice.number));
        }
        if invoice.uploaded_at.is_some() {
            return Err(format!("Invoice {} already uploaded", invoice.number));
        }

        // 模拟税务机关 API 往返
        tokio::time::sleep(Duration::from_millis(UPLOAD_SIMULATED_DELAY_MS)).await;

        let affected = repo.mark_uploaded(invoice_id).await.map_err(|e| e.to_string())?;
        if affected == 0 {
            return Err(format!("Invoice {} changed state during upload", invoice.number));
        }

        Ok(invoice.number)
    }
}
