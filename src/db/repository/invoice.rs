//! Invoice Repository

use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use super::RepoResult;
use crate::db::models::{Invoice, InvoiceItem, InvoiceNote, InvoiceStatus};
use crate::utils::time::now_millis;

/// 发票列表过滤条件
#[derive(Debug, Default, Clone)]
pub struct InvoiceFilter {
    pub period: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub issued_by: Option<String>,
    /// issued_at 下界（含）
    pub from_millis: Option<i64>,
    /// issued_at 上界（不含）
    pub to_millis: Option<i64>,
    pub limit: i64,
    pub offset: i64,
}

/// 已开立发票的合计（按状态/区间重算的权威值）
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IssuedTotals {
    pub total_amount: i64,
    pub invoice_count: i64,
}

#[derive(Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an invoice row plus its line items inside the caller's transaction
    pub async fn insert(
        tx: &mut Transaction<'_, Sqlite>,
        invoice: &Invoice,
        items: &[(String, i64, i64)],
    ) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, number, period, buyer_name, buyer_tax_id,
                sales_amount, tax_amount, grand_total, status,
                issued_by, issued_at, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.number)
        .bind(&invoice.period)
        .bind(&invoice.buyer_name)
        .bind(&invoice.buyer_tax_id)
        .bind(invoice.sales_amount)
        .bind(invoice.tax_amount)
        .bind(invoice.grand_total)
        .bind(invoice.status)
        .bind(&invoice.issued_by)
        .bind(invoice.issued_at)
        .bind(invoice.created_at)
        .execute(&mut **tx)
        .await?;

        for (description, quantity, unit_price) in items {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (invoice_id, description, quantity, unit_price, amount)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&invoice.id)
            .bind(description)
            .bind(quantity)
            .bind(unit_price)
            .bind(quantity * unit_price)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// Find invoice by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    /// Find invoice by id inside a transaction (作废前的状态读取)
    pub async fn find_by_id_tx(
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
    ) -> RepoResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(invoice)
    }

    /// Line items for an invoice
    pub async fn find_items(&self, invoice_id: &str) -> RepoResult<Vec<InvoiceItem>> {
        let items = sqlx::query_as::<_, InvoiceItem>(
            "SELECT * FROM invoice_items WHERE invoice_id = ?1 ORDER BY id ASC",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// List invoices with optional filters, newest first
    pub async fn list(&self, filter: &InvoiceFilter) -> RepoResult<Vec<Invoice>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM invoices WHERE 1=1");

        if let Some(period) = &filter.period {
            qb.push(" AND period = ").push_bind(period);
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(issued_by) = &filter.issued_by {
            qb.push(" AND issued_by = ").push_bind(issued_by);
        }
        if let Some(from) = filter.from_millis {
            qb.push(" AND issued_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to_millis {
            qb.push(" AND issued_at < ").push_bind(to);
        }

        qb.push(" ORDER BY issued_at DESC LIMIT ")
            .push_bind(if filter.limit > 0 { filter.limit } else { 50 })
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let invoices = qb.build_query_as::<Invoice>().fetch_all(&self.pool).await?;
        Ok(invoices)
    }

    /// Flip an issued invoice to voided inside the caller's transaction
    ///
    /// 条件更新：仅 `issued` 状态的行受影响，返回受影响行数供调用方判断。
    pub async fn mark_voided(
        tx: &mut Transaction<'_, Sqlite>,
        id: &str,
        reason: &str,
    ) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET status = 'voided', voided_at = ?1, void_reason = ?2
            WHERE id = ?3 AND status = 'issued'
            "#,
        )
        .bind(now_millis())
        .bind(reason)
        .bind(id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected())
    }

    /// Stamp the upload time on an issued, not-yet-uploaded invoice
    pub async fn mark_uploaded(&self, id: &str) -> RepoResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET uploaded_at = ?1
            WHERE id = ?2 AND status = 'issued' AND uploaded_at IS NULL
            "#,
        )
        .bind(now_millis())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Recompute issued totals from invoice rows (authoritative, not the cache)
    pub async fn issued_totals(
        &self,
        from_millis: i64,
        to_millis: i64,
        issued_by: Option<&str>,
    ) -> RepoResult<IssuedTotals> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT
                COALESCE(SUM(grand_total), 0) AS total_amount,
                COUNT(*) AS invoice_count
            FROM invoices
            WHERE status = 'issued'
            "#,
        );
        qb.push(" AND issued_at >= ").push_bind(from_millis);
        qb.push(" AND issued_at < ").push_bind(to_millis);
        if let Some(user) = issued_by {
            qb.push(" AND issued_by = ").push_bind(user);
        }

        let totals = qb
            .build_query_as::<IssuedTotals>()
            .fetch_one(&self.pool)
            .await?;
        Ok(totals)
    }

    /// Add a free-text note to an invoice
    pub async fn add_note(
        &self,
        invoice_id: &str,
        note: &str,
        created_by: &str,
    ) -> RepoResult<InvoiceNote> {
        let note = sqlx::query_as::<_, InvoiceNote>(
            r#"
            INSERT INTO invoice_notes (invoice_id, note, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(invoice_id)
        .bind(note)
        .bind(created_by)
        .bind(now_millis())
        .fetch_one(&self.pool)
        .await?;
        Ok(note)
    }

    /// Notes for an invoice, oldest first
    pub async fn find_notes(&self, invoice_id: &str) -> RepoResult<Vec<InvoiceNote>> {
        let notes = sqlx::query_as::<_, InvoiceNote>(
            "SELECT * FROM invoice_notes WHERE invoice_id = ?1 ORDER BY created_at ASC",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }
}
