//! Annual Stat Repository

use sqlx::{Sqlite, SqlitePool, Transaction};

use super::RepoResult;
use crate::db::models::AnnualStat;
use crate::utils::time::now_millis;

#[derive(Clone)]
pub struct AnnualStatRepository {
    pool: SqlitePool,
}

impl AnnualStatRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply a delta inside the caller's transaction
    ///
    /// 开立时 `+grand_total / +1`，作废时 `-grand_total / -1`。
    /// 行不存在时创建（upsert）。
    pub async fn apply_delta(
        tx: &mut Transaction<'_, Sqlite>,
        user_id: &str,
        year: i32,
        amount_delta: i64,
        count_delta: i64,
    ) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO annual_stats (user_id, year, total_amount, invoice_count, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (user_id, year) DO UPDATE SET
                total_amount = total_amount + excluded.total_amount,
                invoice_count = invoice_count + excluded.invoice_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(year)
        .bind(amount_delta)
        .bind(count_delta)
        .bind(now_millis())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Find the cached row for one user/year
    pub async fn find(&self, user_id: &str, year: i32) -> RepoResult<Option<AnnualStat>> {
        let stat = sqlx::query_as::<_, AnnualStat>(
            "SELECT * FROM annual_stats WHERE user_id = ?1 AND year = ?2",
        )
        .bind(user_id)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;
        Ok(stat)
    }

    /// List cached rows for a year
    pub async fn find_by_year(&self, year: i32) -> RepoResult<Vec<AnnualStat>> {
        let stats = sqlx::query_as::<_, AnnualStat>(
            "SELECT * FROM annual_stats WHERE year = ?1 ORDER BY user_id ASC",
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?;
        Ok(stats)
    }
}
