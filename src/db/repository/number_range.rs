//! Number Range Repository
//!
//! 号段行的读写。所有函数都在调用方事务内执行 —
//! 号段操作永远是开立发票事务的一部分。

use sqlx::{Sqlite, Transaction};

use super::RepoResult;
use crate::db::models::NumberRange;
use crate::utils::time::now_millis;

#[derive(Clone)]
pub struct NumberRangeRepository;

impl NumberRangeRepository {
    /// Find the active range for a period
    pub async fn find_active(
        tx: &mut Transaction<'_, Sqlite>,
        period: &str,
    ) -> RepoResult<Option<NumberRange>> {
        let range = sqlx::query_as::<_, NumberRange>(
            "SELECT * FROM invoice_numbers WHERE period = ?1 AND is_active = 1 LIMIT 1",
        )
        .bind(period)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(range)
    }

    /// Provision a new active range for a period
    pub async fn provision(
        tx: &mut Transaction<'_, Sqlite>,
        period: &str,
        prefix: &str,
        range_start: i64,
        range_end: i64,
    ) -> RepoResult<NumberRange> {
        let range = sqlx::query_as::<_, NumberRange>(
            r#"
            INSERT INTO invoice_numbers (period, prefix, range_start, range_end, cursor, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?3, 1, ?5)
            RETURNING *
            "#,
        )
        .bind(period)
        .bind(prefix)
        .bind(range_start)
        .bind(range_end)
        .bind(now_millis())
        .fetch_one(&mut **tx)
        .await?;
        Ok(range)
    }

    /// Atomically claim the next number from a range
    ///
    /// 单条条件 UPDATE 完成比较并递增：游标越界时零行受影响，
    /// 返回 `None` 表示号段耗尽。并发开立在同一事务隔离下
    /// 不可能取得同一个号码。
    pub async fn allocate_next(
        tx: &mut Transaction<'_, Sqlite>,
        range_id: i64,
    ) -> RepoResult<Option<i64>> {
        let allocated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE invoice_numbers
            SET cursor = cursor + 1
            WHERE id = ?1 AND cursor <= range_end
            RETURNING cursor - 1
            "#,
        )
        .bind(range_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(allocated)
    }
}
