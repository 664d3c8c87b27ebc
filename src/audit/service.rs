//! 审计日志服务
//!
//! 只追加写入，SHA256 哈希链防篡改。财务关键操作（开立/作废）
//! 的审计写入与业务变更在同一事务内完成。

use sha2::{Digest, Sha256};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};

use super::types::{
    AuditAction, AuditChainBreak, AuditChainVerification, AuditEntry, AuditListResponse,
    AuditQuery,
};
use crate::db::repository::RepoResult;
use crate::utils::time::now_millis;

/// 链首的 prev_hash
const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// 计算条目哈希：prev_hash + 所有业务字段
fn compute_hash(
    prev_hash: &str,
    timestamp: i64,
    action: AuditAction,
    resource_type: &str,
    resource_id: &str,
    operator_id: Option<&str>,
    operator_name: Option<&str>,
    details: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(timestamp.to_le_bytes());
    hasher.update(serde_json::to_string(&action).unwrap_or_default().as_bytes());
    hasher.update(resource_type.as_bytes());
    hasher.update(resource_id.as_bytes());
    hasher.update(operator_id.unwrap_or("").as_bytes());
    hasher.update(operator_name.unwrap_or("").as_bytes());
    hasher.update(details.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct AuditService {
    pool: SqlitePool,
}

impl AuditService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 记录一条审计日志（独立事务）
    ///
    /// 用于登录、设置变更等非财务事件。写入失败只告警不阻断业务。
    pub async fn log(
        &self,
        action: AuditAction,
        resource_type: &str,
        resource_id: impl Into<String>,
        operator_id: Option<String>,
        operator_name: Option<String>,
        details: serde_json::Value,
    ) {
        let resource_id = resource_id.into();
        let result = async {
            let mut tx = self.pool.begin().await?;
            Self::log_tx(
                &mut tx,
                action,
                resource_type,
                &resource_id,
                operator_id.as_deref(),
                operator_name.as_deref(),
                &details,
            )
            .await
            .map_err(|e| sqlx::Error::Protocol(e.to_string()))?;
            tx.commit().await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(action = %action, error = %e, "Failed to write audit entry");
        }
    }

    /// 在调用方事务内追加一条审计日志
    ///
    /// 链尾哈希在同一事务内读取，保证链的连续性。
    pub async fn log_tx(
        tx: &mut Transaction<'_, Sqlite>,
        action: AuditAction,
        resource_type: &str,
        resource_id: &str,
        operator_id: Option<&str>,
        operator_name: Option<&str>,
        details: &serde_json::Value,
    ) -> RepoResult<()> {
        let prev_hash: Option<String> =
            sqlx::query_scalar("SELECT curr_hash FROM audit_logs ORDER BY id DESC LIMIT 1")
                .fetch_optional(&mut **tx)
                .await?;
        let prev_hash = prev_hash.unwrap_or_else(|| GENESIS_HASH.to_string());

        let timestamp = now_millis();
        let details_str = details.to_string();
        let curr_hash = compute_hash(
            &prev_hash,
            timestamp,
            action,
            resource_type,
            resource_id,
            operator_id,
            operator_name,
            &details_str,
        );

        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                timestamp, action, resource_type, resource_id,
                operator_id, operator_name, details, prev_hash, curr_hash
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(timestamp)
        .bind(action)
        .bind(resource_type)
        .bind(resource_id)
        .bind(operator_id)
        .bind(operator_name)
        .bind(&details_str)
        .bind(&prev_hash)
        .bind(&curr_hash)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// 查询审计日志（倒序分页）
    pub async fn list(&self, query: &AuditQuery) -> RepoResult<AuditListResponse> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM audit_logs WHERE 1=1");
        let mut count_qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM audit_logs WHERE 1=1");

        for builder in [&mut qb, &mut count_qb] {
            if let Some(from) = query.from {
                builder.push(" AND timestamp >= ").push_bind(from);
            }
            if let Some(to) = query.to {
                builder.push(" AND timestamp <= ").push_bind(to);
            }
            if let Some(action) = query.action {
                builder.push(" AND action = ").push_bind(action);
            }
            if let Some(operator_id) = &query.operator_id {
                builder.push(" AND operator_id = ").push_bind(operator_id);
            }
        }

        qb.push(" ORDER BY id DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        let items = qb.build_query_as::<AuditEntry>().fetch_all(&self.pool).await?;
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        Ok(AuditListResponse { items, total })
    }

    /// 全链验证：逐条重算哈希并核对链接
    pub async fn verify_chain(&self) -> RepoResult<AuditChainVerification> {
        let entries =
            sqlx::query_as::<_, AuditEntry>("SELECT * FROM audit_logs ORDER BY id ASC")
                .fetch_all(&self.pool)
                .await?;

        let mut breaks = Vec::new();
        let mut expected_prev = GENESIS_HASH.to_string();

        for entry in &entries {
            if entry.prev_hash != expected_prev {
                breaks.push(AuditChainBreak {
                    entry_id: entry.id,
                    expected_hash: expected_prev.clone(),
                    actual_hash: entry.prev_hash.clone(),
                });
            }

            let recomputed = compute_hash(
                &entry.prev_hash,
                entry.timestamp,
                entry.action,
                &entry.resource_type,
                &entry.resource_id,
                entry.operator_id.as_deref(),
                entry.operator_name.as_deref(),
                &entry.details,
            );
            if recomputed != entry.curr_hash {
                breaks.push(AuditChainBreak {
                    entry_id: entry.id,
                    expected_hash: recomputed,
                    actual_hash: entry.curr_hash.clone(),
                });
            }

            expected_prev = entry.curr_hash.clone();
        }

        Ok(AuditChainVerification {
            total_entries: entries.len() as i64,
            chain_intact: breaks.is_empty(),
            breaks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = compute_hash(
            GENESIS_HASH,
            1000,
            AuditAction::InvoiceIssued,
            "invoice",
            "inv-1",
            Some("u1"),
            Some("Operator"),
            "{}",
        );
        let b = compute_hash(
            GENESIS_HASH,
            1000,
            AuditAction::InvoiceIssued,
            "invoice",
            "inv-1",
            Some("u1"),
            Some("Operator"),
            "{}",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hash_depends_on_prev() {
        let a = compute_hash(
            GENESIS_HASH,
            1000,
            AuditAction::InvoiceIssued,
            "invoice",
            "inv-1",
            None,
            None,
            "{}",
        );
        let b = compute_hash(
            &a,
            1000,
            AuditAction::InvoiceIssued,
            "invoice",
            "inv-1",
            None,
            None,
            "{}",
        );
        assert_ne!(a, b);
    }
}
