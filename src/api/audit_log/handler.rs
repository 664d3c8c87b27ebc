//! 审计日志接口处理函数

use axum::{
    Json,
    extract::{Query, State},
};

use crate::audit::{AuditChainVerification, AuditListResponse, AuditQuery};
use crate::core::ServerState;
use crate::utils::AppError;

/// GET /api/audit-log
pub async fn list(
    State(state): State<ServerState>,
    Query(q): Query<AuditQuery>,
) -> Result<Json<AuditListResponse>, AppError> {
    let response = state.audit_service.list(&q).await?;
    Ok(Json(response))
}

/// GET /api/audit-log/verify
///
/// 重算整条哈希链，报告断裂点
pub async fn verify(
    State(state): State<ServerState>,
) -> Result<Json<AuditChainVerification>, AppError> {
    let verification = state.audit_service.verify_chain().await?;

    if !verification.chain_intact {
        tracing::error!(
            breaks = verification.breaks.len(),
            "Audit chain verification failed"
        );
    }

    Ok(Json(verification))
}
