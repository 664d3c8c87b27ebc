//! 年度统计接口处理函数

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use chrono::Datelike;
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::invoices::AnnualStatsReport;
use crate::utils::AppError;

/// 年度统计查询参数
#[derive(Debug, Deserialize)]
pub struct AnnualQuery {
    /// 缺省为当前年度 (业务时区)
    pub year: Option<i32>,
    /// 限定开立人；非管理员只能查自己
    pub user_id: Option<String>,
}

/// GET /api/stats/annual
pub async fn annual(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Query(q): Query<AnnualQuery>,
) -> Result<Json<AnnualStatsReport>, AppError> {
    let year = q.year.unwrap_or_else(|| state.business_today().year());

    // 非管理员只能查看自己的统计
    let user_id = if user.is_admin() {
        q.user_id
    } else {
        match q.user_id {
            Some(ref uid) if uid != &user.id => {
                return Err(AppError::forbidden(
                    "Operators may only view their own annual stats",
                ));
            }
            _ => Some(user.id.clone()),
        }
    };

    let report = state.ledger().annual_stats(year, user_id.as_deref()).await?;
    Ok(Json(report))
}
