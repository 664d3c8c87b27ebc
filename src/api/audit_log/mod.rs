//! 审计日志 API 模块 (仅管理员)

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/audit-log", get(handler::list))
        .route("/api/audit-log/verify", get(handler::verify))
        .layer(middleware::from_fn(require_admin))
}
