//! 年度统计 API 模块

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/stats/annual", get(handler::annual))
        .layer(middleware::from_fn(require_permission("invoices:read")))
}
