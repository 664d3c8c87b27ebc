//! 系统设置 API 模块 (仅管理员)
//!
//! 保存卖方抬头、统编等开票用资料。

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/settings", get(handler::list).put(handler::set))
        .layer(middleware::from_fn(require_admin))
}
