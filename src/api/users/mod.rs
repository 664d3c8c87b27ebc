//! 用户管理 API 模块 (仅管理员)

mod handler;

use axum::{
    Router, middleware,
    routing::{get, put},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .nest("/api/users", user_routes())
        .layer(middleware::from_fn(require_admin))
}

fn user_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", put(handler::update).delete(handler::delete))
}
