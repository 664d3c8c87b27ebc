//! 发票 API 模块
//!
//! 读取、开立、作废、备注、批次上传与导出。
//! 每组路由按所需权限挂载 [`require_permission`] 中间件。

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::require_permission;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/invoices", invoice_routes())
}

fn invoice_routes() -> Router<ServerState> {
    let read = Router::new()
        .route("/", get(handler::list))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/notes", get(handler::list_notes))
        .layer(middleware::from_fn(require_permission("invoices:read")));

    let create = Router::new()
        .route("/", post(handler::create))
        .layer(middleware::from_fn(require_permission("invoices:create")));

    let void = Router::new()
        .route("/{id}/void", post(handler::void))
        .layer(middleware::from_fn(require_permission("invoices:void")));

    let update = Router::new()
        .route("/{id}/notes", post(handler::add_note))
        .route("/upload", post(handler::upload_batch))
        .layer(middleware::from_fn(require_permission("invoices:update")));

    let export = Router::new()
        .route("/export", get(handler::export_csv))
        .layer(middleware::from_fn(require_permission("invoices:export")));

    read.merge(create).merge(void).merge(update).merge(export)
}
