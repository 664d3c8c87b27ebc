//! 发票接口处理函数

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Invoice, InvoiceCreate, InvoiceNote, InvoiceStatus, InvoiceWithItems};
use crate::db::repository::{InvoiceFilter, InvoiceRepository};
use crate::invoices::{Actor, BatchUploadReport, BatchUploadRequest, export};
use crate::utils::AppError;
use crate::utils::time::{day_start_millis, parse_date};

/// 列表查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub period: Option<String>,
    /// issued | voided | draft
    pub status: Option<String>,
    pub issued_by: Option<String>,
    /// 开立日期下界 (YYYY-MM-DD, 含)
    pub from: Option<String>,
    /// 开立日期上界 (YYYY-MM-DD, 不含)
    pub to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// 作废请求
#[derive(Debug, Deserialize)]
pub struct VoidRequest {
    pub reason: String,
}

/// 备注请求
#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub note: String,
}

fn parse_status(s: &str) -> Result<InvoiceStatus, AppError> {
    match s {
        "draft" => Ok(InvoiceStatus::Draft),
        "issued" => Ok(InvoiceStatus::Issued),
        "voided" => Ok(InvoiceStatus::Voided),
        other => Err(AppError::validation(format!(
            "Unknown invoice status: {}",
            other
        ))),
    }
}

fn build_filter(state: &ServerState, q: &ListQuery) -> Result<InvoiceFilter, AppError> {
    let tz = state.config.timezone;
    let status = q.status.as_deref().map(parse_status).transpose()?;
    let from_millis = q
        .from
        .as_deref()
        .map(|s| parse_date(s).map(|d| day_start_millis(d, tz)))
        .transpose()?;
    let to_millis = q
        .to
        .as_deref()
        .map(|s| parse_date(s).map(|d| day_start_millis(d, tz)))
        .transpose()?;

    Ok(InvoiceFilter {
        period: q.period.clone(),
        status,
        issued_by: q.issued_by.clone(),
        from_millis,
        to_millis,
        limit: q.limit.unwrap_or(50).clamp(1, 500),
        offset: q.offset.unwrap_or(0).max(0),
    })
}

fn actor_of(user: &CurrentUser) -> Actor {
    Actor {
        id: user.id.clone(),
        name: user.display_name.clone(),
    }
}

/// GET /api/invoices
pub async fn list(
    State(state): State<ServerState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let filter = build_filter(&state, &q)?;
    let invoices = InvoiceRepository::new(state.pool.clone())
        .list(&filter)
        .await?;
    Ok(Json(invoices))
}

/// GET /api/invoices/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<InvoiceWithItems>, AppError> {
    let repo = InvoiceRepository::new(state.pool.clone());
    let invoice = repo
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Invoice {} not found", id)))?;
    let items = repo.find_items(&id).await?;
    Ok(Json(InvoiceWithItems { invoice, items }))
}

/// POST /api/invoices
pub async fn create(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<InvoiceCreate>,
) -> Result<Json<InvoiceWithItems>, AppError> {
    let today = state.business_today();
    let created = state
        .ledger()
        .create_invoice(&actor_of(&user), req, today)
        .await?;
    Ok(Json(created))
}

/// POST /api/invoices/{id}/void
pub async fn void(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<VoidRequest>,
) -> Result<Json<Invoice>, AppError> {
    let voided = state
        .ledger()
        .void_invoice(&actor_of(&user), &id, &req.reason)
        .await?;
    Ok(Json(voided))
}

/// GET /api/invoices/{id}/notes
pub async fn list_notes(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<InvoiceNote>>, AppError> {
    let repo = InvoiceRepository::new(state.pool.clone());
    repo.find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Invoice {} not found", id)))?;
    let notes = repo.find_notes(&id).await?;
    Ok(Json(notes))
}

/// POST /api/invoices/{id}/notes
pub async fn add_note(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<InvoiceNote>, AppError> {
    if req.note.trim().is_empty() {
        return Err(AppError::validation("Note must not be empty"));
    }

    let repo = InvoiceRepository::new(state.pool.clone());
    repo.find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Invoice {} not found", id)))?;

    let note = repo.add_note(&id, req.note.trim(), &user.id).await?;
    Ok(Json(note))
}

/// POST /api/invoices/upload
pub async fn upload_batch(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<BatchUploadRequest>,
) -> Result<Json<BatchUploadReport>, AppError> {
    if req.invoice_ids.is_empty() {
        return Err(AppError::validation("invoice_ids must not be empty"));
    }

    let report = state
        .uploader()
        .upload_batch(&actor_of(&user), req.invoice_ids)
        .await?;
    Ok(Json(report))
}

/// GET /api/invoices/export
///
/// 按与列表相同的过滤条件导出 CSV
pub async fn export_csv(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Query(q): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut filter = build_filter(&state, &q)?;
    // 导出不分页
    filter.limit = i64::MAX;
    filter.offset = 0;

    let invoices = InvoiceRepository::new(state.pool.clone())
        .list(&filter)
        .await?;
    let csv = export::render_csv(&invoices);

    tracing::info!(
        rows = invoices.len(),
        operator = %user.display_name,
        "Invoice CSV exported"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"invoices.csv\"",
            ),
        ],
        csv,
    ))
}
