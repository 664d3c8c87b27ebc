//! 系统设置接口处理函数

use axum::{Extension, Json, extract::State};
use serde::Deserialize;

use crate::audit::AuditAction;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::SystemSetting;
use crate::db::repository::SettingRepository;
use crate::utils::AppError;

/// 允许的设置键（卖方开票资料）
const ALLOWED_KEYS: &[&str] = &[
    "seller_name",
    "seller_tax_id",
    "seller_address",
    "seller_phone",
];

/// 设置更新请求
#[derive(Debug, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
}

/// GET /api/settings
pub async fn list(State(state): State<ServerState>) -> Result<Json<Vec<SystemSetting>>, AppError> {
    let settings = SettingRepository::new(state.pool.clone()).find_all().await?;
    Ok(Json(settings))
}

/// PUT /api/settings
pub async fn set(
    State(state): State<ServerState>,
    Extension(admin): Extension<CurrentUser>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SystemSetting>, AppError> {
    if !ALLOWED_KEYS.contains(&req.key.as_str()) {
        return Err(AppError::validation(format!(
            "Unknown setting key: {}",
            req.key
        )));
    }

    let setting = SettingRepository::new(state.pool.clone())
        .set(&req.key, &req.value)
        .await?;

    state
        .audit_service
        .log(
            AuditAction::SettingsChanged,
            "setting",
            req.key.clone(),
            Some(admin.id.clone()),
            Some(admin.display_name.clone()),
            serde_json::json!({"key": &req.key, "value": &req.value}),
        )
        .await;

    tracing::info!(key = %req.key, operator = %admin.display_name, "Setting updated");

    Ok(Json(setting))
}
