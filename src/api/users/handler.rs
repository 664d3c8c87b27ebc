//! 用户管理接口处理函数

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::audit::AuditAction;
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{UserCreate, UserResponse, UserUpdate};
use crate::db::repository::UserRepository;
use crate::utils::AppError;

const VALID_ROLES: &[&str] = &["admin", "operator"];

fn validate_role(role: &str) -> Result<(), AppError> {
    if VALID_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(AppError::validation(format!("Unknown role: {}", role)))
    }
}

/// GET /api/users
pub async fn list(State(state): State<ServerState>) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = UserRepository::new(state.pool.clone()).find_all().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// POST /api/users
pub async fn create(
    State(state): State<ServerState>,
    Extension(admin): Extension<CurrentUser>,
    Json(req): Json<UserCreate>,
) -> Result<Json<UserResponse>, AppError> {
    validate_role(&req.role)?;

    let user = UserRepository::new(state.pool.clone()).create(req).await?;

    state
        .audit_service
        .log(
            AuditAction::UserCreated,
            "user",
            user.id.clone(),
            Some(admin.id.clone()),
            Some(admin.display_name.clone()),
            serde_json::json!({"username": &user.username, "role": &user.role}),
        )
        .await;

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        role = %user.role,
        "User created"
    );

    Ok(Json(UserResponse::from(user)))
}

/// PUT /api/users/{id}
pub async fn update(
    State(state): State<ServerState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(req): Json<UserUpdate>,
) -> Result<Json<UserResponse>, AppError> {
    if let Some(role) = &req.role {
        validate_role(role)?;
    }

    let user = UserRepository::new(state.pool.clone()).update(&id, req).await?;

    state
        .audit_service
        .log(
            AuditAction::UserUpdated,
            "user",
            user.id.clone(),
            Some(admin.id.clone()),
            Some(admin.display_name.clone()),
            serde_json::json!({"username": &user.username}),
        )
        .await;

    Ok(Json(UserResponse::from(user)))
}

/// DELETE /api/users/{id}
///
/// 软删除：停用账号而非物理删除
pub async fn delete(
    State(state): State<ServerState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<()>, AppError> {
    if id == admin.id {
        return Err(AppError::business_rule(
            "Administrators cannot deactivate their own account",
        ));
    }

    let deleted = UserRepository::new(state.pool.clone()).delete(&id).await?;
    if !deleted {
        return Err(AppError::not_found(format!("User {} not found", id)));
    }

    state
        .audit_service
        .log(
            AuditAction::UserDeactivated,
            "user",
            id.clone(),
            Some(admin.id.clone()),
            Some(admin.display_name.clone()),
            serde_json::json!({}),
        )
        .await;

    tracing::info!(user_id = %id, operator = %admin.display_name, "User deactivated");

    Ok(Json(()))
}
