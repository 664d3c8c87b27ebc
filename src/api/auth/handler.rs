//! Authentication Handlers
//!
//! Handles login, logout, and token management

use std::time::Duration;

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::audit::AuditAction;
use crate::auth::{CurrentUser, permissions};
use crate::core::ServerState;
use crate::db::repository::UserRepository;
use crate::utils::AppError;

/// Fixed delay for authentication to prevent timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 500;

/// 登录请求
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// 登录响应
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

/// 用户信息 (返回给客户端)
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub is_active: bool,
    pub created_at: i64,
}

/// Login handler
///
/// Authenticates user credentials and returns a JWT token
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let repo = UserRepository::new(state.pool.clone());
    let username = req.username.clone();

    let user = repo.find_by_username(&username).await?;

    // Fixed delay to prevent timing attacks (before checking result)
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    // Check authentication result - unified error message to prevent username enumeration
    let user = match user {
        Some(u) => {
            // User found - check active status
            if !u.is_active {
                return Err(AppError::forbidden("Account has been disabled"));
            }

            // Verify password
            let password_valid = u
                .verify_password(&req.password)
                .map_err(|e| AppError::internal(format!("Password verification failed: {}", e)))?;

            if !password_valid {
                state
                    .audit_service
                    .log(
                        AuditAction::LoginFailed,
                        "auth",
                        format!("user:{}", username),
                        None,
                        None,
                        serde_json::json!({"reason": "invalid_credentials"}),
                    )
                    .await;
                tracing::warn!(username = %username, "Login failed - invalid credentials");
                return Err(AppError::invalid_credentials());
            }

            u
        }
        None => {
            state
                .audit_service
                .log(
                    AuditAction::LoginFailed,
                    "auth",
                    format!("user:{}", username),
                    None,
                    None,
                    serde_json::json!({"reason": "user_not_found"}),
                )
                .await;
            tracing::warn!(username = %username, "Login failed - user not found");
            return Err(AppError::invalid_credentials());
        }
    };

    // Resolve permissions from static role table
    let user_permissions = permissions::get_default_permissions(&user.role);

    // Generate JWT token
    let jwt_service = state.get_jwt_service();
    let token = jwt_service
        .generate_token(
            &user.id,
            &user.username,
            &user.display_name,
            &user.role,
            &user_permissions,
        )
        .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

    // Log successful login
    state
        .audit_service
        .log(
            AuditAction::LoginSuccess,
            "auth",
            format!("user:{}", user.id),
            Some(user.id.clone()),
            Some(user.display_name.clone()),
            serde_json::json!({"username": &user.username}),
        )
        .await;

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        role = %user.role,
        "User logged in successfully"
    );

    let response = LoginResponse {
        token,
        user: UserInfo {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            role: user.role,
            permissions: user_permissions,
            is_active: user.is_active,
            created_at: user.created_at,
        },
    };

    Ok(Json(response))
}

/// Get current user info
pub async fn me(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<UserInfo>, AppError> {
    // Query fresh user data for is_active and created_at
    let repo = UserRepository::new(state.pool.clone());
    let row = repo
        .find_by_id(&user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(UserInfo {
        id: row.id,
        username: row.username,
        display_name: row.display_name,
        role: row.role,
        permissions: user.permissions,
        is_active: row.is_active,
        created_at: row.created_at,
    }))
}

/// Logout handler
pub async fn logout(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<()>, AppError> {
    state
        .audit_service
        .log(
            AuditAction::Logout,
            "auth",
            format!("user:{}", user.id),
            Some(user.id.clone()),
            Some(user.display_name.clone()),
            serde_json::json!({"username": &user.username}),
        )
        .await;

    tracing::info!(
        user_id = %user.id,
        username = %user.username,
        "User logged out"
    );

    Ok(Json(()))
}
