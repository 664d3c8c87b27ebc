//! Database Module
//!
//! Handles SQLite connection pool and migrations

pub mod models;
pub mod repository;

use crate::utils::AppError;
use crate::utils::time::now_millis;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;

use models::User;

/// Database service — owns a SQLite connection pool
#[derive(Clone)]
pub struct DbService {
    pub pool: SqlitePool,
}

impl DbService {
    /// Create a new database service with WAL mode
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        // Build connection options: WAL, foreign keys, normal sync
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| AppError::database(format!("Invalid database path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON")
            .optimize_on_close(true, None);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        // busy_timeout: 写冲突时等待 5s 而非立即失败
        sqlx::query("PRAGMA busy_timeout = 5000;")
            .execute(&pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to set busy_timeout: {e}")))?;

        tracing::info!("Database connection established (SQLite WAL, busy_timeout=5000ms)");

        Self::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Run embedded migrations
    pub async fn run_migrations(pool: &SqlitePool) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .set_ignore_missing(true)
            .run(pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to apply migrations: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// 首次启动时播种默认管理员
    ///
    /// 仅当 users 表为空时创建 `admin / admin` 账号（登录后必须改密）。
    pub async fn seed_default_admin(pool: &SqlitePool) -> Result<(), AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count users: {e}")))?;

        if count > 0 {
            return Ok(());
        }

        let password_hash = User::hash_password("admin")
            .map_err(|e| AppError::internal(format!("Failed to hash default password: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, display_name, password_hash, role, is_active, created_at)
            VALUES (?1, 'admin', 'Administrator', ?2, 'admin', 1, ?3)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(password_hash)
        .bind(now_millis())
        .execute(pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to seed default admin: {e}")))?;

        tracing::warn!("Seeded default admin account (username: admin) — change the password");
        Ok(())
    }
}
