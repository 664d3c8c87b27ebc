//! User Repository

use sqlx::SqlitePool;
use uuid::Uuid;

use super::{RepoError, RepoResult};
use crate::db::models::{User, UserCreate, UserUpdate};
use crate::utils::time::now_millis;

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find user by username (active or not)
    pub async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?1 LIMIT 1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Find user by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// List all users
    pub async fn find_all(&self) -> RepoResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Create a new user
    pub async fn create(&self, data: UserCreate) -> RepoResult<User> {
        if data.username.trim().is_empty() {
            return Err(RepoError::Validation("Username must not be empty".into()));
        }
        if data.password.len() < 6 {
            return Err(RepoError::Validation(
                "Password must be at least 6 characters".into(),
            ));
        }

        let password_hash = User::hash_password(&data.password)
            .map_err(|e| RepoError::Database(format!("Password hashing failed: {e}")))?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: data.username,
            display_name: data.display_name,
            password_hash,
            role: data.role,
            is_active: true,
            created_at: now_millis(),
        };

        sqlx::query(
            r#"
            INSERT INTO users (id, username, display_name, password_hash, role, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Update a user (partial)
    pub async fn update(&self, id: &str, data: UserUpdate) -> RepoResult<User> {
        let mut user = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("User {} not found", id)))?;

        if let Some(display_name) = data.display_name {
            user.display_name = display_name;
        }
        if let Some(role) = data.role {
            user.role = role;
        }
        if let Some(is_active) = data.is_active {
            user.is_active = is_active;
        }
        if let Some(password) = data.password {
            if password.len() < 6 {
                return Err(RepoError::Validation(
                    "Password must be at least 6 characters".into(),
                ));
            }
            user.password_hash = User::hash_password(&password)
                .map_err(|e| RepoError::Database(format!("Password hashing failed: {e}")))?;
        }

        sqlx::query(
            r#"
            UPDATE users
            SET display_name = ?1, password_hash = ?2, role = ?3, is_active = ?4
            WHERE id = ?5
            "#,
        )
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(&user.role)
        .bind(user.is_active)
        .bind(&user.id)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Soft delete a user (deactivate)
    ///
    /// 发票行引用 users.id，物理删除会破坏审计追溯。
    pub async fn delete(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
