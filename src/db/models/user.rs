//! 操作员账号模型

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 操作员账号（数据库行）
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    /// Argon2 哈希，不参与序列化
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// 角色：admin | operator
    pub role: String,
    pub is_active: bool,
    pub created_at: i64,
}

impl User {
    /// Verify password against stored argon2 hash
    pub fn verify_password(&self, password: &str) -> Result<bool, argon2::password_hash::Error> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHash, PasswordVerifier},
        };

        let parsed_hash = PasswordHash::new(&self.password_hash)?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash password using argon2
    pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
        use argon2::{
            Argon2,
            password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
        };

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2.hash_password(password.as_bytes(), &salt)?;
        Ok(password_hash.to_string())
    }
}

/// 创建用户请求
#[derive(Debug, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub display_name: String,
    pub password: String,
    /// 默认 operator
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "operator".to_string()
}

/// 更新用户请求（字段缺省表示不变）
#[derive(Debug, Deserialize)]
pub struct UserUpdate {
    pub display_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

/// 用户响应（不含密码哈希）
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: i64,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            display_name: u.display_name,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = User::hash_password("secret123").expect("hash");
        let user = User {
            id: "u1".to_string(),
            username: "op".to_string(),
            display_name: "Operator".to_string(),
            password_hash: hash,
            role: "operator".to_string(),
            is_active: true,
            created_at: 0,
        };
        assert!(user.verify_password("secret123").unwrap());
        assert!(!user.verify_password("wrong").unwrap());
    }
}
