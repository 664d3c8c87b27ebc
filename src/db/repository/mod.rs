//! Repository Module
//!
//! Provides CRUD operations over the SQLite tables. Functions that must
//! participate in a caller's transaction take `&mut Transaction<'_, Sqlite>`;
//! everything else runs on the pool.

pub mod annual_stat;
pub mod invoice;
pub mod number_range;
pub mod setting;
pub mod user;

pub use annual_stat::AnnualStatRepository;
pub use invoice::{InvoiceFilter, InvoiceRepository, IssuedTotals};
pub use number_range::NumberRangeRepository;
pub use setting::SettingRepository;
pub use user::UserRepository;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(db.to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<RepoError> for crate::utils::AppError {
    fn from(err: RepoError) -> Self {
        use crate::utils::AppError;
        match err {
            RepoError::NotFound(msg) => AppError::not_found(msg),
            RepoError::Duplicate(msg) => AppError::conflict(msg),
            RepoError::Validation(msg) => AppError::validation(msg),
            RepoError::Database(msg) => AppError::database(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
