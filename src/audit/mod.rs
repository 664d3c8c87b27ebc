//! 审计日志模块
//!
//! 只追加、哈希链防篡改的操作记录。

pub mod service;
pub mod types;

pub use service::AuditService;
pub use types::{
    AuditAction, AuditChainVerification, AuditEntry, AuditListResponse, AuditQuery,
};
