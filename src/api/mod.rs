//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查接口
//! - [`auth`] - 认证相关接口
//! - [`invoices`] - 发票管理接口
//! - [`stats`] - 年度统计接口
//! - [`users`] - 用户管理接口 (仅管理员)
//! - [`audit_log`] - 审计日志接口 (仅管理员)
//! - [`settings`] - 系统设置接口 (仅管理员)

pub mod audit_log;
pub mod auth;
pub mod health;
pub mod invoices;
pub mod settings;
pub mod stats;
pub mod users;
