//! 工具模块
//!
//! - [`error`] - 统一错误类型和响应结构
//! - [`result`] - Result 类型别名
//! - [`logger`] - tracing 日志初始化
//! - [`time`] - 业务时区时间转换

pub mod error;
pub mod logger;
pub mod result;
pub mod time;

pub use error::{AppError, AppResponse};
pub use result::AppResult;
