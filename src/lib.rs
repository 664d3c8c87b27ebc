//! E-Invoice Server - 统一发票开立与记账服务
//!
//! # 架构概述
//!
//! 本模块是发票服务器的主入口，提供以下核心功能：
//!
//! - **期别计算** (`period`): 双月期别与申请门槛判定
//! - **发票台账** (`invoices`): 号码领用、开立/作废事务、年度统计
//! - **数据库** (`db`): 嵌入式 SQLite 存储 (sqlx)
//! - **认证** (`auth`): JWT + Argon2 认证体系
//! - **审计** (`audit`): 哈希链防篡改操作日志
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 认证、权限
//! ├── period/        # 双月期别计算
//! ├── invoices/      # 号码分配、台账事务、上传、导出
//! ├── audit/         # 审计日志 (哈希链)
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 数据库层 (模型 + 仓储)
//! └── utils/         # 错误、日志、时间工具
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod core;
pub mod db;
pub mod invoices;
pub mod period;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use invoices::{Actor, LedgerService};
pub use period::Period;
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境 (dotenv + 日志)
///
/// 必须在读取配置之前调用，以便 .env 中的变量生效。
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    // .env 不存在不是错误
    let _ = dotenv::dotenv();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
╔══════════════════════════════════════╗
║          E-INVOICE SERVER            ║
║   統一發票開立與記帳服務             ║
╚══════════════════════════════════════╝
    "#
    );
}
