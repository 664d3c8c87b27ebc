use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::SqlitePool;

use crate::audit::{AuditAction, AuditService};
use crate::auth::JwtService;
use crate::core::Config;
use crate::db::DbService;
use crate::invoices::{LedgerService, UploadService};
use crate::utils::time;

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是服务器的核心数据结构，持有所有服务的共享引用。
/// 使用 Arc / 连接池实现浅拷贝，克隆成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | SQLite 连接池 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | audit_service | AuditService | 审计日志服务 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub pool: SqlitePool,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    /// 审计日志服务
    pub audit_service: AuditService,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`ServerState::initialize`] 代替；测试时可注入现成的连接池。
    pub fn new(config: Config, pool: SqlitePool, jwt_service: Arc<JwtService>) -> Self {
        let audit_service = AuditService::new(pool.clone());
        Self {
            config,
            pool,
            jwt_service,
            audit_service,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/database/einvoice.db，迁移 + 默认管理员播种)
    /// 3. JWT 服务
    /// 4. 记录 system_startup 审计事件
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        let db_path = config.database_path();
        let db_service = DbService::new(&db_path.to_string_lossy())
            .await
            .expect("Failed to initialize database");

        DbService::seed_default_admin(&db_service.pool)
            .await
            .expect("Failed to seed default admin");

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        let state = Self::new(config.clone(), db_service.pool, jwt_service);

        state
            .audit_service
            .log(
                AuditAction::SystemStartup,
                "system",
                "server".to_string(),
                None,
                None,
                serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "environment": &config.environment,
                }),
            )
            .await;

        state
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 发票台账服务
    pub fn ledger(&self) -> LedgerService {
        LedgerService::new(self.pool.clone(), self.config.timezone)
    }

    /// 批次上传服务
    pub fn uploader(&self) -> UploadService {
        UploadService::new(self.pool.clone(), self.audit_service.clone())
    }

    /// 业务时区下的今天
    ///
    /// 期别门槛与年度归属都以这个日期为准，而非 UTC。
    pub fn business_today(&self) -> NaiveDate {
        time::today(self.config.timezone)
    }
}
