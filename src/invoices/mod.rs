//! 发票核心模块
//!
//! - [`allocator`] - 期别号段取得与号码领用
//! - [`service`] - 开立/作废事务与年度统计
//! - [`upload`] - 税务机关批次上传（存根）
//! - [`export`] - CSV 导出

pub mod allocator;
pub mod export;
pub mod service;
pub mod upload;

pub use service::{Actor, AnnualStatsReport, LedgerService, ANNUAL_REVENUE_CEILING};
pub use upload::{BatchUploadReport, BatchUploadRequest, UploadService};
