//! 数据模型
//!
//! 行结构体 (sqlx::FromRow) 与请求/响应 DTO。

pub mod annual_stat;
pub mod invoice;
pub mod number_range;
pub mod setting;
pub mod user;

pub use annual_stat::AnnualStat;
pub use invoice::{
    Invoice, InvoiceCreate, InvoiceItem, InvoiceItemCreate, InvoiceNote, InvoiceStatus,
    InvoiceWithItems,
};
pub use number_range::NumberRange;
pub use setting::SystemSetting;
pub use user::{User, UserCreate, UserResponse, UserUpdate};
