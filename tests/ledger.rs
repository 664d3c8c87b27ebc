//! 发票台账集成测试
//!
//! 使用内存 SQLite（单连接池）跑完整迁移，覆盖开立、作废、
//! 号段耗尽、期别门槛与年度统计；另有一条文件库用例验证重开持久化。

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use chrono_tz::Tz;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use einvoice_server::db::DbService;
use einvoice_server::db::models::{InvoiceCreate, InvoiceItemCreate, InvoiceStatus, UserCreate};
use einvoice_server::db::repository::{AnnualStatRepository, UserRepository};
use einvoice_server::invoices::{ANNUAL_REVENUE_CEILING, Actor, LedgerService};

const TZ: Tz = chrono_tz::Asia::Taipei;

async fn setup_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid options")
        .pragma("foreign_keys", "ON");

    // 单连接：内存库在多连接下各自为独立数据库
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("connect in-memory sqlite");

    DbService::run_migrations(&pool).await.expect("migrations");
    pool
}

async fn seed_operator(pool: &SqlitePool) -> Actor {
    let user = UserRepository::new(pool.clone())
        .create(UserCreate {
            username: "op1".to_string(),
            display_name: "Operator One".to_string(),
            password: "secret123".to_string(),
            role: "operator".to_string(),
        })
        .await
        .expect("seed operator");

    Actor {
        id: user.id,
        name: user.display_name,
    }
}

fn simple_request(amount: i64) -> InvoiceCreate {
    InvoiceCreate {
        period: None,
        buyer_name: "測試商行".to_string(),
        buyer_tax_id: Some("12345678".to_string()),
        tax_amount: 0,
        items: vec![InvoiceItemCreate {
            description: "服務費".to_string(),
            quantity: 1,
            unit_price: amount,
        }],
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn today_in_tz() -> NaiveDate {
    chrono::Utc::now().with_timezone(&TZ).date_naive()
}

#[tokio::test]
async fn test_issue_assigns_sequential_numbers() {
    let pool = setup_pool().await;
    let actor = seed_operator(&pool).await;
    let ledger = LedgerService::new(pool.clone(), TZ);

    let today = date(2025, 1, 15);
    let first = ledger
        .create_invoice(&actor, simple_request(1000), today)
        .await
        .expect("first invoice");
    let second = ledger
        .create_invoice(&actor, simple_request(2000), today)
        .await
        .expect("second invoice");

    assert_eq!(first.invoice.number, "010210000001");
    assert_eq!(second.invoice.number, "010210000002");
    assert_eq!(first.invoice.period, "20250102");
    assert_eq!(first.invoice.status, InvoiceStatus::Issued);
    assert_eq!(first.invoice.grand_total, 1000);
    assert_eq!(first.items.len(), 1);
    assert_eq!(first.items[0].amount, 1000);
}

#[tokio::test]
async fn test_each_period_gets_its_own_range() {
    let pool = setup_pool().await;
    let actor = seed_operator(&pool).await;
    let ledger = LedgerService::new(pool.clone(), TZ);

    let jan = ledger
        .create_invoice(&actor, simple_request(100), date(2025, 1, 15))
        .await
        .expect("current period invoice");

    // 2 月 20 号起可预领下期号段
    let mut req = simple_request(100);
    req.period = Some("20250304".to_string());
    let mar = ledger
        .create_invoice(&actor, req, date(2025, 2, 20))
        .await
        .expect("next period invoice");

    assert_eq!(jan.invoice.number, "010210000001");
    assert_eq!(mar.invoice.number, "030410000001");
    assert_eq!(mar.invoice.period, "20250304");
}

#[tokio::test]
async fn test_next_period_rejected_before_day_20() {
    let pool = setup_pool().await;
    let actor = seed_operator(&pool).await;
    let ledger = LedgerService::new(pool.clone(), TZ);

    let mut req = simple_request(100);
    req.period = Some("20250304".to_string());

    let err = ledger
        .create_invoice(&actor, req, date(2025, 1, 15))
        .await
        .expect_err("next period must be gated");
    assert!(err.to_string().contains("not yet open"), "got: {}", err);

    // 跳期申请一律拒绝
    let mut skip = simple_request(100);
    skip.period = Some("20250506".to_string());
    assert!(
        ledger
            .create_invoice(&actor, skip, date(2025, 1, 25))
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_range_exhaustion_fails_cleanly() {
    let pool = setup_pool().await;
    let actor = seed_operator(&pool).await;
    let ledger = LedgerService::new(pool.clone(), TZ);
    let today = date(2025, 1, 15);

    ledger
        .create_invoice(&actor, simple_request(100), today)
        .await
        .expect("first invoice");

    // 将游标推到号段尾，模拟只剩最后一个号码
    sqlx::query("UPDATE invoice_numbers SET cursor = 10000500 WHERE period = '20250102'")
        .execute(&pool)
        .await
        .expect("advance cursor");

    let last = ledger
        .create_invoice(&actor, simple_request(100), today)
        .await
        .expect("last number in range");
    assert_eq!(last.invoice.number, "010210000500");

    let err = ledger
        .create_invoice(&actor, simple_request(100), today)
        .await
        .expect_err("range exhausted");
    assert!(err.to_string().contains("exhausted"), "got: {}", err);

    // 耗尽的失败不应留下发票行、统计增量或游标移动
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(count, 2);

    let cached_count: i64 = sqlx::query_scalar(
        "SELECT invoice_count FROM annual_stats WHERE user_id = ?1 AND year = 2025",
    )
    .bind(&actor.id)
    .fetch_one(&pool)
    .await
    .expect("cached stat");
    assert_eq!(cached_count, 2);

    let cursor: i64 =
        sqlx::query_scalar("SELECT cursor FROM invoice_numbers WHERE period = '20250102'")
            .fetch_one(&pool)
            .await
            .expect("cursor");
    assert_eq!(cursor, 10000501);
}

#[tokio::test]
async fn test_void_reverses_annual_stats() {
    let pool = setup_pool().await;
    let actor = seed_operator(&pool).await;
    let ledger = LedgerService::new(pool.clone(), TZ);

    // 统计按开立时刻归属年度，所以用业务时区的真实今天
    let today = today_in_tz();
    let year = today.year();

    let created = ledger
        .create_invoice(&actor, simple_request(5000), today)
        .await
        .expect("create");

    let stats = ledger.annual_stats(year, Some(&actor.id)).await.expect("stats");
    assert_eq!(stats.total_amount, 5000);
    assert_eq!(stats.invoice_count, 1);
    assert!(!stats.is_near_limit);

    let voided = ledger
        .void_invoice(&actor, &created.invoice.id, "輸入錯誤")
        .await
        .expect("void");
    assert_eq!(voided.status, InvoiceStatus::Voided);
    assert_eq!(voided.void_reason.as_deref(), Some("輸入錯誤"));
    assert!(voided.voided_at.is_some());

    let stats = ledger.annual_stats(year, Some(&actor.id)).await.expect("stats");
    assert_eq!(stats.total_amount, 0);
    assert_eq!(stats.invoice_count, 0);

    // 缓存的累计行与重算值一致
    let cached = AnnualStatRepository::new(pool.clone())
        .find(&actor.id, year)
        .await
        .expect("cached stat")
        .expect("row exists");
    assert_eq!(cached.total_amount, 0);
    assert_eq!(cached.invoice_count, 0);
}

#[tokio::test]
async fn test_void_is_terminal() {
    let pool = setup_pool().await;
    let actor = seed_operator(&pool).await;
    let ledger = LedgerService::new(pool.clone(), TZ);

    let created = ledger
        .create_invoice(&actor, simple_request(100), today_in_tz())
        .await
        .expect("create");

    ledger
        .void_invoice(&actor, &created.invoice.id, "first void")
        .await
        .expect("void");

    let err = ledger
        .void_invoice(&actor, &created.invoice.id, "second void")
        .await
        .expect_err("double void must fail");
    assert!(err.to_string().contains("already voided"), "got: {}", err);

    // 二次作废不能重复扣减统计
    let year = today_in_tz().year();
    let stats = ledger.annual_stats(year, Some(&actor.id)).await.expect("stats");
    assert_eq!(stats.invoice_count, 0);
    assert_eq!(stats.total_amount, 0);
}

#[tokio::test]
async fn test_void_requires_reason() {
    let pool = setup_pool().await;
    let actor = seed_operator(&pool).await;
    let ledger = LedgerService::new(pool.clone(), TZ);

    let created = ledger
        .create_invoice(&actor, simple_request(100), today_in_tz())
        .await
        .expect("create");

    assert!(
        ledger
            .void_invoice(&actor, &created.invoice.id, "   ")
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_near_limit_threshold() {
    let pool = setup_pool().await;
    let actor = seed_operator(&pool).await;
    let ledger = LedgerService::new(pool.clone(), TZ);
    let today = today_in_tz();
    let year = today.year();

    // 正好 90%：不告警
    let ninety_percent = ANNUAL_REVENUE_CEILING / 10 * 9;
    ledger
        .create_invoice(&actor, simple_request(ninety_percent), today)
        .await
        .expect("create");

    let stats = ledger.annual_stats(year, Some(&actor.id)).await.expect("stats");
    assert!(!stats.is_near_limit);

    // 超过 90%：告警
    ledger
        .create_invoice(&actor, simple_request(1), today)
        .await
        .expect("create");

    let stats = ledger.annual_stats(year, Some(&actor.id)).await.expect("stats");
    assert!(stats.is_near_limit);
    assert_eq!(stats.ceiling, ANNUAL_REVENUE_CEILING);
}

#[tokio::test]
async fn test_validation_rejects_bad_requests() {
    let pool = setup_pool().await;
    let actor = seed_operator(&pool).await;
    let ledger = LedgerService::new(pool.clone(), TZ);
    let today = today_in_tz();

    let mut no_items = simple_request(100);
    no_items.items.clear();
    assert!(ledger.create_invoice(&actor, no_items, today).await.is_err());

    let mut no_buyer = simple_request(100);
    no_buyer.buyer_name = "  ".to_string();
    assert!(ledger.create_invoice(&actor, no_buyer, today).await.is_err());

    let mut bad_qty = simple_request(100);
    bad_qty.items[0].quantity = 0;
    assert!(ledger.create_invoice(&actor, bad_qty, today).await.is_err());

    let mut bad_tax = simple_request(100);
    bad_tax.tax_amount = -1;
    assert!(ledger.create_invoice(&actor, bad_tax, today).await.is_err());
}

#[tokio::test]
async fn test_amount_overflow_rejected() {
    let pool = setup_pool().await;
    let actor = seed_operator(&pool).await;
    let ledger = LedgerService::new(pool.clone(), TZ);
    let today = today_in_tz();

    // 乘积溢出 i64
    let mut huge = simple_request(i64::MAX / 2 + 1);
    huge.items[0].quantity = 2;
    let err = ledger
        .create_invoice(&actor, huge, today)
        .await
        .expect_err("overflowing product must be rejected");
    assert!(err.to_string().contains("supported range"), "got: {}", err);

    // 销售额 + 税额溢出
    let mut tax_overflow = simple_request(i64::MAX);
    tax_overflow.tax_amount = 1;
    assert!(
        ledger
            .create_invoice(&actor, tax_overflow, today)
            .await
            .is_err()
    );

    // 拒绝发生在写入之前，不应留下任何发票行
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_file_backed_db_persists_across_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("einvoice.db");
    let db_path = db_path.to_str().expect("utf8 path");

    {
        let db = DbService::new(db_path).await.expect("open");
        DbService::seed_default_admin(&db.pool).await.expect("seed");
        db.pool.close().await;
    }

    let db = DbService::new(db_path).await.expect("reopen");
    let admins: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = 'admin'")
            .fetch_one(&db.pool)
            .await
            .expect("count admins");
    assert_eq!(admins, 1);

    // 播种只在空表时发生，重开不会再建账号
    DbService::seed_default_admin(&db.pool).await.expect("seed again");
    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&db.pool)
        .await
        .expect("count users");
    assert_eq!(admins, 1);
}

#[tokio::test]
async fn test_audit_chain_stays_intact() {
    use einvoice_server::audit::AuditService;

    let pool = setup_pool().await;
    let actor = seed_operator(&pool).await;
    let ledger = LedgerService::new(pool.clone(), TZ);
    let today = today_in_tz();

    let created = ledger
        .create_invoice(&actor, simple_request(300), today)
        .await
        .expect("create");
    ledger
        .create_invoice(&actor, simple_request(700), today)
        .await
        .expect("create");
    ledger
        .void_invoice(&actor, &created.invoice.id, "測試作廢")
        .await
        .expect("void");

    let audit = AuditService::new(pool.clone());
    let verification = audit.verify_chain().await.expect("verify");
    assert!(verification.chain_intact);
    assert_eq!(verification.total_entries, 3);

    // 篡改一条记录后链必须断裂
    sqlx::query("UPDATE audit_logs SET details = '{\"forged\":true}' WHERE id = 1")
        .execute(&pool)
        .await
        .expect("tamper");

    let verification = audit.verify_chain().await.expect("verify");
    assert!(!verification.chain_intact);
    assert!(!verification.breaks.is_empty());
}
