// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、车场装配、固定时间
// ==========================================

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use parking_lot_system::engine::{FineEvaluator, PaymentRegistry, SpotCatalog};
use parking_lot_system::repository::{FineLedger, InMemoryFineLedger, TicketFileRepository};
use parking_lot_system::ParkingApi;
use std::error::Error;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径非 UTF-8")?
        .to_string();

    let conn = parking_lot_system::db::open_sqlite_connection(&db_path)?;
    parking_lot_system::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 测试基准时间 2025-06-01 08:00:00
pub fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

/// 装配车场 API（内存台账,不落票据）
pub fn build_api(floors: u32, rows: u32, spots_per_row: u32) -> (ParkingApi, Arc<InMemoryFineLedger>) {
    let ledger = Arc::new(InMemoryFineLedger::new());
    let api = build_api_with_ledger(floors, rows, spots_per_row, ledger.clone(), None);
    (api, ledger)
}

/// 装配车场 API（指定台账与票据存储）
pub fn build_api_with_ledger(
    floors: u32,
    rows: u32,
    spots_per_row: u32,
    ledger: Arc<dyn FineLedger>,
    tickets: Option<Arc<TicketFileRepository>>,
) -> ParkingApi {
    ParkingApi::new(
        Arc::new(SpotCatalog::initialize(floors, rows, spots_per_row)),
        Arc::new(FineEvaluator::with_default_policy(ledger)),
        PaymentRegistry::default(),
        tickets,
    )
}
