// ==========================================
// 停车场系统 - 主入口
// ==========================================
// 启动: 日志 → 配置 → 台账 → API,输出当前车场概况
// ==========================================

use anyhow::Context;
use parking_lot_system::config::{default_db_path, ConfigManager};
use parking_lot_system::repository::SqliteFineLedger;
use parking_lot_system::{logging, ParkingApi, APP_NAME, VERSION};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", APP_NAME, VERSION);
    tracing::info!("==================================================");

    let db_path = default_db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("无法创建数据目录: {}", parent.display()))?;
    }
    let db_path = db_path.to_string_lossy().to_string();
    tracing::info!("使用数据库: {}", db_path);

    let config = ConfigManager::new(&db_path)
        .context("无法打开配置库")?
        .load_lot_config()
        .context("车场配置不合法")?;

    let ledger = Arc::new(SqliteFineLedger::open(&db_path).context("无法打开罚款台账")?);
    let api = ParkingApi::from_config(&config, ledger).context("无法初始化车场")?;

    let summary = api.lot_summary()?;
    println!(
        "车场 {}: 共 {} 个车位, 已占用 {}, 空闲 {} ({:.1}%)",
        api.catalog().lot_id(),
        summary.total,
        summary.occupied,
        summary.available,
        summary.occupancy_rate
    );
    for floor in api.floor_summaries()? {
        println!(
            "  {}F: 已占用 {}/{}",
            floor.floor.unwrap_or_default(),
            floor.occupied,
            floor.total
        );
    }

    let outstanding = api.outstanding_snapshot()?;
    if outstanding.is_empty() {
        println!("无未结清罚款");
    } else {
        println!("未结清罚款:");
        for (plate, amount) in outstanding {
            println!("  {}: RM{:.2}", plate, amount);
        }
    }
    println!("支持的付款方式: {}", api.payment_methods().join(", "));

    Ok(())
}
