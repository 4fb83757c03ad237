// ==========================================
// 配置与装配测试
// ==========================================
// 职责: config_kv 覆写 → LotConfig → ParkingApi 装配 → 票据落盘
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod config_test {
    use crate::test_helpers::{create_test_db, t0};
    use chrono::Duration;
    use parking_lot_system::config::{config_keys, ConfigManager, LotConfig};
    use parking_lot_system::repository::{InMemoryFineLedger, SqliteFineLedger};
    use parking_lot_system::{ErrorKind, ParkingApi};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_overrides_shape_the_lot() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let config_manager = ConfigManager::new(&db_path).unwrap();
        config_manager.set_value(config_keys::LOT_ID, "EAST").unwrap();
        config_manager.set_value(config_keys::FLOORS, "1").unwrap();
        config_manager.set_value(config_keys::SPOTS_PER_ROW, "5").unwrap();
        config_manager
            .set_value(config_keys::OVERSTAY_THRESHOLD_HOURS, "2")
            .unwrap();
        config_manager.set_value(config_keys::OVERSTAY_FINE, "20").unwrap();

        let dir = TempDir::new().unwrap();
        let ticket_path = dir.path().join("tickets.txt");
        config_manager
            .set_value(config_keys::TICKET_FILE, ticket_path.to_str().unwrap())
            .unwrap();

        let config = config_manager.load_lot_config().unwrap();
        assert_eq!(config.total_spots(), 10);

        let ledger = Arc::new(SqliteFineLedger::open(&db_path).unwrap());
        let api = ParkingApi::from_config(&config, ledger).unwrap();
        assert_eq!(api.catalog().lot_id(), "EAST");
        assert_eq!(api.lot_summary().unwrap().total, 10);

        let entry = api.park_at("CFG1", "SUV", false, t0()).unwrap();
        let preview = api
            .preview_bill_at("CFG1", t0() + Duration::hours(3))
            .unwrap();
        assert_eq!(preview.fines, 20.0);

        let ticket = api.find_ticket(&entry.ticket_id).unwrap().unwrap();
        assert_eq!(ticket.plate, "CFG1");
        assert_eq!(ticket.spot_id, entry.spot_id);
        assert_eq!(ticket.entry_time, t0());
        assert!(api.find_ticket("T-NOPE-1").unwrap().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = LotConfig {
            floors: 0,
            ..LotConfig::default()
        };
        let err = ParkingApi::from_config(&config, Arc::new(InMemoryFineLedger::new()))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    }

    #[test]
    fn test_snapshot_reflects_overrides() {
        let (_temp_file, db_path) = create_test_db().unwrap();
        let config_manager = ConfigManager::new(&db_path).unwrap();
        config_manager.set_value(config_keys::ROWS_PER_FLOOR, "4").unwrap();

        let snapshot = config_manager.get_config_snapshot().unwrap();
        let value: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(value["rows_per_floor"], 4);
        assert_eq!(value["lot_id"], "MAIN");
    }
}
