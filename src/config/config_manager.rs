// ==========================================
// 停车场系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value)
// 未覆写的键回退 LotConfig::default()
// ==========================================

use crate::config::lot_config::LotConfig;
use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const LOT_ID: &str = "lot_id";
    pub const FLOORS: &str = "floors";
    pub const ROWS_PER_FLOOR: &str = "rows_per_floor";
    pub const SPOTS_PER_ROW: &str = "spots_per_row";
    pub const OVERSTAY_THRESHOLD_HOURS: &str = "overstay_threshold_hours";
    pub const OVERSTAY_FINE: &str = "overstay_fine";
    pub const TICKET_FILE: &str = "ticket_file";
}

/// 默认数据库路径
///
/// 优先环境变量 PARKING_LOT_DB_PATH,其次用户数据目录,最后当前目录
pub fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("PARKING_LOT_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    match dirs::data_dir() {
        Some(data_dir) => data_dir.join("parking-lot-system").join("parking_lot.db"),
        None => PathBuf::from("./parking_lot.db"),
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 打开数据库文件并建表
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 对传入连接再次应用统一 PRAGMA 与建表（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取配置值
    ///
    /// # 返回
    /// - Some(String): 已覆写
    /// - None: 未覆写
    pub fn get_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入配置值（UPSERT）
    pub fn set_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        info!(key = %key, value = %value, "配置已更新");
        Ok(())
    }

    /// 删除覆写,恢复默认
    pub fn remove_value(&self, key: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM config_kv WHERE key = ?1", params![key])?;
        Ok(affected > 0)
    }

    /// 全部覆写项（按键排序）
    pub fn overrides(&self) -> RepositoryResult<BTreeMap<String, String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn parse_override<T: FromStr>(&self, key: &str, default: T) -> RepositoryResult<T> {
        match self.get_value(key)? {
            Some(raw) => raw.trim().parse::<T>().map_err(|_| {
                RepositoryError::ValidationError(format!("配置 {} 取值不合法: {}", key, raw))
            }),
            None => Ok(default),
        }
    }

    /// 加载生效的车场配置（默认值 + 覆写）
    ///
    /// # 错误
    /// - ValidationError: 覆写值无法解析,或合并后的配置不合法
    pub fn load_lot_config(&self) -> RepositoryResult<LotConfig> {
        let defaults = LotConfig::default();
        let config = LotConfig {
            lot_id: self
                .get_value(config_keys::LOT_ID)?
                .unwrap_or(defaults.lot_id),
            floors: self.parse_override(config_keys::FLOORS, defaults.floors)?,
            rows_per_floor: self
                .parse_override(config_keys::ROWS_PER_FLOOR, defaults.rows_per_floor)?,
            spots_per_row: self
                .parse_override(config_keys::SPOTS_PER_ROW, defaults.spots_per_row)?,
            overstay_threshold_hours: self.parse_override(
                config_keys::OVERSTAY_THRESHOLD_HOURS,
                defaults.overstay_threshold_hours,
            )?,
            overstay_fine: self
                .parse_override(config_keys::OVERSTAY_FINE, defaults.overstay_fine)?,
            ticket_file: self
                .get_value(config_keys::TICKET_FILE)?
                .unwrap_or(defaults.ticket_file),
        };

        config.validate().map_err(RepositoryError::ValidationError)?;
        debug!(?config, "车场配置已加载");
        Ok(config)
    }

    /// 生效配置快照（JSON）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let config = self.load_lot_config()?;
        serde_json::to_string(&config)
            .map_err(|e| RepositoryError::InternalError(format!("配置序列化失败: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn manager() -> ConfigManager {
        let conn = open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let mgr = manager();
        assert_eq!(mgr.load_lot_config().unwrap(), LotConfig::default());
        assert!(mgr.overrides().unwrap().is_empty());
    }

    #[test]
    fn test_override_and_remove() {
        let mgr = manager();
        mgr.set_value(config_keys::FLOORS, "5").unwrap();
        mgr.set_value(config_keys::OVERSTAY_FINE, "75.5").unwrap();
        let cfg = mgr.load_lot_config().unwrap();
        assert_eq!(cfg.floors, 5);
        assert_eq!(cfg.overstay_fine, 75.5);

        mgr.set_value(config_keys::FLOORS, "4").unwrap();
        assert_eq!(mgr.load_lot_config().unwrap().floors, 4);

        assert!(mgr.remove_value(config_keys::FLOORS).unwrap());
        assert_eq!(mgr.load_lot_config().unwrap().floors, 3);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mgr = manager();
        mgr.set_value(config_keys::SPOTS_PER_ROW, "many").unwrap();
        assert!(matches!(
            mgr.load_lot_config(),
            Err(RepositoryError::ValidationError(_))
        ));

        mgr.set_value(config_keys::SPOTS_PER_ROW, "0").unwrap();
        assert!(matches!(
            mgr.load_lot_config(),
            Err(RepositoryError::ValidationError(_))
        ));
    }

    #[test]
    fn test_snapshot_is_json() {
        let mgr = manager();
        mgr.set_value(config_keys::LOT_ID, "B2").unwrap();
        let snapshot = mgr.get_config_snapshot().unwrap();
        let parsed: LotConfig = serde_json::from_str(&snapshot).unwrap();
        assert_eq!(parsed.lot_id, "B2");
    }
}
