// ==========================================
// 停车场系统 - 配置层
// ==========================================
// 职责: 车场规模与罚款参数,支持数据库覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod lot_config;

pub use config_manager::{config_keys, default_db_path, ConfigManager};
pub use lot_config::LotConfig;
