// ==========================================
// 停车场系统 - 核心库
// ==========================================
// 职责: 多层车场的车位分配、计费、罚款台账与出场结算
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 台账与票据
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 车场配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{FineReason, SpotCategory, SpotStatus, VehicleType};

// 领域实体
pub use domain::{Bill, ParkingSession, ParkingSpot, Payment, Receipt, Ticket, Vehicle};

// 引擎
pub use engine::{
    AllocationEngine, BillingEngine, ExitOrchestrator, FineEvaluator, PaymentRegistry,
    SessionTracker, SpotCatalog,
};

// 仓储
pub use repository::{FineLedger, InMemoryFineLedger, SqliteFineLedger, TicketFileRepository};

// API
pub use api::{ApiError, ErrorKind, ParkingApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "停车场管理系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
