// ==========================================
// 停车场系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、值对象、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod billing;
pub mod session;
pub mod spot;
pub mod ticket;
pub mod types;
pub mod vehicle;

// 重导出核心类型
pub use billing::{Bill, Payment, Receipt};
pub use session::ParkingSession;
pub use spot::{format_spot_id, ParkingSpot};
pub use ticket::{format_ticket_id, Ticket};
pub use types::{FineReason, SpotCategory, SpotStatus, VehicleType};
pub use vehicle::Vehicle;
