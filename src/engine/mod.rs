// ==========================================
// 停车场系统 - 引擎层
// ==========================================
// 职责: 车位目录、分配、会话、计费、罚款、付款、出场编排
// 红线: Engine 不拼 SQL,持久化经 repository 层 trait
// ==========================================

pub mod allocation;
pub mod billing;
pub mod error;
pub mod fine;
pub mod orchestrator;
pub mod payment;
pub mod session_tracker;
pub mod spot_catalog;

// 重导出核心引擎
pub use allocation::{eligible_categories, AllocationEngine};
pub use billing::{billable_hours, is_fee_exempt, BillingEngine};
pub use error::{EngineError, EngineResult};
pub use fine::{FineAssessment, FineEvaluator, FinePolicy, FixedOverstayPolicy};
pub use orchestrator::{round_currency, ExitOrchestrator};
pub use payment::{CardPayment, CashPayment, PaymentMethod, PaymentRegistry};
pub use session_tracker::{PlateLocks, SessionTracker};
pub use spot_catalog::{OccupancySummary, SpotCatalog};
