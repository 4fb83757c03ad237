// ==========================================
// 停车场系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 罚款台账持久化、入场票据文件
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod fine_ledger_repo;
pub mod ticket_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use fine_ledger_repo::{FineLedger, InMemoryFineLedger, SqliteFineLedger};
pub use ticket_repo::TicketFileRepository;
