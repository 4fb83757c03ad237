// ==========================================
// 停车场系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,校验输入并归类错误
// ==========================================

pub mod error;
pub mod parking_api;
pub mod validator;

// 重导出核心类型
pub use error::{ApiError, ApiResult, ErrorKind};
pub use parking_api::{AllocationResult, ParkingApi};
pub use validator::{validate_method, validate_payment_amount, validate_plate};
