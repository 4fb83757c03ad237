// ==========================================
// 停车场系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,把引擎/仓储错误归入统一分类
// 分类: NotFound / InvalidState / ValidationFailure / NoCapacity / Internal
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// 车位/会话/车辆/付款方式查找失败
    NotFound,
    /// 状态冲突（车位已占用、车牌已在场）
    InvalidState,
    /// 输入不合法（空车牌、非正金额）
    ValidationFailure,
    /// 无可用车位
    NoCapacity,
    /// 存储/锁等基础设施故障
    Internal,
}

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 业务错误 =====
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("状态冲突: {0}")]
    InvalidState(String),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("车位不足: {0}")]
    NoCapacity(String),

    // ===== 数据访问错误 =====
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("票据存储错误: {0}")]
    TicketStoreError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::InvalidState(_) => ErrorKind::InvalidState,
            ApiError::InvalidInput(_) => ErrorKind::ValidationFailure,
            ApiError::NoCapacity(_) => ErrorKind::NoCapacity,
            ApiError::DatabaseError(_)
            | ApiError::TicketStoreError(_)
            | ApiError::InternalError(_)
            | ApiError::Other(_) => ErrorKind::Internal,
        }
    }

    /// 是否为可恢复错误（调用方应重新提示用户,而非中止）
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ValidationFailure | ErrorKind::NoCapacity
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::InternalError(format!("数据库锁获取失败: {}", msg))
            }
            err @ RepositoryError::SchemaVersionMismatch { .. } => {
                ApiError::DatabaseError(err.to_string())
            }
            RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::UniqueConstraintViolation(msg) => ApiError::DatabaseError(msg),
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
            err @ (RepositoryError::TicketFormat { .. } | RepositoryError::Io(_)) => {
                ApiError::TicketStoreError(err.to_string())
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            e @ (EngineError::SpotNotFound { .. }
            | EngineError::SessionNotFound { .. }
            | EngineError::VehicleNotFound { .. }
            | EngineError::UnknownPaymentMethod { .. }) => ApiError::NotFound(e.to_string()),

            e @ (EngineError::SpotAlreadyOccupied { .. }
            | EngineError::SessionAlreadyActive { .. }) => ApiError::InvalidState(e.to_string()),

            e @ (EngineError::NoEligibleCategory { .. } | EngineError::NoSpotAvailable { .. }) => {
                ApiError::NoCapacity(e.to_string())
            }

            e @ EngineError::InvalidAmount(_) => ApiError::InvalidInput(e.to_string()),

            EngineError::LockPoisoned(msg) => {
                ApiError::InternalError(format!("锁获取失败: {}", msg))
            }
            EngineError::Ledger(repo) => ApiError::from(repo),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_classification() {
        let cases = vec![
            (
                EngineError::SessionNotFound { plate: "P".into() },
                ErrorKind::NotFound,
                false,
            ),
            (
                EngineError::SpotAlreadyOccupied {
                    spot_id: "F1-R1-S1".into(),
                    occupant: "Q".into(),
                },
                ErrorKind::InvalidState,
                false,
            ),
            (
                EngineError::NoEligibleCategory {
                    plate: "P".into(),
                    vehicle_type: "Bus".into(),
                },
                ErrorKind::NoCapacity,
                true,
            ),
            (
                EngineError::NoSpotAvailable { plate: "P".into() },
                ErrorKind::NoCapacity,
                true,
            ),
            (EngineError::InvalidAmount(-1.0), ErrorKind::ValidationFailure, true),
            (
                EngineError::LockPoisoned("x".into()),
                ErrorKind::Internal,
                false,
            ),
        ];

        for (engine_err, kind, recoverable) in cases {
            let api_err = ApiError::from(engine_err);
            assert_eq!(api_err.kind(), kind, "{}", api_err);
            assert_eq!(api_err.is_recoverable(), recoverable, "{}", api_err);
        }
    }

    #[test]
    fn test_repository_error_through_engine() {
        let err = ApiError::from(EngineError::Ledger(RepositoryError::ValidationError(
            "负数".into(),
        )));
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);

        let err = ApiError::from(RepositoryError::LockError("poisoned".into()));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
