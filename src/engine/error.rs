// ==========================================
// 停车场系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 查找失败 =====
    #[error("车位不存在: {spot_id}")]
    SpotNotFound { spot_id: String },

    #[error("无活动会话: plate={plate}")]
    SessionNotFound { plate: String },

    #[error("会话缺少车辆信息: plate={plate}")]
    VehicleNotFound { plate: String },

    #[error("未知付款方式: {method}")]
    UnknownPaymentMethod { method: String },

    // ===== 状态冲突 =====
    #[error("车位已被占用: spot_id={spot_id}, occupant={occupant}")]
    SpotAlreadyOccupied { spot_id: String, occupant: String },

    #[error("车牌已有活动会话: plate={plate}, spot_id={spot_id}")]
    SessionAlreadyActive { plate: String, spot_id: String },

    // ===== 容量 =====
    #[error("车辆类型无可用类别: plate={plate}, vehicle_type={vehicle_type}")]
    NoEligibleCategory { plate: String, vehicle_type: String },

    #[error("无可用车位: plate={plate}")]
    NoSpotAvailable { plate: String },

    // ===== 输入 =====
    #[error("金额无效: {0}")]
    InvalidAmount(f64),

    // ===== 基础设施 =====
    #[error("锁获取失败: {0}")]
    LockPoisoned(String),

    #[error(transparent)]
    Ledger(#[from] RepositoryError),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;

impl<T> From<std::sync::PoisonError<T>> for EngineError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        EngineError::LockPoisoned(err.to_string())
    }
}
