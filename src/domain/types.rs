// ==========================================
// 停车场系统 - 领域类型定义
// ==========================================
// 职责: 车位类别、车位状态、车辆类型、罚款原因
// 红线: 类别与费率一一对应,费率不可配置
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 车位类别 (Spot Category)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与票据文件一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpotCategory {
    Compact,     // 紧凑型 RM 2/小时
    Regular,     // 普通型 RM 5/小时
    Handicapped, // 残障专用 RM 2/小时
    Reserved,    // 预留(VIP) RM 10/小时
}

impl SpotCategory {
    /// 全部类别（固定顺序）
    pub const ALL: [SpotCategory; 4] = [
        SpotCategory::Compact,
        SpotCategory::Regular,
        SpotCategory::Handicapped,
        SpotCategory::Reserved,
    ];

    /// 基础小时费率
    pub fn base_hourly_rate(&self) -> f64 {
        match self {
            SpotCategory::Compact => 2.0,
            SpotCategory::Regular => 5.0,
            SpotCategory::Handicapped => 2.0,
            SpotCategory::Reserved => 10.0,
        }
    }

    /// 展示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            SpotCategory::Compact => "Compact",
            SpotCategory::Regular => "Regular",
            SpotCategory::Handicapped => "Handicapped",
            SpotCategory::Reserved => "Reserved",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpotCategory::Compact => "COMPACT",
            SpotCategory::Regular => "REGULAR",
            SpotCategory::Handicapped => "HANDICAPPED",
            SpotCategory::Reserved => "RESERVED",
        }
    }

    /// 按楼层内流水号判定类别
    ///
    /// 规则（顺序敏感）:
    /// - 每第10个 → RESERVED
    /// - 否则每第7个 → HANDICAPPED
    /// - 否则每第3个 → COMPACT
    /// - 其余 → REGULAR
    pub fn for_floor_counter(counter: u32) -> SpotCategory {
        if counter % 10 == 0 {
            SpotCategory::Reserved
        } else if counter % 7 == 0 {
            SpotCategory::Handicapped
        } else if counter % 3 == 0 {
            SpotCategory::Compact
        } else {
            SpotCategory::Regular
        }
    }
}

impl fmt::Display for SpotCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SpotCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "COMPACT" => Ok(SpotCategory::Compact),
            "REGULAR" => Ok(SpotCategory::Regular),
            "HANDICAPPED" => Ok(SpotCategory::Handicapped),
            "RESERVED" => Ok(SpotCategory::Reserved),
            other => Err(format!("未知车位类别: {}", other)),
        }
    }
}

// ==========================================
// 车位状态 (Spot Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpotStatus {
    Available, // 空闲
    Occupied,  // 占用
}

impl fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpotStatus::Available => write!(f, "AVAILABLE"),
            SpotStatus::Occupied => write!(f, "OCCUPIED"),
        }
    }
}

// ==========================================
// 车辆类型 (Vehicle Type)
// ==========================================
// 未识别的类型保留原始输入,准入类别为空
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleType {
    Motorcycle,
    Car,
    Suv,
    Handicapped,
    Unknown(String),
}

impl VehicleType {
    /// 展示名称
    pub fn display_name(&self) -> &str {
        match self {
            VehicleType::Motorcycle => "Motorcycle",
            VehicleType::Car => "Car",
            VehicleType::Suv => "SUV",
            VehicleType::Handicapped => "Handicapped",
            VehicleType::Unknown(raw) => raw.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, VehicleType::Unknown(_))
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for VehicleType {
    type Err = std::convert::Infallible;

    /// 解析声明的车辆类型（大小写不敏感，不会失败）
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.trim().to_lowercase().as_str() {
            "motorcycle" | "motorbike" => VehicleType::Motorcycle,
            "car" => VehicleType::Car,
            "suv" | "truck" | "suv/truck" => VehicleType::Suv,
            "handicapped" => VehicleType::Handicapped,
            _ => VehicleType::Unknown(s.trim().to_string()),
        };
        Ok(parsed)
    }
}

// ==========================================
// 罚款原因 (Fine Reason)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FineReason {
    Overstay,       // 超时停车
    UnderpayAtExit, // 出场少付
    Other(String),
}

impl FineReason {
    pub fn as_str(&self) -> &str {
        match self {
            FineReason::Overstay => "OVERSTAY",
            FineReason::UnderpayAtExit => "UNDERPAY_AT_EXIT",
            FineReason::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for FineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
