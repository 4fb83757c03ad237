// ==========================================
// 停车场系统 - 车辆领域模型
// ==========================================
// 用途: 入场时由车牌 + 声明类型 + 残障证标志构造,之后不可变
// ==========================================

use crate::domain::types::VehicleType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    plate: String,
    vehicle_type: VehicleType,
    handicapped_card_holder: bool,
}

impl Vehicle {
    pub fn new(plate: impl Into<String>, vehicle_type: VehicleType, handicapped_card_holder: bool) -> Self {
        Self {
            plate: plate.into(),
            vehicle_type,
            handicapped_card_holder,
        }
    }

    pub fn motorcycle(plate: impl Into<String>) -> Self {
        Self::new(plate, VehicleType::Motorcycle, false)
    }

    pub fn car(plate: impl Into<String>) -> Self {
        Self::new(plate, VehicleType::Car, false)
    }

    pub fn suv(plate: impl Into<String>) -> Self {
        Self::new(plate, VehicleType::Suv, false)
    }

    /// 残障登记车辆（自带残障证）
    pub fn handicapped(plate: impl Into<String>) -> Self {
        Self::new(plate, VehicleType::Handicapped, true)
    }

    pub fn plate(&self) -> &str {
        &self.plate
    }

    pub fn vehicle_type(&self) -> &VehicleType {
        &self.vehicle_type
    }

    /// 是否享受残障豁免
    ///
    /// 残障登记车辆,或持残障证的任意车型
    pub fn handicapped_exempt(&self) -> bool {
        self.handicapped_card_holder || self.vehicle_type == VehicleType::Handicapped
    }

    pub fn display_type(&self) -> &str {
        self.vehicle_type.display_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exemption_flag() {
        assert!(Vehicle::handicapped("H1").handicapped_exempt());
        assert!(Vehicle::new("C1", VehicleType::Car, true).handicapped_exempt());
        assert!(!Vehicle::car("C2").handicapped_exempt());
        assert_eq!(Vehicle::suv("S1").display_type(), "SUV");
    }
}
