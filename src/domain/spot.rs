// ==========================================
// 停车场系统 - 车位领域模型
// ==========================================
// 红线: occupant 非空 ⇔ status == OCCUPIED
// 用途: 目录初始化时创建,只由占用/释放两个迁移修改
// ==========================================

use crate::domain::types::{SpotCategory, SpotStatus};
use serde::{Deserialize, Serialize};

/// 生成车位ID: F{floor}-R{row}-S{position}
pub fn format_spot_id(floor: u32, row: u32, position: u32) -> String {
    format!("F{}-R{}-S{}", floor, row, position)
}

// ==========================================
// ParkingSpot - 车位
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSpot {
    // ===== 标识 =====
    pub spot_id: String, // F1-R1-S1
    pub floor: u32,
    pub row: u32,
    pub position: u32,

    // ===== 类别 =====
    pub category: SpotCategory,

    // ===== 占用状态 =====
    status: SpotStatus,
    occupant: Option<String>, // 车牌
}

impl ParkingSpot {
    pub fn new(floor: u32, row: u32, position: u32, category: SpotCategory) -> Self {
        Self {
            spot_id: format_spot_id(floor, row, position),
            floor,
            row,
            position,
            category,
            status: SpotStatus::Available,
            occupant: None,
        }
    }

    pub fn status(&self) -> SpotStatus {
        self.status
    }

    pub fn occupant(&self) -> Option<&str> {
        self.occupant.as_deref()
    }

    pub fn is_available(&self) -> bool {
        self.status == SpotStatus::Available
    }

    pub fn hourly_rate(&self) -> f64 {
        self.category.base_hourly_rate()
    }

    /// 占用车位
    ///
    /// # 返回
    /// - Ok(()): 已迁移为 OCCUPIED
    /// - Err(当前占用车牌): 车位已被占用,状态不变
    pub(crate) fn occupy(&mut self, plate: &str) -> Result<(), String> {
        if let Some(current) = &self.occupant {
            return Err(current.clone());
        }
        self.status = SpotStatus::Occupied;
        self.occupant = Some(plate.to_string());
        Ok(())
    }

    /// 释放车位（幂等）
    ///
    /// # 返回
    /// 释放前的占用车牌（原本空闲则为 None）
    pub(crate) fn release(&mut self) -> Option<String> {
        self.status = SpotStatus::Available;
        self.occupant.take()
    }

    /// 车位展示信息
    pub fn spot_info(&self) -> String {
        format!(
            "Spot: {} | Type: {} | Rate: RM{:.2}/hr | Status: {}",
            self.spot_id,
            self.category.display_name(),
            self.hourly_rate(),
            self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupy_then_release() {
        let mut spot = ParkingSpot::new(1, 1, 3, SpotCategory::Compact);
        assert_eq!(spot.spot_id, "F1-R1-S3");
        assert!(spot.occupy("ABC123").is_ok());
        assert_eq!(spot.status(), SpotStatus::Occupied);
        assert_eq!(spot.occupant(), Some("ABC123"));

        assert_eq!(spot.release(), Some("ABC123".to_string()));
        assert_eq!(spot.status(), SpotStatus::Available);
        assert_eq!(spot.occupant(), None);

        // 再次释放是空操作
        assert_eq!(spot.release(), None);
        assert!(spot.is_available());
    }

    #[test]
    fn test_occupy_twice_keeps_first_occupant() {
        let mut spot = ParkingSpot::new(1, 1, 1, SpotCategory::Regular);
        spot.occupy("AAA1").unwrap();
        assert_eq!(spot.occupy("BBB2"), Err("AAA1".to_string()));
        assert_eq!(spot.occupant(), Some("AAA1"));
    }

    #[test]
    fn test_spot_info() {
        let spot = ParkingSpot::new(2, 1, 10, SpotCategory::Reserved);
        assert_eq!(
            spot.spot_info(),
            "Spot: F2-R1-S10 | Type: Reserved | Rate: RM10.00/hr | Status: AVAILABLE"
        );
    }
}
