// ==========================================
// 停车场系统 - 车场配置
// ==========================================
// 说明: 费率固定于 SpotCategory,不在此配置
// ==========================================

use crate::engine::fine::{DEFAULT_OVERSTAY_FINE, DEFAULT_OVERSTAY_THRESHOLD_HOURS};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotConfig {
    pub lot_id: String,
    pub floors: u32,
    pub rows_per_floor: u32,
    pub spots_per_row: u32,
    /// 超时阈值（计费小时严格大于该值时罚款）
    pub overstay_threshold_hours: i64,
    pub overstay_fine: f64,
    /// 票据文件路径
    pub ticket_file: String,
}

impl Default for LotConfig {
    fn default() -> Self {
        Self {
            lot_id: "MAIN".to_string(),
            floors: 3,
            rows_per_floor: 2,
            spots_per_row: 10,
            overstay_threshold_hours: DEFAULT_OVERSTAY_THRESHOLD_HOURS,
            overstay_fine: DEFAULT_OVERSTAY_FINE,
            ticket_file: "tickets.txt".to_string(),
        }
    }
}

impl LotConfig {
    /// 校验配置取值
    ///
    /// # 返回
    /// - Err(String): 第一个不合法的字段说明
    pub fn validate(&self) -> Result<(), String> {
        if self.lot_id.trim().is_empty() {
            return Err("lot_id 不能为空".to_string());
        }
        if self.floors == 0 || self.rows_per_floor == 0 || self.spots_per_row == 0 {
            return Err(format!(
                "车场规模必须为正: floors={}, rows_per_floor={}, spots_per_row={}",
                self.floors, self.rows_per_floor, self.spots_per_row
            ));
        }
        if self.overstay_threshold_hours < 0 {
            return Err(format!(
                "overstay_threshold_hours 不能为负: {}",
                self.overstay_threshold_hours
            ));
        }
        if !self.overstay_fine.is_finite() || self.overstay_fine < 0.0 {
            return Err(format!("overstay_fine 不合法: {}", self.overstay_fine));
        }
        Ok(())
    }

    pub fn total_spots(&self) -> u32 {
        self.floors * self.rows_per_floor * self.spots_per_row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = LotConfig::default();
        assert_eq!(cfg.total_spots(), 60);
        assert_eq!(cfg.overstay_threshold_hours, 24);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: LotConfig = serde_json::from_str(r#"{"floors": 5}"#).unwrap();
        assert_eq!(cfg.floors, 5);
        assert_eq!(cfg.lot_id, "MAIN");
    }

    #[test]
    fn test_validate_rejects_zero_rows() {
        let cfg = LotConfig {
            rows_per_floor: 0,
            ..LotConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
