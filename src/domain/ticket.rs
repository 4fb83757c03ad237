// ==========================================
// 停车场系统 - 入场票据
// ==========================================
// 票据ID: T-<车牌>-<入场时间 yyyyMMddHHmmss>
// 精度为秒: 同一车牌同一秒内再次入场会得到相同ID（票据存储取最新一行）
// ==========================================

use crate::domain::types::SpotCategory;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const TICKET_ID_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

/// 生成票据ID
pub fn format_ticket_id(plate: &str, entry_time: NaiveDateTime) -> String {
    format!("T-{}-{}", plate, entry_time.format(TICKET_ID_TIME_FORMAT))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: String,
    pub plate: String,
    pub spot_id: String,
    pub category: SpotCategory,
    pub entry_time: NaiveDateTime,
}

impl Ticket {
    pub fn issue(plate: &str, spot_id: &str, category: SpotCategory, entry_time: NaiveDateTime) -> Self {
        Self {
            ticket_id: format_ticket_id(plate, entry_time),
            plate: plate.to_string(),
            spot_id: spot_id.to_string(),
            category,
            entry_time,
        }
    }

    /// 展示用入场时间
    pub fn formatted_entry_time(&self) -> String {
        self.entry_time.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_ticket_id_format() {
        let entry = NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 1)
            .unwrap();
        let ticket = Ticket::issue("WXY1234", "F1-R1-S3", SpotCategory::Compact, entry);
        assert_eq!(ticket.ticket_id, "T-WXY1234-20250307090501");
        assert_eq!(ticket.formatted_entry_time(), "2025-03-07 09:05:01");
    }
}
