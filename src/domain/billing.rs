// ==========================================
// 停车场系统 - 账单 / 付款 / 收据值对象
// ==========================================
// 红线: 值对象创建后不可变
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Bill - 账单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    plate: String,
    spot_id: String,
    hours: i64,        // 计费小时（向上取整）
    hourly_rate: f64,  // 车位类别费率
    parking_fee: f64,  // hours * rate - fee_credited（豁免时为 0）
    fee_credited: f64, // 此前结算已计入的停车费
    fines: f64,        // 罚款合计
    total_due: f64,    // parking_fee + fines
}

impl Bill {
    pub fn new(
        plate: impl Into<String>,
        spot_id: impl Into<String>,
        hours: i64,
        hourly_rate: f64,
        parking_fee: f64,
        fines: f64,
    ) -> Self {
        Self {
            plate: plate.into(),
            spot_id: spot_id.into(),
            hours,
            hourly_rate,
            parking_fee,
            fee_credited: 0.0,
            fines,
            total_due: parking_fee + fines,
        }
    }

    /// 标注此前已计入结算的停车费（parking_fee 已扣除该部分）
    pub fn with_fee_credited(mut self, fee_credited: f64) -> Self {
        self.fee_credited = fee_credited;
        self
    }

    pub fn plate(&self) -> &str {
        &self.plate
    }

    pub fn spot_id(&self) -> &str {
        &self.spot_id
    }

    pub fn hours(&self) -> i64 {
        self.hours
    }

    pub fn hourly_rate(&self) -> f64 {
        self.hourly_rate
    }

    pub fn parking_fee(&self) -> f64 {
        self.parking_fee
    }

    pub fn fee_credited(&self) -> f64 {
        self.fee_credited
    }

    /// 从入场起累计的停车费
    pub fn gross_fee(&self) -> f64 {
        self.parking_fee + self.fee_credited
    }

    pub fn fines(&self) -> f64 {
        self.fines
    }

    pub fn total_due(&self) -> f64 {
        self.total_due
    }
}

// ==========================================
// Payment - 付款结算记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: f64,
    pub method: String,
    pub paid_at: NaiveDateTime,
}

impl Payment {
    /// 余额 = 实付 - 应付（≥0 找零,<0 欠款）
    pub fn balance_against(&self, bill: &Bill) -> f64 {
        self.amount - bill.total_due()
    }
}

// ==========================================
// Receipt - 出场收据
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub plate: String,
    pub spot_id: String,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,

    // ===== 计费明细 =====
    pub hours: i64,
    pub hourly_rate: f64,
    pub parking_fee: f64,
    #[serde(default)]
    pub fee_credited: f64,
    pub fines: f64,

    // ===== 付款明细 =====
    pub amount_paid: f64,
    pub method: String,
    pub balance: f64, // 正数为找零,负数为欠款
}

impl Receipt {
    pub fn total_due(&self) -> f64 {
        self.parking_fee + self.fines
    }

    pub fn is_fully_settled(&self) -> bool {
        self.balance >= 0.0
    }

    /// 文本收据
    pub fn format(&self) -> String {
        let balance_label = if self.balance >= 0.0 { "Change" } else { "Outstanding" };
        let mut out = String::new();
        out.push_str("==== EXIT RECEIPT ====\n");
        out.push_str(&format!("Plate      : {}\n", self.plate));
        out.push_str(&format!("Spot       : {}\n", self.spot_id));
        out.push_str(&format!("Entry Time : {}\n", self.entry_time.format("%Y-%m-%d %H:%M:%S")));
        out.push_str(&format!("Exit  Time : {}\n", self.exit_time.format("%Y-%m-%d %H:%M:%S")));
        out.push_str("----------------------\n");
        out.push_str(&format!("Billable Hours (ceil): {}\n", self.hours));
        out.push_str(&format!("Rate (RM/hr)         : {:.2}\n", self.hourly_rate));
        out.push_str(&format!(
            "Breakdown            : {} x RM {:.2} = RM {:.2}\n",
            self.hours,
            self.hourly_rate,
            self.parking_fee + self.fee_credited
        ));
        if self.fee_credited > 0.0 {
            out.push_str(&format!("Previously Billed    : RM {:.2}\n", self.fee_credited));
        }
        out.push_str(&format!("Parking Fee          : RM {:.2}\n", self.parking_fee));
        out.push_str(&format!("Fines                : RM {:.2}\n", self.fines));
        out.push_str(&format!("TOTAL DUE            : RM {:.2}\n", self.total_due()));
        out.push_str("----------------------\n");
        out.push_str(&format!("Paid ({})       : RM {:.2}\n", self.method, self.amount_paid));
        out.push_str(&format!("{:<21}: RM {:.2}\n", balance_label, self.balance.abs()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_bill_total_due() {
        let bill = Bill::new("P1", "F1-R1-S1", 2, 5.0, 10.0, 50.0);
        assert_eq!(bill.total_due(), 60.0);
    }

    #[test]
    fn test_receipt_format_outstanding_label() {
        let t = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let receipt = Receipt {
            plate: "P1".to_string(),
            spot_id: "F1-R1-S1".to_string(),
            entry_time: t,
            exit_time: t,
            hours: 2,
            hourly_rate: 5.0,
            parking_fee: 10.0,
            fee_credited: 0.0,
            fines: 0.0,
            amount_paid: 6.0,
            method: "CASH".to_string(),
            balance: -4.0,
        };
        let text = receipt.format();
        assert!(text.contains("TOTAL DUE            : RM 10.00"));
        assert!(text.contains("Outstanding"));
        assert!(text.contains("RM 4.00"));
        assert!(!receipt.is_fully_settled());
        assert!(!text.contains("Previously Billed"));
    }

    #[test]
    fn test_receipt_format_shows_previously_billed_fee() {
        let t = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let receipt = Receipt {
            plate: "P1".to_string(),
            spot_id: "F1-R1-S1".to_string(),
            entry_time: t,
            exit_time: t,
            hours: 3,
            hourly_rate: 5.0,
            parking_fee: 5.0,
            fee_credited: 10.0,
            fines: 4.0,
            amount_paid: 9.0,
            method: "CASH".to_string(),
            balance: 0.0,
        };
        let text = receipt.format();
        assert!(text.contains("3 x RM 5.00 = RM 15.00"));
        assert!(text.contains("Previously Billed    : RM 10.00"));
        assert!(text.contains("TOTAL DUE            : RM 9.00"));
    }
}
