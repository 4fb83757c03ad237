// ==========================================
// 停车场系统 - 计费引擎
// ==========================================
// 职责: 时长向上取整 + 类别费率 + 残障豁免
// 红线: 纯计算,不修改任何实体
// ==========================================

use crate::domain::billing::Bill;
use crate::domain::session::ParkingSession;
use crate::domain::spot::ParkingSpot;
use crate::domain::types::SpotCategory;
use crate::domain::vehicle::Vehicle;
use chrono::NaiveDateTime;

/// 计费小时数
///
/// - exit <= entry → 0
/// - 否则 ceil(经过分钟 / 60),不足一小时按一小时
///
/// 分钟按整分钟截断（与 Duration::num_minutes 一致）
pub fn billable_hours(entry: NaiveDateTime, exit: NaiveDateTime) -> i64 {
    let minutes = (exit - entry).num_minutes();
    if minutes <= 0 {
        return 0;
    }
    (minutes + 59) / 60
}

/// 是否免收停车费: 豁免车辆停在残障车位
pub fn is_fee_exempt(vehicle: &Vehicle, spot: &ParkingSpot) -> bool {
    vehicle.handicapped_exempt() && spot.category == SpotCategory::Handicapped
}

// ==========================================
// BillingEngine - 计费引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct BillingEngine;

impl BillingEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn billable_hours(&self, entry: NaiveDateTime, exit: NaiveDateTime) -> i64 {
        billable_hours(entry, exit)
    }

    /// 生成账单
    ///
    /// # 参数
    /// - session: 活动会话（提供入场时间）
    /// - spot: 车位（提供类别与费率）
    /// - vehicle: 车辆（提供豁免标志）
    /// - exit_time: 出场/预览时间
    /// - fine_amount: 本次计入账单的罚款
    ///
    /// 会话上 fee_billed 部分已在此前结算中计入,本次只收增量
    pub fn build_bill(
        &self,
        session: &ParkingSession,
        spot: &ParkingSpot,
        vehicle: &Vehicle,
        exit_time: NaiveDateTime,
        fine_amount: f64,
    ) -> Bill {
        let hours = billable_hours(session.entry_time, exit_time);
        let rate = spot.hourly_rate();
        let gross_fee = if is_fee_exempt(vehicle, spot) {
            0.0
        } else {
            hours as f64 * rate
        };
        let credited = session.fee_billed.clamp(0.0, gross_fee);

        Bill::new(
            vehicle.plate(),
            spot.spot_id.clone(),
            hours,
            rate,
            gross_fee - credited,
            fine_amount,
        )
        .with_fee_credited(credited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    fn session_at(vehicle: &Vehicle, spot: &ParkingSpot) -> ParkingSession {
        ParkingSession::new("S-1".to_string(), vehicle.clone(), spot.spot_id.clone(), t0())
    }

    #[test]
    fn test_billable_hours_rounding() {
        let t = t0();
        assert_eq!(billable_hours(t, t), 0);
        assert_eq!(billable_hours(t, t + Duration::minutes(1)), 1);
        assert_eq!(billable_hours(t, t + Duration::minutes(60)), 1);
        assert_eq!(billable_hours(t, t + Duration::minutes(61)), 2);
        assert_eq!(billable_hours(t, t + Duration::minutes(120)), 2);
        assert_eq!(billable_hours(t, t - Duration::minutes(30)), 0);
        // 不足一分钟按 0 分钟
        assert_eq!(billable_hours(t, t + Duration::seconds(59)), 0);
    }

    #[test]
    fn test_billable_hours_monotonic() {
        let t = t0();
        let mut last = 0;
        for m in 0..600 {
            let h = billable_hours(t, t + Duration::minutes(m));
            assert!(h >= last);
            last = h;
        }
    }

    #[test]
    fn test_bill_regular_ninety_minutes() {
        let spot = ParkingSpot::new(1, 1, 1, SpotCategory::Regular);
        let vehicle = Vehicle::car("C1");
        let bill = BillingEngine::new().build_bill(
            &session_at(&vehicle, &spot),
            &spot,
            &vehicle,
            t0() + Duration::minutes(90),
            0.0,
        );
        assert_eq!(bill.hours(), 2);
        assert_eq!(bill.parking_fee(), 10.0);
        assert_eq!(bill.total_due(), 10.0);
    }

    #[test]
    fn test_handicapped_exempt_only_on_handicapped_spot() {
        let vehicle = Vehicle::handicapped("H1");
        let engine = BillingEngine::new();

        let h_spot = ParkingSpot::new(1, 1, 7, SpotCategory::Handicapped);
        let bill = engine.build_bill(
            &session_at(&vehicle, &h_spot),
            &h_spot,
            &vehicle,
            t0() + Duration::hours(30),
            50.0,
        );
        assert_eq!(bill.parking_fee(), 0.0);
        assert_eq!(bill.total_due(), 50.0);

        let r_spot = ParkingSpot::new(1, 1, 1, SpotCategory::Regular);
        let bill = engine.build_bill(
            &session_at(&vehicle, &r_spot),
            &r_spot,
            &vehicle,
            t0() + Duration::hours(3),
            0.0,
        );
        assert_eq!(bill.parking_fee(), 15.0);
    }

    #[test]
    fn test_previously_billed_fee_is_not_charged_again() {
        let spot = ParkingSpot::new(1, 1, 1, SpotCategory::Regular);
        let vehicle = Vehicle::car("C1");
        let mut session = session_at(&vehicle, &spot);
        session.fee_billed = 10.0;
        let engine = BillingEngine::new();

        // 同一时刻再次结算: 停车费已全部计入
        let bill = engine.build_bill(&session, &spot, &vehicle, t0() + Duration::minutes(90), 4.0);
        assert_eq!(bill.parking_fee(), 0.0);
        assert_eq!(bill.fee_credited(), 10.0);
        assert_eq!(bill.gross_fee(), 10.0);
        assert_eq!(bill.total_due(), 4.0);

        // 继续停放 → 只收新增小时
        let bill = engine.build_bill(&session, &spot, &vehicle, t0() + Duration::hours(3), 0.0);
        assert_eq!(bill.parking_fee(), 5.0);
        assert_eq!(bill.gross_fee(), 15.0);
    }

    #[test]
    fn test_non_exempt_on_handicapped_spot_is_charged() {
        let vehicle = Vehicle::car("C1");
        let spot = ParkingSpot::new(1, 1, 7, SpotCategory::Handicapped);
        let bill = BillingEngine::new().build_bill(
            &session_at(&vehicle, &spot),
            &spot,
            &vehicle,
            t0() + Duration::hours(2),
            0.0,
        );
        assert_eq!(bill.parking_fee(), 4.0);
    }
}
