// ==========================================
// 停车场系统 - 罚款评估
// ==========================================
// 职责: 按罚款策略判定本次新增罚款,并写入台账
// 红线: 只计算"新增"罚款,不合并历史欠款（由出场编排器负责）
// ==========================================
// 策略可在运行时替换（管理端切换罚款方案）
// ==========================================

use crate::domain::session::ParkingSession;
use crate::domain::spot::ParkingSpot;
use crate::domain::types::FineReason;
use crate::domain::vehicle::Vehicle;
use crate::engine::billing::billable_hours;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::fine_ledger_repo::FineLedger;
use chrono::NaiveDateTime;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// 默认超时阈值（小时）
pub const DEFAULT_OVERSTAY_THRESHOLD_HOURS: i64 = 24;

/// 默认超时罚款（固定金额）
pub const DEFAULT_OVERSTAY_FINE: f64 = 50.0;

// ==========================================
// FineAssessment - 罚款判定结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct FineAssessment {
    pub amount: f64,
    pub reason: FineReason,
}

// ==========================================
// Trait: FinePolicy
// ==========================================
pub trait FinePolicy: Send + Sync {
    /// 策略名称
    fn name(&self) -> &str;

    /// 判定罚款（纯计算）
    ///
    /// # 返回
    /// - Some: 需罚款
    /// - None: 无罚款
    fn assess(
        &self,
        session: &ParkingSession,
        spot: &ParkingSpot,
        vehicle: &Vehicle,
        at: NaiveDateTime,
    ) -> Option<FineAssessment>;
}

// ==========================================
// FixedOverstayPolicy - 固定金额超时罚款
// ==========================================
// 计费小时（向上取整）严格大于阈值时罚固定金额
#[derive(Debug, Clone)]
pub struct FixedOverstayPolicy {
    threshold_hours: i64,
    amount: f64,
}

impl FixedOverstayPolicy {
    pub fn new(threshold_hours: i64, amount: f64) -> Self {
        Self {
            threshold_hours,
            amount,
        }
    }

    pub fn threshold_hours(&self) -> i64 {
        self.threshold_hours
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }
}

impl Default for FixedOverstayPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_OVERSTAY_THRESHOLD_HOURS, DEFAULT_OVERSTAY_FINE)
    }
}

impl FinePolicy for FixedOverstayPolicy {
    fn name(&self) -> &str {
        "FIXED_OVERSTAY"
    }

    fn assess(
        &self,
        session: &ParkingSession,
        _spot: &ParkingSpot,
        _vehicle: &Vehicle,
        at: NaiveDateTime,
    ) -> Option<FineAssessment> {
        let hours = billable_hours(session.entry_time, at);
        if hours > self.threshold_hours {
            Some(FineAssessment {
                amount: self.amount,
                reason: FineReason::Overstay,
            })
        } else {
            None
        }
    }
}

// ==========================================
// FineEvaluator - 罚款评估器
// ==========================================
pub struct FineEvaluator {
    policy: RwLock<Arc<dyn FinePolicy>>,
    ledger: Arc<dyn FineLedger>,
}

impl FineEvaluator {
    pub fn new(policy: Arc<dyn FinePolicy>, ledger: Arc<dyn FineLedger>) -> Self {
        Self {
            policy: RwLock::new(policy),
            ledger,
        }
    }

    /// 使用默认固定超时策略
    pub fn with_default_policy(ledger: Arc<dyn FineLedger>) -> Self {
        Self::new(Arc::new(FixedOverstayPolicy::default()), ledger)
    }

    pub fn ledger(&self) -> &Arc<dyn FineLedger> {
        &self.ledger
    }

    /// 替换罚款策略
    pub fn set_policy(&self, policy: Arc<dyn FinePolicy>) -> EngineResult<()> {
        let mut current = self.policy.write()?;
        info!(from = %current.name(), to = %policy.name(), "罚款策略已切换");
        *current = policy;
        Ok(())
    }

    pub fn policy_name(&self) -> EngineResult<String> {
        Ok(self.policy.read()?.name().to_string())
    }

    /// 判定新增罚款,不写台账
    pub fn assess(
        &self,
        session: &ParkingSession,
        spot: &ParkingSpot,
        vehicle: &Vehicle,
        at: NaiveDateTime,
    ) -> EngineResult<Option<FineAssessment>> {
        let policy = self.policy.read()?.clone();
        Ok(policy.assess(session, spot, vehicle, at))
    }

    /// 判定新增罚款并写入台账
    ///
    /// # 返回
    /// 本次新增罚款金额（无罚款为 0）
    pub fn evaluate_and_record(
        &self,
        session: &ParkingSession,
        spot: &ParkingSpot,
        vehicle: &Vehicle,
        at: NaiveDateTime,
    ) -> EngineResult<f64> {
        match self.assess(session, spot, vehicle, at)? {
            Some(fine) => {
                self.ledger
                    .accrue(&session.plate, fine.amount, fine.reason.as_str())?;
                info!(
                    plate = %session.plate,
                    amount = fine.amount,
                    reason = %fine.reason,
                    "新增罚款已入账"
                );
                Ok(fine.amount)
            }
            None => {
                debug!(plate = %session.plate, "无新增罚款");
                Ok(0.0)
            }
        }
    }

    /// 记录欠款（出场少付等）
    ///
    /// # 返回
    /// 入账后的余额
    pub fn record_outstanding(&self, plate: &str, amount: f64, reason: &FineReason) -> EngineResult<f64> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(EngineError::InvalidAmount(amount));
        }
        Ok(self.ledger.accrue(plate, amount, reason.as_str())?)
    }

    /// 豁免车牌全部欠款
    ///
    /// # 返回
    /// 豁免前的余额
    pub fn waive(&self, plate: &str) -> EngineResult<f64> {
        Ok(self.ledger.clear(plate)?)
    }

    /// 出场对账: 台账余额原子地置为少付金额（0 则移除条目）
    ///
    /// # 返回
    /// 对账前的余额
    pub fn settle(&self, plate: &str, shortfall: f64) -> EngineResult<f64> {
        if !shortfall.is_finite() || shortfall < 0.0 {
            return Err(EngineError::InvalidAmount(shortfall));
        }
        Ok(self
            .ledger
            .settle(plate, shortfall, FineReason::UnderpayAtExit.as_str())?)
    }

    pub fn outstanding(&self, plate: &str) -> EngineResult<f64> {
        Ok(self.ledger.outstanding(plate)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::SpotCategory;
    use crate::repository::fine_ledger_repo::InMemoryFineLedger;
    use chrono::{Duration, NaiveDate};

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn fixture() -> (ParkingSession, ParkingSpot, Vehicle) {
        let vehicle = Vehicle::car("C1");
        let spot = ParkingSpot::new(1, 1, 1, SpotCategory::Regular);
        let session = ParkingSession::new("S".to_string(), vehicle.clone(), spot.spot_id.clone(), t0());
        (session, spot, vehicle)
    }

    #[test]
    fn test_no_fine_at_exactly_threshold() {
        let (session, spot, vehicle) = fixture();
        let policy = FixedOverstayPolicy::default();
        assert!(policy
            .assess(&session, &spot, &vehicle, t0() + Duration::hours(24))
            .is_none());
        // 24小时零1分钟 → 计费25小时 → 罚款
        let fine = policy
            .assess(&session, &spot, &vehicle, t0() + Duration::minutes(24 * 60 + 1))
            .unwrap();
        assert_eq!(fine.amount, 50.0);
        assert_eq!(fine.reason, FineReason::Overstay);
    }

    #[test]
    fn test_evaluate_and_record_writes_ledger() {
        let ledger = Arc::new(InMemoryFineLedger::new());
        let evaluator = FineEvaluator::with_default_policy(ledger.clone());
        let (session, spot, vehicle) = fixture();

        let fine = evaluator
            .evaluate_and_record(&session, &spot, &vehicle, t0() + Duration::hours(30))
            .unwrap();
        assert_eq!(fine, 50.0);
        assert_eq!(ledger.outstanding("C1").unwrap(), 50.0);

        let none = evaluator
            .evaluate_and_record(&session, &spot, &vehicle, t0() + Duration::hours(2))
            .unwrap();
        assert_eq!(none, 0.0);
        assert_eq!(ledger.outstanding("C1").unwrap(), 50.0);
    }

    #[test]
    fn test_assess_does_not_write_ledger() {
        let ledger = Arc::new(InMemoryFineLedger::new());
        let evaluator = FineEvaluator::with_default_policy(ledger.clone());
        let (session, spot, vehicle) = fixture();
        let fine = evaluator
            .assess(&session, &spot, &vehicle, t0() + Duration::hours(48))
            .unwrap();
        assert!(fine.is_some());
        assert_eq!(ledger.outstanding("C1").unwrap(), 0.0);
    }

    #[test]
    fn test_set_policy_changes_threshold() {
        let ledger = Arc::new(InMemoryFineLedger::new());
        let evaluator = FineEvaluator::with_default_policy(ledger);
        let (session, spot, vehicle) = fixture();
        evaluator
            .set_policy(Arc::new(FixedOverstayPolicy::new(2, 20.0)))
            .unwrap();
        let fine = evaluator
            .assess(&session, &spot, &vehicle, t0() + Duration::hours(3))
            .unwrap()
            .unwrap();
        assert_eq!(fine.amount, 20.0);
        assert_eq!(evaluator.policy_name().unwrap(), "FIXED_OVERSTAY");
    }

    #[test]
    fn test_record_outstanding_rejects_negative() {
        let evaluator = FineEvaluator::with_default_policy(Arc::new(InMemoryFineLedger::new()));
        assert!(matches!(
            evaluator.record_outstanding("P", -3.0, &FineReason::UnderpayAtExit),
            Err(EngineError::InvalidAmount(_))
        ));
        assert_eq!(
            evaluator
                .record_outstanding("P", 3.0, &FineReason::UnderpayAtExit)
                .unwrap(),
            3.0
        );
        assert_eq!(evaluator.outstanding("P").unwrap(), 3.0);
    }

    #[test]
    fn test_settle_replaces_balance_with_shortfall() {
        let evaluator = FineEvaluator::with_default_policy(Arc::new(InMemoryFineLedger::new()));
        evaluator
            .record_outstanding("P", 54.0, &FineReason::Overstay)
            .unwrap();
        assert_eq!(evaluator.settle("P", 4.0).unwrap(), 54.0);
        assert_eq!(evaluator.outstanding("P").unwrap(), 4.0);
        assert!(matches!(
            evaluator.settle("P", f64::INFINITY),
            Err(EngineError::InvalidAmount(_))
        ));
        assert_eq!(evaluator.outstanding("P").unwrap(), 4.0);
    }
}
