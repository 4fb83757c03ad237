// ==========================================
// 停车场系统 - 出场编排器
// ==========================================
// 用途: 协调 会话 → 罚款 → 计费 → 收款 → 对账 → 放行/记欠款
// ==========================================
// 状态（按车牌,隐式）:
//   无会话 → 预览（只读） → 结算 → {已放行, 已记欠款}
// ==========================================
// 台账合并口径:
// - 账单 fines = 新增罚款入账后的台账余额（历史欠款 + 本次新增）
// - 结算后台账余额 = max(0, 应付 - 实付),单事务写入（UNDERPAY_AT_EXIT）
// - 少付后会话保留; 再次结算只收此前未计入的停车费,罚款不重复入账
// ==========================================

use crate::domain::billing::{Bill, Receipt};
use crate::domain::session::ParkingSession;
use crate::domain::spot::ParkingSpot;
use crate::domain::vehicle::Vehicle;
use crate::engine::billing::BillingEngine;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::fine::FineEvaluator;
use crate::engine::payment::PaymentRegistry;
use crate::engine::session_tracker::{PlateLocks, SessionTracker};
use crate::engine::spot_catalog::SpotCatalog;
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// 金额按分取整
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

// ==========================================
// ExitOrchestrator - 出场编排器
// ==========================================
pub struct ExitOrchestrator {
    catalog: Arc<SpotCatalog>,
    sessions: Arc<SessionTracker>,
    plate_locks: Arc<PlateLocks>,
    billing: BillingEngine,
    fines: Arc<FineEvaluator>,
    payments: Arc<PaymentRegistry>,
}

impl ExitOrchestrator {
    /// 创建新的编排器实例
    pub fn new(
        catalog: Arc<SpotCatalog>,
        sessions: Arc<SessionTracker>,
        plate_locks: Arc<PlateLocks>,
        fines: Arc<FineEvaluator>,
        payments: Arc<PaymentRegistry>,
    ) -> Self {
        Self {
            catalog,
            sessions,
            plate_locks,
            billing: BillingEngine::new(),
            fines,
            payments,
        }
    }

    /// 取会话及其引用的车辆、车位
    ///
    /// 会话存在但车辆/车位缺失属于记账错误,直接上抛
    fn load_context(&self, plate: &str) -> EngineResult<(ParkingSession, Vehicle, ParkingSpot)> {
        let session = self.sessions.get(plate)?;
        if session.vehicle.plate() != plate {
            return Err(EngineError::VehicleNotFound {
                plate: plate.to_string(),
            });
        }
        let vehicle = session.vehicle.clone();
        let spot = self.catalog.find_by_id(&session.spot_id)?;
        Ok((session, vehicle, spot))
    }

    fn receipt(
        session: &ParkingSession,
        spot: &ParkingSpot,
        bill: &Bill,
        at: NaiveDateTime,
        amount_paid: f64,
        method: String,
        balance: f64,
    ) -> Receipt {
        Receipt {
            plate: session.plate.clone(),
            spot_id: spot.spot_id.clone(),
            entry_time: session.entry_time,
            exit_time: at,
            hours: bill.hours(),
            hourly_rate: spot.hourly_rate(),
            parking_fee: bill.parking_fee(),
            fee_credited: bill.fee_credited(),
            fines: bill.fines(),
            amount_paid,
            method,
            balance,
        }
    }

    // ==========================================
    // 账单预览（只读）
    // ==========================================

    /// 预览当前账单
    pub fn preview_bill(&self, plate: &str) -> EngineResult<Receipt> {
        self.preview_bill_at(plate, Local::now().naive_local())
    }

    /// 预览指定时刻的账单
    ///
    /// 不写台账、不释放车位、不关闭会话;
    /// 超时罚款只做判定（本会话已入账则不再判定）,与台账余额合并展示
    #[instrument(skip(self), fields(plate = %plate))]
    pub fn preview_bill_at(&self, plate: &str, at: NaiveDateTime) -> EngineResult<Receipt> {
        let (session, vehicle, spot) = self.load_context(plate)?;

        let assessed = if session.fine_posted {
            0.0
        } else {
            self.fines
                .assess(&session, &spot, &vehicle, at)?
                .map(|f| f.amount)
                .unwrap_or(0.0)
        };
        let fines_due = self.fines.outstanding(plate)? + assessed;

        let bill = self.billing.build_bill(&session, &spot, &vehicle, at, fines_due);
        debug!(
            hours = bill.hours(),
            parking_fee = bill.parking_fee(),
            fines = bill.fines(),
            total_due = bill.total_due(),
            "账单预览"
        );

        let balance = -bill.total_due();
        Ok(Self::receipt(
            &session,
            &spot,
            &bill,
            at,
            0.0,
            "PREVIEW".to_string(),
            balance,
        ))
    }

    // ==========================================
    // 出场结算
    // ==========================================

    /// 当前时刻出场结算
    pub fn exit_lot(&self, plate: &str, method_id: &str, amount_tendered: f64) -> EngineResult<Receipt> {
        self.exit_lot_at(plate, method_id, amount_tendered, Local::now().naive_local())
    }

    /// 指定时刻出场结算
    ///
    /// 步骤（车牌互斥域内）:
    /// 1. 取会话/车辆/车位
    /// 2. 判定新增罚款并入账（每个会话只入账一次）
    /// 3. 生成账单（停车费扣除此前已计入部分,罚款 = 台账余额）
    /// 4. 收款
    /// 5. 台账对账: 单事务将余额置为 max(0, 应付 - 实付)
    /// 6. 余额 ≥ 0: 释放车位、关闭会话
    ///    余额 < 0: 会话与车位保持,登记已计入的停车费
    ///
    /// # 错误
    /// - SessionNotFound / VehicleNotFound / SpotNotFound: 记账错误
    /// - UnknownPaymentMethod / InvalidAmount: 在写台账前拒绝
    /// - Ledger: 对账失败时台账、会话、车位均保持原状
    #[instrument(skip(self), fields(plate = %plate))]
    pub fn exit_lot_at(
        &self,
        plate: &str,
        method_id: &str,
        amount_tendered: f64,
        at: NaiveDateTime,
    ) -> EngineResult<Receipt> {
        if !amount_tendered.is_finite() || amount_tendered < 0.0 {
            return Err(EngineError::InvalidAmount(amount_tendered));
        }
        if !self.payments.supports(method_id) {
            return Err(EngineError::UnknownPaymentMethod {
                method: method_id.to_string(),
            });
        }

        self.plate_locks.with_lock(plate, || -> EngineResult<Receipt> {
            // ===== 步骤1: 会话上下文 =====
            let (mut session, vehicle, spot) = self.load_context(plate)?;

            // ===== 步骤2: 新增罚款 =====
            let new_fine = if session.fine_posted {
                0.0
            } else {
                self.fines.evaluate_and_record(&session, &spot, &vehicle, at)?
            };
            if new_fine > 0.0 {
                self.sessions.mark_fine_posted(plate)?;
                session.fine_posted = true;
            }

            // ===== 步骤3: 账单 =====
            let fines_due = self.fines.outstanding(plate)?;
            let bill = self.billing.build_bill(&session, &spot, &vehicle, at, fines_due);

            // ===== 步骤4: 收款 =====
            let payment = self
                .payments
                .take_payment(&bill, method_id, amount_tendered, at)?;
            let balance = round_currency(payment.balance_against(&bill));

            // ===== 步骤5: 台账对账 =====
            let shortfall = if balance < 0.0 { -balance } else { 0.0 };
            self.fines.settle(plate, shortfall)?;

            // ===== 步骤6: 放行 / 保留 =====
            if balance >= 0.0 {
                self.catalog.release(&spot.spot_id)?;
                self.sessions.close(plate)?;
                info!(
                    spot_id = %spot.spot_id,
                    new_fine,
                    total_due = bill.total_due(),
                    change = balance,
                    "出场结清,车位已释放"
                );
            } else {
                self.sessions.record_fee_billed(plate, bill.gross_fee())?;
                warn!(
                    spot_id = %spot.spot_id,
                    new_fine,
                    total_due = bill.total_due(),
                    shortfall,
                    "出场少付,欠款已入账"
                );
            }

            Ok(Self::receipt(
                &session,
                &spot,
                &bill,
                at,
                payment.amount,
                payment.method,
                balance,
            ))
        })
    }
}
