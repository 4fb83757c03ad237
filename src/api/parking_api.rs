// ==========================================
// 停车场系统 - 车场业务 API
// ==========================================
// 职责: 入场分配、出场结算、查询与管理操作
// 错误: 引擎/仓储错误统一转为 ApiError
// ==========================================

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{validate_method, validate_payment_amount, validate_plate};
use crate::config::lot_config::LotConfig;
use crate::domain::billing::Receipt;
use crate::domain::session::ParkingSession;
use crate::domain::spot::ParkingSpot;
use crate::domain::ticket::Ticket;
use crate::domain::types::{SpotCategory, VehicleType};
use crate::domain::vehicle::Vehicle;
use crate::engine::allocation::AllocationEngine;
use crate::engine::error::EngineError;
use crate::engine::fine::{FineEvaluator, FinePolicy, FixedOverstayPolicy};
use crate::engine::orchestrator::ExitOrchestrator;
use crate::engine::payment::PaymentRegistry;
use crate::engine::session_tracker::{PlateLocks, SessionTracker};
use crate::engine::spot_catalog::{OccupancySummary, SpotCatalog};
use crate::repository::fine_ledger_repo::FineLedger;
use crate::repository::ticket_repo::TicketFileRepository;
use std::collections::BTreeMap;

// ==========================================
// AllocationResult - 入场结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub ticket_id: String,
    pub plate: String,
    pub spot_id: String,
    pub category: SpotCategory,
    pub hourly_rate: f64,
    pub entry_time: NaiveDateTime,
}

// ==========================================
// ParkingApi - 车场业务 API
// ==========================================

/// 车场业务API
///
/// 职责：
/// 1. 入场: 分配车位 + 开启会话 + 签发票据
/// 2. 出场: 账单预览、结算
/// 3. 查询: 占用概况、车位信息、票据、欠款、在场车辆
/// 4. 管理: 切换罚款策略
pub struct ParkingApi {
    allocation: AllocationEngine,
    sessions: Arc<SessionTracker>,
    plate_locks: Arc<PlateLocks>,
    fines: Arc<FineEvaluator>,
    payments: Arc<PaymentRegistry>,
    orchestrator: ExitOrchestrator,
    tickets: Option<Arc<TicketFileRepository>>,
}

impl ParkingApi {
    /// 创建新的ParkingApi实例
    ///
    /// # 参数
    /// - catalog: 车位目录
    /// - fines: 罚款评估器（持有台账）
    /// - payments: 付款方式注册表
    /// - tickets: 票据存储（None 则不落盘）
    pub fn new(
        catalog: Arc<SpotCatalog>,
        fines: Arc<FineEvaluator>,
        payments: PaymentRegistry,
        tickets: Option<Arc<TicketFileRepository>>,
    ) -> Self {
        let sessions = Arc::new(SessionTracker::new());
        let plate_locks = Arc::new(PlateLocks::new());
        let payments = Arc::new(payments);
        let orchestrator = ExitOrchestrator::new(
            catalog.clone(),
            sessions.clone(),
            plate_locks.clone(),
            fines.clone(),
            payments.clone(),
        );

        Self {
            allocation: AllocationEngine::new(catalog),
            sessions,
            plate_locks,
            fines,
            payments,
            orchestrator,
            tickets,
        }
    }

    /// 按车场配置装配
    ///
    /// # 错误
    /// - InvalidInput: 配置不合法
    pub fn from_config(config: &LotConfig, ledger: Arc<dyn FineLedger>) -> ApiResult<Self> {
        config.validate().map_err(ApiError::InvalidInput)?;

        let catalog = Arc::new(SpotCatalog::initialize_named(
            &config.lot_id,
            config.floors,
            config.rows_per_floor,
            config.spots_per_row,
        ));
        let policy = FixedOverstayPolicy::new(config.overstay_threshold_hours, config.overstay_fine);
        let fines = Arc::new(FineEvaluator::new(Arc::new(policy), ledger));
        let tickets = Arc::new(TicketFileRepository::new(&config.ticket_file));

        Ok(Self::new(
            catalog,
            fines,
            PaymentRegistry::default(),
            Some(tickets),
        ))
    }

    pub fn catalog(&self) -> &Arc<SpotCatalog> {
        self.allocation.catalog()
    }

    fn build_vehicle(plate: &str, vehicle_type: &str, handicapped_card: bool) -> ApiResult<Vehicle> {
        let plate = validate_plate(plate)?;
        let vehicle_type = vehicle_type
            .parse::<VehicleType>()
            .unwrap_or_else(|never| match never {});
        Ok(Vehicle::new(plate, vehicle_type, handicapped_card))
    }

    // ==========================================
    // 入场
    // ==========================================

    /// 入场分配（当前时刻）
    pub fn park(
        &self,
        plate: &str,
        vehicle_type: &str,
        handicapped_card: bool,
    ) -> ApiResult<AllocationResult> {
        self.park_at(plate, vehicle_type, handicapped_card, Local::now().naive_local())
    }

    /// 入场分配
    ///
    /// # 错误
    /// - InvalidInput: 车牌为空
    /// - InvalidState: 车牌已在场
    /// - NoCapacity: 未知车型,或准入类别均无空位
    #[instrument(skip(self))]
    pub fn park_at(
        &self,
        plate: &str,
        vehicle_type: &str,
        handicapped_card: bool,
        at: NaiveDateTime,
    ) -> ApiResult<AllocationResult> {
        let vehicle = Self::build_vehicle(plate, vehicle_type, handicapped_card)?;

        self.plate_locks
            .with_lock(vehicle.plate(), || -> ApiResult<AllocationResult> {
                if let Some(existing) = self.sessions.find(vehicle.plate())? {
                    return Err(EngineError::SessionAlreadyActive {
                        plate: existing.plate,
                        spot_id: existing.spot_id,
                    }
                    .into());
                }

                let spot = self.allocation.allocate(&vehicle)?;
                if let Err(e) = self.sessions.open(&vehicle, &spot.spot_id, at) {
                    // 会话未建立,归还车位
                    self.allocation.release(&spot.spot_id)?;
                    return Err(e.into());
                }

                let ticket = Ticket::issue(vehicle.plate(), &spot.spot_id, spot.category, at);
                if let Some(store) = &self.tickets {
                    if let Err(e) = store.save(&ticket) {
                        error!(ticket_id = %ticket.ticket_id, error = %e, "票据写入失败,入场已生效");
                    }
                }

                info!(
                    ticket_id = %ticket.ticket_id,
                    spot_id = %spot.spot_id,
                    category = %spot.category,
                    "入场完成"
                );

                Ok(AllocationResult {
                    ticket_id: ticket.ticket_id,
                    plate: ticket.plate,
                    spot_id: spot.spot_id.clone(),
                    category: spot.category,
                    hourly_rate: spot.hourly_rate(),
                    entry_time: at,
                })
            })
    }

    /// 车辆可停的空闲车位
    pub fn suitable_spots(
        &self,
        plate: &str,
        vehicle_type: &str,
        handicapped_card: bool,
    ) -> ApiResult<Vec<ParkingSpot>> {
        let vehicle = Self::build_vehicle(plate, vehicle_type, handicapped_card)?;
        Ok(self.allocation.suitable_spots(&vehicle)?)
    }

    /// 管理端释放车位（已空闲则无操作）
    ///
    /// 在占用车牌的互斥域内先关闭其活动会话,再释放车位;
    /// 被关闭会话未结算的停车费作废,台账欠款保留
    ///
    /// # 错误
    /// - NotFound: 车位不存在
    pub fn release_spot(&self, spot_id: &str) -> ApiResult<()> {
        let spot_id = spot_id.trim();
        loop {
            let holder = match self.catalog().find_by_id(spot_id)?.occupant() {
                Some(plate) => plate.to_string(),
                None => return Ok(()),
            };

            let released = self
                .plate_locks
                .with_lock(&holder, || -> ApiResult<bool> {
                    // 加锁前占用者可能已出场或换人
                    if self.catalog().find_by_id(spot_id)?.occupant() != Some(holder.as_str()) {
                        return Ok(false);
                    }
                    if let Some(session) = self.sessions.find(&holder)? {
                        if session.spot_id == spot_id {
                            self.sessions.close(&holder)?;
                            warn!(
                                session_id = %session.session_id,
                                plate = %holder,
                                spot_id = %spot_id,
                                "管理端释放车位,活动会话已关闭"
                            );
                        }
                    }
                    self.allocation.release(spot_id)?;
                    info!(spot_id = %spot_id, previous = %holder, "车位已手工释放");
                    Ok(true)
                })?;

            if released {
                return Ok(());
            }
        }
    }

    // ==========================================
    // 出场
    // ==========================================

    /// 账单预览（只读）
    pub fn preview_bill(&self, plate: &str) -> ApiResult<Receipt> {
        self.preview_bill_at(plate, Local::now().naive_local())
    }

    pub fn preview_bill_at(&self, plate: &str, at: NaiveDateTime) -> ApiResult<Receipt> {
        let plate = validate_plate(plate)?;
        Ok(self.orchestrator.preview_bill_at(&plate, at)?)
    }

    /// 出场结算（当前时刻）
    pub fn exit(&self, plate: &str, method_id: &str, amount: f64) -> ApiResult<Receipt> {
        self.exit_at(plate, method_id, amount, Local::now().naive_local())
    }

    /// 出场结算
    ///
    /// # 错误
    /// - InvalidInput: 车牌为空、付款方式为空、金额非正
    /// - NotFound: 无活动会话、付款方式未注册
    pub fn exit_at(
        &self,
        plate: &str,
        method_id: &str,
        amount: f64,
        at: NaiveDateTime,
    ) -> ApiResult<Receipt> {
        let plate = validate_plate(plate)?;
        let method_id = validate_method(method_id)?;
        let amount = validate_payment_amount(amount)?;
        Ok(self.orchestrator.exit_lot_at(&plate, &method_id, amount, at)?)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 全场占用概况
    pub fn lot_summary(&self) -> ApiResult<OccupancySummary> {
        Ok(self.catalog().summary()?)
    }

    /// 分楼层占用概况
    pub fn floor_summaries(&self) -> ApiResult<Vec<OccupancySummary>> {
        Ok(self.catalog().floor_summaries()?)
    }

    pub fn spot_info(&self, spot_id: &str) -> ApiResult<String> {
        Ok(self.catalog().spot_info(spot_id.trim())?)
    }

    /// 按票据ID查找
    ///
    /// # 返回
    /// - Ok(None): 未找到,或未配置票据存储
    pub fn find_ticket(&self, ticket_id: &str) -> ApiResult<Option<Ticket>> {
        let ticket_id = ticket_id.trim();
        if ticket_id.is_empty() {
            return Err(ApiError::InvalidInput("票据ID不能为空".to_string()));
        }
        match &self.tickets {
            Some(store) => Ok(store.find_by_id(ticket_id)?),
            None => Ok(None),
        }
    }

    /// 车牌当前欠款
    pub fn outstanding(&self, plate: &str) -> ApiResult<f64> {
        let plate = validate_plate(plate)?;
        Ok(self.fines.outstanding(&plate)?)
    }

    /// 管理端豁免车牌欠款
    ///
    /// # 返回
    /// 豁免前的余额
    pub fn waive_outstanding(&self, plate: &str) -> ApiResult<f64> {
        let plate = validate_plate(plate)?;
        self.plate_locks.with_lock(&plate, || -> ApiResult<f64> {
            let waived = self.fines.waive(&plate)?;
            if waived > 0.0 {
                warn!(plate = %plate, waived, "欠款已豁免");
            }
            Ok(waived)
        })
    }

    /// 全部欠款（按车牌排序,仅余额为正）
    pub fn outstanding_snapshot(&self) -> ApiResult<BTreeMap<String, f64>> {
        Ok(self
            .fines
            .ledger()
            .snapshot()?
            .into_iter()
            .filter(|(_, amount)| *amount > 0.0)
            .collect())
    }

    /// 在场车辆（按入场时间排序）
    pub fn active_sessions(&self) -> ApiResult<Vec<ParkingSession>> {
        Ok(self.sessions.active_sessions()?)
    }

    pub fn payment_methods(&self) -> Vec<String> {
        self.payments.method_ids()
    }

    // ==========================================
    // 管理
    // ==========================================

    /// 切换罚款策略
    pub fn set_fine_policy(&self, policy: Arc<dyn FinePolicy>) -> ApiResult<()> {
        Ok(self.fines.set_policy(policy)?)
    }

    pub fn fine_policy_name(&self) -> ApiResult<String> {
        Ok(self.fines.policy_name()?)
    }
}
