// ==========================================
// 停车场系统 - 活动会话跟踪
// ==========================================
// 职责: 记录 车牌 → (车位, 入场时间) 的活动会话
// 红线: 同一车牌最多一个活动会话
// 红线: 同一车位最多一个活动会话
// ==========================================
// 并发: PlateLocks 为每个车牌提供独立互斥域,
//       入场/出场流程在该域内串行; 不同车牌互不阻塞
// ==========================================

use crate::domain::session::ParkingSession;
use crate::domain::vehicle::Vehicle;
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ==========================================
// PlateLocks - 车牌级互斥
// ==========================================
#[derive(Debug, Default)]
pub struct PlateLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PlateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, plate: &str) -> EngineResult<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock()?;
        Ok(locks
            .entry(plate.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// 在车牌互斥域内执行 f
    ///
    /// 退出时若无其他线程持有该车牌句柄,则移除映射项
    pub fn with_lock<T, E, F>(&self, plate: &str, f: F) -> Result<T, E>
    where
        E: From<EngineError>,
        F: FnOnce() -> Result<T, E>,
    {
        let handle = self.handle(plate)?;
        let result = {
            let _guard = handle.lock().map_err(EngineError::from)?;
            f()
        };
        drop(handle);
        if let Err(e) = self.prune(plate) {
            warn!(plate = %plate, error = %e, "车牌锁清理失败");
        }
        result
    }

    fn prune(&self, plate: &str) -> EngineResult<()> {
        let mut locks = self.locks.lock()?;
        if locks
            .get(plate)
            .is_some_and(|handle| Arc::strong_count(handle) == 1)
        {
            locks.remove(plate);
        }
        Ok(())
    }

    /// 当前登记的车牌锁数量
    pub fn len(&self) -> EngineResult<usize> {
        Ok(self.locks.lock()?.len())
    }

    pub fn is_empty(&self) -> EngineResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[derive(Debug, Default)]
struct SessionIndex {
    by_plate: HashMap<String, ParkingSession>,
    plate_by_spot: HashMap<String, String>,
}

// ==========================================
// SessionTracker - 会话跟踪
// ==========================================
#[derive(Debug, Default)]
pub struct SessionTracker {
    sessions: Mutex<SessionIndex>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 开启会话
    ///
    /// # 错误
    /// - SessionAlreadyActive: 车牌已在场,或车位已被其他会话引用
    pub fn open(
        &self,
        vehicle: &Vehicle,
        spot_id: &str,
        entry_time: NaiveDateTime,
    ) -> EngineResult<ParkingSession> {
        let mut index = self.sessions.lock()?;

        if let Some(existing) = index.by_plate.get(vehicle.plate()) {
            return Err(EngineError::SessionAlreadyActive {
                plate: vehicle.plate().to_string(),
                spot_id: existing.spot_id.clone(),
            });
        }
        if let Some(holder) = index.plate_by_spot.get(spot_id) {
            return Err(EngineError::SessionAlreadyActive {
                plate: holder.clone(),
                spot_id: spot_id.to_string(),
            });
        }

        let session = ParkingSession::new(
            Uuid::new_v4().to_string(),
            vehicle.clone(),
            spot_id.to_string(),
            entry_time,
        );
        index
            .plate_by_spot
            .insert(spot_id.to_string(), session.plate.clone());
        index.by_plate.insert(session.plate.clone(), session.clone());

        info!(
            session_id = %session.session_id,
            plate = %session.plate,
            spot_id = %spot_id,
            "会话已开启"
        );
        Ok(session)
    }

    /// 查询车牌的活动会话
    pub fn find(&self, plate: &str) -> EngineResult<Option<ParkingSession>> {
        Ok(self.sessions.lock()?.by_plate.get(plate).cloned())
    }

    /// 查询车牌的活动会话（不存在则报错）
    pub fn get(&self, plate: &str) -> EngineResult<ParkingSession> {
        self.find(plate)?.ok_or_else(|| EngineError::SessionNotFound {
            plate: plate.to_string(),
        })
    }

    /// 查询车位上的活动会话
    pub fn find_by_spot(&self, spot_id: &str) -> EngineResult<Option<ParkingSession>> {
        let index = self.sessions.lock()?;
        Ok(index
            .plate_by_spot
            .get(spot_id)
            .and_then(|plate| index.by_plate.get(plate))
            .cloned())
    }

    /// 少付出场后登记结算进度
    ///
    /// fee_billed: 截至本次已计入结算的停车费（实付或转入台账）
    pub fn record_fee_billed(&self, plate: &str, fee_billed: f64) -> EngineResult<()> {
        let mut index = self.sessions.lock()?;
        let session = index
            .by_plate
            .get_mut(plate)
            .ok_or_else(|| EngineError::SessionNotFound {
                plate: plate.to_string(),
            })?;
        session.fee_billed = fee_billed;
        debug!(session_id = %session.session_id, fee_billed, "会话结算进度已更新");
        Ok(())
    }

    /// 标记本会话罚款已入账
    pub fn mark_fine_posted(&self, plate: &str) -> EngineResult<()> {
        let mut index = self.sessions.lock()?;
        let session = index
            .by_plate
            .get_mut(plate)
            .ok_or_else(|| EngineError::SessionNotFound {
                plate: plate.to_string(),
            })?;
        session.fine_posted = true;
        Ok(())
    }

    /// 关闭会话
    ///
    /// # 返回
    /// 被关闭的会话
    pub fn close(&self, plate: &str) -> EngineResult<ParkingSession> {
        let mut index = self.sessions.lock()?;
        let session = index
            .by_plate
            .remove(plate)
            .ok_or_else(|| EngineError::SessionNotFound {
                plate: plate.to_string(),
            })?;
        index.plate_by_spot.remove(&session.spot_id);

        info!(session_id = %session.session_id, plate = %plate, "会话已关闭");
        Ok(session)
    }

    /// 当前全部活动会话（按入场时间排序）
    pub fn active_sessions(&self) -> EngineResult<Vec<ParkingSession>> {
        let mut sessions: Vec<ParkingSession> =
            self.sessions.lock()?.by_plate.values().cloned().collect();
        sessions.sort_by(|a, b| a.entry_time.cmp(&b.entry_time).then(a.plate.cmp(&b.plate)));
        Ok(sessions)
    }

    pub fn active_count(&self) -> EngineResult<usize> {
        Ok(self.sessions.lock()?.by_plate.len())
    }
}
