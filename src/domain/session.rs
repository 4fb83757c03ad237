// ==========================================
// 停车场系统 - 停车会话领域模型
// ==========================================
// 红线: 同一车牌最多一个活动会话,同一车位最多一个活动会话
// 用途: 分配成功时创建,完全结清出场时销毁
// ==========================================
// 少付出场后会话保留; 已计费的停车费与已入账的罚款记录在会话上,
// 再次结算只计增量,避免同一笔费用重复收取
// ==========================================

use crate::domain::vehicle::Vehicle;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSession {
    pub session_id: String,
    pub plate: String,
    pub spot_id: String,
    pub entry_time: NaiveDateTime,
    pub vehicle: Vehicle, // 出场计费需要类型与豁免标志

    // ===== 结算进度 =====
    #[serde(default)]
    pub fee_billed: f64, // 已计入结算的停车费（实付或转入台账）
    #[serde(default)]
    pub fine_posted: bool, // 本会话的罚款已入账
}

impl ParkingSession {
    pub fn new(session_id: String, vehicle: Vehicle, spot_id: String, entry_time: NaiveDateTime) -> Self {
        Self {
            session_id,
            plate: vehicle.plate().to_string(),
            spot_id,
            entry_time,
            vehicle,
            fee_billed: 0.0,
            fine_posted: false,
        }
    }
}
