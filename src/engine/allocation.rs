// ==========================================
// 停车场系统 - 车位分配引擎
// ==========================================
// 职责: 车型 → 准入类别（有序）, 首次适配分配, 释放
// 红线: 首次适配（first-fit）,不做跨类别/跨楼层均衡
// 红线: 同一目录状态 + 同一车辆 → 同一分配结果
// ==========================================

use crate::domain::spot::ParkingSpot;
use crate::domain::types::{SpotCategory, VehicleType};
use crate::domain::vehicle::Vehicle;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::spot_catalog::SpotCatalog;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// 准入类别映射表（按优先顺序）
const EXEMPT_CATEGORIES: &[SpotCategory] = &[
    SpotCategory::Compact,
    SpotCategory::Regular,
    SpotCategory::Handicapped,
    SpotCategory::Reserved,
];
const MOTORCYCLE_CATEGORIES: &[SpotCategory] = &[SpotCategory::Compact];
const CAR_CATEGORIES: &[SpotCategory] = &[SpotCategory::Compact, SpotCategory::Regular];
const SUV_CATEGORIES: &[SpotCategory] = &[SpotCategory::Regular];

/// 车辆的准入类别（有序）
///
/// - 残障豁免车辆: COMPACT, REGULAR, HANDICAPPED, RESERVED
/// - 摩托车: COMPACT
/// - 轿车: COMPACT, REGULAR
/// - SUV/卡车: REGULAR
/// - 未知类型: 空
pub fn eligible_categories(vehicle: &Vehicle) -> &'static [SpotCategory] {
    if vehicle.handicapped_exempt() {
        return EXEMPT_CATEGORIES;
    }
    match vehicle.vehicle_type() {
        VehicleType::Motorcycle => MOTORCYCLE_CATEGORIES,
        VehicleType::Car => CAR_CATEGORIES,
        VehicleType::Suv => SUV_CATEGORIES,
        // 残障登记车辆必然豁免,已在上方返回
        VehicleType::Handicapped => EXEMPT_CATEGORIES,
        VehicleType::Unknown(raw) => {
            warn!(plate = %vehicle.plate(), vehicle_type = %raw, "未知车辆类型,无准入类别");
            &[]
        }
    }
}

// ==========================================
// AllocationEngine - 分配引擎
// ==========================================
pub struct AllocationEngine {
    catalog: Arc<SpotCatalog>,
}

impl AllocationEngine {
    pub fn new(catalog: Arc<SpotCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<SpotCatalog> {
        &self.catalog
    }

    pub fn eligible_categories(&self, vehicle: &Vehicle) -> &'static [SpotCategory] {
        eligible_categories(vehicle)
    }

    /// 分配车位
    ///
    /// 按准入类别优先顺序,在第一个有空位的类别中取目录顺序第一个空位并占用
    ///
    /// # 错误
    /// - NoEligibleCategory: 未知车型（不访问目录）
    /// - NoSpotAvailable: 所有准入类别均无空位
    #[instrument(skip(self, vehicle), fields(plate = %vehicle.plate()))]
    pub fn allocate(&self, vehicle: &Vehicle) -> EngineResult<ParkingSpot> {
        let categories = eligible_categories(vehicle);
        if categories.is_empty() {
            return Err(EngineError::NoEligibleCategory {
                plate: vehicle.plate().to_string(),
                vehicle_type: vehicle.display_type().to_string(),
            });
        }

        for category in categories {
            if let Some(spot) = self.catalog.occupy_first_available(*category, vehicle.plate())? {
                info!(
                    spot_id = %spot.spot_id,
                    category = %spot.category,
                    vehicle_type = %vehicle.display_type(),
                    "车位分配成功"
                );
                return Ok(spot);
            }
        }

        warn!(vehicle_type = %vehicle.display_type(), "无可用车位");
        Err(EngineError::NoSpotAvailable {
            plate: vehicle.plate().to_string(),
        })
    }

    /// 释放车位
    pub fn release(&self, spot_id: &str) -> EngineResult<Option<String>> {
        self.catalog.release(spot_id)
    }

    /// 车辆可用的全部空闲车位（类别优先顺序,类别内目录顺序）
    pub fn suitable_spots(&self, vehicle: &Vehicle) -> EngineResult<Vec<ParkingSpot>> {
        let mut spots = Vec::new();
        for category in eligible_categories(vehicle) {
            spots.extend(self.catalog.find_available(*category)?);
        }
        Ok(spots)
    }
}
