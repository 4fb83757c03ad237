// ==========================================
// 停车场系统 - 车位目录
// ==========================================
// 职责: 持有全部车位,提供查询与占用/释放迁移
// 红线: 每个车位独立加锁,占用/释放原子且互斥
// 红线: 统计实时计算,不缓存
// ==========================================
// 目录顺序: (floor, row, position) 升序
// 楼层仅用于统计展示
// ==========================================

use crate::domain::spot::ParkingSpot;
use crate::domain::types::SpotCategory;
use crate::engine::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

// ==========================================
// OccupancySummary - 占用统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancySummary {
    pub floor: Option<u32>, // None 表示全场
    pub total: usize,
    pub occupied: usize,
    pub available: usize,
    pub occupancy_rate: f64, // 百分比
}

impl OccupancySummary {
    fn new(floor: Option<u32>, total: usize, occupied: usize) -> Self {
        let occupancy_rate = if total == 0 {
            0.0
        } else {
            occupied as f64 * 100.0 / total as f64
        };
        Self {
            floor,
            total,
            occupied,
            available: total - occupied,
            occupancy_rate,
        }
    }
}

#[derive(Debug)]
struct FloorRange {
    floor_no: u32,
    spots: Range<usize>,
}

// ==========================================
// SpotCatalog - 车位目录
// ==========================================
#[derive(Debug)]
pub struct SpotCatalog {
    lot_id: String,
    floors: Vec<FloorRange>,
    spots: Vec<Mutex<ParkingSpot>>,
    index: HashMap<String, usize>,
}

impl SpotCatalog {
    /// 按固定规则构建 floor_count × rows_per_floor × spots_per_row 个车位
    ///
    /// 类别由楼层内流水号（从1开始,跨行连续）决定,见 SpotCategory::for_floor_counter
    pub fn initialize(floor_count: u32, rows_per_floor: u32, spots_per_row: u32) -> Self {
        Self::initialize_named("MAIN", floor_count, rows_per_floor, spots_per_row)
    }

    pub fn initialize_named(
        lot_id: &str,
        floor_count: u32,
        rows_per_floor: u32,
        spots_per_row: u32,
    ) -> Self {
        let mut spots = Vec::new();
        let mut floors = Vec::new();

        for floor_no in 1..=floor_count {
            let start = spots.len();
            let mut counter = 1u32;
            for row in 1..=rows_per_floor {
                for position in 1..=spots_per_row {
                    let category = SpotCategory::for_floor_counter(counter);
                    spots.push(ParkingSpot::new(floor_no, row, position, category));
                    counter += 1;
                }
            }
            debug!(floor_no, spots = spots.len() - start, "楼层初始化完成");
            floors.push(FloorRange {
                floor_no,
                spots: start..spots.len(),
            });
        }

        let index = spots
            .iter()
            .enumerate()
            .map(|(i, spot)| (spot.spot_id.clone(), i))
            .collect();

        info!(
            lot_id = %lot_id,
            floors = floor_count,
            rows_per_floor,
            spots_per_row,
            total = spots.len(),
            "车位目录初始化完成"
        );

        Self {
            lot_id: lot_id.to_string(),
            floors,
            spots: spots.into_iter().map(Mutex::new).collect(),
            index,
        }
    }

    pub fn lot_id(&self) -> &str {
        &self.lot_id
    }

    pub fn floor_count(&self) -> usize {
        self.floors.len()
    }

    fn lock_at(&self, i: usize) -> EngineResult<MutexGuard<'_, ParkingSpot>> {
        Ok(self.spots[i].lock()?)
    }

    fn position_of(&self, spot_id: &str) -> EngineResult<usize> {
        self.index
            .get(spot_id)
            .copied()
            .ok_or_else(|| EngineError::SpotNotFound {
                spot_id: spot_id.to_string(),
            })
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 指定类别的全部空闲车位（目录顺序,快照）
    pub fn find_available(&self, category: SpotCategory) -> EngineResult<Vec<ParkingSpot>> {
        let mut found = Vec::new();
        for i in 0..self.spots.len() {
            let spot = self.lock_at(i)?;
            if spot.category == category && spot.is_available() {
                found.push(spot.clone());
            }
        }
        Ok(found)
    }

    /// 按ID查找车位（快照）
    pub fn find_by_id(&self, spot_id: &str) -> EngineResult<ParkingSpot> {
        let i = self.position_of(spot_id)?;
        Ok(self.lock_at(i)?.clone())
    }

    /// 全部车位快照（目录顺序）
    pub fn spots(&self) -> EngineResult<Vec<ParkingSpot>> {
        (0..self.spots.len())
            .map(|i| -> EngineResult<ParkingSpot> { Ok(self.lock_at(i)?.clone()) })
            .collect()
    }

    /// 车位展示信息
    pub fn spot_info(&self, spot_id: &str) -> EngineResult<String> {
        Ok(self.find_by_id(spot_id)?.spot_info())
    }

    // ==========================================
    // 状态迁移
    // ==========================================

    /// 占用车位
    ///
    /// # 错误
    /// - SpotNotFound: ID 未知
    /// - SpotAlreadyOccupied: 已被占用（状态不变）
    pub fn occupy(&self, spot_id: &str, plate: &str) -> EngineResult<()> {
        let i = self.position_of(spot_id)?;
        let mut spot = self.lock_at(i)?;
        spot.occupy(plate)
            .map_err(|occupant| EngineError::SpotAlreadyOccupied {
                spot_id: spot_id.to_string(),
                occupant,
            })?;
        info!(spot_id = %spot_id, plate = %plate, "车位已占用");
        Ok(())
    }

    /// 释放车位（幂等,空闲车位释放为空操作）
    ///
    /// # 返回
    /// 释放前的占用车牌
    pub fn release(&self, spot_id: &str) -> EngineResult<Option<String>> {
        let i = self.position_of(spot_id)?;
        let previous = self.lock_at(i)?.release();
        match &previous {
            Some(plate) => info!(spot_id = %spot_id, plate = %plate, "车位已释放"),
            None => debug!(spot_id = %spot_id, "车位本已空闲"),
        }
        Ok(previous)
    }

    /// 首个可用车位即占（目录顺序）
    ///
    /// 逐个车位加锁检查并占用,并发分配不会拿到同一车位
    ///
    /// # 返回
    /// - Some(ParkingSpot): 已占用的车位快照
    /// - None: 该类别无空闲车位
    pub fn occupy_first_available(
        &self,
        category: SpotCategory,
        plate: &str,
    ) -> EngineResult<Option<ParkingSpot>> {
        for i in 0..self.spots.len() {
            let mut spot = self.lock_at(i)?;
            if spot.category != category || !spot.is_available() {
                continue;
            }
            if spot.occupy(plate).is_ok() {
                info!(spot_id = %spot.spot_id, plate = %plate, category = %category, "车位已占用");
                return Ok(Some(spot.clone()));
            }
        }
        Ok(None)
    }

    // ==========================================
    // 统计（实时计算）
    // ==========================================

    fn count_occupied(&self, range: Range<usize>) -> EngineResult<usize> {
        let mut occupied = 0;
        for i in range {
            if !self.lock_at(i)?.is_available() {
                occupied += 1;
            }
        }
        Ok(occupied)
    }

    pub fn total_spots(&self) -> usize {
        self.spots.len()
    }

    pub fn occupied_count(&self) -> EngineResult<usize> {
        self.count_occupied(0..self.spots.len())
    }

    pub fn available_count(&self) -> EngineResult<usize> {
        Ok(self.total_spots() - self.occupied_count()?)
    }

    /// 占用率（百分比,空目录为 0）
    pub fn occupancy_rate(&self) -> EngineResult<f64> {
        Ok(self.summary()?.occupancy_rate)
    }

    /// 全场统计
    pub fn summary(&self) -> EngineResult<OccupancySummary> {
        let occupied = self.occupied_count()?;
        Ok(OccupancySummary::new(None, self.total_spots(), occupied))
    }

    /// 分楼层统计
    pub fn floor_summaries(&self) -> EngineResult<Vec<OccupancySummary>> {
        self.floors
            .iter()
            .map(|floor| -> EngineResult<OccupancySummary> {
                let occupied = self.count_occupied(floor.spots.clone())?;
                Ok(OccupancySummary::new(
                    Some(floor.floor_no),
                    floor.spots.len(),
                    occupied,
                ))
            })
            .collect()
    }
}
