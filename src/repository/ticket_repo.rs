// ==========================================
// 停车场系统 - 入场票据文件仓储
// ==========================================
// 存储: 追加写文本文件,每行一张票据
// 行格式: ticket_id,plate,spot_id,CATEGORY,entry_time(ISO-8601)
// 查询: 线性扫描
// ==========================================

use crate::domain::ticket::Ticket;
use crate::domain::types::SpotCategory;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// 入场时间在票据文件中的格式
pub const TICKET_ENTRY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const TICKET_FIELD_COUNT: usize = 5;

pub struct TicketFileRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl TicketFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一张票据
    pub fn save(&self, ticket: &Ticket) -> RepositoryResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        let entry_time = ticket.entry_time.format(TICKET_ENTRY_TIME_FORMAT).to_string();
        writer.write_record([
            ticket.ticket_id.as_str(),
            ticket.plate.as_str(),
            ticket.spot_id.as_str(),
            ticket.category.as_str(),
            entry_time.as_str(),
        ])?;
        writer.flush()?;

        debug!(ticket_id = %ticket.ticket_id, path = %self.path.display(), "票据已写入");
        Ok(())
    }

    /// 按票据ID查找
    ///
    /// 票据ID精度为秒,同一车牌同一秒内重复入场会产生相同ID,
    /// 此时返回最后写入的一行
    ///
    /// # 返回
    /// - Ok(Some(Ticket)): 找到
    /// - Ok(None): 未找到,或票据文件尚不存在
    /// - Err: 匹配行的类别/时间无法解析
    pub fn find_by_id(&self, ticket_id: &str) -> RepositoryResult<Option<Ticket>> {
        if !self.path.exists() {
            warn!(path = %self.path.display(), "票据文件不存在");
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut latest = None;
        for record in reader.records() {
            let record = record?;
            if record.len() >= TICKET_FIELD_COUNT && &record[0] == ticket_id {
                latest = Some(record);
            }
        }

        let Some(record) = latest else {
            return Ok(None);
        };

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let category: SpotCategory = record[3]
            .parse()
            .map_err(|message| RepositoryError::TicketFormat { line, message })?;
        let entry_time = NaiveDateTime::parse_from_str(&record[4], TICKET_ENTRY_TIME_FORMAT)
            .map_err(|e| RepositoryError::TicketFormat {
                line,
                message: e.to_string(),
            })?;

        Ok(Some(Ticket {
            ticket_id: record[0].to_string(),
            plate: record[1].to_string(),
            spot_id: record[2].to_string(),
            category,
            entry_time,
        }))
    }
}
