// ==========================================
// 停车场系统 - 罚款台账仓储
// ==========================================
// 职责: 车牌 → 未结清金额 的累加 / 查询 / 清零 / 结算
// 红线: 余额恒 ≥ 0; 同一车牌的读-改-写必须串行
// 红线: Repository 不含业务逻辑（罚款判定在 engine::fine）
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

// ==========================================
// Trait: FineLedger
// ==========================================
// 实现者: InMemoryFineLedger / SqliteFineLedger
pub trait FineLedger: Send + Sync {
    /// 累加未结清金额（条目不存在时创建）
    ///
    /// # 返回
    /// 累加后的余额
    ///
    /// # 错误
    /// - ValidationError: amount 为负数或非有限值
    fn accrue(&self, plate: &str, amount: f64, reason: &str) -> RepositoryResult<f64>;

    /// 查询未结清金额（无条目返回 0）
    fn outstanding(&self, plate: &str) -> RepositoryResult<f64>;

    /// 清零并移除条目
    ///
    /// # 返回
    /// 清零前的余额
    fn clear(&self, plate: &str) -> RepositoryResult<f64>;

    /// 结算对账: 原子地将余额置为 remaining
    ///
    /// remaining > 0 时以 reason 记为新欠款,= 0 时移除条目;
    /// 清零与重新入账在同一事务内完成,任一步失败则余额保持不变
    ///
    /// # 返回
    /// 结算前的余额
    ///
    /// # 错误
    /// - ValidationError: remaining 为负数或非有限值
    fn settle(&self, plate: &str, remaining: f64, reason: &str) -> RepositoryResult<f64>;

    /// 全部未结清条目快照（按车牌排序）
    fn snapshot(&self) -> RepositoryResult<BTreeMap<String, f64>>;
}

/// 校验金额: 非负且有限
fn validate_amount(amount: f64) -> RepositoryResult<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(RepositoryError::ValidationError(format!(
            "台账金额必须为非负数: {}",
            amount
        )));
    }
    Ok(())
}

// ==========================================
// InMemoryFineLedger - 内存台账
// ==========================================
// 单个 Mutex 内完成读-改-写,保证每次操作原子
#[derive(Debug, Default)]
pub struct InMemoryFineLedger {
    balances: Mutex<HashMap<String, f64>>,
}

impl InMemoryFineLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> RepositoryResult<std::sync::MutexGuard<'_, HashMap<String, f64>>> {
        self.balances
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl FineLedger for InMemoryFineLedger {
    fn accrue(&self, plate: &str, amount: f64, reason: &str) -> RepositoryResult<f64> {
        validate_amount(amount)?;
        let mut balances = self.lock()?;
        let entry = balances.entry(plate.to_string()).or_insert(0.0);
        *entry += amount;
        let balance = *entry;
        info!(plate = %plate, amount, reason = %reason, balance, "台账累加");
        Ok(balance)
    }

    fn outstanding(&self, plate: &str) -> RepositoryResult<f64> {
        Ok(self.lock()?.get(plate).copied().unwrap_or(0.0))
    }

    fn clear(&self, plate: &str) -> RepositoryResult<f64> {
        let previous = self.lock()?.remove(plate).unwrap_or(0.0);
        if previous > 0.0 {
            info!(plate = %plate, cleared = previous, "台账清零");
        }
        Ok(previous)
    }

    fn settle(&self, plate: &str, remaining: f64, reason: &str) -> RepositoryResult<f64> {
        validate_amount(remaining)?;
        let mut balances = self.lock()?;
        let previous = if remaining > 0.0 {
            balances.insert(plate.to_string(), remaining)
        } else {
            balances.remove(plate)
        };
        let previous = previous.unwrap_or(0.0);
        debug!(plate = %plate, previous, remaining, reason = %reason, "台账结算");
        Ok(previous)
    }

    fn snapshot(&self) -> RepositoryResult<BTreeMap<String, f64>> {
        Ok(self
            .lock()?
            .iter()
            .map(|(plate, amount)| (plate.clone(), *amount))
            .collect())
    }
}

// ==========================================
// SqliteFineLedger - SQLite 台账
// ==========================================
// 存储: fine_ledger + fine_ledger_event
pub struct SqliteFineLedger {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFineLedger {
    /// 从已有连接创建仓储实例
    ///
    /// 说明：调用方负责先执行 db::init_schema
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 打开数据库文件并建表
    ///
    /// # 错误
    /// - SchemaVersionMismatch: 数据库由更新版本的程序写入
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        let found = crate::db::read_schema_version(&conn)?.unwrap_or(0);
        if found > crate::db::CURRENT_SCHEMA_VERSION {
            return Err(RepositoryError::SchemaVersionMismatch {
                found,
                expected: crate::db::CURRENT_SCHEMA_VERSION,
            });
        }
        debug!(db_path = %db_path, schema_version = found, "台账数据库已打开");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询某车牌的台账流水
    ///
    /// # 返回
    /// (event_type, amount, reason) 按发生顺序
    pub fn history(&self, plate: &str) -> RepositoryResult<Vec<(String, f64, Option<String>)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT event_type, amount, reason
            FROM fine_ledger_event
            WHERE plate = ?1
            ORDER BY event_id
            "#,
        )?;
        let rows = stmt
            .query_map(params![plate], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn read_outstanding(conn: &Connection, plate: &str) -> RepositoryResult<f64> {
        let value: Option<f64> = conn
            .query_row(
                "SELECT outstanding FROM fine_ledger WHERE plate = ?1",
                params![plate],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or(0.0))
    }
}

impl FineLedger for SqliteFineLedger {
    fn accrue(&self, plate: &str, amount: f64, reason: &str) -> RepositoryResult<f64> {
        validate_amount(amount)?;
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO fine_ledger (plate, outstanding, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(plate) DO UPDATE SET
                outstanding = outstanding + excluded.outstanding,
                updated_at = excluded.updated_at
            "#,
            params![plate, amount],
        )?;
        tx.execute(
            "INSERT INTO fine_ledger_event (plate, event_type, amount, reason) VALUES (?1, 'ACCRUE', ?2, ?3)",
            params![plate, amount, reason],
        )?;
        let balance = Self::read_outstanding(&tx, plate)?;
        tx.commit()?;

        info!(plate = %plate, amount, reason = %reason, balance, "台账累加");
        Ok(balance)
    }

    fn outstanding(&self, plate: &str) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;
        Self::read_outstanding(&conn, plate)
    }

    fn clear(&self, plate: &str) -> RepositoryResult<f64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let previous = Self::read_outstanding(&tx, plate)?;
        tx.execute("DELETE FROM fine_ledger WHERE plate = ?1", params![plate])?;
        if previous > 0.0 {
            tx.execute(
                "INSERT INTO fine_ledger_event (plate, event_type, amount, reason) VALUES (?1, 'CLEAR', ?2, NULL)",
                params![plate, previous],
            )?;
        }
        tx.commit()?;

        if previous > 0.0 {
            info!(plate = %plate, cleared = previous, "台账清零");
        }
        Ok(previous)
    }

    fn settle(&self, plate: &str, remaining: f64, reason: &str) -> RepositoryResult<f64> {
        validate_amount(remaining)?;
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let previous = Self::read_outstanding(&tx, plate)?;
        if previous > 0.0 {
            tx.execute(
                "INSERT INTO fine_ledger_event (plate, event_type, amount, reason) VALUES (?1, 'CLEAR', ?2, NULL)",
                params![plate, previous],
            )?;
        }
        if remaining > 0.0 {
            tx.execute(
                r#"
                INSERT INTO fine_ledger (plate, outstanding, updated_at)
                VALUES (?1, ?2, datetime('now'))
                ON CONFLICT(plate) DO UPDATE SET
                    outstanding = excluded.outstanding,
                    updated_at = excluded.updated_at
                "#,
                params![plate, remaining],
            )?;
            tx.execute(
                "INSERT INTO fine_ledger_event (plate, event_type, amount, reason) VALUES (?1, 'ACCRUE', ?2, ?3)",
                params![plate, remaining, reason],
            )?;
        } else {
            tx.execute("DELETE FROM fine_ledger WHERE plate = ?1", params![plate])?;
        }
        tx.commit()?;

        info!(plate = %plate, previous, remaining, reason = %reason, "台账结算");
        Ok(previous)
    }

    fn snapshot(&self) -> RepositoryResult<BTreeMap<String, f64>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT plate, outstanding FROM fine_ledger ORDER BY plate")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
            .collect::<rusqlite::Result<BTreeMap<String, f64>>>()?;
        Ok(rows)
    }
}
