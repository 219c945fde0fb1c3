// ==========================================
// 医院排班预约系统 - 事务存储端口
// ==========================================
// 职责:
// - 每次请求独立获取连接，作用域结束即释放（无全局单例连接）
// - 提供 BEGIN IMMEDIATE 写事务：检查与提交在同一把写锁内完成，
//   并发预约由 SQLite 串行化，而不是依赖进程内锁
// - 闭包返回 Err 或 panic 时事务随 drop 自动回滚
// 红线: 只做数据访问，不含业务规则
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::reservation::{Interval, Reservation, StatusTransition};
use crate::domain::resource::Resource;
use crate::domain::types::{OccupancyStatus, ReservationStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{reservation_repo, resource_repo};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Duration;
use tracing::{debug, warn};

/// 默认 BEGIN IMMEDIATE 忙重试次数（busy_timeout 之外的额外重试）
pub const DEFAULT_BUSY_RETRY_LIMIT: u32 = 3;

// ==========================================
// BookingStore - 事务存储
// ==========================================
#[derive(Debug, Clone)]
pub struct BookingStore {
    db_path: String,
    busy_retry_limit: u32,
}

impl BookingStore {
    /// 创建存储并确保表结构存在
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（需为文件库，每次请求都会重新打开连接）
    pub fn new(db_path: impl Into<String>) -> RepositoryResult<Self> {
        let db_path = db_path.into();
        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;

        Ok(Self {
            db_path,
            busy_retry_limit: DEFAULT_BUSY_RETRY_LIMIT,
        })
    }

    /// 设置忙重试次数
    pub fn with_busy_retry_limit(mut self, limit: u32) -> Self {
        self.busy_retry_limit = limit;
        self
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// 获取一个新连接（调用方持有，离开作用域即关闭）
    pub fn connect(&self) -> RepositoryResult<Connection> {
        open_sqlite_connection(&self.db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))
    }

    /// 只读访问
    pub fn read<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&Connection) -> RepositoryResult<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    /// 单语句写入（自动提交，不开启显式事务）
    ///
    /// 仅供管理操作使用；预约核心的检查-写入必须走 with_transaction
    pub fn write<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        F: FnOnce(&Connection) -> RepositoryResult<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    /// 在写事务内执行闭包
    ///
    /// # 语义
    /// - 闭包返回 Ok → 提交
    /// - 闭包返回 Err → 回滚（Transaction drop 时自动回滚）
    /// - BEGIN 阶段遇到 SQLITE_BUSY → 退避后重试，超过上限返回 DatabaseBusy
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&BookingTx<'_>) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let conn = self.connect()?;
        let tx = self.begin_immediate(&conn)?;
        let booking_tx = BookingTx { tx };

        let value = f(&booking_tx)?;

        booking_tx
            .tx
            .commit()
            .map_err(|e| E::from(RepositoryError::from(e)))?;
        Ok(value)
    }

    fn begin_immediate<'c>(&self, conn: &'c Connection) -> RepositoryResult<Transaction<'c>> {
        let mut attempt: u32 = 0;
        loop {
            match Transaction::new_unchecked(conn, TransactionBehavior::Immediate) {
                Ok(tx) => {
                    debug!(db_path = %self.db_path, attempt, "写事务已开启");
                    return Ok(tx);
                }
                Err(e) => {
                    let err = RepositoryError::from(e);
                    if err.is_busy() && attempt < self.busy_retry_limit {
                        attempt += 1;
                        warn!(attempt, "写锁被占用，退避后重试");
                        std::thread::sleep(Duration::from_millis(20 * u64::from(attempt)));
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }
}

// ==========================================
// BookingTx - 事务内数据访问
// ==========================================
// 引擎层通过此类型完成“检查 + 写入”，不直接拼 SQL
pub struct BookingTx<'c> {
    tx: Transaction<'c>,
}

impl<'c> BookingTx<'c> {
    pub fn find_resource(&self, resource_id: &str) -> RepositoryResult<Option<Resource>> {
        resource_repo::load_resource(&self.tx, resource_id)
    }

    pub fn set_occupancy(&self, resource_id: &str, status: OccupancyStatus) -> RepositoryResult<()> {
        resource_repo::update_occupancy(&self.tx, resource_id, status)
    }

    pub fn find_reservation(&self, reservation_id: &str) -> RepositoryResult<Option<Reservation>> {
        reservation_repo::load_reservation(&self.tx, reservation_id)
    }

    /// 查询资源某日所有未取消预约
    pub fn find_active_on_day(&self, resource_id: &str, day: NaiveDate) -> RepositoryResult<Vec<Reservation>> {
        reservation_repo::load_non_cancelled_on_day(&self.tx, resource_id, day)
    }

    /// 查询与区间重叠的未取消预约
    pub fn find_overlapping(&self, resource_id: &str, interval: &Interval) -> RepositoryResult<Vec<Reservation>> {
        reservation_repo::load_overlapping(&self.tx, resource_id, interval)
    }

    /// 资源是否已有在院记录
    pub fn has_admitted(&self, resource_id: &str) -> RepositoryResult<bool> {
        reservation_repo::exists_with_status(&self.tx, resource_id, ReservationStatus::Admitted)
    }

    pub fn insert_reservation(&self, reservation: &Reservation) -> RepositoryResult<()> {
        reservation_repo::insert_reservation(&self.tx, reservation)
    }

    pub fn update_status(
        &self,
        reservation_id: &str,
        status: ReservationStatus,
        updated_at: NaiveDateTime,
        closed_at: Option<NaiveDateTime>,
    ) -> RepositoryResult<()> {
        reservation_repo::update_status(&self.tx, reservation_id, status, updated_at, closed_at)
    }

    pub fn insert_transition(&self, transition: &StatusTransition) -> RepositoryResult<()> {
        reservation_repo::insert_transition(&self.tx, transition)
    }
}
