// ==========================================
// 医院排班预约系统 - 预约数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

use crate::db::DB_DATETIME_FORMAT;
use crate::domain::reservation::{Interval, Reservation, StatusTransition};
use crate::domain::types::{BookingOrigin, ReservationStatus, ResourceKind, Urgency};
use crate::repository::booking_store::BookingStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;

const RESERVATION_COLUMNS: &str = r#"
    reservation_id, resource_id, resource_kind, requester_id, attending_id,
    start_ts, end_ts, status, origin, urgency, reason,
    created_at, updated_at, closed_at
"#;

// ==========================================
// ReservationRepository - 预约只读查询
// ==========================================
// 写入只发生在 BookingStore 事务内（见 booking_store::BookingTx）
pub struct ReservationRepository {
    store: Arc<BookingStore>,
}

impl ReservationRepository {
    pub fn new(store: Arc<BookingStore>) -> Self {
        Self { store }
    }

    /// 按ID查询预约
    pub fn find_by_id(&self, reservation_id: &str) -> RepositoryResult<Option<Reservation>> {
        self.store.read(|conn| load_reservation(conn, reservation_id))
    }

    /// 查询资源某日的未取消预约（按开始时间升序）
    pub fn find_non_cancelled_on_day(
        &self,
        resource_id: &str,
        day: NaiveDate,
    ) -> RepositoryResult<Vec<Reservation>> {
        self.store.read(|conn| load_non_cancelled_on_day(conn, resource_id, day))
    }

    /// 查询全部在院记录
    pub fn find_active_admissions(&self) -> RepositoryResult<Vec<Reservation>> {
        self.store.read(|conn| {
            let sql = format!(
                "SELECT {} FROM reservation WHERE status = 'ADMITTED' ORDER BY start_ts",
                RESERVATION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_reservation_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// 查询预约的状态流转记录（按时间升序）
    pub fn find_transitions(&self, reservation_id: &str) -> RepositoryResult<Vec<StatusTransition>> {
        self.store.read(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT transition_id, reservation_id, from_status, to_status, actor, transition_ts
                FROM reservation_transition
                WHERE reservation_id = ?1
                ORDER BY transition_ts, rowid
                "#,
            )?;
            let rows = stmt
                .query_map(params![reservation_id], |row| {
                    Ok(StatusTransition {
                        transition_id: row.get(0)?,
                        reservation_id: row.get(1)?,
                        from_status: row
                            .get::<_, Option<String>>(2)?
                            .map(|s| parse_status(2, &s))
                            .transpose()?,
                        to_status: parse_status(3, &row.get::<_, String>(3)?)?,
                        actor: row.get(4)?,
                        transition_ts: parse_ts(5, &row.get::<_, String>(5)?)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

// ==========================================
// 连接级数据访问（供事务复用）
// ==========================================

pub(crate) fn load_reservation(conn: &Connection, reservation_id: &str) -> RepositoryResult<Option<Reservation>> {
    let sql = format!("SELECT {} FROM reservation WHERE reservation_id = ?1", RESERVATION_COLUMNS);
    let reservation = conn
        .query_row(&sql, params![reservation_id], map_reservation_row)
        .optional()?;
    Ok(reservation)
}

pub(crate) fn load_non_cancelled_on_day(
    conn: &Connection,
    resource_id: &str,
    day: NaiveDate,
) -> RepositoryResult<Vec<Reservation>> {
    let day_start = day.and_hms_opt(0, 0, 0).map(format_ts).unwrap_or_default();
    let day_end = day.and_hms_opt(23, 59, 59).map(format_ts).unwrap_or_default();

    let sql = format!(
        r#"
        SELECT {} FROM reservation
        WHERE resource_id = ?1
          AND start_ts BETWEEN ?2 AND ?3
          AND status <> 'CANCELLED'
        ORDER BY start_ts
        "#,
        RESERVATION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![resource_id, day_start, day_end], map_reservation_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// 半开区间重叠: existing.start < requested.end AND existing.end > requested.start
/// end_ts 为空的记录（在院）视为无穷远
pub(crate) fn load_overlapping(
    conn: &Connection,
    resource_id: &str,
    interval: &Interval,
) -> RepositoryResult<Vec<Reservation>> {
    let sql = format!(
        r#"
        SELECT {} FROM reservation
        WHERE resource_id = ?1
          AND status <> 'CANCELLED'
          AND start_ts < ?2
          AND (end_ts IS NULL OR end_ts > ?3)
        ORDER BY start_ts
        "#,
        RESERVATION_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![resource_id, format_ts(interval.end), format_ts(interval.start)],
            map_reservation_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub(crate) fn exists_with_status(
    conn: &Connection,
    resource_id: &str,
    status: ReservationStatus,
) -> RepositoryResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM reservation WHERE resource_id = ?1 AND status = ?2 LIMIT 1",
            params![resource_id, status.to_db_str()],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);
    Ok(found)
}

pub(crate) fn insert_reservation(conn: &Connection, r: &Reservation) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO reservation (
            reservation_id, resource_id, resource_kind, requester_id, attending_id,
            start_ts, end_ts, status, origin, urgency, reason,
            created_at, updated_at, closed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
        params![
            r.reservation_id,
            r.resource_id,
            r.resource_kind.to_db_str(),
            r.requester_id,
            r.attending_id,
            format_ts(r.start_ts),
            r.end_ts.map(format_ts),
            r.status.to_db_str(),
            r.origin.to_db_str(),
            r.urgency.to_db_str(),
            r.reason,
            format_ts(r.created_at),
            format_ts(r.updated_at),
            r.closed_at.map(format_ts),
        ],
    )?;
    Ok(())
}

pub(crate) fn update_status(
    conn: &Connection,
    reservation_id: &str,
    status: ReservationStatus,
    updated_at: NaiveDateTime,
    closed_at: Option<NaiveDateTime>,
) -> RepositoryResult<()> {
    let affected = conn.execute(
        r#"
        UPDATE reservation
        SET status = ?1, updated_at = ?2, closed_at = COALESCE(?3, closed_at)
        WHERE reservation_id = ?4
        "#,
        params![
            status.to_db_str(),
            format_ts(updated_at),
            closed_at.map(format_ts),
            reservation_id
        ],
    )?;
    if affected == 0 {
        return Err(RepositoryError::NotFound {
            entity: "Reservation".to_string(),
            id: reservation_id.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn insert_transition(conn: &Connection, t: &StatusTransition) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO reservation_transition (
            transition_id, reservation_id, from_status, to_status, actor, transition_ts
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            t.transition_id,
            t.reservation_id,
            t.from_status.map(|s| s.to_db_str()),
            t.to_status.to_db_str(),
            t.actor,
            format_ts(t.transition_ts),
        ],
    )?;
    Ok(())
}

// ==========================================
// 行映射
// ==========================================

fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(DB_DATETIME_FORMAT).to_string()
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DB_DATETIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_status(idx: usize, raw: &str) -> rusqlite::Result<ReservationStatus> {
    ReservationStatus::from_db_str(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, format!("未知预约状态: {}", raw).into())
    })
}

fn map_reservation_row(row: &Row<'_>) -> rusqlite::Result<Reservation> {
    let kind_raw: String = row.get(2)?;
    let resource_kind = ResourceKind::from_db_str(&kind_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, format!("未知资源类型: {}", kind_raw).into())
    })?;

    Ok(Reservation {
        reservation_id: row.get(0)?,
        resource_id: row.get(1)?,
        resource_kind,
        requester_id: row.get(3)?,
        attending_id: row.get(4)?,
        start_ts: parse_ts(5, &row.get::<_, String>(5)?)?,
        end_ts: row
            .get::<_, Option<String>>(6)?
            .map(|s| parse_ts(6, &s))
            .transpose()?,
        status: parse_status(7, &row.get::<_, String>(7)?)?,
        origin: BookingOrigin::from_db_str(&row.get::<_, String>(8)?),
        urgency: row
            .get::<_, Option<String>>(9)?
            .map(|s| Urgency::from_db_str(&s))
            .unwrap_or_default(),
        reason: row.get(10)?,
        created_at: parse_ts(11, &row.get::<_, String>(11)?)?,
        updated_at: parse_ts(12, &row.get::<_, String>(12)?)?,
        closed_at: row
            .get::<_, Option<String>>(13)?
            .map(|s| parse_ts(13, &s))
            .transpose()?,
    })
}
