// ==========================================
// 医院排班预约系统 - 区间冲突检测
// ==========================================
// 用于可变时长预约（手术室）
// 冲突 ⇔ existing.start < requested.end && existing.end > requested.start
// 不做对齐，边界相接不算冲突
// ==========================================

use crate::domain::reservation::{Interval, Reservation};
use crate::domain::types::ReservationStatus;
use crate::engine::error::{BookingError, BookingResult};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalConflictChecker;

impl IntervalConflictChecker {
    pub fn new() -> Self {
        Self
    }

    /// 校验并构造区间，end <= start 返回 InvalidInterval
    pub fn validate(&self, start: NaiveDateTime, end: NaiveDateTime) -> BookingResult<Interval> {
        Interval::new(start, end).ok_or(BookingError::InvalidInterval { start, end })
    }

    /// 返回第一条与请求区间冲突的未取消预约
    pub fn find_conflict<'a>(
        &self,
        requested: &Interval,
        existing: &'a [Reservation],
    ) -> Option<&'a Reservation> {
        existing
            .iter()
            .filter(|r| r.status != ReservationStatus::Cancelled)
            .find(|r| r.interval().overlaps(requested))
    }
}
