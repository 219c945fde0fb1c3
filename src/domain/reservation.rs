// ==========================================
// 医院排班预约系统 - 预约领域模型
// ==========================================
// 预约 = 已提交的 (资源, 时间区间, 申请人) 元组 + 状态
// 红线: 取消为软删除（状态变更），不做物理删除
// 红线: 同一资源所有未取消预约的时间区间两两不相交
// ==========================================

use crate::domain::types::{BookingOrigin, ReservationStatus, ResourceKind, Urgency};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Interval - 半开时间区间 [start, end)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Interval {
    /// 构造区间，end 必须严格晚于 start
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        if end > start {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// 从起点与固定时长构造
    pub fn from_duration(start: NaiveDateTime, duration: Duration) -> Self {
        Self {
            start,
            end: start + duration,
        }
    }

    /// 半开区间重叠判定: a.start < b.end && a.end > b.start
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && self.end > other.start
    }
}

// ==========================================
// Reservation - 预约
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: String,
    pub resource_id: String,
    pub resource_kind: ResourceKind,

    // ===== 参与方 =====
    pub requester_id: String,         // 患者
    pub attending_id: Option<String>, // 主治/主刀医生（手术、住院）

    // ===== 时间 =====
    pub start_ts: NaiveDateTime,
    pub end_ts: Option<NaiveDateTime>, // 住院在出院前为空（开区间）

    // ===== 状态 =====
    pub status: ReservationStatus,
    pub origin: BookingOrigin,
    pub urgency: Urgency,
    pub reason: Option<String>, // 主诉 / 手术名称 / 入院诊断

    // ===== 审计 =====
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub closed_at: Option<NaiveDateTime>, // 进入终态的时间（出院时间等）
}

impl Reservation {
    /// 预约占用的区间；开区间预约（在院）视为延伸到无穷远
    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start_ts,
            end: self.end_ts.unwrap_or(NaiveDateTime::MAX),
        }
    }
}

// ==========================================
// StatusTransition - 状态流转记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub transition_id: String,
    pub reservation_id: String,
    pub from_status: Option<ReservationStatus>, // 创建时为空
    pub to_status: ReservationStatus,
    pub actor: String,
    pub transition_ts: NaiveDateTime,
}

// ==========================================
// 请求对象（瞬态，只存在于一次分配调用内）
// ==========================================

/// 自助预约请求：按主诉推断专科并自动分配医生
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub requester_id: String,
    pub requirement_text: String,
    pub preferred_start: Option<NaiveDateTime>,
    pub urgency: Urgency,
}

/// 工作人员代约：指定医生与时刻
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffAppointmentRequest {
    pub actor_id: String,
    pub requester_id: String,
    pub resource_id: String,
    pub start: NaiveDateTime,
    pub reason: Option<String>,
    pub urgency: Urgency,
}

/// 区间预约（手术室）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalBookingRequest {
    pub actor_id: String,
    pub resource_id: String,
    pub requester_id: String,
    pub attending_id: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub procedure: Option<String>,
    pub urgency: Urgency,
}

/// 入院请求（床位）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionRequest {
    pub actor_id: String,
    pub bed_id: String,
    pub occupant_id: String,
    pub attending_id: String,
    pub diagnosis: Option<String>,
}

// ==========================================
// 结果对象
// ==========================================

/// 自动分配预约结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedAppointment {
    pub reservation_id: String,
    pub resource_id: String,
    pub resource_name: String,
    pub category: String,
    pub interval: Interval,
    pub status: ReservationStatus,
}

/// 释放结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleasedReservation {
    pub reservation_id: String,
    pub new_status: ReservationStatus,
}
