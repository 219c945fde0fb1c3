// ==========================================
// 医院排班预约系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 资源类型 (Resource Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    Practitioner, // 医生（号源）
    Theater,      // 手术室
    Bed,          // 病床
}

impl ResourceKind {
    /// 转换为数据库字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ResourceKind::Practitioner => "PRACTITIONER",
            ResourceKind::Theater => "THEATER",
            ResourceKind::Bed => "BED",
        }
    }

    /// 从数据库字符串解析（未知值返回 None）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PRACTITIONER" => Some(ResourceKind::Practitioner),
            "THEATER" => Some(ResourceKind::Theater),
            "BED" => Some(ResourceKind::Bed),
            _ => None,
        }
    }

    /// 该类资源使用的时间校验策略
    pub fn timing_strategy(&self) -> TimingStrategy {
        match self {
            ResourceKind::Practitioner => TimingStrategy::FixedSlot,
            ResourceKind::Theater => TimingStrategy::IntervalOverlap,
            ResourceKind::Bed => TimingStrategy::ExclusiveOccupancy,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 时间校验策略 (Timing Strategy)
// ==========================================
// 三类资源共享同一套预约/状态机/事务逻辑，只有时间校验方式不同
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimingStrategy {
    FixedSlot,          // 固定时长号源：按粒度向前搜索空闲时段
    IntervalOverlap,    // 可变时长：半开区间重叠检测
    ExclusiveOccupancy, // 独占占用：依赖资源占用状态 (AVAILABLE/OCCUPIED)
}

// ==========================================
// 占用状态 (Occupancy Status)
// ==========================================
// 仅用于独占型资源（床位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OccupancyStatus {
    Available,
    Occupied,
}

impl OccupancyStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OccupancyStatus::Available => "AVAILABLE",
            OccupancyStatus::Occupied => "OCCUPIED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "AVAILABLE" => Some(OccupancyStatus::Available),
            "OCCUPIED" => Some(OccupancyStatus::Occupied),
            _ => None,
        }
    }
}

impl fmt::Display for OccupancyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 预约状态 (Reservation Status)
// ==========================================
// 三类资源的状态合并为一个枚举，每类资源只使用其中一部分：
// - 门诊预约: PENDING → CONFIRMED → COMPLETED / CANCELLED
// - 手术排期: SCHEDULED → IN_PROGRESS → COMPLETED / CANCELLED
// - 住院:     ADMITTED → DISCHARGED
// 合法流转见 engine::state_machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Scheduled,
    InProgress,
    Admitted,
    Completed,
    Discharged,
    Cancelled,
}

impl ReservationStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Scheduled => "SCHEDULED",
            ReservationStatus::InProgress => "IN_PROGRESS",
            ReservationStatus::Admitted => "ADMITTED",
            ReservationStatus::Completed => "COMPLETED",
            ReservationStatus::Discharged => "DISCHARGED",
            ReservationStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(ReservationStatus::Pending),
            "CONFIRMED" => Some(ReservationStatus::Confirmed),
            "SCHEDULED" => Some(ReservationStatus::Scheduled),
            "IN_PROGRESS" => Some(ReservationStatus::InProgress),
            "ADMITTED" => Some(ReservationStatus::Admitted),
            "COMPLETED" => Some(ReservationStatus::Completed),
            "DISCHARGED" => Some(ReservationStatus::Discharged),
            "CANCELLED" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }

    /// 终态：不再允许任何流转
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Completed | ReservationStatus::Discharged | ReservationStatus::Cancelled
        )
    }

    /// 在途状态（负载均衡计数口径）
    pub fn is_live(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 预约来源 (Booking Origin)
// ==========================================
// 患者自助预约直接 CONFIRMED；工作人员代约从 PENDING 开始
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingOrigin {
    SelfService,
    Staff,
}

impl BookingOrigin {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            BookingOrigin::SelfService => "SELF_SERVICE",
            BookingOrigin::Staff => "STAFF",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "SELF_SERVICE" => BookingOrigin::SelfService,
            _ => BookingOrigin::Staff,
        }
    }
}

// ==========================================
// 紧急程度 (Urgency)
// ==========================================
// 只随预约记录保存，不参与分配算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Low,
    Normal,
    High,
    Emergency,
}

impl Urgency {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Urgency::Low => "LOW",
            Urgency::Normal => "NORMAL",
            Urgency::High => "HIGH",
            Urgency::Emergency => "EMERGENCY",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "LOW" => Urgency::Low,
            "HIGH" => Urgency::High,
            "EMERGENCY" => Urgency::Emergency,
            _ => Urgency::Normal, // 默认值
        }
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_db_round_trip_is_case_insensitive() {
        assert_eq!(
            ReservationStatus::from_db_str("in_progress"),
            Some(ReservationStatus::InProgress)
        );
        assert_eq!(ReservationStatus::from_db_str("UNKNOWN"), None);
    }

    #[test]
    fn test_terminal_and_live_sets() {
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(ReservationStatus::Discharged.is_terminal());
        assert!(ReservationStatus::Pending.is_live());
        assert!(ReservationStatus::Admitted.is_live());
        assert!(!ReservationStatus::Completed.is_live());
    }

    #[test]
    fn test_timing_strategy_per_kind() {
        assert_eq!(ResourceKind::Practitioner.timing_strategy(), TimingStrategy::FixedSlot);
        assert_eq!(ResourceKind::Theater.timing_strategy(), TimingStrategy::IntervalOverlap);
        assert_eq!(ResourceKind::Bed.timing_strategy(), TimingStrategy::ExclusiveOccupancy);
    }
}
