// ==========================================
// 医院排班预约系统 - 预约状态机
// ==========================================
// 门诊预约: PENDING → CONFIRMED → COMPLETED；任意非终态 → CANCELLED
// 手术排期: SCHEDULED → IN_PROGRESS → COMPLETED；任意非终态 → CANCELLED
// 住院:     ADMITTED → DISCHARGED
// 红线: 只能单向流转，任何状态不可重入
// ==========================================

use crate::domain::types::{BookingOrigin, ReservationStatus, ResourceKind};
use crate::engine::error::{BookingError, BookingResult};

use ReservationStatus::*;

/// 新建预约的初始状态
pub fn initial_status(kind: ResourceKind, origin: BookingOrigin) -> ReservationStatus {
    match (kind, origin) {
        (ResourceKind::Practitioner, BookingOrigin::SelfService) => Confirmed,
        (ResourceKind::Practitioner, BookingOrigin::Staff) => Pending,
        (ResourceKind::Theater, _) => Scheduled,
        (ResourceKind::Bed, _) => Admitted,
    }
}

/// 该资源类型下从 from 出发允许到达的状态
pub fn allowed_next(kind: ResourceKind, from: ReservationStatus) -> &'static [ReservationStatus] {
    match (kind, from) {
        (ResourceKind::Practitioner, Pending) => &[Confirmed, Cancelled],
        (ResourceKind::Practitioner, Confirmed) => &[Completed, Cancelled],
        (ResourceKind::Theater, Scheduled) => &[InProgress, Cancelled],
        (ResourceKind::Theater, InProgress) => &[Completed, Cancelled],
        (ResourceKind::Bed, Admitted) => &[Discharged],
        _ => &[],
    }
}

/// 校验状态流转
pub fn check_transition(
    kind: ResourceKind,
    from: ReservationStatus,
    to: ReservationStatus,
) -> BookingResult<()> {
    if allowed_next(kind, from).contains(&to) {
        Ok(())
    } else {
        Err(BookingError::InvalidTransition { from, to })
    }
}

/// 释放操作的目标状态（床位为出院，其余为取消）
pub fn release_target(kind: ResourceKind) -> ReservationStatus {
    match kind {
        ResourceKind::Bed => Discharged,
        ResourceKind::Practitioner | ResourceKind::Theater => Cancelled,
    }
}
