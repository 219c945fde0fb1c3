// ==========================================
// 医院排班预约系统 - 引擎层事件发布
// ==========================================
// 职责: 定义预约事件发布 trait，实现依赖倒置
// 说明: 引擎只在事务提交成功后发布；审计落库、通知等由下游实现
// ==========================================

use crate::domain::reservation::{Interval, Reservation};
use crate::domain::types::{ReservationStatus, ResourceKind};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 预约事件类型
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingEventType {
    /// 新建预约（号源分配 / 手术排期 / 入院）
    Allocated,
    /// 状态流转
    StatusChanged,
}

impl BookingEventType {
    pub fn as_str(&self) -> &str {
        match self {
            BookingEventType::Allocated => "Allocated",
            BookingEventType::StatusChanged => "StatusChanged",
        }
    }
}

/// 预约事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingEvent {
    pub event_type: BookingEventType,
    /// 操作人（患者本人或工作人员）
    pub actor: String,
    pub reservation_id: String,
    pub resource_id: String,
    pub resource_kind: ResourceKind,
    /// 住院在出院前 end 为开区间，此处为 None
    pub interval: Option<Interval>,
    pub status: ReservationStatus,
    pub previous_status: Option<ReservationStatus>,
    pub occurred_at: NaiveDateTime,
}

impl BookingEvent {
    /// 创建分配事件
    pub fn allocated(actor: &str, reservation: &Reservation, occurred_at: NaiveDateTime) -> Self {
        Self {
            event_type: BookingEventType::Allocated,
            actor: actor.to_string(),
            reservation_id: reservation.reservation_id.clone(),
            resource_id: reservation.resource_id.clone(),
            resource_kind: reservation.resource_kind,
            interval: reservation.end_ts.map(|end| Interval {
                start: reservation.start_ts,
                end,
            }),
            status: reservation.status,
            previous_status: None,
            occurred_at,
        }
    }

    /// 创建状态流转事件（reservation 为流转后的记录）
    pub fn status_changed(
        actor: &str,
        reservation: &Reservation,
        previous_status: ReservationStatus,
        occurred_at: NaiveDateTime,
    ) -> Self {
        Self {
            event_type: BookingEventType::StatusChanged,
            previous_status: Some(previous_status),
            ..Self::allocated(actor, reservation, occurred_at)
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 预约事件发布者 Trait
///
/// # 返回
/// - `Ok(id)`: 下游分配的消息 ID（如果支持）或空字符串
/// - `Err`: 发布失败（引擎只记录告警，不回滚已提交的预约）
pub trait BookingEventPublisher: Send + Sync {
    fn publish(&self, event: BookingEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl BookingEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: BookingEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - reservation_id={}, event_type={}",
            event.reservation_id,
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn BookingEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn BookingEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: BookingEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => Ok(String::new()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
