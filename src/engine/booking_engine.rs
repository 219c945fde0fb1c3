// ==========================================
// 医院排班预约系统 - 预约事务引擎
// ==========================================
// 职责: 编排 准入筛选 → 负载均衡 → 时间校验 → 原子提交
// 红线:
// - 可用性检查与 “写预约 + 翻转资源状态 + 写流转记录” 在同一写事务内
// - 截止时间在提交前检查，超时则整体回滚，不留半成品
// - 事件只在提交成功后发布，发布失败不影响已提交结果
// ==========================================

use crate::config::scheduling_config::SchedulingConfig;
use crate::domain::reservation::{
    AdmissionRequest, AllocatedAppointment, AppointmentRequest, Interval, IntervalBookingRequest,
    ReleasedReservation, Reservation, StaffAppointmentRequest, StatusTransition,
};
use crate::domain::types::{
    BookingOrigin, OccupancyStatus, ReservationStatus, ResourceKind, TimingStrategy, Urgency,
};
use crate::engine::clock::{Clock, Deadline};
use crate::engine::eligibility::EligibilitySelector;
use crate::engine::error::{BookingError, BookingResult};
use crate::engine::events::{BookingEvent, BookingEventPublisher, OptionalEventPublisher};
use crate::engine::interval_check::IntervalConflictChecker;
use crate::engine::load_balancer::LoadBalancer;
use crate::engine::slot_search::{SlotSearchEngine, SlotSearchParams};
use crate::engine::state_machine;
use crate::repository::booking_store::{BookingStore, BookingTx};
use crate::repository::error::RepositoryError;
use crate::repository::reservation_repo::ReservationRepository;
use crate::repository::resource_directory::ResourceDirectory;
use chrono::{NaiveDateTime, Timelike};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// BookingEngine - 预约事务引擎
// ==========================================
pub struct BookingEngine {
    store: Arc<BookingStore>,
    directory: Arc<dyn ResourceDirectory>,
    reservations: ReservationRepository,
    clock: Arc<dyn Clock>,
    events: OptionalEventPublisher,
}

/// 新建预约的公共字段
struct NewReservation<'a> {
    resource_id: &'a str,
    kind: ResourceKind,
    requester_id: &'a str,
    attending_id: Option<String>,
    start: NaiveDateTime,
    end: Option<NaiveDateTime>,
    origin: BookingOrigin,
    urgency: Urgency,
    reason: Option<String>,
}

impl BookingEngine {
    pub fn new(
        store: Arc<BookingStore>,
        directory: Arc<dyn ResourceDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reservations: ReservationRepository::new(store.clone()),
            store,
            directory,
            clock,
            events: OptionalEventPublisher::none(),
        }
    }

    /// 配置事件发布者
    pub fn with_event_publisher(mut self, publisher: Arc<dyn BookingEventPublisher>) -> Self {
        self.events = OptionalEventPublisher::with_publisher(publisher);
        self
    }

    // ==========================================
    // 自助预约：自动分配医生 + 号源
    // ==========================================

    /// 按主诉自动分配医生并预约首个空闲号源
    ///
    /// # 流程
    /// 1. 推断专科，按兜底链取候选医生
    /// 2. 选在途预约最少者
    /// 3. 事务外搜索空闲号源（规划）
    /// 4. 事务内复核号源仍空闲后写入（提交）
    /// 5. 提交时被并发抢占 → 整体重新规划，最多 max_allocation_attempts 次
    #[instrument(skip(self, config, request), fields(requester_id = %request.requester_id))]
    pub fn allocate_and_book_appointment(
        &self,
        config: &SchedulingConfig,
        request: &AppointmentRequest,
    ) -> BookingResult<AllocatedAppointment> {
        require_non_empty("requester_id", &request.requester_id)?;

        let deadline = Deadline::start(config.allocation_timeout());
        let selector = EligibilitySelector::from_config(config);
        let search = SlotSearchEngine::new(SlotSearchParams::from_config(config)?);
        let category = selector.infer_category(&request.requirement_text);
        debug!(category = %category, "主诉已映射到专科");

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            deadline.check()?;

            match self.try_allocate_once(config, &selector, &search, &category, request, &deadline) {
                Err(e) if e.is_retryable() && attempt < config.max_allocation_attempts => {
                    warn!(attempt, error = %e, "号源提交时被抢占，重新规划");
                }
                result => return result,
            }
        }
    }

    fn try_allocate_once(
        &self,
        config: &SchedulingConfig,
        selector: &EligibilitySelector,
        search: &SlotSearchEngine,
        category: &str,
        request: &AppointmentRequest,
        deadline: &Deadline,
    ) -> BookingResult<AllocatedAppointment> {
        let candidates =
            selector.select_candidates(self.directory.as_ref(), ResourceKind::Practitioner, category)?;
        let chosen = LoadBalancer::new()
            .pick(&candidates.candidates)
            .ok_or_else(|| BookingError::NoEligibleResource {
                kind: ResourceKind::Practitioner,
                category: category.to_string(),
            })?
            .resource
            .clone();

        let now = self.now();
        let start = search.normalize_start(request.preferred_start, now);
        let slot = search.find_first_free(start, &chosen.resource_id, |day| {
            Ok(self
                .reservations
                .find_non_cancelled_on_day(&chosen.resource_id, day)?
                .into_iter()
                .map(|r| r.start_ts)
                .collect())
        })?;
        let interval = Interval::from_duration(slot, config.granularity());

        let reservation = self.build_reservation(
            NewReservation {
                resource_id: &chosen.resource_id,
                kind: ResourceKind::Practitioner,
                requester_id: &request.requester_id,
                attending_id: None,
                start: interval.start,
                end: Some(interval.end),
                origin: BookingOrigin::SelfService,
                urgency: request.urgency,
                reason: non_empty(&request.requirement_text),
            },
            now,
        );

        self.store.with_transaction(|tx| -> BookingResult<_> {
            let booked = booked_starts(tx, &chosen.resource_id, slot)?;
            if !search.is_slot_free(slot, &booked) {
                return Err(BookingError::ResourceBooked {
                    resource_id: chosen.resource_id.clone(),
                    at_commit: true,
                });
            }
            deadline.check()?;
            insert_with_transition(tx, &reservation, &request.requester_id)
        })?;

        info!(
            reservation_id = %reservation.reservation_id,
            resource_id = %chosen.resource_id,
            slot = %slot,
            scope = ?candidates.scope,
            "门诊号源已分配"
        );
        self.publish(BookingEvent::allocated(&request.requester_id, &reservation, now));

        Ok(AllocatedAppointment {
            reservation_id: reservation.reservation_id,
            resource_id: chosen.resource_id,
            resource_name: chosen.display_name,
            category: candidates.category,
            interval,
            status: reservation.status,
        })
    }

    // ==========================================
    // 工作人员代约：指定医生 + 时刻
    // ==========================================

    #[instrument(skip(self, config, request), fields(resource_id = %request.resource_id, start = %request.start))]
    pub fn book_appointment(
        &self,
        config: &SchedulingConfig,
        request: &StaffAppointmentRequest,
    ) -> BookingResult<Reservation> {
        require_non_empty("requester_id", &request.requester_id)?;

        let deadline = Deadline::start(config.allocation_timeout());
        let search = SlotSearchEngine::new(SlotSearchParams::from_config(config)?);
        let now = self.now();
        let interval = Interval::from_duration(request.start, config.granularity());

        let reservation = self.build_reservation(
            NewReservation {
                resource_id: &request.resource_id,
                kind: ResourceKind::Practitioner,
                requester_id: &request.requester_id,
                attending_id: None,
                start: interval.start,
                end: Some(interval.end),
                origin: BookingOrigin::Staff,
                urgency: request.urgency,
                reason: request.reason.clone(),
            },
            now,
        );

        self.store.with_transaction(|tx| -> BookingResult<_> {
            load_bookable(tx, &request.resource_id, TimingStrategy::FixedSlot)?;

            let booked = booked_starts(tx, &request.resource_id, request.start)?;
            if !search.is_slot_free(request.start, &booked) {
                return Err(BookingError::ResourceBooked {
                    resource_id: request.resource_id.clone(),
                    at_commit: false,
                });
            }
            deadline.check()?;
            insert_with_transition(tx, &reservation, &request.actor_id)
        })?;

        info!(reservation_id = %reservation.reservation_id, "代约已创建");
        self.publish(BookingEvent::allocated(&request.actor_id, &reservation, now));
        Ok(reservation)
    }

    // ==========================================
    // 区间预约（手术室）
    // ==========================================

    #[instrument(skip(self, config, request), fields(resource_id = %request.resource_id))]
    pub fn book_interval(
        &self,
        config: &SchedulingConfig,
        request: &IntervalBookingRequest,
    ) -> BookingResult<Reservation> {
        let checker = IntervalConflictChecker::new();
        let interval = checker.validate(request.start, request.end)?;
        require_non_empty("requester_id", &request.requester_id)?;

        let deadline = Deadline::start(config.allocation_timeout());
        let now = self.now();
        let reservation = self.build_reservation(
            NewReservation {
                resource_id: &request.resource_id,
                kind: ResourceKind::Theater,
                requester_id: &request.requester_id,
                attending_id: request.attending_id.clone(),
                start: interval.start,
                end: Some(interval.end),
                origin: BookingOrigin::Staff,
                urgency: request.urgency,
                reason: request.procedure.clone(),
            },
            now,
        );

        self.store.with_transaction(|tx| -> BookingResult<_> {
            load_bookable(tx, &request.resource_id, TimingStrategy::IntervalOverlap)?;

            let existing = tx.find_overlapping(&request.resource_id, &interval)?;
            if let Some(conflict) = checker.find_conflict(&interval, &existing) {
                debug!(conflict_id = %conflict.reservation_id, "区间与已有预约重叠");
                return Err(BookingError::ResourceBooked {
                    resource_id: request.resource_id.clone(),
                    at_commit: false,
                });
            }
            deadline.check()?;
            insert_with_transition(tx, &reservation, &request.actor_id)
        })?;

        info!(
            reservation_id = %reservation.reservation_id,
            start = %interval.start,
            end = %interval.end,
            "手术室已排期"
        );
        self.publish(BookingEvent::allocated(&request.actor_id, &reservation, now));
        Ok(reservation)
    }

    // ==========================================
    // 入院（床位）
    // ==========================================

    #[instrument(skip(self, config, request), fields(bed_id = %request.bed_id, occupant_id = %request.occupant_id))]
    pub fn admit_to_bed(
        &self,
        config: &SchedulingConfig,
        request: &AdmissionRequest,
    ) -> BookingResult<Reservation> {
        require_non_empty("occupant_id", &request.occupant_id)?;

        let deadline = Deadline::start(config.allocation_timeout());
        let now = self.now();
        let reservation = self.build_reservation(
            NewReservation {
                resource_id: &request.bed_id,
                kind: ResourceKind::Bed,
                requester_id: &request.occupant_id,
                attending_id: Some(request.attending_id.clone()),
                start: now,
                end: None,
                origin: BookingOrigin::Staff,
                urgency: Urgency::Normal,
                reason: request.diagnosis.clone(),
            },
            now,
        );

        self.store.with_transaction(|tx| -> BookingResult<_> {
            let bed = tx
                .find_resource(&request.bed_id)?
                .ok_or_else(|| BookingError::not_found("Resource", &request.bed_id))?;
            if bed.kind.timing_strategy() != TimingStrategy::ExclusiveOccupancy {
                return Err(BookingError::InvalidInput(format!(
                    "资源{}不是床位: kind={}",
                    bed.resource_id, bed.kind
                )));
            }

            let attending = tx
                .find_resource(&request.attending_id)?
                .ok_or_else(|| BookingError::not_found("Resource", &request.attending_id))?;
            if attending.kind != ResourceKind::Practitioner {
                return Err(BookingError::InvalidInput(format!(
                    "主治医生{}不是医生资源",
                    attending.resource_id
                )));
            }

            if !bed.active || !bed.is_available() || tx.has_admitted(&bed.resource_id)? {
                return Err(BookingError::BedUnavailable {
                    bed_id: bed.resource_id,
                });
            }

            deadline.check()?;
            insert_with_transition(tx, &reservation, &request.actor_id)?;
            tx.set_occupancy(&bed.resource_id, OccupancyStatus::Occupied)?;
            Ok(())
        })?;

        info!(reservation_id = %reservation.reservation_id, "已入院，床位置为占用");
        self.publish(BookingEvent::allocated(&request.actor_id, &reservation, now));
        Ok(reservation)
    }

    // ==========================================
    // 状态流转
    // ==========================================

    /// 释放预约：床位为出院（同时释放床位），其余为取消
    #[instrument(skip(self))]
    pub fn release_reservation(&self, reservation_id: &str, actor: &str) -> BookingResult<ReleasedReservation> {
        let now = self.now();

        let (previous, updated) = self.store.with_transaction(|tx| -> BookingResult<_> {
            let current = load_reservation(tx, reservation_id)?;
            if current.status.is_terminal() {
                return Err(BookingError::AlreadyTerminal {
                    reservation_id: reservation_id.to_string(),
                    status: current.status,
                });
            }

            let target = state_machine::release_target(current.resource_kind);
            state_machine::check_transition(current.resource_kind, current.status, target)?;
            let updated = apply_transition(tx, &current, target, actor, now)?;
            Ok((current.status, updated))
        })?;

        info!(from = %previous, to = %updated.status, "预约已释放");
        self.publish(BookingEvent::status_changed(actor, &updated, previous, now));

        Ok(ReleasedReservation {
            reservation_id: updated.reservation_id,
            new_status: updated.status,
        })
    }

    /// 推进状态（只允许状态机中的单向流转）
    #[instrument(skip(self))]
    pub fn advance_status(
        &self,
        reservation_id: &str,
        next: ReservationStatus,
        actor: &str,
    ) -> BookingResult<Reservation> {
        let now = self.now();

        let (previous, updated) = self.store.with_transaction(|tx| -> BookingResult<_> {
            let current = load_reservation(tx, reservation_id)?;
            state_machine::check_transition(current.resource_kind, current.status, next)?;
            let updated = apply_transition(tx, &current, next, actor, now)?;
            Ok((current.status, updated))
        })?;

        info!(from = %previous, to = %updated.status, "预约状态已推进");
        self.publish(BookingEvent::status_changed(actor, &updated, previous, now));
        Ok(updated)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 当前时间（截断到秒，与存储精度一致）
    fn now(&self) -> NaiveDateTime {
        let t = self.clock.now();
        t.with_nanosecond(0).unwrap_or(t)
    }

    fn build_reservation(&self, new: NewReservation<'_>, now: NaiveDateTime) -> Reservation {
        Reservation {
            reservation_id: Uuid::new_v4().to_string(),
            resource_id: new.resource_id.to_string(),
            resource_kind: new.kind,
            requester_id: new.requester_id.to_string(),
            attending_id: new.attending_id,
            start_ts: new.start,
            end_ts: new.end,
            status: state_machine::initial_status(new.kind, new.origin),
            origin: new.origin,
            urgency: new.urgency,
            reason: new.reason,
            created_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    fn publish(&self, event: BookingEvent) {
        if let Err(e) = self.events.publish(event) {
            warn!("预约事件发布失败: {}", e);
        }
    }
}

// ==========================================
// 事务内步骤
// ==========================================

fn require_non_empty(field: &str, value: &str) -> BookingResult<()> {
    if value.trim().is_empty() {
        return Err(BookingError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(())
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// 校验指定资源存在、在用且时间策略匹配
fn load_bookable(tx: &BookingTx<'_>, resource_id: &str, expected: TimingStrategy) -> BookingResult<()> {
    let resource = tx
        .find_resource(resource_id)?
        .ok_or_else(|| BookingError::not_found("Resource", resource_id))?;

    if resource.kind.timing_strategy() != expected {
        return Err(BookingError::InvalidInput(format!(
            "资源{}类型不支持该预约方式: kind={}",
            resource_id, resource.kind
        )));
    }
    if !resource.active {
        return Err(BookingError::NoEligibleResource {
            kind: resource.kind,
            category: resource.eligibility_tag.unwrap_or_default(),
        });
    }
    Ok(())
}

fn booked_starts(tx: &BookingTx<'_>, resource_id: &str, slot: NaiveDateTime) -> BookingResult<Vec<NaiveDateTime>> {
    Ok(tx
        .find_active_on_day(resource_id, slot.date())?
        .into_iter()
        .map(|r| r.start_ts)
        .collect())
}

fn load_reservation(tx: &BookingTx<'_>, reservation_id: &str) -> BookingResult<Reservation> {
    tx.find_reservation(reservation_id)?
        .ok_or_else(|| BookingError::not_found("Reservation", reservation_id))
}

/// 写预约 + 初始流转记录；唯一索引冲突按资源类型映射
fn insert_with_transition(tx: &BookingTx<'_>, reservation: &Reservation, actor: &str) -> BookingResult<()> {
    tx.insert_reservation(reservation).map_err(|e| match e {
        RepositoryError::UniqueConstraintViolation(_) => match reservation.resource_kind {
            ResourceKind::Bed => BookingError::BedUnavailable {
                bed_id: reservation.resource_id.clone(),
            },
            _ => BookingError::ResourceBooked {
                resource_id: reservation.resource_id.clone(),
                at_commit: true,
            },
        },
        other => other.into(),
    })?;

    tx.insert_transition(&StatusTransition {
        transition_id: Uuid::new_v4().to_string(),
        reservation_id: reservation.reservation_id.clone(),
        from_status: None,
        to_status: reservation.status,
        actor: actor.to_string(),
        transition_ts: reservation.created_at,
    })?;
    Ok(())
}

/// 更新状态 + 写流转记录；出院时同步释放床位
fn apply_transition(
    tx: &BookingTx<'_>,
    current: &Reservation,
    to: ReservationStatus,
    actor: &str,
    now: NaiveDateTime,
) -> BookingResult<Reservation> {
    let closed_at = to.is_terminal().then_some(now);
    tx.update_status(&current.reservation_id, to, now, closed_at)?;

    if current.resource_kind == ResourceKind::Bed && to == ReservationStatus::Discharged {
        tx.set_occupancy(&current.resource_id, OccupancyStatus::Available)?;
    }

    tx.insert_transition(&StatusTransition {
        transition_id: Uuid::new_v4().to_string(),
        reservation_id: current.reservation_id.clone(),
        from_status: Some(current.status),
        to_status: to,
        actor: actor.to_string(),
        transition_ts: now,
    })?;

    let mut updated = current.clone();
    updated.status = to;
    updated.updated_at = now;
    if closed_at.is_some() {
        updated.closed_at = closed_at;
    }
    Ok(updated)
}
