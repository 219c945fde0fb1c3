// ==========================================
// 医院排班预约系统 - 预约 API
// ==========================================
// 职责: 异步入口；每次调用读取一次配置快照，
//       同步引擎在 blocking 线程池内执行（SQLite 调用会阻塞）
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;

use crate::api::error::{ApiError, ApiResult};
use crate::config::scheduling_config::SchedulingConfig;
use crate::config::scheduling_config_trait::SchedulingConfigReader;
use crate::domain::reservation::{
    AdmissionRequest, AllocatedAppointment, AppointmentRequest, IntervalBookingRequest,
    ReleasedReservation, Reservation, StaffAppointmentRequest, StatusTransition,
};
use crate::domain::types::ReservationStatus;
use crate::engine::booking_engine::BookingEngine;
use crate::engine::error::{BookingError, BookingResult};
use crate::repository::reservation_repo::ReservationRepository;

// ==========================================
// BookingApi - 预约 API
// ==========================================
pub struct BookingApi {
    engine: Arc<BookingEngine>,
    reservations: Arc<ReservationRepository>,
    config_reader: Arc<dyn SchedulingConfigReader>,
}

impl BookingApi {
    pub fn new(
        engine: Arc<BookingEngine>,
        reservations: Arc<ReservationRepository>,
        config_reader: Arc<dyn SchedulingConfigReader>,
    ) -> Self {
        Self {
            engine,
            reservations,
            config_reader,
        }
    }

    async fn load_config(&self) -> ApiResult<SchedulingConfig> {
        SchedulingConfig::load(self.config_reader.as_ref())
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    async fn run_blocking<T, F>(f: F) -> ApiResult<T>
    where
        F: FnOnce() -> BookingResult<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| ApiError::TaskJoinError(e.to_string()))?
            .map_err(ApiError::from)
    }

    // ==========================================
    // 预约操作
    // ==========================================

    /// 自助预约：按主诉自动分配医生与号源
    ///
    /// # 返回
    /// - Ok(AllocatedAppointment): 医生、号源区间、状态（CONFIRMED）
    /// - Err: NoEligibleResource / NoAvailableSlot / Timeout 等
    pub async fn allocate_and_book_appointment(
        &self,
        request: AppointmentRequest,
    ) -> ApiResult<AllocatedAppointment> {
        let config = self.load_config().await?;
        let engine = self.engine.clone();
        Self::run_blocking(move || engine.allocate_and_book_appointment(&config, &request)).await
    }

    /// 工作人员代约（PENDING）
    pub async fn book_appointment(&self, request: StaffAppointmentRequest) -> ApiResult<Reservation> {
        if request.resource_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("医生ID不能为空".to_string()));
        }
        let config = self.load_config().await?;
        let engine = self.engine.clone();
        Self::run_blocking(move || engine.book_appointment(&config, &request)).await
    }

    /// 手术室区间预约
    pub async fn book_interval(&self, request: IntervalBookingRequest) -> ApiResult<Reservation> {
        if request.resource_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("手术室ID不能为空".to_string()));
        }
        let config = self.load_config().await?;
        let engine = self.engine.clone();
        Self::run_blocking(move || engine.book_interval(&config, &request)).await
    }

    /// 入院
    pub async fn admit_to_bed(&self, request: AdmissionRequest) -> ApiResult<Reservation> {
        if request.bed_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("床位ID不能为空".to_string()));
        }
        let config = self.load_config().await?;
        let engine = self.engine.clone();
        Self::run_blocking(move || engine.admit_to_bed(&config, &request)).await
    }

    /// 释放预约（取消 / 出院）
    pub async fn release_reservation(
        &self,
        reservation_id: &str,
        actor: &str,
    ) -> ApiResult<ReleasedReservation> {
        if reservation_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("预约ID不能为空".to_string()));
        }
        let engine = self.engine.clone();
        let reservation_id = reservation_id.to_string();
        let actor = actor.to_string();
        Self::run_blocking(move || engine.release_reservation(&reservation_id, &actor)).await
    }

    /// 推进状态
    pub async fn advance_status(
        &self,
        reservation_id: &str,
        next: ReservationStatus,
        actor: &str,
    ) -> ApiResult<Reservation> {
        if reservation_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("预约ID不能为空".to_string()));
        }
        let engine = self.engine.clone();
        let reservation_id = reservation_id.to_string();
        let actor = actor.to_string();
        Self::run_blocking(move || engine.advance_status(&reservation_id, next, &actor)).await
    }

    // ==========================================
    // 查询
    // ==========================================

    pub async fn get_reservation(&self, reservation_id: &str) -> ApiResult<Reservation> {
        let repo = self.reservations.clone();
        let reservation_id = reservation_id.to_string();
        Self::run_blocking(move || {
            repo.find_by_id(&reservation_id)?
                .ok_or_else(|| BookingError::not_found("Reservation", &reservation_id))
        })
        .await
    }

    /// 资源某日的未取消预约
    pub async fn list_reservations_on_day(
        &self,
        resource_id: &str,
        day: NaiveDate,
    ) -> ApiResult<Vec<Reservation>> {
        let repo = self.reservations.clone();
        let resource_id = resource_id.to_string();
        Self::run_blocking(move || Ok(repo.find_non_cancelled_on_day(&resource_id, day)?)).await
    }

    /// 当前在院记录
    pub async fn list_active_admissions(&self) -> ApiResult<Vec<Reservation>> {
        let repo = self.reservations.clone();
        Self::run_blocking(move || Ok(repo.find_active_admissions()?)).await
    }

    /// 预约状态流转历史
    pub async fn list_transitions(&self, reservation_id: &str) -> ApiResult<Vec<StatusTransition>> {
        let repo = self.reservations.clone();
        let reservation_id = reservation_id.to_string();
        Self::run_blocking(move || Ok(repo.find_transitions(&reservation_id)?)).await
    }
}
