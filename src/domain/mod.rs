// ==========================================
// 医院排班预约系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod reservation;
pub mod resource;
pub mod types;

// 重导出核心类型
pub use reservation::{
    AdmissionRequest, AllocatedAppointment, AppointmentRequest, Interval, IntervalBookingRequest,
    ReleasedReservation, Reservation, StaffAppointmentRequest, StatusTransition,
};
pub use resource::{Resource, ResourceLoad, WardSpec};
pub use types::{
    BookingOrigin, OccupancyStatus, ReservationStatus, ResourceKind, TimingStrategy, Urgency,
};
