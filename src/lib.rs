// ==========================================
// 医院排班预约系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 排班与资源分配核心（医生号源 / 手术室 / 病床）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 预约规则
pub mod engine;

// 配置层 - 排班参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 异步接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    BookingOrigin, OccupancyStatus, ReservationStatus, ResourceKind, TimingStrategy, Urgency,
};

// 领域实体
pub use domain::{
    AdmissionRequest, AllocatedAppointment, AppointmentRequest, Interval, IntervalBookingRequest,
    ReleasedReservation, Reservation, Resource, ResourceLoad, StaffAppointmentRequest,
    StatusTransition, WardSpec,
};

// 引擎
pub use engine::{BookingEngine, BookingError, BookingResult};

// API
pub use api::{ApiError, ApiResult, BookingApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "医院排班预约系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
