// ==========================================
// 医院排班预约系统 - API 层
// ==========================================
// 职责: 对外提供异步预约接口（与传输层无关）
// ==========================================

pub mod booking_api;
pub mod error;

// 重导出核心类型
pub use booking_api::BookingApi;
pub use error::{ApiError, ApiResult};
