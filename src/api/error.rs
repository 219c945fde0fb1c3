// ==========================================
// 医院排班预约系统 - API层错误类型
// ==========================================
// 职责: 在预约核心错误之外，补充 API 层自身的失败（配置加载、后台任务）
// ==========================================

use crate::engine::error::BookingError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    /// 预约核心错误（NoEligibleResource / ResourceBooked / BedUnavailable 等）
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("配置加载失败: {0}")]
    ConfigError(String),

    #[error("后台任务失败: {0}")]
    TaskJoinError(String),
}

impl ApiError {
    /// 取出预约核心错误（便于调用方按类型分支）
    pub fn as_booking(&self) -> Option<&BookingError> {
        match self {
            ApiError::Booking(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.as_booking().map(BookingError::is_retryable).unwrap_or(false)
    }
}

// ==========================================
// 从 RepositoryError 转换（查询接口直接经由仓储）
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        ApiError::Booking(BookingError::from(err))
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
