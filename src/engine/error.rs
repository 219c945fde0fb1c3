// ==========================================
// 医院排班预约系统 - 预约核心错误类型
// ==========================================
// 预期内的业务结果（无可用资源、时段冲突等）均为类型化错误，
// 只有存储层的意外故障折叠为 StorageFailure
// ==========================================

use crate::domain::types::{ReservationStatus, ResourceKind};
use crate::repository::error::RepositoryError;
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    // ===== 资源选择 =====
    #[error("无可用资源: kind={kind}, category={category}")]
    NoEligibleResource { kind: ResourceKind, category: String },

    #[error("无可用号源: resource_id={resource_id}, 搜索窗口={lookahead_days}天")]
    NoAvailableSlot {
        resource_id: String,
        lookahead_days: i64,
    },

    // ===== 时间校验 =====
    #[error("无效区间: start={start}, end={end}（end 必须晚于 start）")]
    InvalidInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// at_commit=true 表示规划时空闲、提交时被并发请求抢占
    #[error("资源时段已被占用: resource_id={resource_id}, at_commit={at_commit}")]
    ResourceBooked { resource_id: String, at_commit: bool },

    #[error("床位不可用: bed_id={bed_id}")]
    BedUnavailable { bed_id: String },

    // ===== 状态机 =====
    #[error("无效的状态转换: from={from} to={to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("预约已处于终态: reservation_id={reservation_id}, status={status}")]
    AlreadyTerminal {
        reservation_id: String,
        status: ReservationStatus,
    },

    // ===== 执行约束 =====
    #[error("分配超时: 已耗时 {elapsed_ms}ms")]
    Timeout { elapsed_ms: u128 },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("存储故障: {0}")]
    StorageFailure(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BookingError {
    /// 可整体重新规划的错误（提交时竞争失败）
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::ResourceBooked { at_commit: true, .. })
    }

    pub(crate) fn not_found(entity: &str, id: &str) -> Self {
        BookingError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
// 唯一约束冲突的业务含义取决于上下文（号源 / 床位），
// 由引擎在写入处单独映射，这里统一视为存储故障
impl From<RepositoryError> for BookingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => BookingError::NotFound { entity, id },
            RepositoryError::FieldValueError { field, message } => {
                BookingError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::Other(e) => BookingError::Other(e),
            other => BookingError::StorageFailure(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type BookingResult<T> = Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_commit_time_conflicts_are_retryable() {
        let at_commit = BookingError::ResourceBooked {
            resource_id: "D1".to_string(),
            at_commit: true,
        };
        let at_check = BookingError::ResourceBooked {
            resource_id: "D1".to_string(),
            at_commit: false,
        };
        assert!(at_commit.is_retryable());
        assert!(!at_check.is_retryable());
        assert!(!BookingError::Timeout { elapsed_ms: 10 }.is_retryable());
    }

    #[test]
    fn test_repository_error_conversion() {
        let err: BookingError = RepositoryError::NotFound {
            entity: "Reservation".to_string(),
            id: "R1".to_string(),
        }
        .into();
        assert!(matches!(err, BookingError::NotFound { ref id, .. } if id == "R1"));

        let err: BookingError = RepositoryError::DatabaseBusy("locked".to_string()).into();
        match err {
            BookingError::StorageFailure(msg) => assert!(msg.contains("locked")),
            other => panic!("Expected StorageFailure, got {:?}", other),
        }
    }
}
