// ==========================================
// 医院排班预约系统 - 时钟与截止时间
// ==========================================
// 时钟可注入：测试使用固定时间，生产使用本地时间
// ==========================================

use crate::engine::error::{BookingError, BookingResult};
use chrono::{Local, NaiveDateTime};
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    /// 当前本地时间（无时区）
    fn now(&self) -> NaiveDateTime;
}

/// 系统本地时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// 固定时钟
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

// ==========================================
// Deadline - 单次分配的截止时间
// ==========================================
// 覆盖 搜索 + 提交 全过程；提交前最后检查一次
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn check(&self) -> BookingResult<()> {
        let elapsed = self.started.elapsed();
        if elapsed >= self.budget {
            return Err(BookingError::Timeout {
                elapsed_ms: elapsed.as_millis(),
            });
        }
        Ok(())
    }
}
