// ==========================================
// 医院排班预约系统 - 引擎层
// ==========================================
// 职责: 预约核心规则（准入、负载均衡、号源搜索、区间校验、状态机）
// 红线: Engine 不拼 SQL，数据访问统一经由 repository
// ==========================================

pub mod booking_engine;
pub mod clock;
pub mod eligibility;
pub mod error;
pub mod events;
pub mod interval_check;
pub mod load_balancer;
pub mod slot_search;
pub mod state_machine;

// 重导出核心引擎
pub use booking_engine::BookingEngine;
pub use clock::{Clock, Deadline, FixedClock, SystemClock};
pub use eligibility::{CandidateScope, CandidateSet, EligibilitySelector};
pub use error::{BookingError, BookingResult};
pub use events::{
    BookingEvent, BookingEventPublisher, BookingEventType, NoOpEventPublisher,
    OptionalEventPublisher,
};
pub use interval_check::IntervalConflictChecker;
pub use load_balancer::LoadBalancer;
pub use slot_search::{SlotSearchEngine, SlotSearchParams};
