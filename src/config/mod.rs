// ==========================================
// 医院排班预约系统 - 配置层
// ==========================================
// 职责: 排班参数管理（号源粒度、营业时间、专科关键词表等）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod scheduling_config;
pub mod scheduling_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use scheduling_config::SchedulingConfig;
pub use scheduling_config_trait::{
    default_specialization_table, CategoryKeywords, SchedulingConfigReader,
};
