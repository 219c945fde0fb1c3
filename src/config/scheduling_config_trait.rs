// ==========================================
// 医院排班预约系统 - 排班配置读取 Trait
// ==========================================
// 职责: 定义预约核心所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// 专科关键词规则（声明顺序即匹配顺序）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryKeywords {
    pub category: String,
    pub keywords: Vec<String>,
}

impl CategoryKeywords {
    pub fn new(category: &str, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

// ==========================================
// SchedulingConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait SchedulingConfigReader: Send + Sync {
    // ===== 号源搜索 =====

    /// 号源粒度（分钟）
    ///
    /// # 默认值
    /// - 30
    async fn get_slot_granularity_minutes(&self) -> Result<i64, Box<dyn Error + Send + Sync>>;

    /// 营业开始时间
    ///
    /// # 默认值
    /// - 09:00
    async fn get_business_open(&self) -> Result<NaiveTime, Box<dyn Error + Send + Sync>>;

    /// 营业结束时间（不含）
    ///
    /// # 默认值
    /// - 17:00
    async fn get_business_close(&self) -> Result<NaiveTime, Box<dyn Error + Send + Sync>>;

    /// 向前搜索天数
    ///
    /// # 默认值
    /// - 7
    async fn get_lookahead_days(&self) -> Result<i64, Box<dyn Error + Send + Sync>>;

    // ===== 专科路由 =====

    /// 专科关键词表
    ///
    /// # 默认值
    /// - Cardiology / Dermatology / Neurology / Orthopedics / Pediatrics / General Physician
    async fn get_specialization_table(&self) -> Result<Vec<CategoryKeywords>, Box<dyn Error + Send + Sync>>;

    /// 兜底专科
    ///
    /// # 默认值
    /// - General Physician
    async fn get_fallback_category(&self) -> Result<String, Box<dyn Error + Send + Sync>>;

    // ===== 事务 =====

    /// 单次分配（搜索 + 提交）的截止时长（毫秒）
    ///
    /// # 默认值
    /// - 5000
    async fn get_allocation_timeout_ms(&self) -> Result<u64, Box<dyn Error + Send + Sync>>;

    /// 提交竞争失败后整体重新规划的最大尝试次数
    ///
    /// # 默认值
    /// - 3
    async fn get_max_allocation_attempts(&self) -> Result<u32, Box<dyn Error + Send + Sync>>;
}

/// 默认专科关键词表
pub fn default_specialization_table() -> Vec<CategoryKeywords> {
    vec![
        CategoryKeywords::new(
            "Cardiology",
            &["heart", "chest pain", "palpitation", "cardiac", "blood pressure"],
        ),
        CategoryKeywords::new("Dermatology", &["skin", "rash", "acne", "itch", "hair"]),
        CategoryKeywords::new(
            "Neurology",
            &["headache", "dizzy", "faint", "seizure", "numbness", "brain"],
        ),
        CategoryKeywords::new(
            "Orthopedics",
            &["bone", "fracture", "joint", "muscle", "back pain", "knee"],
        ),
        CategoryKeywords::new("Pediatrics", &["child", "baby", "kid", "infant"]),
        CategoryKeywords::new(
            "General Physician",
            &["fever", "cold", "cough", "flu", "weakness", "general"],
        ),
    ]
}
