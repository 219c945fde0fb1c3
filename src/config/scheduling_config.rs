// ==========================================
// 医院排班预约系统 - 排班配置快照
// ==========================================
// 每次分配调用开始时读取一次，调用期间不可变
// ==========================================

use crate::config::scheduling_config_trait::{
    default_specialization_table, CategoryKeywords, SchedulingConfigReader,
};
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use std::error::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    pub slot_granularity_minutes: i64,
    pub business_open: NaiveTime,
    pub business_close: NaiveTime,
    pub lookahead_days: i64,
    pub specialization_table: Vec<CategoryKeywords>,
    pub fallback_category: String,
    pub allocation_timeout_ms: u64,
    pub max_allocation_attempts: u32,
}

impl SchedulingConfig {
    /// 从配置读取器加载快照
    pub async fn load(
        reader: &dyn SchedulingConfigReader,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(Self {
            slot_granularity_minutes: reader.get_slot_granularity_minutes().await?,
            business_open: reader.get_business_open().await?,
            business_close: reader.get_business_close().await?,
            lookahead_days: reader.get_lookahead_days().await?,
            specialization_table: reader.get_specialization_table().await?,
            fallback_category: reader.get_fallback_category().await?,
            allocation_timeout_ms: reader.get_allocation_timeout_ms().await?,
            max_allocation_attempts: reader.get_max_allocation_attempts().await?,
        })
    }

    pub fn granularity(&self) -> Duration {
        Duration::minutes(self.slot_granularity_minutes)
    }

    pub fn allocation_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.allocation_timeout_ms)
    }
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_granularity_minutes: 30,
            business_open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            business_close: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
            lookahead_days: 7,
            specialization_table: default_specialization_table(),
            fallback_category: "General Physician".to_string(),
            allocation_timeout_ms: 5_000,
            max_allocation_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_manager::{config_keys, ConfigManager};
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_matches_default_on_empty_store() {
        let temp = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp.path().to_str().unwrap()).unwrap();

        let config = SchedulingConfig::load(&manager).await.unwrap();
        assert_eq!(config, SchedulingConfig::default());
        assert_eq!(config.granularity(), Duration::minutes(30));
    }

    #[tokio::test]
    async fn test_load_picks_up_overrides() {
        let temp = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp.path().to_str().unwrap()).unwrap();
        manager.set_global_config_value(config_keys::BUSINESS_OPEN, "08:00").unwrap();
        manager.set_global_config_value(config_keys::MAX_ALLOCATION_ATTEMPTS, "5").unwrap();

        let config = SchedulingConfig::load(&manager).await.unwrap();
        assert_eq!(config.business_open, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(config.max_allocation_attempts, 5);
    }
}
