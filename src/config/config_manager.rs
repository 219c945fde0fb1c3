// ==========================================
// 医院排班预约系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::scheduling_config_trait::{
    default_specialization_table, CategoryKeywords, SchedulingConfigReader,
};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use chrono::NaiveTime;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const SLOT_GRANULARITY_MINUTES: &str = "slot_granularity_minutes";
    pub const BUSINESS_OPEN: &str = "business_open";
    pub const BUSINESS_CLOSE: &str = "business_close";
    pub const LOOKAHEAD_DAYS: &str = "lookahead_days";
    pub const SPECIALIZATION_KEYWORDS: &str = "specialization_keywords";
    pub const FALLBACK_CATEGORY: &str = "fallback_category";
    pub const ALLOCATION_TIMEOUT_MS: &str = "allocation_timeout_ms";
    pub const MAX_ALLOCATION_ATTEMPTS: &str = "max_allocation_attempts";
    pub const BUSY_RETRY_LIMIT: &str = "busy_retry_limit";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS config_kv (
                scope_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (scope_id, key)
            );
            "#,
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取数值配置，格式错误时回退默认值并告警
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: std::str::FromStr + Copy + std::fmt::Display,
    {
        match self.get_config_value(key)? {
            Some(raw) => Ok(raw.trim().parse::<T>().unwrap_or_else(|_| {
                tracing::warn!(config_key = key, raw_value = %raw, default = %default, "配置格式错误，使用默认值");
                default
            })),
            None => Ok(default),
        }
    }

    fn get_time_or_default(&self, key: &str, default: NaiveTime) -> ConfigResult<NaiveTime> {
        match self.get_config_value(key)? {
            Some(raw) => Ok(NaiveTime::parse_from_str(raw.trim(), "%H:%M").unwrap_or_else(|_| {
                tracing::warn!(config_key = key, raw_value = %raw, "时间配置格式错误（期望 HH:MM），使用默认值");
                default
            })),
            None => Ok(default),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入/覆盖 global scope 配置值
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    /// 读取 BEGIN IMMEDIATE 忙重试次数
    pub fn get_busy_retry_limit(&self) -> ConfigResult<u32> {
        self.get_parsed_or_default(config_keys::BUSY_RETRY_LIMIT, 3u32)
    }
}

// ==========================================
// SchedulingConfigReader Trait 实现
// ==========================================
#[async_trait]
impl SchedulingConfigReader for ConfigManager {
    async fn get_slot_granularity_minutes(&self) -> ConfigResult<i64> {
        let value = self.get_parsed_or_default(config_keys::SLOT_GRANULARITY_MINUTES, 30i64)?;
        if value <= 0 {
            return Ok(30);
        }
        Ok(value)
    }

    async fn get_business_open(&self) -> ConfigResult<NaiveTime> {
        self.get_time_or_default(config_keys::BUSINESS_OPEN, NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default())
    }

    async fn get_business_close(&self) -> ConfigResult<NaiveTime> {
        self.get_time_or_default(config_keys::BUSINESS_CLOSE, NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default())
    }

    async fn get_lookahead_days(&self) -> ConfigResult<i64> {
        let value = self.get_parsed_or_default(config_keys::LOOKAHEAD_DAYS, 7i64)?;
        Ok(value.max(1))
    }

    async fn get_specialization_table(&self) -> ConfigResult<Vec<CategoryKeywords>> {
        let raw = match self.get_config_value(config_keys::SPECIALIZATION_KEYWORDS)? {
            Some(v) => v,
            None => return Ok(default_specialization_table()),
        };

        let table: Vec<CategoryKeywords> = serde_json::from_str(&raw).unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::SPECIALIZATION_KEYWORDS,
                raw_value = %raw,
                "专科关键词配置格式错误，使用默认关键词表"
            );
            default_specialization_table()
        });
        Ok(table)
    }

    async fn get_fallback_category(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::FALLBACK_CATEGORY, "General Physician")?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok("General Physician".to_string());
        }
        Ok(trimmed.to_string())
    }

    async fn get_allocation_timeout_ms(&self) -> ConfigResult<u64> {
        self.get_parsed_or_default(config_keys::ALLOCATION_TIMEOUT_MS, 5_000u64)
    }

    async fn get_max_allocation_attempts(&self) -> ConfigResult<u32> {
        let value = self.get_parsed_or_default(config_keys::MAX_ALLOCATION_ATTEMPTS, 3u32)?;
        Ok(value.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn setup_manager() -> (NamedTempFile, ConfigManager) {
        let temp = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp.path().to_str().unwrap()).unwrap();
        (temp, manager)
    }

    #[tokio::test]
    async fn test_defaults_when_config_missing() {
        let (_temp, manager) = setup_manager();

        assert_eq!(manager.get_slot_granularity_minutes().await.unwrap(), 30);
        assert_eq!(manager.get_lookahead_days().await.unwrap(), 7);
        assert_eq!(
            manager.get_business_open().await.unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(manager.get_fallback_category().await.unwrap(), "General Physician");
        assert_eq!(manager.get_specialization_table().await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_overrides_and_malformed_values() {
        let (_temp, manager) = setup_manager();
        manager.set_global_config_value(config_keys::SLOT_GRANULARITY_MINUTES, "15").unwrap();
        manager.set_global_config_value(config_keys::BUSINESS_CLOSE, "not-a-time").unwrap();
        manager.set_global_config_value(config_keys::LOOKAHEAD_DAYS, "abc").unwrap();

        assert_eq!(manager.get_slot_granularity_minutes().await.unwrap(), 15);
        assert_eq!(
            manager.get_business_close().await.unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap()
        );
        assert_eq!(manager.get_lookahead_days().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_custom_specialization_table() {
        let (_temp, manager) = setup_manager();
        manager
            .set_global_config_value(
                config_keys::SPECIALIZATION_KEYWORDS,
                r#"[{"category":"ENT","keywords":["ear","throat"]}]"#,
            )
            .unwrap();

        let table = manager.get_specialization_table().await.unwrap();
        assert_eq!(table, vec![CategoryKeywords::new("ENT", &["ear", "throat"])]);

        let snapshot = manager.get_config_snapshot().unwrap();
        assert!(snapshot.contains("specialization_keywords"));
    }
}
