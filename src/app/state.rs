// ==========================================
// 医院排班预约系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 说明: 不持有长连接，存储层每次请求自行打开连接
// ==========================================

use std::sync::Arc;

use crate::api::BookingApi;
use crate::config::config_manager::ConfigManager;
use crate::engine::clock::{Clock, SystemClock};
use crate::engine::events::BookingEventPublisher;
use crate::engine::BookingEngine;
use crate::repository::{BookingStore, ReservationRepository, ResourceRepository};

/// 应用状态
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 预约API
    pub booking_api: Arc<BookingApi>,

    /// 资源仓储（管理操作：建病区、启停资源）
    pub resource_repo: Arc<ResourceRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::build(db_path, Arc::new(SystemClock), None)
    }

    /// 带事件发布者创建
    pub fn with_event_publisher(
        db_path: String,
        publisher: Arc<dyn BookingEventPublisher>,
    ) -> Result<Self, String> {
        Self::build(db_path, Arc::new(SystemClock), Some(publisher))
    }

    /// 指定时钟与事件发布者创建（测试/回放）
    pub fn build(
        db_path: String,
        clock: Arc<dyn Clock>,
        publisher: Option<Arc<dyn BookingEventPublisher>>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let config_manager = Arc::new(
            ConfigManager::new(&db_path).map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let busy_retry_limit = config_manager
            .get_busy_retry_limit()
            .map_err(|e| format!("无法读取busy_retry_limit: {}", e))?;

        let store = Arc::new(
            BookingStore::new(db_path.clone())
                .map_err(|e| format!("无法创建BookingStore: {}", e))?
                .with_busy_retry_limit(busy_retry_limit),
        );

        let resource_repo = Arc::new(ResourceRepository::new(store.clone()));
        let reservation_repo = Arc::new(ReservationRepository::new(store.clone()));

        let mut engine = BookingEngine::new(store, resource_repo.clone(), clock);
        if let Some(publisher) = publisher {
            engine = engine.with_event_publisher(publisher);
        }

        let booking_api = Arc::new(BookingApi::new(
            Arc::new(engine),
            reservation_repo,
            config_manager.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            booking_api,
            resource_repo,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级:
/// 1. 环境变量 HOSPITAL_SCHEDULER_DB_PATH
/// 2. 用户数据目录下的 hospital-scheduler/hospital_scheduler.db
/// 3. 当前目录 ./hospital_scheduler.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("HOSPITAL_SCHEDULER_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./hospital_scheduler.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        let app_dir = data_dir.join("hospital-scheduler-dev");

        #[cfg(not(debug_assertions))]
        let app_dir = data_dir.join("hospital-scheduler");

        if std::fs::create_dir_all(&app_dir).is_ok() {
            path = app_dir.join("hospital_scheduler.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_wires_all_components() {
        let temp = NamedTempFile::new().unwrap();
        let state = AppState::new(temp.path().to_str().unwrap().to_string()).unwrap();
        assert_eq!(state.db_path, temp.path().to_str().unwrap());
        assert!(state.config_manager.get_config_snapshot().is_ok());
    }
}
