// ==========================================
// 医院排班预约系统 - 主入口
// ==========================================
// 用法: hospital-scheduler [db_path]
// 初始化数据库与配置，输出当前在院与配置概况
// ==========================================

use hospital_scheduler::app::{get_default_db_path, AppState};
use hospital_scheduler::config::SchedulingConfig;
use hospital_scheduler::db::{open_sqlite_connection, read_schema_version};
use hospital_scheduler::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 系统版本: {}", hospital_scheduler::APP_NAME, hospital_scheduler::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let app_state = AppState::new(db_path.clone())?;

    let conn = open_sqlite_connection(&db_path)?;
    let schema_version = read_schema_version(&conn)?;
    tracing::info!("schema_version: {:?}", schema_version);

    let config = SchedulingConfig::load(app_state.config_manager.as_ref())
        .await
        .map_err(|e| format!("配置加载失败: {}", e))?;
    tracing::info!(
        granularity_min = config.slot_granularity_minutes,
        open = %config.business_open,
        close = %config.business_close,
        lookahead_days = config.lookahead_days,
        "排班配置"
    );

    let admissions = app_state.booking_api.list_active_admissions().await?;
    tracing::info!("当前在院: {} 人", admissions.len());
    for admission in &admissions {
        tracing::info!(
            bed = %admission.resource_id,
            occupant = %admission.requester_id,
            since = %admission.start_ts,
            "在院记录"
        );
    }

    Ok(())
}
