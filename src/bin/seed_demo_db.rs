// ==========================================
// 医院排班预约系统 - 演示数据库初始化
// ==========================================
// 用法: seed_demo_db [db_path]
// 备份并重建数据库，写入医生、手术室、病区床位与默认配置，
// 并通过预约引擎生成少量演示预约
// ==========================================

use chrono::{Duration, Local};
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use hospital_scheduler::app::get_default_db_path;
use hospital_scheduler::config::{config_keys, ConfigManager, SchedulingConfig};
use hospital_scheduler::db::open_sqlite_connection;
use hospital_scheduler::domain::{
    AdmissionRequest, AppointmentRequest, IntervalBookingRequest, Resource, Urgency, WardSpec,
};
use hospital_scheduler::engine::{BookingEngine, SystemClock};
use hospital_scheduler::repository::{BookingStore, ResourceRepository};

const DOCTORS: &[(&str, &str, &str)] = &[
    ("D001", "Dr. Alice Moore", "Cardiology"),
    ("D002", "Dr. Brian Chen", "Cardiology"),
    ("D003", "Dr. Carla Diaz", "Dermatology"),
    ("D004", "Dr. David Khan", "Neurology"),
    ("D005", "Dr. Emma Novak", "Orthopedics"),
    ("D006", "Dr. Farid Haddad", "Pediatrics"),
    ("D007", "Dr. Grace Liu", "General Physician"),
    ("D008", "Dr. Henry Adams", "General Physician"),
];

const THEATERS: &[&str] = &["OT-1", "OT-2", "OT-3"];

fn main() -> Result<(), Box<dyn Error>> {
    hospital_scheduler::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);
    backup_and_reset_db(&db_path)?;

    let store = Arc::new(BookingStore::new(db_path.clone())?);
    let resources = Arc::new(ResourceRepository::new(store.clone()));

    seed_config(&db_path)?;
    let general_bed = seed_resources(&resources)?;
    seed_bookings(store, resources, &general_bed)?;

    print_quick_counts(&db_path)?;
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;
    for suffix in ["-wal", "-shm"] {
        let sidecar = format!("{}{}", db_path, suffix);
        if Path::new(&sidecar).exists() {
            fs::remove_file(&sidecar)?;
        }
    }

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_config(db_path: &str) -> Result<(), Box<dyn Error>> {
    let config_manager = ConfigManager::new(db_path).map_err(|e| e.to_string())?;
    let defaults = SchedulingConfig::default();

    let entries = [
        (config_keys::SLOT_GRANULARITY_MINUTES, defaults.slot_granularity_minutes.to_string()),
        (config_keys::BUSINESS_OPEN, defaults.business_open.format("%H:%M").to_string()),
        (config_keys::BUSINESS_CLOSE, defaults.business_close.format("%H:%M").to_string()),
        (config_keys::LOOKAHEAD_DAYS, defaults.lookahead_days.to_string()),
        (config_keys::FALLBACK_CATEGORY, defaults.fallback_category.clone()),
        (
            config_keys::SPECIALIZATION_KEYWORDS,
            serde_json::to_string(&defaults.specialization_table)?,
        ),
        (config_keys::ALLOCATION_TIMEOUT_MS, defaults.allocation_timeout_ms.to_string()),
        (config_keys::MAX_ALLOCATION_ATTEMPTS, defaults.max_allocation_attempts.to_string()),
        (config_keys::BUSY_RETRY_LIMIT, "3".to_string()),
    ];

    for (key, value) in entries {
        config_manager
            .set_global_config_value(key, &value)
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// 返回普通病区第一张床位的ID
fn seed_resources(resources: &ResourceRepository) -> Result<String, Box<dyn Error>> {
    for (id, name, specialization) in DOCTORS {
        resources.insert(&Resource::practitioner(*id, *name, *specialization))?;
    }
    for theater in THEATERS {
        resources.insert(&Resource::theater(*theater))?;
    }

    let wards = [
        WardSpec {
            name: "General Ward".to_string(),
            ward_type: "General".to_string(),
            floor: 1,
            capacity: 10,
            gender: None,
        },
        WardSpec {
            name: "Intensive Care".to_string(),
            ward_type: "ICU".to_string(),
            floor: 2,
            capacity: 4,
            gender: None,
        },
        WardSpec {
            name: "Maternity".to_string(),
            ward_type: "Maternity".to_string(),
            floor: 3,
            capacity: 6,
            gender: Some("F".to_string()),
        },
    ];
    let mut first_general_bed = None;
    for ward in &wards {
        let beds = resources.create_ward(ward)?;
        if first_general_bed.is_none() {
            first_general_bed = beds.into_iter().next().map(|b| b.resource_id);
        }
    }
    first_general_bed.ok_or_else(|| "普通病区未生成床位".into())
}

fn seed_bookings(
    store: Arc<BookingStore>,
    resources: Arc<ResourceRepository>,
    general_bed: &str,
) -> Result<(), Box<dyn Error>> {
    let engine = BookingEngine::new(store, resources, Arc::new(SystemClock));
    let config = SchedulingConfig::default();
    let tomorrow = Local::now().date_naive() + Duration::days(1);

    let complaints = [
        ("P001", "Chest pain when climbing stairs"),
        ("P002", "Itchy rash on both arms"),
        ("P003", "Recurring headache and dizziness"),
        ("P004", "Fever and cough for three days"),
    ];
    for (patient, text) in complaints {
        let booked = engine.allocate_and_book_appointment(
            &config,
            &AppointmentRequest {
                requester_id: patient.to_string(),
                requirement_text: text.to_string(),
                preferred_start: tomorrow.and_hms_opt(9, 0, 0),
                urgency: Urgency::Normal,
            },
        )?;
        eprintln!(
            "  appointment {} -> {} ({}) at {}",
            patient, booked.resource_name, booked.category, booked.interval.start
        );
    }

    if let (Some(start), Some(end)) = (tomorrow.and_hms_opt(10, 0, 0), tomorrow.and_hms_opt(11, 0, 0)) {
        engine.book_interval(
            &config,
            &IntervalBookingRequest {
                actor_id: "seed".to_string(),
                resource_id: "OT-1".to_string(),
                requester_id: "P005".to_string(),
                attending_id: Some("D005".to_string()),
                start,
                end,
                procedure: Some("Knee arthroscopy".to_string()),
                urgency: Urgency::High,
            },
        )?;
    }

    engine.admit_to_bed(
        &config,
        &AdmissionRequest {
            actor_id: "seed".to_string(),
            bed_id: general_bed.to_string(),
            occupant_id: "P006".to_string(),
            attending_id: "D007".to_string(),
            diagnosis: Some("Pneumonia".to_string()),
        },
    )?;
    Ok(())
}

fn print_quick_counts(db_path: &str) -> Result<(), Box<dyn Error>> {
    let conn = open_sqlite_connection(db_path)?;
    let tables = ["config_kv", "resource", "reservation", "reservation_transition"];

    eprintln!("Row counts:");
    for t in tables {
        let sql = format!("SELECT COUNT(*) FROM {}", t);
        let c: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        eprintln!("  {:<28} {}", t, c);
    }
    Ok(())
}
