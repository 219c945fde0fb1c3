// ==========================================
// 医院排班预约系统 - 资源数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::resource::{Resource, ResourceLoad, WardSpec};
use crate::domain::types::{OccupancyStatus, ResourceKind};
use crate::repository::booking_store::BookingStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::resource_directory::ResourceDirectory;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const RESOURCE_COLUMNS: &str = r#"
    r.resource_id, r.kind, r.display_name, r.eligibility_tag, r.group_tag,
    r.gender_tag, r.active, r.occupancy
"#;

/// 在途状态集合（与 ReservationStatus::is_live 保持一致）
const LIVE_STATUS_SQL: &str = "('PENDING', 'CONFIRMED', 'SCHEDULED', 'IN_PROGRESS', 'ADMITTED')";

// ==========================================
// ResourceRepository - 资源仓储
// ==========================================
/// 资源仓储
/// 职责: 管理 resource 表；读接口实现 ResourceDirectory，写接口仅供管理操作
pub struct ResourceRepository {
    store: Arc<BookingStore>,
}

impl ResourceRepository {
    pub fn new(store: Arc<BookingStore>) -> Self {
        Self { store }
    }

    // ==========================================
    // 管理写入（预约核心之外）
    // ==========================================

    /// 新增资源
    pub fn insert(&self, resource: &Resource) -> RepositoryResult<()> {
        self.store.write(|conn| insert_resource(conn, resource))
    }

    /// 新建病区并自动生成床位（同一事务）
    ///
    /// # 返回
    /// - Ok(Vec<Resource>): 新生成的床位，全部为 AVAILABLE
    pub fn create_ward(&self, spec: &WardSpec) -> RepositoryResult<Vec<Resource>> {
        if spec.capacity == 0 {
            return Err(RepositoryError::FieldValueError {
                field: "capacity".to_string(),
                message: "病区容量必须大于0".to_string(),
            });
        }

        // 床号只作为显示名，主键另行生成（不同病区的床号前缀可能相同）
        let beds: Vec<Resource> = spec
            .bed_numbers()
            .into_iter()
            .map(|bed_no| {
                let mut bed = Resource::bed(
                    Uuid::new_v4().to_string(),
                    spec.name.clone(),
                    spec.ward_type.clone(),
                    spec.gender.clone(),
                );
                bed.display_name = bed_no;
                bed
            })
            .collect();

        let mut conn = self.store.connect()?;
        let tx = conn.transaction()?;
        for bed in &beds {
            insert_resource(&tx, bed)?;
        }
        tx.commit()?;

        info!(ward = %spec.name, floor = spec.floor, beds = beds.len(), "病区已创建");
        Ok(beds)
    }

    /// 启用/停用资源
    pub fn set_active(&self, resource_id: &str, active: bool) -> RepositoryResult<()> {
        self.store.write(|conn| {
            let affected = conn.execute(
                "UPDATE resource SET active = ?1 WHERE resource_id = ?2",
                params![active, resource_id],
            )?;
            if affected == 0 {
                return Err(RepositoryError::NotFound {
                    entity: "Resource".to_string(),
                    id: resource_id.to_string(),
                });
            }
            Ok(())
        })
    }

    /// 查询病区全部床位
    pub fn find_beds_by_ward(&self, ward_name: &str) -> RepositoryResult<Vec<Resource>> {
        self.store.read(|conn| {
            let sql = format!(
                "SELECT {} FROM resource r WHERE r.kind = 'BED' AND r.group_tag = ?1 ORDER BY r.display_name",
                RESOURCE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let beds = stmt
                .query_map(params![ward_name], map_resource_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(beds)
        })
    }

    fn query_loads(&self, kind: ResourceKind, tag: Option<&str>) -> RepositoryResult<Vec<ResourceLoad>> {
        self.store.read(|conn| {
            let sql = format!(
                r#"
                SELECT {cols},
                       (SELECT COUNT(*) FROM reservation v
                         WHERE v.resource_id = r.resource_id
                           AND v.status IN {live}) AS live_count
                FROM resource r
                WHERE r.kind = ?1
                  AND r.active = 1
                  AND (?2 IS NULL OR LOWER(r.eligibility_tag) = LOWER(?2))
                ORDER BY r.display_name, r.resource_id
                "#,
                cols = RESOURCE_COLUMNS,
                live = LIVE_STATUS_SQL,
            );
            let mut stmt = conn.prepare(&sql)?;
            let loads = stmt
                .query_map(params![kind.to_db_str(), tag.map(str::trim)], |row| {
                    Ok(ResourceLoad {
                        resource: map_resource_row(row)?,
                        live_count: row.get(8)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(loads)
        })
    }
}

impl ResourceDirectory for ResourceRepository {
    fn find_active_by_tag(&self, kind: ResourceKind, tag: &str) -> RepositoryResult<Vec<ResourceLoad>> {
        self.query_loads(kind, Some(tag))
    }

    fn find_active_by_kind(&self, kind: ResourceKind) -> RepositoryResult<Vec<ResourceLoad>> {
        self.query_loads(kind, None)
    }

    fn find_by_id(&self, resource_id: &str) -> RepositoryResult<Option<Resource>> {
        self.store.read(|conn| load_resource(conn, resource_id))
    }
}

// ==========================================
// 连接级数据访问（供事务复用）
// ==========================================

pub(crate) fn insert_resource(conn: &Connection, resource: &Resource) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO resource (
            resource_id, kind, display_name, eligibility_tag, group_tag,
            gender_tag, active, occupancy
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            resource.resource_id,
            resource.kind.to_db_str(),
            resource.display_name,
            resource.eligibility_tag,
            resource.group_tag,
            resource.gender_tag,
            resource.active,
            resource.occupancy.map(|s| s.to_db_str()),
        ],
    )?;
    Ok(())
}

pub(crate) fn load_resource(conn: &Connection, resource_id: &str) -> RepositoryResult<Option<Resource>> {
    let sql = format!("SELECT {} FROM resource r WHERE r.resource_id = ?1", RESOURCE_COLUMNS);
    let resource = conn
        .query_row(&sql, params![resource_id], map_resource_row)
        .optional()?;
    Ok(resource)
}

pub(crate) fn update_occupancy(
    conn: &Connection,
    resource_id: &str,
    status: OccupancyStatus,
) -> RepositoryResult<()> {
    let affected = conn.execute(
        "UPDATE resource SET occupancy = ?1 WHERE resource_id = ?2",
        params![status.to_db_str(), resource_id],
    )?;
    if affected == 0 {
        return Err(RepositoryError::NotFound {
            entity: "Resource".to_string(),
            id: resource_id.to_string(),
        });
    }
    Ok(())
}

fn map_resource_row(row: &Row<'_>) -> rusqlite::Result<Resource> {
    let kind_raw: String = row.get(1)?;
    let kind = ResourceKind::from_db_str(&kind_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, format!("未知资源类型: {}", kind_raw).into())
    })?;

    Ok(Resource {
        resource_id: row.get(0)?,
        kind,
        display_name: row.get(2)?,
        eligibility_tag: row.get(3)?,
        group_tag: row.get(4)?,
        gender_tag: row.get(5)?,
        active: row.get(6)?,
        occupancy: row
            .get::<_, Option<String>>(7)?
            .and_then(|s| OccupancyStatus::from_db_str(&s)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn setup_repo() -> (NamedTempFile, ResourceRepository) {
        let temp = NamedTempFile::new().unwrap();
        let store = BookingStore::new(temp.path().to_str().unwrap()).unwrap();
        (temp, ResourceRepository::new(Arc::new(store)))
    }

    #[test]
    fn test_find_active_by_tag_is_case_insensitive_and_skips_inactive() {
        let (_temp, repo) = setup_repo();
        repo.insert(&Resource::practitioner("D1", "Dr. A", "Cardiology")).unwrap();
        repo.insert(&Resource::practitioner("D2", "Dr. B", "cardiology")).unwrap();
        repo.insert(&Resource::practitioner("D3", "Dr. C", "Neurology")).unwrap();
        repo.set_active("D2", false).unwrap();

        let found = repo.find_active_by_tag(ResourceKind::Practitioner, "CARDIOLOGY").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].resource.resource_id, "D1");
        assert_eq!(found[0].live_count, 0);
    }

    #[test]
    fn test_find_active_by_kind_orders_by_name() {
        let (_temp, repo) = setup_repo();
        repo.insert(&Resource::practitioner("D9", "Dr. Z", "Dermatology")).unwrap();
        repo.insert(&Resource::practitioner("D1", "Dr. A", "Neurology")).unwrap();
        repo.insert(&Resource::theater("OT-1")).unwrap();

        let found = repo.find_active_by_kind(ResourceKind::Practitioner).unwrap();
        let ids: Vec<_> = found.iter().map(|l| l.resource.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["D1", "D9"]);
    }

    #[test]
    fn test_create_ward_generates_available_beds() {
        let (_temp, repo) = setup_repo();
        let spec = WardSpec {
            name: "West Wing".to_string(),
            ward_type: "General".to_string(),
            floor: 2,
            capacity: 2,
            gender: Some("F".to_string()),
        };

        let beds = repo.create_ward(&spec).unwrap();
        assert_eq!(beds.len(), 2);

        let stored = repo.find_beds_by_ward("West Wing").unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].display_name, "WES-101");
        assert_eq!(stored[1].display_name, "WES-102");
        assert_ne!(stored[0].resource_id, stored[0].display_name);
        assert_eq!(stored[0].occupancy, Some(OccupancyStatus::Available));
        assert_eq!(stored[1].gender_tag.as_deref(), Some("F"));
    }

    #[test]
    fn test_wards_sharing_name_prefix_coexist() {
        let (_temp, repo) = setup_repo();
        let ward = |name: &str| WardSpec {
            name: name.to_string(),
            ward_type: "General".to_string(),
            floor: 1,
            capacity: 2,
            gender: None,
        };

        let a = repo.create_ward(&ward("Ward A")).unwrap();
        let b = repo.create_ward(&ward("Ward B")).unwrap();

        // 床号相同，主键不同
        assert_eq!(a[0].display_name, "WAR-101");
        assert_eq!(b[0].display_name, "WAR-101");
        assert_ne!(a[0].resource_id, b[0].resource_id);

        assert_eq!(repo.find_beds_by_ward("Ward A").unwrap().len(), 2);
        assert_eq!(repo.find_beds_by_ward("Ward B").unwrap().len(), 2);
        let found = repo.find_by_id(&b[1].resource_id).unwrap().unwrap();
        assert_eq!(found.group_tag.as_deref(), Some("Ward B"));
    }

    #[test]
    fn test_insert_and_set_active_are_persisted() {
        let (_temp, repo) = setup_repo();
        repo.insert(&Resource::theater("OT-1")).unwrap();
        repo.set_active("OT-1", false).unwrap();

        // 新连接读取，确认写入已落盘
        let stored = repo.find_by_id("OT-1").unwrap().unwrap();
        assert!(!stored.active);
        assert!(repo.find_active_by_kind(ResourceKind::Theater).unwrap().is_empty());
    }

    #[test]
    fn test_create_ward_rejects_zero_capacity() {
        let (_temp, repo) = setup_repo();
        let spec = WardSpec {
            name: "Empty".to_string(),
            ward_type: "General".to_string(),
            floor: 1,
            capacity: 0,
            gender: None,
        };
        assert!(matches!(
            repo.create_ward(&spec),
            Err(RepositoryError::FieldValueError { .. })
        ));
    }

    #[test]
    fn test_set_active_unknown_resource() {
        let (_temp, repo) = setup_repo();
        assert!(matches!(
            repo.set_active("missing", false),
            Err(RepositoryError::NotFound { .. })
        ));
    }
}
