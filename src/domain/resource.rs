// ==========================================
// 医院排班预约系统 - 资源领域模型
// ==========================================
// 资源 = 可被预约的对象（医生号源 / 手术室 / 病床）
// 红线: 资源主数据只由管理操作修改，预约核心只读；
//       唯一例外是床位占用状态，只在预约事务内翻转
// ==========================================

use crate::domain::types::{OccupancyStatus, ResourceKind};
use serde::{Deserialize, Serialize};

// ==========================================
// Resource - 资源
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub resource_id: String,
    pub kind: ResourceKind,
    pub display_name: String,

    // ===== 准入标签 =====
    pub eligibility_tag: Option<String>, // 医生: 专科；床位: 病区类型；手术室: 可空
    pub group_tag: Option<String>,       // 床位所属病区名称
    pub gender_tag: Option<String>,      // 病区性别限制

    pub active: bool,

    // ===== 独占资源状态 =====
    pub occupancy: Option<OccupancyStatus>, // 仅床位有值
}

impl Resource {
    /// 创建医生资源
    pub fn practitioner(id: impl Into<String>, name: impl Into<String>, specialization: impl Into<String>) -> Self {
        Self {
            resource_id: id.into(),
            kind: ResourceKind::Practitioner,
            display_name: name.into(),
            eligibility_tag: Some(specialization.into()),
            group_tag: None,
            gender_tag: None,
            active: true,
            occupancy: None,
        }
    }

    /// 创建手术室资源（手术室以名称作为标识，如 OT-1）
    pub fn theater(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            resource_id: id,
            kind: ResourceKind::Theater,
            eligibility_tag: None,
            group_tag: None,
            gender_tag: None,
            active: true,
            occupancy: None,
        }
    }

    /// 创建床位资源（初始为 AVAILABLE）
    pub fn bed(
        id: impl Into<String>,
        ward_name: impl Into<String>,
        ward_type: impl Into<String>,
        gender: Option<String>,
    ) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            resource_id: id,
            kind: ResourceKind::Bed,
            eligibility_tag: Some(ward_type.into()),
            group_tag: Some(ward_name.into()),
            gender_tag: gender,
            active: true,
            occupancy: Some(OccupancyStatus::Available),
        }
    }

    /// 标签是否匹配（大小写不敏感）
    pub fn has_tag(&self, tag: &str) -> bool {
        self.eligibility_tag
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case(tag.trim()))
            .unwrap_or(false)
    }

    /// 独占资源是否空闲；非独占资源恒为 true
    pub fn is_available(&self) -> bool {
        match self.occupancy {
            Some(OccupancyStatus::Occupied) => false,
            _ => true,
        }
    }
}

// ==========================================
// ResourceLoad - 带在途预约计数的候选资源
// ==========================================
// 用途: 负载均衡输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLoad {
    pub resource: Resource,
    pub live_count: i64,
}

// ==========================================
// WardSpec - 新建病区参数
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardSpec {
    pub name: String,
    pub ward_type: String,
    pub floor: i32,
    pub capacity: u32,
    pub gender: Option<String>,
}

impl WardSpec {
    /// 床号规则: 病区名前三个字符大写 + "-" + (101 + 序号)
    ///
    /// 例如: "General Ward" 容量 2 → GEN-101, GEN-102
    ///
    /// 床号只是显示名，不同病区可能重复，不能作为资源主键
    pub fn bed_numbers(&self) -> Vec<String> {
        let prefix: String = self.name.chars().take(3).collect::<String>().to_uppercase();
        (0..self.capacity)
            .map(|i| format!("{}-{}", prefix, 101 + i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_tag_ignores_case() {
        let doctor = Resource::practitioner("D1", "Dr. A", "Cardiology");
        assert!(doctor.has_tag("cardiology"));
        assert!(!doctor.has_tag("Neurology"));
    }

    #[test]
    fn test_ward_bed_numbers() {
        let spec = WardSpec {
            name: "icu east".to_string(),
            ward_type: "ICU".to_string(),
            floor: 3,
            capacity: 3,
            gender: None,
        };
        assert_eq!(spec.bed_numbers(), vec!["ICU-101", "ICU-102", "ICU-103"]);
    }

    #[test]
    fn test_bed_availability() {
        let mut bed = Resource::bed("W1-101", "W1", "General", None);
        assert!(bed.is_available());
        bed.occupancy = Some(OccupancyStatus::Occupied);
        assert!(!bed.is_available());
        assert!(Resource::theater("OT-1").is_available());
    }
}
