// ==========================================
// 医院排班预约系统 - 资源目录读端口 Trait
// ==========================================
// 职责: 定义候选资源查询接口（不包含实现）
// 红线: 只读；不包含准入/负载均衡规则
// ==========================================

use crate::domain::resource::{Resource, ResourceLoad};
use crate::domain::types::ResourceKind;
use crate::repository::error::RepositoryResult;

// ==========================================
// ResourceDirectory Trait
// ==========================================
// 实现者: ResourceRepository（使用 rusqlite）
pub trait ResourceDirectory: Send + Sync {
    /// 查询指定类型、标签（大小写不敏感）的启用资源，附带在途预约数
    ///
    /// # 返回
    /// - 按 display_name、resource_id 排序（顺序稳定，负载均衡平局依赖此顺序）
    fn find_active_by_tag(&self, kind: ResourceKind, tag: &str) -> RepositoryResult<Vec<ResourceLoad>>;

    /// 查询指定类型的全部启用资源，附带在途预约数
    fn find_active_by_kind(&self, kind: ResourceKind) -> RepositoryResult<Vec<ResourceLoad>>;

    /// 按ID查询资源（不过滤启用状态）
    fn find_by_id(&self, resource_id: &str) -> RepositoryResult<Option<Resource>>;
}
