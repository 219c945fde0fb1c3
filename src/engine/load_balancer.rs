// ==========================================
// 医院排班预约系统 - 负载均衡
// ==========================================
// 规则: 在途预约最少者胜出；并列时保持候选列表顺序（稳定）
// ==========================================

use crate::domain::resource::ResourceLoad;

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadBalancer;

impl LoadBalancer {
    pub fn new() -> Self {
        Self
    }

    /// 选出在途预约最少的候选；候选为空返回 None
    pub fn pick<'a>(&self, candidates: &'a [ResourceLoad]) -> Option<&'a ResourceLoad> {
        // min_by_key 并列时返回第一个
        candidates.iter().min_by_key(|c| c.live_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::Resource;

    fn load(id: &str, live_count: i64) -> ResourceLoad {
        ResourceLoad {
            resource: Resource::practitioner(id, format!("Dr. {}", id), "Cardiology"),
            live_count,
        }
    }

    #[test]
    fn test_picks_least_loaded() {
        let candidates = vec![load("A", 2), load("B", 0), load("C", 1)];
        let picked = LoadBalancer::new().pick(&candidates).unwrap();
        assert_eq!(picked.resource.resource_id, "B");
    }

    #[test]
    fn test_tie_keeps_list_order() {
        let candidates = vec![load("A", 1), load("B", 1), load("C", 3)];
        let picked = LoadBalancer::new().pick(&candidates).unwrap();
        assert_eq!(picked.resource.resource_id, "A");
    }

    #[test]
    fn test_empty_candidates() {
        assert!(LoadBalancer::new().pick(&[]).is_none());
    }
}
