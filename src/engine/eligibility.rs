// ==========================================
// 医院排班预约系统 - 准入筛选引擎
// ==========================================
// 职责: 主诉文本 → 专科；专科 → 候选资源（带兜底链）
// 兜底链: 精确专科 → 兜底专科 → 同类任意在用资源 → NoEligibleResource
// ==========================================

use crate::config::scheduling_config::SchedulingConfig;
use crate::config::scheduling_config_trait::CategoryKeywords;
use crate::domain::resource::ResourceLoad;
use crate::domain::types::ResourceKind;
use crate::engine::error::{BookingError, BookingResult};
use crate::repository::resource_directory::ResourceDirectory;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// 候选集来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateScope {
    Exact,
    Fallback,
    AnyOfKind,
}

#[derive(Debug, Clone)]
pub struct CandidateSet {
    pub category: String,
    pub scope: CandidateScope,
    pub candidates: Vec<ResourceLoad>,
}

// ==========================================
// EligibilitySelector - 准入筛选器
// ==========================================
pub struct EligibilitySelector {
    table: Vec<CategoryKeywords>,
    fallback_category: String,
}

impl EligibilitySelector {
    pub fn new(table: Vec<CategoryKeywords>, fallback_category: impl Into<String>) -> Self {
        Self {
            table,
            fallback_category: fallback_category.into(),
        }
    }

    pub fn from_config(config: &SchedulingConfig) -> Self {
        Self::new(config.specialization_table.clone(), config.fallback_category.clone())
    }

    /// 推断专科
    ///
    /// 规则:
    /// - 大小写不敏感的子串匹配
    /// - 按表声明顺序扫描，首个命中的专科胜出
    /// - 无命中返回兜底专科
    pub fn infer_category(&self, requirement_text: &str) -> String {
        let text = requirement_text.to_lowercase();
        self.table
            .iter()
            .find(|entry| {
                entry
                    .keywords
                    .iter()
                    .any(|kw| !kw.trim().is_empty() && text.contains(&kw.trim().to_lowercase()))
            })
            .map(|entry| entry.category.clone())
            .unwrap_or_else(|| self.fallback_category.clone())
    }

    /// 按兜底链查询候选资源
    #[instrument(skip(self, directory), fields(kind = %kind, category = %category))]
    pub fn select_candidates(
        &self,
        directory: &dyn ResourceDirectory,
        kind: ResourceKind,
        category: &str,
    ) -> BookingResult<CandidateSet> {
        let exact = directory.find_active_by_tag(kind, category)?;
        if !exact.is_empty() {
            return Ok(CandidateSet {
                category: category.to_string(),
                scope: CandidateScope::Exact,
                candidates: exact,
            });
        }

        if !self.fallback_category.eq_ignore_ascii_case(category) {
            let fallback = directory.find_active_by_tag(kind, &self.fallback_category)?;
            if !fallback.is_empty() {
                debug!(fallback = %self.fallback_category, "专科无在用资源，放宽到兜底专科");
                return Ok(CandidateSet {
                    category: self.fallback_category.clone(),
                    scope: CandidateScope::Fallback,
                    candidates: fallback,
                });
            }
        }

        let any = directory.find_active_by_kind(kind)?;
        if !any.is_empty() {
            debug!("兜底专科无在用资源，放宽到同类任意资源");
            return Ok(CandidateSet {
                category: category.to_string(),
                scope: CandidateScope::AnyOfKind,
                candidates: any,
            });
        }

        Err(BookingError::NoEligibleResource {
            kind,
            category: category.to_string(),
        })
    }
}
