// ==========================================
// 医院排班预约系统 - 号源搜索引擎
// ==========================================
// 职责: 固定时长预约的首个空闲时段搜索
// 算法:
// 1. 规范化起点（过去/缺省 → 当前；营业前 → 当日开诊；
//    营业后 → 次日开诊；营业中 → 向后对齐到粒度边界）
// 2. 按 天 → 时段 顺序扫描 lookahead 天
// 3. 时段空闲 ⇔ 不存在开始时间落在 (slot - 粒度, slot + 粒度) 内的未取消预约
// 输出: 首个空闲时刻，保证 open ≤ t < close
// ==========================================

use crate::config::scheduling_config::SchedulingConfig;
use crate::engine::error::{BookingError, BookingResult};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSearchParams {
    pub granularity: Duration,
    pub business_open: NaiveTime,
    pub business_close: NaiveTime,
    pub lookahead_days: i64,
}

impl SlotSearchParams {
    pub fn from_config(config: &SchedulingConfig) -> BookingResult<Self> {
        let params = Self {
            granularity: config.granularity(),
            business_open: config.business_open,
            business_close: config.business_close,
            lookahead_days: config.lookahead_days,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> BookingResult<()> {
        if self.granularity <= Duration::zero() {
            return Err(BookingError::InvalidInput("号源粒度必须大于0".to_string()));
        }
        if self.business_open >= self.business_close {
            return Err(BookingError::InvalidInput(format!(
                "营业时间无效: open={}, close={}",
                self.business_open, self.business_close
            )));
        }
        if self.lookahead_days <= 0 {
            return Err(BookingError::InvalidInput("搜索天数必须大于0".to_string()));
        }
        Ok(())
    }
}

// ==========================================
// SlotSearchEngine - 号源搜索引擎
// ==========================================
pub struct SlotSearchEngine {
    params: SlotSearchParams,
}

impl SlotSearchEngine {
    pub fn new(params: SlotSearchParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SlotSearchParams {
        &self.params
    }

    fn open_on(&self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(self.params.business_open)
    }

    fn close_on(&self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(self.params.business_close)
    }

    /// 规范化搜索起点
    pub fn normalize_start(&self, requested: Option<NaiveDateTime>, now: NaiveDateTime) -> NaiveDateTime {
        let t = match requested {
            Some(preferred) if preferred >= now => preferred,
            _ => now,
        };
        let day = t.date();

        if t < self.open_on(day) {
            return self.open_on(day);
        }
        if t >= self.close_on(day) {
            return self.open_on(day + Duration::days(1));
        }

        // 以开诊时间为基准，总是前进到下一个粒度边界（边界上的时刻也前进一格）
        let gran_secs = self.params.granularity.num_seconds();
        let offset_secs = (t - self.open_on(day)).num_seconds();
        let snapped = self.open_on(day) + Duration::seconds(offset_secs - offset_secs % gran_secs + gran_secs);

        if snapped >= self.close_on(day) {
            self.open_on(day + Duration::days(1))
        } else {
            snapped
        }
    }

    /// 对称碰撞窗口: |existing - slot| < 粒度 即视为占用
    pub fn is_slot_free(&self, slot: NaiveDateTime, booked_starts: &[NaiveDateTime]) -> bool {
        let window = self.params.granularity;
        !booked_starts
            .iter()
            .any(|existing| *existing > slot - window && *existing < slot + window)
    }

    /// 搜索首个空闲时段
    ///
    /// # 参数
    /// - start: 已规范化的起点
    /// - resource_id: 仅用于错误信息与日志
    /// - load_day: 按天加载该资源未取消预约的开始时间
    #[instrument(skip(self, load_day), fields(resource_id = %resource_id, start = %start))]
    pub fn find_first_free<F>(
        &self,
        start: NaiveDateTime,
        resource_id: &str,
        mut load_day: F,
    ) -> BookingResult<NaiveDateTime>
    where
        F: FnMut(NaiveDate) -> BookingResult<Vec<NaiveDateTime>>,
    {
        let first_day = start.date();

        for offset in 0..self.params.lookahead_days {
            let day = first_day + Duration::days(offset);
            let close = self.close_on(day);
            let mut slot = if offset == 0 { start.max(self.open_on(day)) } else { self.open_on(day) };
            if slot >= close {
                continue;
            }

            let booked = load_day(day)?;
            while slot < close {
                if self.is_slot_free(slot, &booked) {
                    debug!(slot = %slot, "找到空闲号源");
                    return Ok(slot);
                }
                slot += self.params.granularity;
            }
        }

        Err(BookingError::NoAvailableSlot {
            resource_id: resource_id.to_string(),
            lookahead_days: self.params.lookahead_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SlotSearchEngine {
        SlotSearchEngine::new(SlotSearchParams::from_config(&SchedulingConfig::default()).unwrap())
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_normalize_start_snaps_and_wraps() {
        let e = engine();
        let now = at(10, 8, 0);
        assert_eq!(e.normalize_start(Some(at(10, 7, 0)), now), at(10, 9, 0));
        assert_eq!(e.normalize_start(Some(at(10, 9, 7)), now), at(10, 9, 30));
        assert_eq!(e.normalize_start(Some(at(10, 9, 30)), now), at(10, 10, 0));
        assert_eq!(e.normalize_start(Some(at(10, 17, 0)), now), at(11, 9, 0));
        assert_eq!(e.normalize_start(Some(at(10, 16, 45)), now), at(11, 9, 0));
    }

    #[test]
    fn test_normalize_start_advances_from_boundary() {
        let e = engine();
        let now = at(10, 8, 0);
        // 整点/半点也前进到下一格
        assert_eq!(e.normalize_start(Some(at(10, 10, 0)), now), at(10, 10, 30));
        // 恰好在开诊时刻也前进一格
        assert_eq!(e.normalize_start(Some(at(10, 9, 0)), now), at(10, 9, 30));
        // 前进后触及收诊则顺延到次日开诊
        assert_eq!(e.normalize_start(Some(at(10, 16, 30)), now), at(11, 9, 0));
    }

    #[test]
    fn test_normalize_start_replaces_past_or_missing() {
        let e = engine();
        let now = at(10, 10, 10);
        assert_eq!(e.normalize_start(None, now), at(10, 10, 30));
        assert_eq!(e.normalize_start(Some(at(9, 10, 0)), now), at(10, 10, 30));
    }

    #[test]
    fn test_symmetric_collision_window() {
        let e = engine();
        let booked = vec![at(10, 9, 15)];
        // 09:15 的预约同时挡住 09:00 与 09:30
        assert!(!e.is_slot_free(at(10, 9, 0), &booked));
        assert!(!e.is_slot_free(at(10, 9, 30), &booked));
        assert!(e.is_slot_free(at(10, 9, 45), &booked));
        // 恰好相差一个粒度不算冲突
        assert!(e.is_slot_free(at(10, 10, 0), &[at(10, 9, 30)]));
    }

    #[test]
    fn test_find_first_free_skips_booked_and_is_deterministic() {
        let e = engine();
        let loader = |day: NaiveDate| -> BookingResult<Vec<NaiveDateTime>> {
            if day == at(10, 0, 0).date() {
                Ok(vec![at(10, 9, 0), at(10, 9, 30)])
            } else {
                Ok(vec![])
            }
        };

        let first = e.find_first_free(at(10, 9, 0), "D1", loader).unwrap();
        let second = e.find_first_free(at(10, 9, 0), "D1", loader).unwrap();
        assert_eq!(first, at(10, 10, 0));
        assert_eq!(first, second);
    }

    #[test]
    fn test_find_first_free_rolls_to_next_day_within_hours() {
        let e = engine();
        let full_day: Vec<NaiveDateTime> = (0..16).map(|i| at(10, 9, 0) + Duration::minutes(30 * i)).collect();
        let loader = |day: NaiveDate| -> BookingResult<Vec<NaiveDateTime>> {
            if day == at(10, 0, 0).date() {
                Ok(full_day.clone())
            } else {
                Ok(vec![])
            }
        };

        let slot = e.find_first_free(at(10, 9, 0), "D1", loader).unwrap();
        assert_eq!(slot, at(11, 9, 0));
        assert!(slot.time() >= NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(slot.time() < NaiveTime::from_hms_opt(17, 0, 0).unwrap());
    }

    #[test]
    fn test_find_first_free_exhausted() {
        let e = engine();
        let loader = |day: NaiveDate| -> BookingResult<Vec<NaiveDateTime>> {
            Ok((0..16).map(|i| day.and_hms_opt(9, 0, 0).unwrap() + Duration::minutes(30 * i)).collect())
        };
        assert!(matches!(
            e.find_first_free(at(10, 9, 0), "D1", loader),
            Err(BookingError::NoAvailableSlot { lookahead_days: 7, .. })
        ));
    }

    #[test]
    fn test_invalid_business_hours_rejected() {
        let mut config = SchedulingConfig::default();
        config.business_close = config.business_open;
        assert!(matches!(
            SlotSearchParams::from_config(&config),
            Err(BookingError::InvalidInput(_))
        ));
    }
}
