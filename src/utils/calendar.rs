//! Civil-date resolution for reward eligibility.
//!
//! All "today" and cutoff decisions go through [`RewardCalendar`], which reads the
//! current instant from an injected [`Clock`] and interprets it in a fixed UTC offset
//! (IST in production). Tests swap in [`FixedClock`].

use crate::config::RewardsConfig;
use crate::error::AppResult;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定时间时钟（测试 / 回放）
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Clone)]
pub struct RewardCalendar {
    clock: Arc<dyn Clock>,
    tz: FixedOffset,
    cutoff: NaiveTime,
}

impl RewardCalendar {
    pub fn new(clock: Arc<dyn Clock>, tz: FixedOffset, cutoff: NaiveTime) -> Self {
        Self { clock, tz, cutoff }
    }

    pub fn from_config(config: &RewardsConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        Ok(Self::new(clock, config.timezone()?, config.cutoff_time()?))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// 当前民用日期
    pub fn today(&self) -> NaiveDate {
        self.date_of(self.clock.now())
    }

    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// 本地时间是否已到达截止时间（边界包含）
    pub fn is_past_cutoff(&self, instant: DateTime<Utc>) -> bool {
        instant.with_timezone(&self.tz).time() >= self.cutoff
    }
}
