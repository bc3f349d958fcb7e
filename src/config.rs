use chrono::{FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// 单个奖励档位的每日配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierConfig {
    /// 每日预算 (cash 为 paise)
    pub daily_budget: i64,
    /// 随机金额下限（含）
    pub min_amount: i64,
    /// 随机金额上限（含）
    pub max_amount: i64,
    /// 每日获奖人数上限，None 为不限
    #[serde(default)]
    pub max_users: Option<i32>,
}

impl TierConfig {
    pub fn cash_default() -> Self {
        Self {
            daily_budget: 10_000, // ₹100
            min_amount: 100,      // ₹1
            max_amount: 1_000,    // ₹10
            max_users: Some(30),
        }
    }

    pub fn points_default() -> Self {
        Self {
            daily_budget: 10_000,
            min_amount: 1,
            max_amount: 50,
            max_users: None,
        }
    }

    fn validate(&self, name: &str) -> AppResult<()> {
        if self.daily_budget <= 0 {
            return Err(AppError::ConfigError(format!(
                "rewards.{name}.daily_budget must be positive"
            )));
        }
        if self.min_amount <= 0 || self.min_amount > self.max_amount {
            return Err(AppError::ConfigError(format!(
                "rewards.{name} requires 0 < min_amount <= max_amount"
            )));
        }
        if matches!(self.max_users, Some(n) if n <= 0) {
            return Err(AppError::ConfigError(format!(
                "rewards.{name}.max_users must be positive when set"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    /// 民用时区相对 UTC 的分钟偏移 (IST = 330)
    pub utc_offset_minutes: i32,
    /// 每日开始发放奖励的时间 (HH:MM, 含)
    pub cutoff: String,
    /// 预算扣减乐观重试次数
    pub reserve_attempts: u32,
    pub cash: TierConfig,
    pub points: TierConfig,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 330,
            cutoff: "15:00".to_string(),
            reserve_attempts: 5,
            cash: TierConfig::cash_default(),
            points: TierConfig::points_default(),
        }
    }
}

impl RewardsConfig {
    pub fn timezone(&self) -> AppResult<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            AppError::ConfigError(format!(
                "rewards.utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            ))
        })
    }

    pub fn cutoff_time(&self) -> AppResult<NaiveTime> {
        NaiveTime::parse_from_str(&self.cutoff, "%H:%M").map_err(|e| {
            AppError::ConfigError(format!("rewards.cutoff must be HH:MM ({}): {e}", self.cutoff))
        })
    }

    pub fn validate(&self) -> AppResult<()> {
        self.timezone()?;
        self.cutoff_time()?;
        if self.reserve_attempts == 0 {
            return Err(AppError::ConfigError(
                "rewards.reserve_attempts must be at least 1".into(),
            ));
        }
        self.cash.validate("cash")?;
        self.points.validate("points")?;
        Ok(())
    }
}

/// 历史数据保留天数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub award_days: i64,
    pub transaction_days: i64,
    pub pool_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            award_days: 30,
            transaction_days: 365,
            pool_days: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    /// 管理接口令牌 (X-Admin-Token)，为空时管理接口全部拒绝
    #[serde(default)]
    pub token: String,
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let database_url = env::var("DATABASE_URL")
                    .map_err(|_| "DATABASE_URL is not set and config.toml was not found")?;

                Config {
                    server: ServerConfig {
                        host: "0.0.0.0".to_string(),
                        port: 8080,
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: 10,
                    },
                    rewards: RewardsConfig::default(),
                    retention: RetentionConfig::default(),
                    admin: AdminConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("failed to read config file {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_env_overrides();
        config.rewards.validate()?;

        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| format!("failed to parse config file: {e}"))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
            env::var(name).ok().and_then(|v| v.parse::<T>().ok())
        }

        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = parsed("SERVER_PORT") {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = parsed("DB_MAX_CONNECTIONS") {
            self.database.max_connections = mc;
        }
        if let Some(v) = parsed("REWARDS_UTC_OFFSET_MINUTES") {
            self.rewards.utc_offset_minutes = v;
        }
        if let Ok(v) = env::var("REWARDS_CUTOFF") {
            self.rewards.cutoff = v;
        }
        if let Some(v) = parsed("REWARDS_CASH_DAILY_BUDGET") {
            self.rewards.cash.daily_budget = v;
        }
        if let Some(v) = parsed("REWARDS_CASH_MAX_USERS") {
            self.rewards.cash.max_users = Some(v);
        }
        if let Some(v) = parsed("REWARDS_POINTS_DAILY_BUDGET") {
            self.rewards.points.daily_budget = v;
        }
        if let Ok(v) = env::var("ADMIN_TOKEN") {
            self.admin.token = v;
        }
    }
}
