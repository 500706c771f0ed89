use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;

use crate::batches::BatchPlan;
use crate::retry::RetryConfig;

const MAX_STEP_HOURS: i64 = 24 * 31;
const MAX_BATCH_SIZE: usize = 256;

/// Run settings, read from `HARVEST_*` environment variables.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_step_hours")]
    pub step_hours: i64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_start")]
    pub default_start: DateTime<Utc>,
    #[serde(default = "default_temperature_unit")]
    pub temperature_unit: String,
    #[serde(default = "default_wind_unit")]
    pub wind_unit: String,
    /// Hours added to a snapshot time to build its archive path.
    #[serde(default = "default_url_offset_hours")]
    pub url_offset_hours: i64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

fn default_base_url() -> String {
    "https://gaia.nullschool.net".to_string()
}

fn default_step_hours() -> i64 {
    3
}

fn default_batch_size() -> usize {
    16
}

fn default_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 3, 3, 1, 0, 0)
        .single()
        .unwrap_or_default()
}

fn default_temperature_unit() -> String {
    "°C".to_string()
}

fn default_wind_unit() -> String {
    "km/h".to_string()
}

fn default_url_offset_hours() -> i64 {
    -7
}

fn default_http_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    4
}

fn default_retry_base_delay_ms() -> u64 {
    2000
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config: Config = envy::prefixed("HARVEST_").from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_STEP_HOURS).contains(&self.step_hours) {
            anyhow::bail!(
                "HARVEST_STEP_HOURS must be between 1 and {}, got {}",
                MAX_STEP_HOURS,
                self.step_hours
            );
        }
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            anyhow::bail!(
                "HARVEST_BATCH_SIZE must be between 1 and {}, got {}",
                MAX_BATCH_SIZE,
                self.batch_size
            );
        }
        if self.max_attempts == 0 {
            anyhow::bail!("HARVEST_MAX_ATTEMPTS must be at least 1");
        }
        Ok(())
    }

    pub fn step(&self) -> TimeDelta {
        TimeDelta::hours(self.step_hours)
    }

    pub fn batch_plan(&self) -> BatchPlan {
        BatchPlan {
            step: self.step(),
            batch_size: self.batch_size,
        }
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_delay_ms: self.retry_base_delay_ms,
            ..RetryConfig::default()
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
