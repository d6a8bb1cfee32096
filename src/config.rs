use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::constants;
use crate::error::ConfigError;

pub const CONFIG_PATH_ENV: &str = "DAY_TRADER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketConfig {
    /// 0 seeds from entropy
    pub random_seed: u64,
    pub stock_count: usize,
    pub activate_first_stock: bool,
    pub open_market_on_start: bool,
    pub min_processing_secs: f64,
    pub max_processing_secs: f64,
    pub price_effect_duration_secs: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            random_seed: 0,
            stock_count: constants::market::DEFAULT_STOCK_COUNT,
            activate_first_stock: true,
            open_market_on_start: false,
            min_processing_secs: constants::market::MIN_PROCESSING_SECS,
            max_processing_secs: constants::market::MAX_PROCESSING_SECS,
            price_effect_duration_secs: constants::market::PRICE_EFFECT_DURATION_SECS,
        }
    }
}

impl MarketConfig {
    pub fn price_effect_duration(&self) -> Duration {
        Duration::from_secs_f64(self.price_effect_duration_secs.max(0.0))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ClockConfig {
    pub day_duration_secs: f64,
    pub open_time: String,
    pub close_time: String,
    pub infinite_day: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            day_duration_secs: constants::clock::DAY_DURATION_SECS,
            open_time: constants::clock::OPEN_TIME.to_string(),
            close_time: constants::clock::CLOSE_TIME.to_string(),
            infinite_day: false,
        }
    }
}

impl ClockConfig {
    pub fn open(&self) -> NaiveTime {
        parse_time_or(&self.open_time, constants::clock::OPEN_TIME)
    }

    pub fn close(&self) -> NaiveTime {
        parse_time_or(&self.close_time, constants::clock::CLOSE_TIME)
    }
}

pub fn parse_time(value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), constants::clock::TIME_FORMAT).map_err(|_| {
        ConfigError::InvalidTime {
            value: value.to_string(),
        }
    })
}

fn parse_time_or(value: &str, fallback: &str) -> NaiveTime {
    parse_time(value).unwrap_or_else(|e| {
        warn!("⚠️ [CONFIG] {} - using {}", e, fallback);
        NaiveTime::parse_from_str(fallback, constants::clock::TIME_FORMAT).unwrap_or(NaiveTime::MIN)
    })
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct NewsConfig {
    pub first_gap_secs: f64,
    pub gap_min_secs: f64,
    pub gap_max_secs: f64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            first_gap_secs: constants::news::FIRST_NEWS_GAP_SECS,
            gap_min_secs: constants::news::NEWS_GAP_MIN_SECS,
            gap_max_secs: constants::news::NEWS_GAP_MAX_SECS,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub settle_delay_secs: f64,
    /// Unlocks every mechanic regardless of progression
    pub force_mechanics: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            settle_delay_secs: constants::player::SETTLE_DELAY_SECS,
            force_mechanics: false,
        }
    }
}

impl PlayerConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs_f64(self.settle_delay_secs.max(0.0))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
    pub journal_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "./data/save.json".to_string(),
            journal_path: "./data/trades.jsonl".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub market: MarketConfig,
    pub clock: ClockConfig,
    pub news: NewsConfig,
    pub player: PlayerConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
}

impl AppConfig {
    /// Loads from `$DAY_TRADER_CONFIG` or `config.yaml`. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            info!("[CONFIG] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}
