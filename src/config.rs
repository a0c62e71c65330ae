use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use directories::BaseDirs;
use serde::Deserialize;

use crate::domain::{ChartMode, RegionKey};
use crate::error::CovidError;

pub const DEFAULT_CONFIG_FILE: &str = "covid-charts.json";
pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/";
pub const DEFAULT_WINDOW_HOURS: u32 = 6;
pub const DEFAULT_COUNTRY: &str = "Germany";

pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, 1).unwrap_or_default()
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub freshness: Option<FreshnessEntry>,
    #[serde(default)]
    pub start_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FreshnessEntry {
    Shorthand(String),
    Detailed(FreshnessEntryObject),
}

#[derive(Debug, Deserialize)]
pub struct FreshnessEntryObject {
    pub window_hours: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessPolicy {
    Window { hours: u32 },
    CalendarDay,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        FreshnessPolicy::Window {
            hours: DEFAULT_WINDOW_HOURS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub cache_dir: Utf8PathBuf,
    pub base_url: String,
    pub freshness: FreshnessPolicy,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub cache_dir: Utf8PathBuf,
    pub base_url: String,
    pub freshness: FreshnessPolicy,
    pub start_date: NaiveDate,
    pub region: RegionKey,
    pub mode: ChartMode,
    pub force_update: bool,
    pub verbose: bool,
    pub output: Utf8PathBuf,
}

impl RunConfig {
    pub fn new(resolved: ResolvedConfig, region: RegionKey, mode: ChartMode) -> Self {
        let output = default_output_path(mode);
        Self {
            cache_dir: resolved.cache_dir,
            base_url: resolved.base_url,
            freshness: resolved.freshness,
            start_date: resolved.start_date,
            region,
            mode,
            force_update: false,
            verbose: false,
            output,
        }
    }
}

pub fn default_output_path(mode: ChartMode) -> Utf8PathBuf {
    let dir = Utf8PathBuf::from_path_buf(std::env::temp_dir())
        .unwrap_or_else(|_| Utf8PathBuf::from("."));
    dir.join("covid-charts").join(format!("{mode}.svg"))
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CovidError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| CovidError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CovidError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CovidError> {
        let cache_dir = match config.cache_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => default_cache_dir()?,
        };

        let mut base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let freshness = match config.freshness {
            None => FreshnessPolicy::default(),
            Some(FreshnessEntry::Shorthand(value)) => match value.trim() {
                "window" => FreshnessPolicy::default(),
                "calendar-day" => FreshnessPolicy::CalendarDay,
                other => return Err(CovidError::InvalidFreshness(other.to_string())),
            },
            Some(FreshnessEntry::Detailed(obj)) => {
                if obj.window_hours == 0 {
                    return Err(CovidError::InvalidFreshness(
                        "window_hours must be positive".to_string(),
                    ));
                }
                FreshnessPolicy::Window {
                    hours: obj.window_hours,
                }
            }
        };

        let start_date = match config.start_date {
            Some(value) => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                .map_err(|_| CovidError::InvalidStartDate(value.clone()))?,
            None => default_start_date(),
        };

        Ok(ResolvedConfig {
            cache_dir,
            base_url,
            freshness,
            start_date,
        })
    }
}

fn default_cache_dir() -> Result<Utf8PathBuf, CovidError> {
    BaseDirs::new()
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.cache_dir().join("covid-charts")).ok())
        .ok_or_else(|| CovidError::Filesystem("unable to resolve cache directory".to_string()))
}
