use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Datestamp tags scanned, in order, by the datestamp heuristics.
pub const DEFAULT_DATESTAMP_TAGS: &[&str] = &[
    "SubSecDateTimeOriginal",
    "DateTimeOriginal",
    "SubSecCreateDate",
    "CreateDate",
    "SubSecMediaCreateDate",
    "MediaCreateDate",
    "CreationDate",
    "ModifyDate",
];

/// Flags for GPS reconciliation and timezone inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TzOptions {
    /// Treat `0,0` coordinates as "no fix".
    pub ignore_zero_zero_lat_lon: bool,
    /// Try the GPS-derived zone before explicit offset tags.
    pub prefer_gps_inference: bool,
    pub infer_timezone_from_datestamps: bool,
    pub infer_timezone_from_datestamp_tags: Vec<String>,
    pub default_videos_to_utc: bool,
    /// Difference a UTC stamp (GPSDateTime, DateTimeUTC) against a local
    /// datestamp.
    pub infer_timezone_from_utc_offset: bool,
    /// Difference the `TimeStamp` tag against a local datestamp.
    pub infer_timezone_from_timestamps: bool,
    pub use_geolocation_time_zone: bool,
    /// Pin zoneless date-times to the resolved zone.
    pub backfill_timezones: bool,
}

impl Default for TzOptions {
    fn default() -> Self {
        Self {
            ignore_zero_zero_lat_lon: true,
            prefer_gps_inference: false,
            infer_timezone_from_datestamps: false,
            infer_timezone_from_datestamp_tags: DEFAULT_DATESTAMP_TAGS
                .iter()
                .map(|tag| tag.to_string())
                .collect(),
            default_videos_to_utc: true,
            infer_timezone_from_utc_offset: true,
            infer_timezone_from_timestamps: false,
            use_geolocation_time_zone: true,
            backfill_timezones: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pretty_json: bool,
    pub geo_lookup: bool,
    pub timezone: TzOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pretty_json: false,
            geo_lookup: true,
            timezone: TzOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "tagtime", "tagtime")
        .context("could not determine the OS configuration directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

/// Reads `path`, falling back to defaults when it does not exist.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    save_config_to(config, &paths.config_path)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| {
            format!("failed to create config directory: {}", dir.display())
        })?;
    }
    let body = toml::to_string_pretty(config).context("failed to serialize config")?;
    fs::write(path, body)
        .with_context(|| format!("failed to write config file: {}", path.display()))?;
    Ok(())
}
