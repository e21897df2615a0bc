use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::ConfigError,
    model::{Recipient, ScheduleEntry},
};

pub const DEFAULT_LOCATION: &str = "Bekobod,UZ";
pub const DEFAULT_TIMEZONE: &str = "Asia/Tashkent";
pub const DEFAULT_LANGUAGE: &str = "uz";
pub const DEFAULT_MEDIA_DIR: &str = "images";
pub const DEFAULT_HEALTH_PORT: u16 = 10000;

/// Configuration as stored on disk.
///
/// Every field can be overridden from the environment, see [`Config::apply_env`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub telegram_token: Option<String>,
    pub weather_api_key: Option<String>,
    pub location: String,
    pub recipients: Vec<Recipient>,

    /// Example TOML:
    /// schedule = ["07:00", "12:10", "19:10"]
    pub schedule: Vec<ScheduleEntry>,

    pub timezone: String,
    pub language: String,
    pub media_dir: PathBuf,
    pub health_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telegram_token: None,
            weather_api_key: None,
            location: DEFAULT_LOCATION.to_string(),
            recipients: Vec::new(),
            schedule: default_schedule(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            media_dir: PathBuf::from(DEFAULT_MEDIA_DIR),
            health_port: DEFAULT_HEALTH_PORT,
        }
    }
}

fn default_schedule() -> Vec<ScheduleEntry> {
    [(7, 0), (12, 10), (19, 10)]
        .into_iter()
        .filter_map(|(h, m)| ScheduleEntry::new(h, m).ok())
        .collect()
}

/// Validated, immutable runtime settings shared by reference with every component.
#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram_token: String,
    pub weather_api_key: String,
    pub location: String,
    pub recipients: Vec<Recipient>,
    pub schedule: Vec<ScheduleEntry>,
    pub timezone: Tz,
    pub language: String,
    pub media_dir: PathBuf,
    pub health_port: u16,
}

impl Config {
    /// Load config from the default location, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default location, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weatherbot", "weatherbot")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Override fields from environment variables.
    ///
    /// `lookup` is `std::env::var(..).ok()` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(token) = get("TELEGRAM_TOKEN") {
            self.telegram_token = Some(token);
        }
        if let Some(key) = get("OWM_API_KEY") {
            self.weather_api_key = Some(key);
        }
        if let Some(city) = get("CITY_NAME") {
            self.location = city;
        }
        if let Some(ids) = get("CHAT_ID") {
            self.recipients = split_list(&ids).map(Recipient::new).collect();
        }
        if let Some(times) = get("SCHEDULE") {
            self.schedule = split_list(&times)
                .map(str::parse)
                .collect::<Result<Vec<ScheduleEntry>, _>>()?;
        }
        if let Some(tz) = get("TIMEZONE") {
            self.timezone = tz;
        }
        if let Some(lang) = get("WEATHER_LANG") {
            self.language = lang;
        }
        if let Some(dir) = get("MEDIA_DIR") {
            self.media_dir = PathBuf::from(dir);
        }
        if let Some(port) = get("PORT") {
            self.health_port = port.parse().map_err(|_| ConfigError::InvalidPort(port))?;
        }

        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }

    /// Validate and freeze into [`Settings`].
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let telegram_token = self
            .telegram_token
            .clone()
            .ok_or(ConfigError::Missing("telegram_token"))?;
        let weather_api_key = self
            .weather_api_key
            .clone()
            .ok_or(ConfigError::Missing("weather_api_key"))?;

        let timezone = self.timezone()?;

        if self.schedule.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }

        Ok(Settings {
            telegram_token,
            weather_api_key,
            location: self.location.clone(),
            recipients: self.recipients.clone(),
            schedule: self.schedule.clone(),
            timezone,
            language: self.language.clone(),
            media_dir: self.media_dir.clone(),
            health_port: self.health_port,
        })
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}
