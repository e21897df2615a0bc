use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};

use crate::error::ConfigError;

/// Coarse weather classification plus the provider's free-text wording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// Provider category such as "clear" or "rain". Stored lowercase.
    pub category: String,
    pub description: String,
}

/// Current conditions for one location, fetched once per pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location_name: String,
    pub condition: Condition,
    pub temperature_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub humidity_pct: Option<u8>,
    pub wind_speed_mps: Option<f64>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

/// What gets sent to every recipient for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub text: String,
    pub media: Option<PathBuf>,
}

/// Chat or channel handle understood by the delivery channel
/// (a numeric chat id or an `@channel` name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipient(String);

impl Recipient {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Daily wall-clock time at which the pipeline fires, in the configured timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScheduleEntry {
    hour: u32,
    minute: u32,
}

impl ScheduleEntry {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ConfigError> {
        if hour > 23 || minute > 59 {
            return Err(ConfigError::InvalidScheduleEntry(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn matches<T: Timelike>(&self, time: &T) -> bool {
        time.hour() == self.hour && time.minute() == self.minute
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ScheduleEntry {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidScheduleEntry(s.to_string());

        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = hour.parse().map_err(|_| invalid())?;
        let minute = minute.parse().map_err(|_| invalid())?;

        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ScheduleEntry {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScheduleEntry> for String {
    fn from(entry: ScheduleEntry) -> Self {
        entry.to_string()
    }
}

/// Part of the day derived from the local hour.
///
/// Morning is `[5, 11)`, midday `[11, 18)`, evening everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeBucket {
    Morning,
    Midday,
    Evening,
}

impl TimeBucket {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=10 => TimeBucket::Morning,
            11..=17 => TimeBucket::Midday,
            _ => TimeBucket::Evening,
        }
    }

    pub fn of<T: Timelike>(time: &T) -> Self {
        Self::from_hour(time.hour())
    }

    /// Prefix used for media file names.
    pub fn tag(&self) -> &'static str {
        match self {
            TimeBucket::Morning => "morning",
            TimeBucket::Midday => "day",
            TimeBucket::Evening => "evening",
        }
    }
}
