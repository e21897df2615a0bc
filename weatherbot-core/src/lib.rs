//! Core library for the daily weather bot.
//!
//! This crate defines:
//! - Configuration loading and validated runtime settings
//! - The OpenWeather client
//! - Uzbek message formatting and contextual media selection
//! - Fan-out delivery over Telegram with per-recipient failure isolation
//! - The daily wall-clock scheduler that drives the pipeline
//!
//! It is used by the `weatherbot` binary, but every stage sits behind a
//! trait so it can be driven from tests or other front-ends.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod media;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod scheduler;
pub mod telegram;

pub use config::{Config, Settings};
pub use dispatch::{DeliveryOutcome, DeliveryReport, Dispatcher, Messenger};
pub use error::{
    ConfigError, DeliveryError, FetchError, FormatError, MediaResolutionError, PipelineError,
    SchedulerError,
};
pub use format::MessageFormatter;
pub use media::{DirectoryStore, MediaRef, MediaSelector, MediaStore};
pub use model::{NotificationContent, Recipient, ScheduleEntry, TimeBucket, WeatherSnapshot};
pub use pipeline::{Composer, Pipeline};
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use scheduler::{Job, Scheduler, SchedulerState};
pub use telegram::TelegramMessenger;
