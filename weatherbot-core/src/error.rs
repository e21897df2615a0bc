//! Error types for the notification pipeline.
//!
//! Fetch and format failures abort the current run only. Delivery failures
//! are scoped to a single recipient. Media resolution failures never leave
//! the selector.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("weather request timed out")]
    Timeout,

    #[error("weather request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("weather service returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to parse weather response: {0}")]
    Parse(#[from] serde_json::Error),
}

// Request URLs carry the API key, so they are stripped before the error is stored.
impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(err.without_url())
        }
    }
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("weather snapshot for '{0}' has no condition category")]
    MissingCondition(String),
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("delivery channel rejected message ({status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("failed to read media file {path}: {source}")]
    Media {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// Bot API URLs embed the token (`/bot<token>/...`).
impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Transport(err.without_url())
    }
}

#[derive(Debug, Error)]
pub enum MediaResolutionError {
    #[error("media '{0}' not found")]
    NotFound(String),
}

/// Reasons a single pipeline run produced no notification.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting '{0}'")]
    Missing(&'static str),

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("invalid schedule entry '{0}', expected HH:MM")]
    InvalidScheduleEntry(String),

    #[error("invalid health port '{0}'")]
    InvalidPort(String),

    #[error("schedule has no entries")]
    EmptySchedule,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("scheduler has no entries to arm")]
    EmptySchedule,

    #[error("scheduler must be armed before it can run")]
    NotArmed,
}
