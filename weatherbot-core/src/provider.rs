use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::FetchError, model::WeatherSnapshot};

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Source of current conditions for a named location.
///
/// Implementations make exactly one request per call and never retry.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch(&self, location: &str) -> Result<WeatherSnapshot, FetchError>;
}
