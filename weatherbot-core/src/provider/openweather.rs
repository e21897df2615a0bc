use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    error::FetchError,
    model::{Condition, WeatherSnapshot},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    language: String,
    base_url: String,
    timeout: Duration,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: impl Into<String>, language: impl Into<String>) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            api_key: api_key.into(),
            language: language.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Per-request deadline; exceeding it yields [`FetchError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    main: OwMain,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    sys: OwSys,
}

impl OwCurrentResponse {
    fn into_snapshot(self, requested: &str) -> WeatherSnapshot {
        let condition = self
            .weather
            .into_iter()
            .next()
            .map(|w| Condition {
                category: w.main.trim().to_lowercase(),
                description: w.description,
            })
            .unwrap_or_else(|| Condition {
                category: String::new(),
                description: String::new(),
            });

        // "Bekobod,UZ" -> "Bekobod" when the provider omits the name
        let location_name = if self.name.is_empty() {
            requested.split(',').next().unwrap_or(requested).trim().to_string()
        } else {
            self.name
        };

        WeatherSnapshot {
            location_name,
            condition,
            temperature_c: self.main.temp,
            feels_like_c: self.main.feels_like,
            humidity_pct: self.main.humidity,
            wind_speed_mps: self.wind.speed,
            sunrise: self.sys.sunrise.and_then(unix_to_utc),
            sunset: self.sys.sunset.and_then(unix_to_utc),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(&self, location: &str) -> Result<WeatherSnapshot, FetchError> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", self.language.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body)?;

        tracing::debug!(location, category = ?parsed.weather.first().map(|w| &w.main), "weather fetched");

        Ok(parsed.into_snapshot(location))
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenWeatherProvider {
        OpenWeatherProvider::new("test_key", "uz")
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn fetch_parses_current_weather() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Bekobod,UZ"))
            .and(query_param("appid", "test_key"))
            .and(query_param("units", "metric"))
            .and(query_param("lang", "uz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Bekobod",
                "weather": [{"main": "Clear", "description": "ochiq osmon"}],
                "main": {"temp": 21.4, "feels_like": 20.9, "humidity": 40},
                "wind": {"speed": 1.2},
                "sys": {"sunrise": 1712707920, "sunset": 1712753220}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let snapshot = provider(&server).fetch("Bekobod,UZ").await.unwrap();

        assert_eq!(snapshot.location_name, "Bekobod");
        assert_eq!(snapshot.condition.category, "clear");
        assert_eq!(snapshot.condition.description, "ochiq osmon");
        assert_eq!(snapshot.temperature_c, Some(21.4));
        assert_eq!(snapshot.humidity_pct, Some(40));
        assert_eq!(snapshot.wind_speed_mps, Some(1.2));
        assert_eq!(snapshot.sunrise.map(|t| t.timestamp()), Some(1712707920));
    }

    #[tokio::test]
    async fn fetch_tolerates_missing_optional_fields() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "weather": [{"main": "Rain", "description": "light rain"}],
                "main": {"temp": 3.0}
            })))
            .mount(&server)
            .await;

        let snapshot = provider(&server).fetch("Bekobod,UZ").await.unwrap();

        assert_eq!(snapshot.location_name, "Bekobod");
        assert_eq!(snapshot.condition.category, "rain");
        assert!(snapshot.feels_like_c.is_none());
        assert!(snapshot.wind_speed_mps.is_none());
        assert!(snapshot.sunset.is_none());
    }

    #[tokio::test]
    async fn unauthorized_is_a_status_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"cod":401,"message":"Invalid API key"}"#),
            )
            .mount(&server)
            .await;

        let err = provider(&server).fetch("Bekobod,UZ").await.unwrap_err();

        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status.as_u16(), 401);
                assert!(body.contains("Invalid API key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = provider(&server).fetch("Bekobod,UZ").await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[tokio::test]
    async fn slow_response_is_a_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"name": "Bekobod"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = provider(&server)
            .with_timeout(Duration::from_millis(50))
            .fetch("Bekobod,UZ")
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Timeout), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn transport_error_does_not_leak_api_key() {
        // nothing listens on the discard port
        let err = OpenWeatherProvider::new("SECRET-KEY", "uz")
            .unwrap()
            .with_base_url("http://127.0.0.1:9")
            .fetch("Bekobod,UZ")
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Transport(_)), "unexpected error: {err:?}");
        assert!(!err.to_string().contains("SECRET-KEY"));
        assert!(!format!("{err:?}").contains("SECRET-KEY"));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "ё".repeat(300);
        let truncated = truncate_body(&long);

        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
