use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::{path::Path, sync::Arc};

use crate::{
    config::Settings,
    dispatch::{DeliveryReport, Dispatcher, Messenger},
    error::{FetchError, PipelineError},
    format::MessageFormatter,
    media::{DirectoryStore, MediaSelector},
    model::{NotificationContent, Recipient},
    provider::{OpenWeatherProvider, WeatherProvider},
    scheduler::Job,
    telegram::TelegramMessenger,
};

/// fetch -> format -> select media. Produces content but never delivers it.
#[derive(Debug)]
pub struct Composer {
    provider: Box<dyn WeatherProvider>,
    formatter: MessageFormatter,
    selector: MediaSelector,
    location: String,
}

impl Composer {
    pub fn new(
        provider: Box<dyn WeatherProvider>,
        formatter: MessageFormatter,
        selector: MediaSelector,
        location: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            formatter,
            selector,
            location: location.into(),
        }
    }

    /// OpenWeather plus on-disk media. Needs no Telegram token.
    pub fn openweather(
        api_key: &str,
        language: &str,
        timezone: Tz,
        media_dir: &Path,
        location: &str,
    ) -> Result<Self, FetchError> {
        let provider = OpenWeatherProvider::new(api_key, language)?;
        let store = DirectoryStore::new(media_dir);

        Ok(Self::new(
            Box::new(provider),
            MessageFormatter::new(timezone),
            MediaSelector::from_entropy(Box::new(store), timezone),
            location,
        ))
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub async fn compose(&mut self, now: DateTime<Utc>) -> Result<NotificationContent, PipelineError> {
        let snapshot = self.provider.fetch(&self.location).await?;
        let text = self.formatter.format(&snapshot, now)?;
        let media = self.selector.pick(&snapshot.condition.category, now);

        Ok(NotificationContent { text, media })
    }
}

/// [`Composer`] plus fan-out, once per call to [`Pipeline::run_once`].
#[derive(Debug)]
pub struct Pipeline {
    composer: Composer,
    dispatcher: Dispatcher,
    recipients: Vec<Recipient>,
}

impl Pipeline {
    pub fn new(
        provider: Box<dyn WeatherProvider>,
        formatter: MessageFormatter,
        selector: MediaSelector,
        dispatcher: Dispatcher,
        location: impl Into<String>,
        recipients: Vec<Recipient>,
    ) -> Self {
        Self::with_composer(
            Composer::new(provider, formatter, selector, location),
            dispatcher,
            recipients,
        )
    }

    pub fn with_composer(
        composer: Composer,
        dispatcher: Dispatcher,
        recipients: Vec<Recipient>,
    ) -> Self {
        Self {
            composer,
            dispatcher,
            recipients,
        }
    }

    /// Wire the production components (OpenWeather, Telegram, on-disk media) from settings.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let composer = Composer::openweather(
            &settings.weather_api_key,
            &settings.language,
            settings.timezone,
            &settings.media_dir,
            &settings.location,
        )?;
        let messenger: Arc<dyn Messenger> = Arc::new(TelegramMessenger::new(&settings.telegram_token)?);

        Ok(Self::with_composer(
            composer,
            Dispatcher::new(messenger),
            settings.recipients.clone(),
        ))
    }

    /// One complete run. Fetch and format errors abort before any delivery.
    pub async fn run_once(&mut self, now: DateTime<Utc>) -> Result<DeliveryReport, PipelineError> {
        let content = self.composer.compose(now).await?;
        Ok(self.dispatcher.deliver(&content, &self.recipients).await)
    }
}

#[async_trait]
impl Job for Pipeline {
    async fn fire(&mut self, now: DateTime<Utc>) {
        tracing::info!(location = %self.composer.location(), recipients = self.recipients.len(), "pipeline run started");

        match self.run_once(now).await {
            Ok(report) => tracing::info!(
                delivered = report.delivered(),
                failed = report.failed(),
                "pipeline run finished"
            ),
            Err(PipelineError::Fetch(FetchError::Status { status, body })) => {
                tracing::error!(%status, body = %body, "weather service refused request, run aborted")
            }
            Err(err) => tracing::error!(error = %err, "pipeline run aborted"),
        }
    }
}
