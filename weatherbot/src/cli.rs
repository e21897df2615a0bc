use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use inquire::{Password, Text};
use std::path::PathBuf;

use weatherbot_core::{
    Composer, Config, DeliveryOutcome, Pipeline, Recipient, ScheduleEntry, Scheduler,
    config::Settings,
};

use crate::health;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherbot", version, about = "Daily weather notifications for Telegram")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the scheduler and the health endpoint (default).
    Run,

    /// Fetch, format and deliver one notification right now.
    Send,

    /// Print the notification that would be sent right now, without sending it.
    Preview,

    /// Interactively write the config file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = self.load_config()?;

        match self.command.unwrap_or(Command::Run) {
            Command::Run => run(&config.settings()?).await,
            Command::Send => send(&config.settings()?).await,
            Command::Preview => preview(&config).await,
            Command::Configure => configure(config, self.config),
        }
    }

    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        config
            .apply_env(|key| std::env::var(key).ok())
            .context("Invalid configuration in environment")?;
        Ok(config)
    }
}

async fn run(settings: &Settings) -> Result<()> {
    let mut pipeline = Pipeline::from_settings(settings)?;
    let mut scheduler = Scheduler::new(settings.timezone);
    scheduler.arm(&settings.schedule)?;

    if settings.recipients.is_empty() {
        tracing::warn!("no recipients configured, scheduled runs will deliver nothing");
    }

    let port = settings.health_port;
    tokio::spawn(async move {
        if let Err(err) = health::serve(port).await {
            tracing::error!(error = %err, "health endpoint stopped");
        }
    });

    scheduler.run(&mut pipeline, shutdown_signal()).await?;
    Ok(())
}

async fn send(settings: &Settings) -> Result<()> {
    let mut pipeline = Pipeline::from_settings(settings)?;
    let report = pipeline.run_once(Utc::now()).await?;

    if report.is_empty() {
        println!("No recipients configured, nothing sent.");
    }
    for attempt in &report.attempts {
        match &attempt.outcome {
            DeliveryOutcome::Delivered => println!("✅ {}", attempt.recipient),
            DeliveryOutcome::Failed(reason) => println!("❌ {}: {reason}", attempt.recipient),
        }
    }

    Ok(())
}

async fn preview(config: &Config) -> Result<()> {
    let api_key = config.weather_api_key.as_deref().context(
        "No weather API key configured.\n\
         Hint: set OWM_API_KEY or run `weatherbot configure`.",
    )?;

    let mut composer = Composer::openweather(
        api_key,
        &config.language,
        config.timezone()?,
        &config.media_dir,
        &config.location,
    )?;
    let content = composer.compose(Utc::now()).await?;

    println!("{}\n", content.text);
    match &content.media {
        Some(path) => println!("Media: {}", path.display()),
        None => println!("Media: none"),
    }
    Ok(())
}

fn configure(mut config: Config, path: Option<PathBuf>) -> Result<()> {
    let token = prompt_secret("Telegram bot token:", config.telegram_token.take())?;
    let api_key = prompt_secret("OpenWeather API key:", config.weather_api_key.take())?;

    let location = Text::new("Location:")
        .with_default(&config.location)
        .prompt()?;

    let current_recipients = join(&config.recipients);
    let recipients = Text::new("Chat ids (comma-separated):")
        .with_default(&current_recipients)
        .prompt()?;

    let current_schedule = join(&config.schedule);
    let schedule = Text::new("Send times, HH:MM (comma-separated):")
        .with_default(&current_schedule)
        .prompt()?;

    let timezone = Text::new("Timezone:").with_default(&config.timezone).prompt()?;

    config.telegram_token = Some(token);
    config.weather_api_key = Some(api_key);
    config.location = location;
    config.recipients = split(&recipients).map(Recipient::new).collect();
    config.schedule = split(&schedule)
        .map(str::parse)
        .collect::<Result<Vec<ScheduleEntry>, _>>()?;
    config.timezone = timezone;

    // fail before writing anything unusable
    config.settings()?;

    let path = match path {
        Some(path) => path,
        None => Config::config_file_path()?,
    };
    config.save_to(&path)?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}

/// Ask for a secret without echoing it. An empty answer keeps `current`.
fn prompt_secret(message: &str, current: Option<String>) -> Result<String> {
    loop {
        let mut prompt = Password::new(message).without_confirmation();
        if current.is_some() {
            prompt = prompt.with_help_message("leave empty to keep the current value");
        }

        if let Some(value) = keep_or_replace(&prompt.prompt()?, current.as_deref()) {
            return Ok(value);
        }
        println!("A value is required.");
    }
}

fn keep_or_replace(answer: &str, current: Option<&str>) -> Option<String> {
    let answer = answer.trim();
    if answer.is_empty() {
        current.map(str::to_string)
    } else {
        Some(answer.to_string())
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

fn split(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown requested");
}
