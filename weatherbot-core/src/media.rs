//! Picks an illustration for the notification.
//!
//! Files are named `{bucket}_{variant}`, e.g. `morning_clear_2.jpg`, and live
//! in a single directory. A bucket-independent `default.jpg` is the last resort.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use std::{fmt, path::PathBuf};

use crate::{error::MediaResolutionError, model::TimeBucket};

/// Condition category -> image variants.
pub const MEDIA_VARIANTS: &[(&str, &[&str])] = &[
    ("clear", &["clear_1.jpg", "clear_2.jpg"]),
    ("clouds", &["clouds_1.jpg", "clouds_2.jpg"]),
    ("rain", &["rain_1.jpg", "rain_2.jpg"]),
    ("drizzle", &["rain_1.jpg"]),
    ("thunderstorm", &["storm_1.jpg", "storm_2.jpg"]),
    ("snow", &["snow_1.jpg", "snow_2.jpg"]),
    ("mist", &["fog_1.jpg"]),
    ("fog", &["fog_1.jpg", "fog_2.jpg"]),
    ("haze", &["fog_2.jpg"]),
    ("smoke", &["fog_2.jpg"]),
];

/// Used for categories missing from [`MEDIA_VARIANTS`].
pub const DEFAULT_VARIANTS: &[&str] = &["default_1.jpg", "default_2.jpg"];

pub const FALLBACK_MEDIA: &str = "default.jpg";

/// Key of an image inside a [`MediaStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaRef(String);

impl MediaRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn fallback() -> Self {
        Self(FALLBACK_MEDIA.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Answers whether a media key can actually be sent.
pub trait MediaStore: Send + Sync {
    fn locate(&self, media: &MediaRef) -> Result<PathBuf, MediaResolutionError>;
}

/// Images stored as plain files in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MediaStore for DirectoryStore {
    fn locate(&self, media: &MediaRef) -> Result<PathBuf, MediaResolutionError> {
        let path = self.root.join(media.as_str());
        if path.is_file() {
            Ok(path)
        } else {
            Err(MediaResolutionError::NotFound(path.display().to_string()))
        }
    }
}

/// Every key `select` may return for `category` during `bucket`.
pub fn candidates(category: &str, bucket: TimeBucket) -> Vec<MediaRef> {
    variants_for(category)
        .iter()
        .map(|v| MediaRef(format!("{}_{v}", bucket.tag())))
        .collect()
}

fn variants_for(category: &str) -> &'static [&'static str] {
    let key = category.trim().to_lowercase();
    MEDIA_VARIANTS
        .iter()
        .find(|(name, _)| *name == key)
        .map_or(DEFAULT_VARIANTS, |(_, variants)| *variants)
}

pub struct MediaSelector<R = StdRng> {
    store: Box<dyn MediaStore>,
    timezone: Tz,
    rng: R,
}

impl MediaSelector<StdRng> {
    /// Selector seeded from OS entropy.
    pub fn from_entropy(store: Box<dyn MediaStore>, timezone: Tz) -> Self {
        Self::new(store, timezone, StdRng::from_entropy())
    }
}

impl<R: rand::Rng> MediaSelector<R> {
    pub fn new(store: Box<dyn MediaStore>, timezone: Tz, rng: R) -> Self {
        Self { store, timezone, rng }
    }

    /// Uniform pick among the variants for `category` in the current local time bucket.
    pub fn select(&mut self, category: &str, now: DateTime<Utc>) -> MediaRef {
        let bucket = TimeBucket::of(&now.with_timezone(&self.timezone));
        let variant = variants_for(category)
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(FALLBACK_MEDIA);

        MediaRef(format!("{}_{variant}", bucket.tag()))
    }

    /// Path of `media`, degrading to [`FALLBACK_MEDIA`] and then to no media at all.
    pub fn resolve(&self, media: &MediaRef) -> Option<PathBuf> {
        match self.store.locate(media) {
            Ok(path) => return Some(path),
            Err(err) => tracing::warn!(%media, error = %err, "media missing, using fallback"),
        }

        match self.store.locate(&MediaRef::fallback()) {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!(error = %err, "fallback media missing, sending text only");
                None
            }
        }
    }

    pub fn pick(&mut self, category: &str, now: DateTime<Utc>) -> Option<PathBuf> {
        let media = self.select(category, now);
        self.resolve(&media)
    }
}

impl<R> fmt::Debug for MediaSelector<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSelector")
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}
