//! Uzbek-language rendering of a [`WeatherSnapshot`].
//!
//! The output uses Telegram's legacy Markdown (`*bold*`), so dynamic text
//! coming from the provider is escaped before it is spliced in.

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

use crate::{
    error::FormatError,
    model::{TimeBucket, WeatherSnapshot},
};

/// Rendered in place of any value the provider did not report.
pub const PLACEHOLDER: &str = "—";

/// Condition category -> localized phrase. Categories are lowercase.
pub const CONDITION_PHRASES: &[(&str, &str)] = &[
    ("clear", "ochiq osmon"),
    ("clouds", "bulutli"),
    ("rain", "yomgʻir"),
    ("drizzle", "mayda yomgʻir"),
    ("thunderstorm", "momaqaldiroq"),
    ("snow", "qor"),
    ("mist", "tuman"),
    ("fog", "tuman"),
    ("haze", "tutunli"),
    ("smoke", "tutun"),
    ("dust", "changli havo"),
    ("sand", "qumli havo"),
    ("ash", "kul bosgan havo"),
    ("squall", "shamol kuchaygan"),
    ("tornado", "bo‘ron"),
];

/// Indexed by `month0()`.
pub const MONTH_NAMES: [&str; 12] = [
    "Yanvar", "Fevral", "Mart", "Aprel", "May", "Iyun", "Iyul", "Avgust", "Sentabr", "Oktabr",
    "Noyabr", "Dekabr",
];

pub fn greeting(bucket: TimeBucket) -> &'static str {
    match bucket {
        TimeBucket::Morning => {
            "🌅 *Xayrli tong!*\nYangi kun boshlandi. Sizga unumli ishlar va iliq kayfiyat tilaymiz."
        }
        TimeBucket::Midday => "🌤 *Xayrli kun!* 🌞",
        TimeBucket::Evening => "🌙 *Xayrli oqshom!* 🌌",
    }
}

/// Localized phrase for `category`, or the capitalized `description` when the
/// category is not in [`CONDITION_PHRASES`].
pub fn translate_condition(category: &str, description: &str) -> String {
    let key = category.trim().to_lowercase();

    CONDITION_PHRASES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, phrase)| phrase.to_string())
        .unwrap_or_else(|| capitalize(description.trim()))
}

pub fn month_name(date: &impl Datelike) -> &'static str {
    MONTH_NAMES[date.month0() as usize]
}

#[derive(Debug, Clone)]
pub struct MessageFormatter {
    timezone: Tz,
}

impl MessageFormatter {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Build the notification text for `snapshot` as observed at `now`.
    pub fn format(&self, snapshot: &WeatherSnapshot, now: DateTime<Utc>) -> Result<String, FormatError> {
        if snapshot.condition.category.trim().is_empty() {
            return Err(FormatError::MissingCondition(snapshot.location_name.clone()));
        }

        let local = now.with_timezone(&self.timezone);
        let date = format!("{:02}-{} {}", local.day(), month_name(&local), local.year());
        let clock = local.format("%H:%M");

        let condition = translate_condition(
            &snapshot.condition.category,
            &snapshot.condition.description,
        );

        let temp = temperature(snapshot.temperature_c);
        let feels = temperature(snapshot.feels_like_c);
        let humidity = snapshot
            .humidity_pct
            .map_or_else(|| PLACEHOLDER.to_string(), |h| format!("{h}%"));
        let wind = snapshot
            .wind_speed_mps
            .map_or_else(|| PLACEHOLDER.to_string(), |w| format!("{w:.1} m/s"));

        let sunrise = self.clock_time(snapshot.sunrise);
        let sunset = self.clock_time(snapshot.sunset);

        Ok(format!(
            "{greeting}\n\n\
             🌤 {name} shahrining ayni vaqtdagi ob-havo ma'lumotlari ({date} -yil, soat {clock})\n\n\
             🔸 Havo holati: {condition}\n\
             🌡 Harorat: *{temp}* (Tuyulishi: {feels})\n\
             💧 Namlik: {humidity}\n\
             🌬 Shamol: {wind}\n\
             🌅 Quyosh chiqishi: {sunrise}\n\
             🌇 Quyosh botishi: {sunset}\n\n\
             📍 *{zone} vaqti bo‘yicha ma’lumot*",
            greeting = greeting(TimeBucket::of(&local)),
            name = bold(&snapshot.location_name),
            condition = bold(&condition),
            zone = zone_label(self.timezone),
        ))
    }

    fn clock_time(&self, ts: Option<DateTime<Utc>>) -> String {
        ts.map_or_else(
            || PLACEHOLDER.to_string(),
            |t| t.with_timezone(&self.timezone).format("%H:%M").to_string(),
        )
    }
}

fn temperature(value: Option<f64>) -> String {
    // `+ 0.0` turns -0 into 0 so "-0°C" never shows up
    value.map_or_else(
        || PLACEHOLDER.to_string(),
        |t| format!("{}°C", t.round() + 0.0),
    )
}

/// "Asia/Tashkent" -> "Tashkent"
fn zone_label(tz: Tz) -> String {
    let name = tz.name();
    name.rsplit('/').next().unwrap_or(name).replace('_', " ")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn is_markup(c: char) -> bool {
    matches!(c, '_' | '*' | '`' | '[')
}

/// Render `s` bold in legacy Telegram Markdown.
///
/// That dialect has no escapes inside an entity, so markup characters are
/// emitted escaped between bold runs: `a_b` becomes `*a*\_*b*`.
fn bold(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut run = String::new();

    for c in s.chars() {
        if is_markup(c) {
            if !run.is_empty() {
                out.push_str(&format!("*{run}*"));
                run.clear();
            }
            out.push('\\');
            out.push(c);
        } else {
            run.push(c);
        }
    }
    if !run.is_empty() {
        out.push_str(&format!("*{run}*"));
    }
    out
}
