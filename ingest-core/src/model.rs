use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format of the persisted `timestamp` field.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One normalized weather observation, captured at fetch time.
///
/// The serialized form is the persisted record shape: `condition` is written
/// as `weather` and `observed_at` as `timestamp` (`YYYY-MM-DD HH:MM:SS`, UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Canonical location name reported by the provider.
    pub city: String,
    /// Degrees Celsius.
    pub temperature: f64,
    #[serde(rename = "weather")]
    pub condition: String,
    /// Relative humidity, 0-100.
    pub humidity: u8,
    /// Hectopascals.
    pub pressure: f64,
    /// Meters per second.
    pub wind_speed: f64,
    /// When the reading was fetched, not when the provider measured it.
    #[serde(rename = "timestamp", with = "timestamp")]
    pub observed_at: DateTime<Utc>,
}

impl WeatherReading {
    /// Current wall-clock time at the precision the record keeps.
    pub fn recorded_now() -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }

    /// `observed_at` rendered the way it is persisted.
    pub fn timestamp(&self) -> String {
        self.observed_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl fmt::Display for WeatherReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.1}°C, {}, humidity {}%, pressure {} hPa, wind {:.1} m/s (at {} UTC)",
            self.city,
            self.temperature,
            self.condition,
            self.humidity,
            self.pressure,
            self.wind_speed,
            self.timestamp(),
        )
    }
}

/// Identifier the document store assigned to an inserted reading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
    }
}
