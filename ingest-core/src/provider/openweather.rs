use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::{fmt, time::Duration};

use crate::{
    error::{FetchError, ParseError},
    model::WeatherReading,
};

use super::{WeatherProvider, truncate_body};

pub const DEFAULT_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Fetches readings from the OpenWeather "current weather" endpoint.
#[derive(Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    api_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    /// Build a provider whose requests give up after `timeout`.
    pub fn with_timeout(api_url: &str, api_key: String, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, api_url, api_key))
    }

    pub fn with_client(http: Client, api_url: &str, api_key: String) -> Self {
        Self {
            api_key,
            api_url: api_url.to_string(),
            http,
        }
    }
}

impl fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(&self, location: &str) -> Result<WeatherReading, FetchError> {
        tracing::debug!(message = "requesting current weather", url = %self.api_url, location = %location);

        let res = self
            .http
            .get(&self.api_url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = res.status();
        if status != StatusCode::OK {
            // The status is the failure; an unreadable body only loses the excerpt.
            let body = res.text().await.unwrap_or_default();
            tracing::debug!(message = "provider rejected request", status = %status);
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let body = res.text().await?;

        let reading = parse_current(&body, WeatherReading::recorded_now())?;
        tracing::debug!(message = "parsed current weather", city = %reading.city);
        Ok(reading)
    }
}

/// Validate a 200 response body and normalize it into a reading.
pub fn parse_current(body: &str, observed_at: DateTime<Utc>) -> Result<WeatherReading, ParseError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)?;
    parsed.into_reading(observed_at)
}

// Every field is optional so that a missing one is reported by name rather
// than as a generic deserialization failure.

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    humidity: Option<i64>,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    main: Option<OwMain>,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: Option<OwWind>,
}

impl OwCurrentResponse {
    fn into_reading(self, observed_at: DateTime<Utc>) -> Result<WeatherReading, ParseError> {
        let city = self.name.ok_or(ParseError::MissingField("name"))?;
        if city.trim().is_empty() {
            return Err(ParseError::InvalidField {
                field: "name",
                reason: "empty location name".to_string(),
            });
        }

        let main = self.main.ok_or(ParseError::MissingField("main"))?;
        let temperature = main.temp.ok_or(ParseError::MissingField("main.temp"))?;
        let humidity = main.humidity.ok_or(ParseError::MissingField("main.humidity"))?;
        let pressure = main.pressure.ok_or(ParseError::MissingField("main.pressure"))?;

        let humidity = u8::try_from(humidity)
            .ok()
            .filter(|h| *h <= 100)
            .ok_or_else(|| ParseError::InvalidField {
                field: "main.humidity",
                reason: format!("{humidity} is outside 0-100"),
            })?;

        let condition = self
            .weather
            .into_iter()
            .next()
            .and_then(|w| w.description)
            .ok_or(ParseError::MissingField("weather[0].description"))?;

        let wind_speed = self
            .wind
            .and_then(|w| w.speed)
            .ok_or(ParseError::MissingField("wind.speed"))?;

        Ok(WeatherReading {
            city,
            temperature,
            condition,
            humidity,
            pressure,
            wind_speed,
            observed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TORONTO: &str = r#"{"name":"Toronto","main":{"temp":5.2,"humidity":80,"pressure":1012},"weather":[{"description":"clear sky"}],"wind":{"speed":3.1}}"#;

    fn parse(value: serde_json::Value) -> Result<WeatherReading, ParseError> {
        parse_current(&value.to_string(), WeatherReading::recorded_now())
    }

    fn toronto() -> serde_json::Value {
        serde_json::from_str(TORONTO).unwrap()
    }

    #[test]
    fn parses_minimal_body() {
        let at = WeatherReading::recorded_now();
        let reading = parse_current(TORONTO, at).unwrap();

        assert_eq!(reading.city, "Toronto");
        assert_eq!(reading.temperature, 5.2);
        assert_eq!(reading.condition, "clear sky");
        assert_eq!(reading.humidity, 80);
        assert_eq!(reading.pressure, 1012.0);
        assert_eq!(reading.wind_speed, 3.1);
        assert_eq!(reading.observed_at, at);
    }

    #[test]
    fn ignores_extra_provider_fields() {
        let mut body = toronto();
        body["dt"] = json!(1_700_000_000);
        body["sys"] = json!({"country": "CA"});
        body["weather"] = json!([{"id": 800, "main": "Clear", "description": "clear sky"}, {"description": "mist"}]);

        let reading = parse(body).unwrap();
        assert_eq!(reading.condition, "clear sky");
    }

    #[test]
    fn reports_missing_fields_by_path() {
        let cases: [(&str, fn(&mut serde_json::Value)); 7] = [
            ("name", |b| {
                b.as_object_mut().unwrap().remove("name");
            }),
            ("main", |b| {
                b.as_object_mut().unwrap().remove("main");
            }),
            ("main.temp", |b| {
                b["main"].as_object_mut().unwrap().remove("temp");
            }),
            ("main.humidity", |b| {
                b["main"].as_object_mut().unwrap().remove("humidity");
            }),
            ("main.pressure", |b| {
                b["main"].as_object_mut().unwrap().remove("pressure");
            }),
            ("weather[0].description", |b| b["weather"] = json!([])),
            ("wind.speed", |b| b["wind"] = json!({})),
        ];

        for (field, strip) in cases {
            let mut body = toronto();
            strip(&mut body);

            match parse(body) {
                Err(ParseError::MissingField(missing)) => assert_eq!(missing, field),
                other => panic!("expected missing `{field}`, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_humidity_out_of_range() {
        for bad in [-1, 101, 300] {
            let mut body = toronto();
            body["main"]["humidity"] = json!(bad);

            assert!(matches!(
                parse(body),
                Err(ParseError::InvalidField { field: "main.humidity", .. })
            ));
        }
    }

    #[test]
    fn rejects_empty_city() {
        let mut body = toronto();
        body["name"] = json!("  ");

        assert!(matches!(parse(body), Err(ParseError::InvalidField { field: "name", .. })));
    }

    #[test]
    fn rejects_wrong_types_and_non_json() {
        let mut body = toronto();
        body["main"]["temp"] = json!("warm");
        assert!(matches!(parse(body), Err(ParseError::Malformed(_))));

        let err = parse_current("<html>502</html>", WeatherReading::recorded_now()).unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
    }

    #[test]
    fn debug_hides_api_key() {
        let provider = OpenWeatherProvider::with_client(Client::new(), DEFAULT_API_URL, "SECRET".to_string());
        let shown = format!("{provider:?}");

        assert!(!shown.contains("SECRET"));
        assert!(shown.contains(DEFAULT_API_URL));
    }
}
