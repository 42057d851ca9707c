//! Sequencing of one ingestion run: fetch a reading, then store it.

use crate::{
    config::Settings,
    error::{FetchError, IngestError},
    model::{DocumentId, WeatherReading},
    provider::{OpenWeatherProvider, WeatherProvider},
    store::{MongoWriter, ReadingWriter},
};

/// A reading that was fetched and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub id: DocumentId,
    pub reading: WeatherReading,
}

pub type Outcome = Result<Ingested, IngestError>;

/// Fetch the current reading for `location` and hand it to `writer`.
///
/// The writer is only invoked once the fetch has succeeded.
pub async fn run<P, W>(provider: &P, writer: &W, location: &str) -> Outcome
where
    P: WeatherProvider + ?Sized,
    W: ReadingWriter + ?Sized,
{
    let reading = provider.fetch(location).await.inspect_err(|e| {
        tracing::error!(message = "failed to fetch reading", location = %location, error = %e);
    })?;
    tracing::info!(message = "fetched reading", location = %location, city = %reading.city);

    let id = writer.write(&reading).await.inspect_err(|e| {
        tracing::error!(message = "failed to store reading", city = %reading.city, error = %e);
    })?;
    tracing::info!(message = "stored reading", id = %id, city = %reading.city);

    Ok(Ingested { id, reading })
}

/// Run once against the OpenWeather API and the MongoDB store in `settings`.
///
/// The store connection is opened before fetching and closed on every path out.
pub async fn run_with_store(settings: &Settings) -> Outcome {
    let provider = provider_for(settings)?;
    let writer = MongoWriter::connect(&settings.store, settings.timeout).await?;

    let outcome = run(&provider, &writer, &settings.location).await;
    writer.close().await;

    outcome
}

/// Fetch a reading without storing it.
pub async fn fetch_only(settings: &Settings) -> Result<WeatherReading, FetchError> {
    let provider = provider_for(settings)?;
    provider.fetch(&settings.location).await
}

fn provider_for(settings: &Settings) -> Result<OpenWeatherProvider, FetchError> {
    OpenWeatherProvider::with_timeout(
        &settings.provider.api_url,
        settings.provider.api_key.clone(),
        settings.timeout,
    )
}
