use async_trait::async_trait;
use mongodb::{
    Client, Collection,
    bson::{Bson, doc},
    error::{Error as MongoError, ErrorKind},
    options::ClientOptions,
};
use std::time::Duration;

use crate::{
    config::StoreSettings,
    error::StoreError,
    model::{DocumentId, WeatherReading},
};

use super::ReadingWriter;

const APP_NAME: &str = "weather-ingest";

/// Writes readings into one MongoDB collection.
///
/// The client is created by [`MongoWriter::connect`] and released by
/// [`MongoWriter::close`]; the writer never reads documents back.
#[derive(Debug)]
pub struct MongoWriter {
    client: Client,
    collection: Collection<WeatherReading>,
    target: String,
}

impl MongoWriter {
    /// Open a client for `settings` and verify the server answers a ping.
    pub async fn connect(settings: &StoreSettings, timeout: Duration) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(settings.uri.as_str())
            .await
            .map_err(|e| StoreError::InvalidUri(Box::new(e)))?;

        // Hosts only: the URI itself may carry credentials.
        let target = options
            .hosts
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>()
            .join(",");

        options.app_name = Some(APP_NAME.to_string());
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let client = Client::with_options(options).map_err(|e| StoreError::InvalidUri(Box::new(e)))?;
        let database = client.database(&settings.database);

        tracing::debug!(message = "pinging document store", target = %target, database = %settings.database);
        if let Err(e) = database.run_command(doc! { "ping": 1 }).await {
            client.shutdown().await;
            return Err(StoreError::Connection {
                target,
                source: Box::new(e),
            });
        }

        tracing::info!(
            message = "connected to document store",
            target = %target,
            database = %settings.database,
            collection = %settings.collection,
        );

        Ok(Self {
            collection: database.collection(&settings.collection),
            client,
            target,
        })
    }

    /// Shut the client down, closing its pooled connections.
    pub async fn close(self) {
        tracing::debug!(message = "closing document store connection", target = %self.target);
        self.client.shutdown().await;
    }
}

#[async_trait]
impl ReadingWriter for MongoWriter {
    async fn write(&self, reading: &WeatherReading) -> Result<DocumentId, StoreError> {
        let result = self
            .collection
            .insert_one(reading)
            .await
            .map_err(|e| classify(e, &self.target, self.collection.name()))?;

        let id = document_id(result.inserted_id);
        tracing::debug!(message = "inserted reading", id = %id, collection = %self.collection.name());
        Ok(id)
    }
}

fn classify(err: MongoError, target: &str, collection: &str) -> StoreError {
    if is_unreachable(&err) {
        StoreError::Connection {
            target: target.to_string(),
            source: Box::new(err),
        }
    } else {
        StoreError::Write {
            collection: collection.to_string(),
            source: Box::new(err),
        }
    }
}

fn is_unreachable(err: &MongoError) -> bool {
    matches!(*err.kind, ErrorKind::ServerSelection { .. } | ErrorKind::Io(_))
}

fn document_id(inserted: Bson) -> DocumentId {
    match inserted {
        Bson::ObjectId(oid) => DocumentId::new(oid.to_hex()),
        Bson::String(s) => DocumentId::new(s),
        other => DocumentId::new(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn object_id_becomes_hex() {
        let oid = ObjectId::new();
        let id = document_id(Bson::ObjectId(oid));

        assert_eq!(id.as_str(), oid.to_hex());
        assert_eq!(id.as_str().len(), 24);
    }

    #[test]
    fn other_ids_are_kept_readable() {
        assert_eq!(document_id(Bson::String("abc".into())).as_str(), "abc");
        assert_eq!(document_id(Bson::Int32(7)).as_str(), "7");
    }

    #[test]
    fn reading_converts_to_record_document() {
        let reading = WeatherReading {
            city: "Toronto".into(),
            temperature: 5.2,
            condition: "clear sky".into(),
            humidity: 80,
            pressure: 1012.0,
            wind_speed: 3.1,
            observed_at: WeatherReading::recorded_now(),
        };

        let document = mongodb::bson::to_document(&reading).unwrap();

        assert_eq!(document.get_str("city").unwrap(), "Toronto");
        assert_eq!(document.get_str("weather").unwrap(), "clear sky");
        assert_eq!(document.get_str("timestamp").unwrap(), reading.timestamp());
        assert!(document.get("observed_at").is_none());
    }

    #[test]
    fn io_failure_during_insert_is_a_connection_error() {
        let err = MongoError::from(std::io::Error::other("connection reset"));

        match classify(err, "db.local:27017", "weather_data") {
            StoreError::Connection { target, .. } => assert_eq!(target, "db.local:27017"),
            other => panic!("expected connection error, got {other:?}"),
        }
    }

    #[test]
    fn rejected_insert_is_a_write_error() {
        let serialization = mongodb::bson::to_document(&5_i32).unwrap_err();
        let err = MongoError::from(serialization);

        match classify(err, "db.local:27017", "weather_data") {
            StoreError::Write { collection, .. } => assert_eq!(collection, "weather_data"),
            other => panic!("expected write error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_uri_is_rejected_before_connecting() {
        let settings = StoreSettings {
            uri: "postgres://localhost/weather".into(),
            database: "weather_db".into(),
            collection: "weather_data".into(),
        };

        let err = MongoWriter::connect(&settings, Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidUri(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        // Port 9 (discard) on loopback is not a MongoDB server.
        let settings = StoreSettings {
            uri: "mongodb://127.0.0.1:9/?directConnection=true".into(),
            database: "weather_db".into(),
            collection: "weather_data".into(),
        };

        let err = MongoWriter::connect(&settings, Duration::from_millis(200)).await.unwrap_err();
        match err {
            StoreError::Connection { target, .. } => assert_eq!(target, "127.0.0.1:9"),
            other => panic!("expected connection error, got {other:?}"),
        }
    }
}
