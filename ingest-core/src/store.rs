use crate::{
    error::StoreError,
    model::{DocumentId, WeatherReading},
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod mongo;

pub use mongo::MongoWriter;

/// Append-only sink for readings.
#[async_trait]
pub trait ReadingWriter: Send + Sync + Debug {
    /// Persist `reading` as a new document and return the store's id for it.
    async fn write(&self, reading: &WeatherReading) -> Result<DocumentId, StoreError>;
}
