//! Core library for the `weather-ingest` CLI.
//!
//! This crate defines:
//! - The `WeatherReading` record and its persisted shape
//! - A weather provider abstraction with an OpenWeather implementation
//! - A document store writer backed by MongoDB
//! - The driver that fetches one reading and stores it
//! - Configuration & credentials handling
//!
//! It is used by `weather-ingest-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod provider;
pub mod store;

pub use config::{Config, Overrides, Settings};
pub use error::{FetchError, IngestError, ParseError, StoreError};
pub use ingest::{Ingested, Outcome};
pub use model::{DocumentId, WeatherReading};
pub use provider::{OpenWeatherProvider, WeatherProvider};
pub use store::{MongoWriter, ReadingWriter};
