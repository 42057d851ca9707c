use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::{Password, Text};
use tracing::Level;
use weather_ingest_core::{
    Config, Overrides, WeatherReading,
    config::{DEFAULT_COLLECTION, DEFAULT_DB_NAME, DEFAULT_DB_URI},
    ingest,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-ingest", version, about = "Fetch current weather and store it in a document database")]
pub struct Cli {
    /// Read and write configuration at this path instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[arg(long, global = true, default_value_t = Level::INFO)]
    pub log_level: Level,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively store defaults (location, API key, database) in the config file.
    Configure,

    /// Fetch the current weather and print it without storing anything.
    Fetch {
        #[command(flatten)]
        provider: ProviderArgs,

        /// Print the reading as a JSON record.
        #[arg(long)]
        json: bool,
    },

    /// Fetch the current weather and append it to the document store.
    Ingest {
        #[command(flatten)]
        provider: ProviderArgs,

        #[command(flatten)]
        store: StoreArgs,

        /// Print the stored record as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
pub struct ProviderArgs {
    /// Location to query, e.g. "Toronto" or "London,GB". Defaults to the configured location.
    pub location: Option<String>,

    /// Location to query, as a flag instead of a positional argument.
    #[arg(long = "location", value_name = "LOCATION", conflicts_with = "location")]
    pub location_flag: Option<String>,

    /// OpenWeather API key.
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// OpenWeather "current weather" endpoint.
    #[arg(long)]
    pub api_url: Option<String>,

    /// Timeout for each network call, in seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// Document store connection string.
    #[arg(long, env = "WEATHER_INGEST_DB_URI", hide_env_values = true)]
    pub db_uri: Option<String>,

    /// Target database.
    #[arg(long)]
    pub db_name: Option<String>,

    /// Target collection.
    #[arg(long)]
    pub collection: Option<String>,
}

impl ProviderArgs {
    fn overrides(self) -> Overrides {
        Overrides {
            location: self.location.or(self.location_flag),
            api_key: self.api_key,
            api_url: self.api_url,
            timeout_secs: self.timeout_secs,
            ..Overrides::default()
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        match self.command {
            Command::Configure => configure(config, self.config),
            Command::Fetch { provider, json } => {
                let settings = config.resolve(provider.overrides())?;
                let reading = ingest::fetch_only(&settings)
                    .await
                    .with_context(|| format!("Failed to fetch weather for '{}'", settings.location))?;

                print_reading(&reading, json)
            }
            Command::Ingest { provider, store, json } => {
                let overrides = Overrides {
                    db_uri: store.db_uri,
                    db_name: store.db_name,
                    collection: store.collection,
                    ..provider.overrides()
                };
                let settings = config.resolve(overrides)?;

                let ingested = ingest::run_with_store(&settings).await.map_err(|e| {
                    let context = match e.status_code() {
                        Some(status) => format!(
                            "Failed to ingest weather for '{}' (provider status {status})",
                            settings.location
                        ),
                        None => format!("Failed to ingest weather for '{}'", settings.location),
                    };
                    anyhow::Error::new(e).context(context)
                })?;

                if json {
                    let mut record = serde_json::to_value(&ingested.reading)?;
                    record["_id"] = serde_json::Value::String(ingested.id.to_string());
                    println!("{}", serde_json::to_string_pretty(&record)?);
                } else {
                    println!("Stored document {}", ingested.id);
                    println!("{}", ingested.reading);
                }
                Ok(())
            }
        }
    }
}

fn print_reading(reading: &WeatherReading, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reading)?);
    } else {
        println!("{reading}");
    }
    Ok(())
}

fn configure(mut config: Config, path: Option<PathBuf>) -> anyhow::Result<()> {
    let location = Text::new("Default location:")
        .with_initial_value(config.location.as_deref().unwrap_or_default())
        .with_help_message("Leave empty to always pass a location on the command line")
        .prompt()?;
    config.location = non_empty(location);

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_help_message("Leave empty to keep the current key")
        .prompt()?;
    if let Some(key) = non_empty(api_key) {
        config.provider.api_key = Some(key);
    }

    let uri = Text::new("Database connection string:")
        .with_default(config.store.uri.as_deref().unwrap_or(DEFAULT_DB_URI))
        .prompt()?;
    config.store.uri = non_empty(uri);

    let database = Text::new("Database name:")
        .with_default(config.store.database.as_deref().unwrap_or(DEFAULT_DB_NAME))
        .prompt()?;
    config.store.database = non_empty(database);

    let collection = Text::new("Collection name:")
        .with_default(config.store.collection.as_deref().unwrap_or(DEFAULT_COLLECTION))
        .prompt()?;
    config.store.collection = non_empty(collection);

    let saved_to = match path {
        Some(path) => {
            config.save_to(&path)?;
            path
        }
        None => config.save()?,
    };

    println!("Configuration saved to {}", saved_to.display());
    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
