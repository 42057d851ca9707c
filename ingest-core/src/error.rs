//! Error types for the fetch and store steps.
//!
//! Every error is terminal for a run: nothing here is retried or recovered.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The provider answered 200 but the body did not match the expected schema.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed provider response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("provider response is missing `{0}`")]
    MissingField(&'static str),

    #[error("provider response has invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("weather provider responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request to weather provider failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid document store connection string: {0}")]
    InvalidUri(#[source] BoxError),

    #[error("unable to reach document store at {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: BoxError,
    },

    #[error("document store rejected insert into `{collection}`: {source}")]
    Write {
        collection: String,
        #[source]
        source: BoxError,
    },
}

/// Failure of a whole ingestion run.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IngestError {
    /// HTTP status of a rejected provider request, if that is what failed.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Fetch(FetchError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_only_for_rejected_requests() {
        let err = IngestError::from(FetchError::Status { status: 404, body: "city not found".into() });
        assert_eq!(err.status_code(), Some(404));

        let err = IngestError::from(FetchError::Parse(ParseError::MissingField("main.temp")));
        assert_eq!(err.status_code(), None);

        let err = IngestError::from(StoreError::Write {
            collection: "weather_data".into(),
            source: "duplicate key".into(),
        });
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn messages_carry_details() {
        let err = FetchError::Status { status: 401, body: "invalid api key".into() };
        assert_eq!(err.to_string(), "weather provider responded with status 401: invalid api key");

        let err = FetchError::from(ParseError::MissingField("weather[0].description"));
        assert_eq!(err.to_string(), "provider response is missing `weather[0].description`");

        let err = StoreError::Connection { target: "db.local:27017".into(), source: "timed out".into() };
        assert!(err.to_string().contains("db.local:27017"));
        assert!(err.to_string().contains("timed out"));
    }
}
