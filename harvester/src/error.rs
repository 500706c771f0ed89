use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("could not decode snapshot {time} from {url} as {format}: {source}")]
    Decode {
        time: DateTime<Utc>,
        url: String,
        format: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("no {quantity} value at {location} for {time}")]
    MissingValue {
        quantity: &'static str,
        location: String,
        time: DateTime<Utc>,
    },

    #[error("malformed temperature reading {0:?}")]
    MalformedTemperature(String),

    #[error("malformed wind reading {0:?}")]
    MalformedWind(String),

    #[error("unknown {quantity} unit {unit:?}")]
    UnknownUnit {
        quantity: &'static str,
        unit: String,
    },

    #[error("could not persist {location} at {time}: {source}")]
    Persist {
        time: DateTime<Utc>,
        location: String,
        #[source]
        source: Box<HarvestError>,
    },

    #[error("store rejected the write: {0}")]
    Rejected(String),

    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] bb8::RunError<tokio_postgres::Error>),
}
