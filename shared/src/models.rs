use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named point of the harvest roster. The name is part of the persisted key.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Location {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(name: &str, lat: f64, lon: f64) -> Self {
        Self {
            name: name.to_string(),
            lat,
            lon,
        }
    }
}

/// One sampled reading, unique by `(datetime, location)`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    pub datetime: DateTime<Utc>,
    pub location: String,
    pub lat: f64,
    pub lon: f64,
    pub temp: f64,
    pub wind_dir: i32,
    pub wind_speed: i32,
}

impl DataPoint {
    pub fn key(&self) -> (DateTime<Utc>, &str) {
        (self.datetime, &self.location)
    }
}
