//! Fakes shared by the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::batches::Clock;
use crate::error::HarvestError;
use crate::field::{ScalarField, Vector, VectorField};
use crate::source::{Snapshot, SnapshotSource};

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Same value everywhere on the globe.
pub struct Uniform<T>(pub T);

impl ScalarField for Uniform<f64> {
    fn sample(&self, _lon: f64, _lat: f64) -> Option<f64> {
        Some(self.0)
    }
}

impl VectorField for Uniform<Vector> {
    fn sample(&self, _lon: f64, _lat: f64) -> Option<Vector> {
        Some(self.0)
    }
}

/// No data anywhere.
pub struct Empty;

impl ScalarField for Empty {
    fn sample(&self, _lon: f64, _lat: f64) -> Option<f64> {
        None
    }
}

/// Serves uniform snapshots: 300 K and a (3, 4) m/s wind.
#[derive(Default)]
pub struct ConstantSource {
    fetched: AtomicUsize,
    failing_at: Option<DateTime<Utc>>,
    latency: Option<fn(DateTime<Utc>) -> Duration>,
}

impl ConstantSource {
    pub fn failing_at(mut self, time: DateTime<Utc>) -> Self {
        self.failing_at = Some(time);
        self
    }

    pub fn with_latency(mut self, latency: fn(DateTime<Utc>) -> Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn fetched(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotSource for ConstantSource {
    async fn fetch(&self, time: DateTime<Utc>) -> Result<Snapshot, HarvestError> {
        self.fetched.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency(time)).await;
        }
        if self.failing_at == Some(time) {
            return Err(HarvestError::Status {
                url: format!("http://upstream/{}", time.format("%Y/%m/%d/%H%M")),
                status: reqwest::StatusCode::NOT_FOUND,
            });
        }
        Ok(Snapshot {
            time,
            temperature: Box::new(Uniform(300.0)),
            wind: Box::new(Uniform(Vector::new(3.0, 4.0))),
        })
    }
}
