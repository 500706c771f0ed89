use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::DataPoint;
use std::collections::HashMap;

use crate::db;
use crate::error::HarvestError;
use crate::repos;

/// Where data points live. The store is the only record of ingestion progress.
#[async_trait]
pub trait DataPointStore: Send + Sync {
    /// Latest persisted datetime of every location that has rows.
    async fn latest_by_location(&self) -> Result<HashMap<String, DateTime<Utc>>, HarvestError>;

    /// Create or overwrite the row keyed by `(datetime, location)`.
    async fn upsert(&self, point: &DataPoint) -> Result<(), HarvestError>;
}

pub struct PgStore {
    pool: db::Pool,
}

impl PgStore {
    pub fn new(pool: db::Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DataPointStore for PgStore {
    async fn latest_by_location(&self) -> Result<HashMap<String, DateTime<Utc>>, HarvestError> {
        let client = self.pool.get().await?;
        let latest = repos::data_points::latest_by_location(&client).await?;
        Ok(latest
            .into_iter()
            .map(|row| (row.location, row.datetime))
            .collect())
    }

    async fn upsert(&self, point: &DataPoint) -> Result<(), HarvestError> {
        let client = self.pool.get().await?;
        match repos::data_points::upsert(&client, point).await? {
            0 => Err(HarvestError::Rejected(format!(
                "{} at {}",
                point.location, point.datetime
            ))),
            _ => Ok(()),
        }
    }
}
