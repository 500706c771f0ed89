//! Remote snapshot source.
//!
//! Each snapshot is two payloads published under a date/time path: surface
//! temperature and 850 hPa wind. Both are downloaded concurrently and handed
//! to the decoder.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

use crate::decoder::SnapshotDecoder;
use crate::error::HarvestError;
use crate::field::{ScalarField, VectorField};
use crate::retry::{status_error, with_retry, RetryConfig, RetryError};

/// One decoded dataset instant. Dropped once every location is sampled.
pub struct Snapshot {
    pub time: DateTime<Utc>,
    pub temperature: Box<dyn ScalarField>,
    pub wind: Box<dyn VectorField>,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot").field("time", &self.time).finish()
    }
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, time: DateTime<Utc>) -> Result<Snapshot, HarvestError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotUrls {
    pub temperature: String,
    pub wind: String,
}

/// Build both payload URLs for a snapshot time.
///
/// The path is formatted after shifting `time` by `offset_hours`:
/// `{base}/data/gfs/{yyyy/MM/dd}/{HHmm}-temp-surface-level-gfs-0.5.epak`
pub fn snapshot_urls(base_url: &str, time: DateTime<Utc>, offset_hours: i64) -> SnapshotUrls {
    let shifted = time + TimeDelta::hours(offset_hours);
    let date = shifted.format("%Y/%m/%d");
    let hhmm = shifted.format("%H%M");
    let base = base_url.trim_end_matches('/');
    SnapshotUrls {
        temperature: format!(
            "{}/data/gfs/{}/{}-temp-surface-level-gfs-0.5.epak",
            base, date, hhmm
        ),
        wind: format!(
            "{}/data/gfs/{}/{}-wind-isobaric-850hPa-gfs-0.5.epak",
            base, date, hhmm
        ),
    }
}

/// Downloads one payload.
#[async_trait]
pub trait PayloadFetcher: Send + Sync {
    async fn get(&self, url: &str) -> Result<Bytes, HarvestError>;
}

/// HTTP downloads, each retried on its own.
pub struct HttpFetcher {
    client: reqwest::Client,
    retry: RetryConfig,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, retry: RetryConfig) -> Result<Self, HarvestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| HarvestError::Fetch {
                url: String::new(),
                source,
            })?;
        Ok(Self { client, retry })
    }
}

#[async_trait]
impl PayloadFetcher for HttpFetcher {
    async fn get(&self, url: &str) -> Result<Bytes, HarvestError> {
        with_retry(
            move || async move {
                let response = self.client.get(url).send().await?;
                match response.status() {
                    reqwest::StatusCode::OK => Ok(response.bytes().await?),
                    status => Err(status_error(url, status)),
                }
            },
            &self.retry,
        )
        .await
        .map_err(RetryError::into_inner)
    }
}

/// Snapshots served from an archive laid out by date and time.
pub struct HttpSource {
    base_url: String,
    offset_hours: i64,
    fetcher: Box<dyn PayloadFetcher>,
    decoder: Box<dyn SnapshotDecoder>,
}

impl HttpSource {
    pub fn new(
        base_url: &str,
        offset_hours: i64,
        timeout: Duration,
        retry: RetryConfig,
        decoder: Box<dyn SnapshotDecoder>,
    ) -> Result<Self, HarvestError> {
        let fetcher = HttpFetcher::new(timeout, retry)?;
        Ok(Self::with_fetcher(
            base_url,
            offset_hours,
            Box::new(fetcher),
            decoder,
        ))
    }

    pub fn with_fetcher(
        base_url: &str,
        offset_hours: i64,
        fetcher: Box<dyn PayloadFetcher>,
        decoder: Box<dyn SnapshotDecoder>,
    ) -> Self {
        Self {
            base_url: base_url.to_string(),
            offset_hours,
            fetcher,
            decoder,
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSource {
    async fn fetch(&self, time: DateTime<Utc>) -> Result<Snapshot, HarvestError> {
        let urls = snapshot_urls(&self.base_url, time, self.offset_hours);
        log::debug!("Fetching snapshot {} from {}", time, urls.temperature);

        let (temperature, wind) = tokio::try_join!(
            self.fetcher.get(&urls.temperature),
            self.fetcher.get(&urls.wind)
        )?;

        let format = self.decoder.format();
        let temperature =
            self.decoder
                .temperature(&temperature)
                .map_err(|source| HarvestError::Decode {
                    time,
                    url: urls.temperature.clone(),
                    format,
                    source,
                })?;
        let wind = self
            .decoder
            .wind(&wind)
            .map_err(|source| HarvestError::Decode {
                time,
                url: urls.wind.clone(),
                format,
                source,
            })?;

        Ok(Snapshot {
            time,
            temperature,
            wind,
        })
    }
}
