use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use shared::Location;
use tokio_util::sync::CancellationToken;

use crate::batches::{snapshots, BatchPlan, Clock};
use crate::cursor::{self, Cursor};
use crate::error::HarvestError;
use crate::sampler;
use crate::source::{Snapshot, SnapshotSource};
use crate::store::DataPointStore;
use crate::units::DisplayUnits;

/// What a run did.
#[derive(Clone, Debug, PartialEq)]
pub struct HarvestReport {
    pub cursor: Cursor,
    pub first: DateTime<Utc>,
    pub last: Option<DateTime<Utc>>,
    pub snapshots: usize,
    pub written: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

pub struct Harvester<'a, S: ?Sized, D: ?Sized> {
    pub source: &'a S,
    pub store: &'a D,
    pub clock: &'a dyn Clock,
    pub locations: &'a [Location],
    pub units: DisplayUnits<'a>,
    pub plan: BatchPlan,
    pub default_start: DateTime<Utc>,
}

impl<'a, S, D> Harvester<'a, S, D>
where
    S: SnapshotSource + ?Sized,
    D: DataPointStore + ?Sized,
{
    /// Ingest from the persisted resume point up to the wall clock.
    pub async fn run(&self, cancel: CancellationToken) -> Result<HarvestReport, HarvestError> {
        let resume = cursor::resolve(self.store, self.locations, self.default_start).await?;
        let first = resume.cursor.first_timestamp(self.plan.step);
        log::info!("Harvesting from {}", first);

        let mut report = HarvestReport {
            cursor: resume.cursor,
            first,
            last: None,
            snapshots: 0,
            written: 0,
            skipped: 0,
            cancelled: false,
        };

        let mut stream = Box::pin(snapshots(
            self.source,
            self.clock,
            self.plan,
            first,
            cancel.clone(),
        ));

        while let Some(snapshot) = stream.try_next().await? {
            for location in self.locations {
                if resume.covers(&location.name, snapshot.time) {
                    report.skipped += 1;
                    continue;
                }
                self.ingest(&snapshot, location).await?;
                report.written += 1;
            }
            report.snapshots += 1;
            report.last = Some(snapshot.time);

            if cancel.is_cancelled() {
                break;
            }
        }

        report.cancelled = cancel.is_cancelled();
        if report.cancelled {
            log::warn!("Harvest cancelled after {:?}", report.last);
        }
        log::info!(
            "Harvested {} snapshots, {} points written, {} already present",
            report.snapshots,
            report.written,
            report.skipped
        );
        Ok(report)
    }

    async fn ingest(&self, snapshot: &Snapshot, location: &Location) -> Result<(), HarvestError> {
        let formatted = sampler::sample(snapshot, location, &self.units)?;
        log::debug!(
            "{} {} {} {}",
            location.name,
            snapshot.time.format("%Y-%m-%d %H:%M:%S"),
            formatted.temperature,
            formatted.wind
        );
        let point = sampler::to_data_point(location, &formatted)?;
        self.store
            .upsert(&point)
            .await
            .map_err(|source| HarvestError::Persist {
                time: point.datetime,
                location: point.location.clone(),
                source: Box::new(source),
            })
    }
}

/// Sample one snapshot for the whole roster without persisting anything.
pub async fn preview<S>(
    source: &S,
    locations: &[Location],
    units: &DisplayUnits<'_>,
    time: DateTime<Utc>,
) -> Result<Vec<sampler::FormattedSample>, HarvestError>
where
    S: SnapshotSource + ?Sized,
{
    let snapshot = source.fetch(time).await?;
    locations
        .iter()
        .map(|location| sampler::sample(&snapshot, location, units))
        .collect()
}
