//! Ordered, batched snapshot stream.
//!
//! Snapshots are fetched `batch_size` at a time, concurrently, and yielded one
//! by one in timestamp order. The stream ends once the next batch would reach
//! past the wall clock, or when the cancellation token fires.

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::try_join_all;
use futures::stream::{self, Stream, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::HarvestError;
use crate::source::{Snapshot, SnapshotSource};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BatchPlan {
    pub step: TimeDelta,
    pub batch_size: usize,
}

impl BatchPlan {
    /// Time covered by one batch, `None` when it does not fit a `TimeDelta`.
    pub fn span(&self) -> Option<TimeDelta> {
        let size = i32::try_from(self.batch_size).ok()?;
        self.step.checked_mul(size)
    }

    /// Snapshot times of the batch starting at `cursor`.
    pub fn timestamps(&self, cursor: DateTime<Utc>) -> Option<Vec<DateTime<Utc>>> {
        let mut times = Vec::with_capacity(self.batch_size);
        let mut time = cursor;
        for _ in 0..self.batch_size {
            times.push(time);
            time = time.checked_add_signed(self.step)?;
        }
        Some(times)
    }
}

struct State<'a, S: ?Sized> {
    source: &'a S,
    clock: &'a dyn Clock,
    plan: BatchPlan,
    cursor: DateTime<Utc>,
    cancel: CancellationToken,
}

async fn next_batch<S>(
    state: State<'_, S>,
) -> Result<Option<(Vec<Snapshot>, State<'_, S>)>, HarvestError>
where
    S: SnapshotSource + ?Sized,
{
    if state.cancel.is_cancelled() {
        return Ok(None);
    }

    let Some(next_cursor) = state
        .plan
        .span()
        .and_then(|span| state.cursor.checked_add_signed(span))
    else {
        log::warn!(
            "Batch starting {} ends outside the representable time range, stopping",
            state.cursor
        );
        return Ok(None);
    };
    if next_cursor > state.clock.now() {
        log::info!(
            "Batch starting {} would end past now, stopping",
            state.cursor
        );
        return Ok(None);
    }

    log::info!(
        "Fetching {} snapshots from {}",
        state.plan.batch_size,
        state.cursor
    );
    let Some(times) = state.plan.timestamps(state.cursor) else {
        return Ok(None);
    };
    let fetches = times.into_iter().map(|time| state.source.fetch(time));

    let batch = tokio::select! {
        _ = state.cancel.cancelled() => {
            log::warn!("Cancelled while fetching batch at {}", state.cursor);
            return Ok(None);
        }
        batch = try_join_all(fetches) => batch?,
    };

    Ok(Some((
        batch,
        State {
            cursor: next_cursor,
            ..state
        },
    )))
}

/// Stream snapshots from `first` onward, one batch in flight at a time.
pub fn snapshots<'a, S>(
    source: &'a S,
    clock: &'a dyn Clock,
    plan: BatchPlan,
    first: DateTime<Utc>,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<Snapshot, HarvestError>> + Send + 'a
where
    S: SnapshotSource + ?Sized,
{
    let state = State {
        source,
        clock,
        plan,
        cursor: first,
        cancel,
    };

    stream::try_unfold(state, next_batch)
        .map_ok(|batch| stream::iter(batch.into_iter().map(Ok::<_, HarvestError>)))
        .try_flatten()
}
