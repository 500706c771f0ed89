//! Resume position, recomputed from the store on every run.

use chrono::{DateTime, TimeDelta, Utc};
use shared::Location;
use std::collections::HashMap;

use crate::error::HarvestError;
use crate::store::DataPointStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cursor {
    /// Nothing usable persisted: ingest from this instant, inclusive.
    Start(DateTime<Utc>),
    /// Every roster location is covered up to this instant, inclusive.
    After(DateTime<Utc>),
}

impl Cursor {
    pub fn instant(&self) -> DateTime<Utc> {
        match *self {
            Cursor::Start(t) | Cursor::After(t) => t,
        }
    }

    /// First snapshot time still to ingest.
    pub fn first_timestamp(&self, step: TimeDelta) -> DateTime<Utc> {
        match *self {
            Cursor::Start(t) => t,
            Cursor::After(t) => t + step,
        }
    }
}

/// The run-wide cursor plus each location's own progress.
#[derive(Clone, Debug)]
pub struct ResumePoints {
    pub cursor: Cursor,
    latest: HashMap<String, DateTime<Utc>>,
}

impl ResumePoints {
    /// Compute the cursor from per-location maxima.
    ///
    /// The cursor is the minimum of the roster's maxima. A roster location
    /// without rows, or an empty store, falls back to `default_start`.
    /// Locations outside the roster are ignored.
    pub fn from_latest(
        mut latest: HashMap<String, DateTime<Utc>>,
        locations: &[Location],
        default_start: DateTime<Utc>,
    ) -> Self {
        latest.retain(|name, _| locations.iter().any(|l| &l.name == name));

        let mut cursor = None;
        for location in locations {
            match latest.get(&location.name) {
                None => {
                    cursor = Some(Cursor::Start(default_start));
                    break;
                }
                Some(&t) => {
                    if cursor.map_or(true, |c: Cursor| t < c.instant()) {
                        cursor = Some(Cursor::After(t));
                    }
                }
            }
        }

        Self {
            cursor: cursor.unwrap_or(Cursor::Start(default_start)),
            latest,
        }
    }

    /// Latest persisted datetime of a location, if any.
    pub fn latest(&self, location: &str) -> Option<DateTime<Utc>> {
        self.latest.get(location).copied()
    }

    /// Whether `(time, location)` is already persisted per the resolved state.
    pub fn covers(&self, location: &str, time: DateTime<Utc>) -> bool {
        self.latest(location).map_or(false, |latest| time <= latest)
    }
}

pub async fn resolve<D>(
    store: &D,
    locations: &[Location],
    default_start: DateTime<Utc>,
) -> Result<ResumePoints, HarvestError>
where
    D: DataPointStore + ?Sized,
{
    let latest = store.latest_by_location().await?;
    let resume = ResumePoints::from_latest(latest, locations, default_start);
    log::info!("Resolved cursor {:?}", resume.cursor);
    Ok(resume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 3, 3, hour, 0, 0).unwrap()
    }

    fn roster() -> Vec<Location> {
        vec![
            Location::new("BKK", 13.729984, 100.536443),
            Location::new("Surat", 9.126057, 99.325355),
        ]
    }

    fn latest(entries: &[(&str, u32)]) -> HashMap<String, DateTime<Utc>> {
        entries
            .iter()
            .map(|(name, hour)| (name.to_string(), at(*hour)))
            .collect()
    }

    #[test]
    fn test_empty_store_uses_default_start() {
        let resume = ResumePoints::from_latest(HashMap::new(), &roster(), at(1));
        assert_eq!(resume.cursor, Cursor::Start(at(1)));
        assert_eq!(resume.cursor.first_timestamp(TimeDelta::hours(3)), at(1));
    }

    #[test]
    fn test_minimum_of_maxima() {
        let resume =
            ResumePoints::from_latest(latest(&[("BKK", 7), ("Surat", 4)]), &roster(), at(1));
        assert_eq!(resume.cursor, Cursor::After(at(4)));
        assert_eq!(resume.cursor.first_timestamp(TimeDelta::hours(3)), at(7));
    }

    #[test]
    fn test_location_without_history_forces_default_start() {
        let resume = ResumePoints::from_latest(latest(&[("BKK", 10)]), &roster(), at(1));
        assert_eq!(resume.cursor, Cursor::Start(at(1)));
        // the other location keeps its own progress
        assert!(resume.covers("BKK", at(10)));
        assert!(!resume.covers("Surat", at(1)));
    }

    #[test]
    fn test_unknown_locations_are_ignored() {
        let resume = ResumePoints::from_latest(
            latest(&[("BKK", 7), ("Surat", 7), ("Retired", 1)]),
            &roster(),
            at(1),
        );
        assert_eq!(resume.cursor, Cursor::After(at(7)));
        assert_eq!(resume.latest("Retired"), None);
    }

    #[test]
    fn test_covers_is_inclusive() {
        let resume =
            ResumePoints::from_latest(latest(&[("BKK", 7), ("Surat", 4)]), &roster(), at(1));
        assert!(resume.covers("BKK", at(7)));
        assert!(!resume.covers("BKK", at(10)));
        assert!(resume.covers("Surat", at(4)));
        assert!(!resume.covers("Surat", at(7)));
    }

    #[test]
    fn test_cursor_never_later_than_min_of_maxima() {
        for (a, b) in [(1, 22), (13, 13), (22, 4)] {
            let resume =
                ResumePoints::from_latest(latest(&[("BKK", a), ("Surat", b)]), &roster(), at(0));
            assert_eq!(resume.cursor.instant(), at(a.min(b)));
        }
    }
}
