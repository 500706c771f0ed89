use chrono::{DateTime, Utc};
use shared::{DataPoint, Location};

use crate::error::HarvestError;
use crate::source::Snapshot;
use crate::units::{parse_vector, DisplayUnits};

/// Display-ready readings of one snapshot at one location.
#[derive(Clone, Debug, PartialEq)]
pub struct FormattedSample {
    pub time: DateTime<Utc>,
    pub temperature: String,
    pub wind: String,
}

pub fn sample(
    snapshot: &Snapshot,
    location: &Location,
    units: &DisplayUnits<'_>,
) -> Result<FormattedSample, HarvestError> {
    let missing = |quantity| HarvestError::MissingValue {
        quantity,
        location: location.name.clone(),
        time: snapshot.time,
    };

    let temperature = snapshot
        .temperature
        .sample(location.lon, location.lat)
        .ok_or_else(|| missing("temperature"))?;
    let wind = snapshot
        .wind
        .sample(location.lon, location.lat)
        .ok_or_else(|| missing("wind"))?;

    Ok(FormattedSample {
        time: snapshot.time,
        temperature: units.temperature.format(temperature).formatted,
        wind: units.wind.format(wind).formatted,
    })
}

/// Parse a formatted sample back into the persisted record.
pub fn to_data_point(
    location: &Location,
    sample: &FormattedSample,
) -> Result<DataPoint, HarvestError> {
    let temp: f64 = sample
        .temperature
        .parse()
        .map_err(|_| HarvestError::MalformedTemperature(sample.temperature.clone()))?;
    let (wind_dir, wind_speed) = parse_vector(&sample.wind)?;

    Ok(DataPoint {
        datetime: sample.time,
        location: location.name.clone(),
        lat: location.lat,
        lon: location.lon,
        temp,
        wind_dir,
        wind_speed,
    })
}
