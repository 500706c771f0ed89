//! Display units for the harvested quantities.
//!
//! A registry is built once at startup and the selected descriptors are
//! passed down explicitly. Values arrive in SI (kelvin, m/s).

use std::collections::BTreeMap;

use crate::error::HarvestError;
use crate::field::Vector;

/// Which way a vector's direction is reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Convention {
    /// Bearing the quantity points into.
    Into,
    /// Bearing the quantity comes from (meteorological wind direction).
    From,
}

#[derive(Clone, Copy)]
pub struct UnitDescriptor<T> {
    pub symbol: &'static str,
    pub convert: fn(T) -> T,
    pub scalarize: Option<fn(T) -> f64>,
    pub precision: usize,
    pub convention: Convention,
}

impl<T> std::fmt::Debug for UnitDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitDescriptor")
            .field("symbol", &self.symbol)
            .field("precision", &self.precision)
            .field("convention", &self.convention)
            .finish()
    }
}

/// A converted scalar, rounded for display.
#[derive(Clone, Debug, PartialEq)]
pub struct FormattedScalar {
    pub value: f64,
    pub formatted: String,
}

/// A converted vector: direction in whole degrees plus rounded magnitude.
#[derive(Clone, Debug, PartialEq)]
pub struct FormattedVector {
    pub direction: i32,
    pub magnitude: f64,
    pub formatted: String,
}

/// Fixed-point text, ties rounded away from zero.
fn to_fixed(value: f64, precision: usize) -> String {
    let factor = 10f64.powi(precision as i32);
    let scaled = value * factor;
    let rounded = if scaled.is_finite() {
        scaled.round() / factor
    } else {
        value
    };
    let formatted = format!("{:.*}", precision, rounded);
    // no negative zero
    if formatted.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
        formatted.trim_start_matches('-').to_string()
    } else {
        formatted
    }
}

impl UnitDescriptor<f64> {
    pub fn format(&self, value: f64) -> FormattedScalar {
        let converted = (self.convert)(value);
        let scalar = match self.scalarize {
            Some(scalarize) => scalarize(converted),
            None => converted,
        };
        let formatted = to_fixed(scalar, self.precision);
        FormattedScalar {
            value: formatted.parse().unwrap_or(scalar),
            formatted,
        }
    }
}

/// Compass bearing of `(u, v)` in whole degrees, within `[0, 360)`.
pub fn bearing(vector: Vector, convention: Convention) -> i32 {
    let (u, v) = match convention {
        Convention::Into => (vector.u, vector.v),
        Convention::From => (-vector.u, -vector.v),
    };
    let degrees = u.atan2(v).to_degrees().rem_euclid(360.0);
    (degrees.round() as i32) % 360
}

impl UnitDescriptor<Vector> {
    pub fn format(&self, vector: Vector) -> FormattedVector {
        let converted = (self.convert)(vector);
        let scalarize = self.scalarize.unwrap_or(Vector::length);
        let magnitude = to_fixed(scalarize(converted), self.precision);
        let direction = bearing(converted, self.convention);
        FormattedVector {
            direction,
            magnitude: magnitude.parse().unwrap_or_default(),
            formatted: format!("{}° @ {}", direction, magnitude),
        }
    }
}

/// Split a `"<direction>° @ <magnitude>"` reading back into integers.
pub fn parse_vector(formatted: &str) -> Result<(i32, i32), HarvestError> {
    let malformed = || HarvestError::MalformedWind(formatted.to_string());
    let (direction, magnitude) = formatted.split_once("° @ ").ok_or_else(malformed)?;
    let direction: i32 = direction.trim().parse().map_err(|_| malformed())?;
    let magnitude: f64 = magnitude.trim().parse().map_err(|_| malformed())?;
    if !magnitude.is_finite() {
        return Err(malformed());
    }
    Ok((direction, magnitude.round() as i32))
}

#[derive(Debug)]
pub struct UnitRegistry {
    temperature: BTreeMap<&'static str, UnitDescriptor<f64>>,
    wind: BTreeMap<&'static str, UnitDescriptor<Vector>>,
}

fn scalar(symbol: &'static str, convert: fn(f64) -> f64, precision: usize) -> UnitDescriptor<f64> {
    UnitDescriptor {
        symbol,
        convert,
        scalarize: None,
        precision,
        convention: Convention::Into,
    }
}

fn speed(
    symbol: &'static str,
    convert: fn(Vector) -> Vector,
    precision: usize,
) -> UnitDescriptor<Vector> {
    UnitDescriptor {
        symbol,
        convert,
        scalarize: Some(Vector::length),
        precision,
        convention: Convention::Into,
    }
}

impl UnitRegistry {
    pub fn standard() -> Self {
        let temperature = [
            scalar("°C", |k| k - 273.15, 1),
            scalar("°F", |k| k * 9.0 / 5.0 - 459.67, 1),
            scalar("K", |k| k, 1),
        ];
        let wind = [
            speed("km/h", |uv| uv.scale(3.6), 0),
            speed("m/s", |uv| uv, 1),
            speed("kn", |uv| uv.scale(1.943844), 0),
            speed("mph", |uv| uv.scale(2.236936), 0),
        ];

        Self {
            temperature: temperature.into_iter().map(|d| (d.symbol, d)).collect(),
            wind: wind.into_iter().map(|d| (d.symbol, d)).collect(),
        }
    }

    pub fn temperature(&self, unit: &str) -> Result<&UnitDescriptor<f64>, HarvestError> {
        self.temperature
            .get(unit)
            .ok_or_else(|| HarvestError::UnknownUnit {
                quantity: "temperature",
                unit: unit.to_string(),
            })
    }

    pub fn wind(&self, unit: &str) -> Result<&UnitDescriptor<Vector>, HarvestError> {
        self.wind.get(unit).ok_or_else(|| HarvestError::UnknownUnit {
            quantity: "wind",
            unit: unit.to_string(),
        })
    }

    /// Pick the display units used by a run, failing on unknown names.
    pub fn select(&self, temperature: &str, wind: &str) -> Result<DisplayUnits<'_>, HarvestError> {
        Ok(DisplayUnits {
            temperature: self.temperature(temperature)?,
            wind: self.wind(wind)?,
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DisplayUnits<'a> {
    pub temperature: &'a UnitDescriptor<f64>,
    pub wind: &'a UnitDescriptor<Vector>,
}
