use anyhow::{anyhow, Result};
use grib::Grib2SubmessageDecoder;
use std::io::Cursor;

use crate::field::{RegularGrid, ScalarField, VectorField, VectorGrid};

/// Turns raw snapshot payloads into sampleable fields.
pub trait SnapshotDecoder: Send + Sync {
    /// Payload format this decoder reads, reported on decode failures.
    fn format(&self) -> &'static str;
    fn temperature(&self, payload: &[u8]) -> Result<Box<dyn ScalarField>>;
    fn wind(&self, payload: &[u8]) -> Result<Box<dyn VectorField>>;
}

// Discipline 0 (Meteorological)
// Category 0 (Temperature): parameter 0 = TMP
// Category 2 (Momentum): parameter 2 = UGRD, parameter 3 = VGRD
const DISCIPLINE_METEOROLOGICAL: u8 = 0;
const CATEGORY_TEMPERATURE: u8 = 0;
const PARAM_TEMPERATURE: u8 = 0;
const CATEGORY_MOMENTUM: u8 = 2;
const PARAM_U_WIND: u8 = 2;
const PARAM_V_WIND: u8 = 3;

// GFS 0.5 degree global grid, scanning north to south from 0E
const WIDTH: usize = 720;
const HEIGHT: usize = 360;
const HEIGHT_WITH_POLES: usize = 361;
const RESOLUTION: f64 = 0.5;

/// Decodes GRIB2 payloads laid out on the GFS 0.5° global grid.
///
/// This reads GRIB2 only, not the packed `.epak` files of the public archive.
/// `HARVEST_BASE_URL` has to point at a mirror serving GRIB2 payloads under
/// the same paths; any other payload fails with a decode error.
#[derive(Debug, Default)]
pub struct GribDecoder;

impl GribDecoder {
    /// Values of the first submessages matching each `(category, parameter)`.
    fn extract(payload: &[u8], wanted: &[(u8, u8)]) -> Result<Vec<Vec<f32>>> {
        let grib2 = grib::from_reader(Cursor::new(payload))?;
        let mut found: Vec<Option<Vec<f32>>> = vec![None; wanted.len()];

        for (_index, submessage) in grib2.iter() {
            if submessage.indicator().discipline != DISCIPLINE_METEOROLOGICAL {
                continue;
            }
            let prod_def = submessage.prod_def();
            let (Some(category), Some(parameter)) =
                (prod_def.parameter_category(), prod_def.parameter_number())
            else {
                continue;
            };
            let Some(slot) = wanted
                .iter()
                .position(|&w| w == (category, parameter))
                .filter(|&i| found[i].is_none())
            else {
                continue;
            };

            let decoder = Grib2SubmessageDecoder::from(submessage)?;
            found[slot] = Some(decoder.dispatch()?.collect());

            if found.iter().all(Option::is_some) {
                break;
            }
        }

        found
            .into_iter()
            .zip(wanted)
            .map(|(values, (category, parameter))| {
                values.ok_or_else(|| {
                    anyhow!(
                        "parameter {}/{} not found in GRIB payload",
                        category,
                        parameter
                    )
                })
            })
            .collect()
    }
}

/// Wrap decoded values in the global grid, accepting 360 or 361 rows.
fn global_grid(values: Vec<f32>) -> Result<RegularGrid> {
    let height = match values.len() {
        n if n == WIDTH * HEIGHT_WITH_POLES => HEIGHT_WITH_POLES,
        n if n == WIDTH * HEIGHT => HEIGHT,
        n => {
            return Err(anyhow!(
                "Unexpected grid size: {}, expected {} or {}",
                n,
                WIDTH * HEIGHT,
                WIDTH * HEIGHT_WITH_POLES
            ))
        }
    };
    RegularGrid::new(0.0, 90.0, RESOLUTION, -RESOLUTION, WIDTH, height, values)
}

impl SnapshotDecoder for GribDecoder {
    fn format(&self) -> &'static str {
        "GRIB2"
    }

    fn temperature(&self, payload: &[u8]) -> Result<Box<dyn ScalarField>> {
        let mut values = Self::extract(payload, &[(CATEGORY_TEMPERATURE, PARAM_TEMPERATURE)])?;
        let grid = global_grid(values.remove(0))?;
        Ok(Box::new(grid))
    }

    fn wind(&self, payload: &[u8]) -> Result<Box<dyn VectorField>> {
        let mut values = Self::extract(
            payload,
            &[
                (CATEGORY_MOMENTUM, PARAM_U_WIND),
                (CATEGORY_MOMENTUM, PARAM_V_WIND),
            ],
        )?;
        let v = global_grid(values.remove(1))?;
        let u = global_grid(values.remove(0))?;
        Ok(Box::new(VectorGrid::new(u, v)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_grid_accepts_both_heights() {
        let grid = global_grid(vec![0.0; WIDTH * HEIGHT]).unwrap();
        assert_eq!(grid.height, HEIGHT);
        assert!(grid.wrap_longitude);

        let grid = global_grid(vec![0.0; WIDTH * HEIGHT_WITH_POLES]).unwrap();
        assert_eq!(grid.height, HEIGHT_WITH_POLES);
    }

    #[test]
    fn test_global_grid_rejects_other_sizes() {
        assert!(global_grid(vec![0.0; 1000]).is_err());
    }

    #[test]
    fn test_global_grid_orientation() {
        // row r holds latitude 90 - r/2, column c holds longitude c/2
        let values = (0..WIDTH * HEIGHT_WITH_POLES)
            .map(|i| (90.0 - (i / WIDTH) as f32 * 0.5) * 1000.0 + (i % WIDTH) as f32 * 0.5)
            .collect();
        let grid = global_grid(values).unwrap();
        assert_eq!(grid.sample(100.5, 13.5), Some(13_500.0 + 100.5));
        assert_eq!(grid.sample(-0.5, 0.0), Some(359.5));
    }

    #[test]
    fn test_garbage_payload_fails() {
        let decoder = GribDecoder;
        assert!(decoder.temperature(b"not a grib file").is_err());
        assert!(decoder.wind(b"").is_err());
    }
}
