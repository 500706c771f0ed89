//! Gridded fields and the bilinear sampling primitive.
//!
//! The pipeline only ever sees the `ScalarField` / `VectorField` capabilities;
//! `RegularGrid` and `VectorGrid` are what the bundled decoder produces.

use std::fmt;

/// A 2-D vector quantity, `u` eastward and `v` northward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vector {
    pub u: f64,
    pub v: f64,
}

impl Vector {
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }

    pub fn length(self) -> f64 {
        self.u.hypot(self.v)
    }

    pub fn scale(self, k: f64) -> Self {
        Self {
            u: self.u * k,
            v: self.v * k,
        }
    }
}

pub trait ScalarField: Send + Sync {
    /// Value at the given point, `None` when outside the grid or missing.
    fn sample(&self, lon: f64, lat: f64) -> Option<f64>;
}

pub trait VectorField: Send + Sync {
    fn sample(&self, lon: f64, lat: f64) -> Option<Vector>;
}

/// A regular lat/lon grid stored row-major, first row at `lat0`.
///
/// `dlat` is negative for grids scanning north to south (GFS layout).
#[derive(Clone)]
pub struct RegularGrid {
    pub lon0: f64,
    pub lat0: f64,
    pub dlon: f64,
    pub dlat: f64,
    pub width: usize,
    pub height: usize,
    pub wrap_longitude: bool,
    values: Vec<f32>,
}

impl fmt::Debug for RegularGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegularGrid")
            .field("lon0", &self.lon0)
            .field("lat0", &self.lat0)
            .field("dlon", &self.dlon)
            .field("dlat", &self.dlat)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl RegularGrid {
    pub fn new(
        lon0: f64,
        lat0: f64,
        dlon: f64,
        dlat: f64,
        width: usize,
        height: usize,
        values: Vec<f32>,
    ) -> anyhow::Result<Self> {
        if width == 0 || height == 0 || values.len() != width * height {
            anyhow::bail!(
                "grid of {}x{} cannot hold {} values",
                width,
                height,
                values.len()
            );
        }
        if dlon == 0.0 || dlat == 0.0 {
            anyhow::bail!("grid spacing must be non-zero");
        }
        let wrap_longitude = ((width as f64) * dlon.abs() - 360.0).abs() < 1e-6;
        Ok(Self {
            lon0,
            lat0,
            dlon,
            dlat,
            width,
            height,
            wrap_longitude,
            values,
        })
    }

    /// Fractional column/row of a point, `None` when outside the grid.
    fn grid_position(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let x = if self.wrap_longitude {
            (lon - self.lon0).rem_euclid(360.0) / self.dlon
        } else {
            (lon - self.lon0) / self.dlon
        };
        let y = (lat - self.lat0) / self.dlat;

        let max_x = if self.wrap_longitude {
            self.width as f64
        } else {
            (self.width - 1) as f64
        };
        if !(0.0..=max_x).contains(&x) || !(0.0..=(self.height - 1) as f64).contains(&y) {
            return None;
        }
        Some((x, y))
    }

    fn value(&self, column: usize, row: usize) -> f32 {
        self.values[row * self.width + column]
    }

    pub fn bilinear(&self, lon: f64, lat: f64) -> Option<f64> {
        let (x, y) = self.grid_position(lon, lat)?;

        let x1 = (x.floor() as usize).min(self.width - 1);
        let y1 = (y.floor() as usize).min(self.height - 1);
        let x2 = if self.wrap_longitude {
            (x1 + 1) % self.width
        } else {
            (x1 + 1).min(self.width - 1)
        };
        let y2 = (y1 + 1).min(self.height - 1);

        let dx = x - x1 as f64;
        let dy = y - y1 as f64;

        let v11 = self.value(x1, y1) as f64;
        let v21 = self.value(x2, y1) as f64;
        let v12 = self.value(x1, y2) as f64;
        let v22 = self.value(x2, y2) as f64;

        let top = v11 * (1.0 - dx) + v21 * dx;
        let bottom = v12 * (1.0 - dx) + v22 * dx;
        let value = top * (1.0 - dy) + bottom * dy;

        value.is_finite().then_some(value)
    }
}

impl ScalarField for RegularGrid {
    fn sample(&self, lon: f64, lat: f64) -> Option<f64> {
        self.bilinear(lon, lat)
    }
}

/// U and V components sharing one grid geometry.
#[derive(Clone, Debug)]
pub struct VectorGrid {
    u: RegularGrid,
    v: RegularGrid,
}

impl VectorGrid {
    pub fn new(u: RegularGrid, v: RegularGrid) -> anyhow::Result<Self> {
        if u.width != v.width || u.height != v.height {
            anyhow::bail!(
                "U grid is {}x{} but V grid is {}x{}",
                u.width,
                u.height,
                v.width,
                v.height
            );
        }
        Ok(Self { u, v })
    }
}

impl VectorField for VectorGrid {
    fn sample(&self, lon: f64, lat: f64) -> Option<Vector> {
        Some(Vector::new(
            self.u.bilinear(lon, lat)?,
            self.v.bilinear(lon, lat)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x2 grid from (0E, 10N) to (1E, 9N).
    fn square(values: [f32; 4]) -> RegularGrid {
        RegularGrid::new(0.0, 10.0, 1.0, -1.0, 2, 2, values.to_vec()).unwrap()
    }

    #[test]
    fn test_vector_length_and_scale() {
        let v = Vector::new(3.0, 4.0);
        assert_eq!(v.length(), 5.0);
        assert_eq!(v.scale(2.0), Vector::new(6.0, 8.0));
    }

    #[test]
    fn test_bilinear_corners() {
        let grid = square([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(grid.sample(0.0, 10.0), Some(1.0));
        assert_eq!(grid.sample(1.0, 10.0), Some(2.0));
        assert_eq!(grid.sample(0.0, 9.0), Some(3.0));
        assert_eq!(grid.sample(1.0, 9.0), Some(4.0));
    }

    #[test]
    fn test_bilinear_center() {
        let grid = square([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(grid.sample(0.5, 9.5), Some(2.5));
    }

    #[test]
    fn test_bilinear_edge_midpoint() {
        let grid = square([0.0, 10.0, 0.0, 10.0]);
        assert_eq!(grid.sample(0.25, 10.0), Some(2.5));
    }

    #[test]
    fn test_outside_grid_is_none() {
        let grid = square([1.0, 2.0, 3.0, 4.0]);
        assert_eq!(grid.sample(2.0, 9.5), None);
        assert_eq!(grid.sample(0.5, 11.0), None);
        assert_eq!(grid.sample(0.5, 8.5), None);
    }

    #[test]
    fn test_missing_values_are_none() {
        let grid = square([f32::NAN, 2.0, 3.0, 4.0]);
        assert_eq!(grid.sample(0.5, 9.5), None);
        assert_eq!(grid.sample(1.0, 9.0), Some(4.0));
    }

    #[test]
    fn test_global_grid_wraps_longitude() {
        // 4 columns of 90 degrees: 0, 90, 180, 270
        let values = vec![0.0, 90.0, 180.0, 270.0, 0.0, 90.0, 180.0, 270.0];
        let grid = RegularGrid::new(0.0, 90.0, 90.0, -180.0, 4, 2, values).unwrap();
        assert!(grid.wrap_longitude);
        // halfway between 270 and 360 == 0
        assert_eq!(grid.sample(315.0, 0.0), Some(135.0));
        // negative longitudes map onto the same grid
        assert_eq!(grid.sample(-90.0, 0.0), Some(270.0));
    }

    #[test]
    fn test_grid_rejects_bad_shape() {
        assert!(RegularGrid::new(0.0, 0.0, 1.0, 1.0, 2, 2, vec![1.0; 3]).is_err());
        assert!(RegularGrid::new(0.0, 0.0, 0.0, 1.0, 2, 2, vec![1.0; 4]).is_err());
    }

    #[test]
    fn test_vector_grid_samples_both_components() {
        let wind = VectorGrid::new(square([1.0; 4]), square([-2.0; 4])).unwrap();
        assert_eq!(wind.sample(0.5, 9.5), Some(Vector::new(1.0, -2.0)));
    }
}
