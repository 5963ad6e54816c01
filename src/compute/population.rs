//! Population lookups for Voronoi cells.

use std::fs;
use std::path::Path;

use geo::{Area, BoundingRect, Contains, MultiPolygon, Point};
use serde::{Deserialize, Serialize};

use crate::schema::{Region, ScenarioError};

/// Population lookup failures. The evaluator counts a failed cell as empty.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum OracleError {
    #[error("Polygon does not overlap the population raster")]
    NoOverlap,
    #[error("Polygon is empty")]
    EmptyGeometry,
    #[error("Raster has {actual} values, expected {expected}")]
    InvalidRaster { expected: usize, actual: usize },
    #[error("Population source unavailable: {0}")]
    Unavailable(String),
}

/// Answers "how many people live inside this polygon".
pub trait PopulationOracle: Send + Sync {
    fn population_in_polygon(&self, polygon: &MultiPolygon<f64>) -> Result<f64, OracleError>;
}

impl<F> PopulationOracle for F
where
    F: Fn(&MultiPolygon<f64>) -> Result<f64, OracleError> + Send + Sync,
{
    fn population_in_polygon(&self, polygon: &MultiPolygon<f64>) -> Result<f64, OracleError> {
        self(polygon)
    }
}

/// Population spread evenly: planar area times a constant density.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UniformDensity {
    /// People per squared coordinate unit.
    pub per_unit_area: f64,
}

impl UniformDensity {
    /// Spread `total` people evenly over `region`.
    pub fn with_total(region: &Region, total: f64) -> Self {
        Self {
            per_unit_area: total / region.area(),
        }
    }

    /// Stand-in when no population data exists: on average twice the service
    /// level (at least 1) for each of `sites` cells.
    pub fn for_service_level(region: &Region, service_level: f64, sites: usize) -> Self {
        let total = 2.0 * service_level.max(1.0) * sites.max(1) as f64;
        Self::with_total(region, total)
    }
}

impl PopulationOracle for UniformDensity {
    fn population_in_polygon(&self, polygon: &MultiPolygon<f64>) -> Result<f64, OracleError> {
        Ok(polygon.unsigned_area() * self.per_unit_area)
    }
}

fn default_nodata() -> i32 {
    -200
}

/// North-up population raster with a GDAL-style geotransform.
///
/// Pixel `(x, y)` is anchored at `(origin_x + x * pixel_width,
/// origin_y + y * pixel_height)`; `pixel_height` is negative for north-up
/// rasters. Values are stored row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationRaster {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub width: usize,
    pub height: usize,
    pub values: Vec<i32>,
    /// Pixels holding this value are skipped.
    #[serde(default = "default_nodata")]
    pub nodata: i32,
}

impl PopulationRaster {
    /// Load a raster from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Raster extent as `(min_x, max_x, min_y, max_y)`.
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let x0 = self.origin_x;
        let x1 = self.origin_x + self.width as f64 * self.pixel_width;
        let y0 = self.origin_y;
        let y1 = self.origin_y + self.height as f64 * self.pixel_height;
        (x0.min(x1), x0.max(x1), y0.min(y1), y0.max(y1))
    }

    fn pixel_column(&self, x: f64) -> i64 {
        ((x - self.origin_x) / self.pixel_width) as i64
    }

    fn pixel_row(&self, y: f64) -> i64 {
        ((y - self.origin_y) / self.pixel_height) as i64
    }
}

impl PopulationOracle for PopulationRaster {
    fn population_in_polygon(&self, polygon: &MultiPolygon<f64>) -> Result<f64, OracleError> {
        let expected = self.width * self.height;
        if self.values.len() != expected || expected == 0 {
            return Err(OracleError::InvalidRaster {
                expected,
                actual: self.values.len(),
            });
        }

        let bounds = polygon.bounding_rect().ok_or(OracleError::EmptyGeometry)?;
        let (min, max) = (bounds.min(), bounds.max());

        let (raster_min_x, raster_max_x, raster_min_y, raster_max_y) = self.extent();
        if min.x > raster_max_x || max.x < raster_min_x || min.y > raster_max_y || max.y < raster_min_y
        {
            return Err(OracleError::NoOverlap);
        }

        let last_col = self.width as i64 - 1;
        let last_row = self.height as i64 - 1;
        let (c0, c1) = (self.pixel_column(min.x), self.pixel_column(max.x));
        let (r0, r1) = (self.pixel_row(max.y), self.pixel_row(min.y));
        let x_start = c0.min(c1).max(0);
        let x_end = c0.max(c1).min(last_col);
        let y_start = r0.min(r1).max(0);
        let y_end = r0.max(r1).min(last_row);

        let mut population = 0.0;
        for y in y_start..=y_end {
            let row = y as usize * self.width;
            let lat = self.origin_y + y as f64 * self.pixel_height;
            for x in x_start..=x_end {
                let value = self.values[row + x as usize];
                if value == self.nodata {
                    continue;
                }
                let lon = self.origin_x + x as f64 * self.pixel_width;
                if polygon.contains(&Point::new(lon, lat)) {
                    population += value as f64;
                }
            }
        }

        Ok(population)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};

    fn square(min: (f64, f64), max: (f64, f64)) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![min, (max.0, min.1), max, (min.0, max.1)]),
            vec![],
        )])
    }

    /// 4x4 raster over [0, 4] x [0, 4], origin at the top-left corner.
    fn raster(values: Vec<i32>) -> PopulationRaster {
        PopulationRaster {
            origin_x: 0.0,
            origin_y: 4.0,
            pixel_width: 1.0,
            pixel_height: -1.0,
            width: 4,
            height: 4,
            values,
            nodata: -200,
        }
    }

    #[test]
    fn test_uniform_density() {
        let oracle = UniformDensity {
            per_unit_area: 1000.0,
        };
        let pop = oracle
            .population_in_polygon(&square((0.0, 0.0), (0.5, 1.0)))
            .unwrap();
        assert!((pop - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_density_with_total() {
        let region = Region::rectangle((-0.40, 39.45), (-0.35, 39.49)).unwrap();
        let oracle = UniformDensity::with_total(&region, 6000.0);

        let whole = MultiPolygon::new(vec![region.polygon().clone()]);
        let pop = oracle.population_in_polygon(&whole).unwrap();
        assert!((pop - 6000.0).abs() < 1e-6);
    }

    #[test]
    fn test_service_level_density_leaves_excess_to_minimize() {
        let region = Region::rectangle((0.0, 0.0), (1.0, 1.0)).unwrap();
        let oracle = UniformDensity::for_service_level(&region, 1000.0, 2);

        let half = square((0.0, 0.0), (0.5, 1.0));
        let pop = oracle.population_in_polygon(&half).unwrap();
        assert!((pop - 2000.0).abs() < 1e-6);
        assert!(pop > 1000.0);

        let floor = UniformDensity::for_service_level(&region, 0.0, 0);
        assert!((floor.per_unit_area - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_raster_sums_contained_pixels() {
        let oracle = raster(vec![10; 16]);
        // Anchors strictly inside (0.5..3.5)^2: x in {1, 2, 3}, y in {1, 2, 3}.
        let pop = oracle
            .population_in_polygon(&square((0.5, 0.5), (3.5, 3.5)))
            .unwrap();
        assert_eq!(pop, 90.0);
    }

    #[test]
    fn test_raster_skips_nodata() {
        let mut values = vec![10; 16];
        // Row 1, column 1 -> anchor (1, 3).
        values[5] = -200;
        let oracle = raster(values);
        let pop = oracle
            .population_in_polygon(&square((0.5, 0.5), (3.5, 3.5)))
            .unwrap();
        assert_eq!(pop, 80.0);
    }

    #[test]
    fn test_raster_no_overlap() {
        let oracle = raster(vec![1; 16]);
        assert_eq!(
            oracle.population_in_polygon(&square((10.0, 10.0), (11.0, 11.0))),
            Err(OracleError::NoOverlap)
        );
    }

    #[test]
    fn test_raster_empty_geometry() {
        let oracle = raster(vec![1; 16]);
        assert_eq!(
            oracle.population_in_polygon(&MultiPolygon::new(vec![])),
            Err(OracleError::EmptyGeometry)
        );
    }

    #[test]
    fn test_raster_shape_mismatch() {
        let oracle = raster(vec![1; 3]);
        assert!(matches!(
            oracle.population_in_polygon(&square((0.5, 0.5), (1.5, 1.5))),
            Err(OracleError::InvalidRaster { expected: 16, actual: 3 })
        ));
    }

    #[test]
    fn test_closure_oracle() {
        let oracle = |_: &MultiPolygon<f64>| -> Result<f64, OracleError> {
            Err(OracleError::Unavailable("offline".into()))
        };
        assert!(oracle
            .population_in_polygon(&square((0.0, 0.0), (1.0, 1.0)))
            .is_err());
    }
}
