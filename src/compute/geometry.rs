//! Geometric utilities: great-circle distance, grid cells and Voronoi division.
//!
//! Voronoi cells are built in the plane of the (longitude, latitude)
//! coordinates. Each cell is the intersection of the half-planes bounded by the
//! perpendicular bisectors between its site and every other site, seeded with
//! an enlarged bounding rectangle of the region so that outer cells are closed.
//! Convex regions clip cells with the same half-plane step; other regions go
//! through the boolean-ops backend.

use std::panic::{self, AssertUnwindSafe};

use geo::{Area, BooleanOps, BoundingRect, Coord, LineString, MultiPolygon, Polygon};

use crate::schema::{CandidateSite, Region};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Geometry failures for a single Voronoi cell.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum GeometryError {
    #[error("Region has no bounding rectangle")]
    EmptyRegion,
    #[error("Cell intersection with region failed: {0}")]
    Intersection(String),
}

/// Anything with a (longitude, latitude) position.
pub trait Located {
    fn lon_lat(&self) -> (f64, f64);
}

impl Located for (f64, f64) {
    fn lon_lat(&self) -> (f64, f64) {
        *self
    }
}

impl Located for CandidateSite {
    fn lon_lat(&self) -> (f64, f64) {
        self.coordinate
    }
}

impl<T: Located> Located for &T {
    fn lon_lat(&self) -> (f64, f64) {
        (*self).lon_lat()
    }
}

/// Haversine distance in meters between two (longitude, latitude) points.
pub fn haversine(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lon1, lat1) = (a.0.to_radians(), a.1.to_radians());
    let (lon2, lat2) = (b.0.to_radians(), b.1.to_radians());

    let dlon = lon2 - lon1;
    let dlat = lat2 - lat1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Grid cell `(lat_index, lon_index)` whose edges measure roughly
/// `cell_size_m` at the point's latitude.
///
/// Indices truncate toward zero.
pub fn grid_index(coordinate: (f64, f64), cell_size_m: f64) -> (i64, i64) {
    let (lon, lat) = coordinate;

    let lat_cell = (cell_size_m / EARTH_RADIUS_M).to_degrees();
    let lon_cell = (cell_size_m / (EARTH_RADIUS_M * lat.to_radians().cos())).to_degrees();

    ((lat / lat_cell) as i64, (lon / lon_cell) as i64)
}

/// Voronoi division of `region` around `points`.
///
/// Duplicate points are merged (first occurrence wins). Fewer than two
/// distinct points, zero included, give a single cell equal to the region.
/// Otherwise cells keep the order of the first occurrence of their site; empty
/// intersections are dropped. A cell whose intersection fails is dropped as
/// well and logged.
pub fn voronoi_division(points: &[(f64, f64)], region: &Region) -> Vec<MultiPolygon<f64>> {
    let sites = distinct_points(points);
    if sites.len() < 2 {
        return vec![MultiPolygon::new(vec![region.polygon().clone()])];
    }

    let cells = match voronoi_cells(&sites, region) {
        Ok(cells) => cells,
        Err(e) => {
            log::warn!("Voronoi construction failed: {}", e);
            return Vec::new();
        }
    };

    cells
        .into_iter()
        .filter_map(|cell| match clip_to_region(&cell, region) {
            Ok(clipped) if !is_empty(&clipped) => Some(clipped),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Dropping Voronoi cell: {}", e);
                None
            }
        })
        .collect()
}

/// Unclipped convex Voronoi cells, one per site, bounded by the region's
/// enlarged bounding rectangle.
pub fn voronoi_cells(
    sites: &[(f64, f64)],
    region: &Region,
) -> Result<Vec<Polygon<f64>>, GeometryError> {
    let rect = region
        .polygon()
        .bounding_rect()
        .ok_or(GeometryError::EmptyRegion)?;

    let margin = (rect.width() + rect.height()).max(1e-9);
    let (min, max) = (rect.min(), rect.max());
    let frame = vec![
        (min.x - margin, min.y - margin),
        (max.x + margin, min.y - margin),
        (max.x + margin, max.y + margin),
        (min.x - margin, max.y + margin),
    ];

    let cells = sites
        .iter()
        .enumerate()
        .map(|(i, &site)| {
            let ring = sites
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .fold(frame.clone(), |ring, (_, &other)| {
                    clip_to_bisector(&ring, site, other)
                });
            Polygon::new(LineString::from(ring), vec![])
        })
        .collect();

    Ok(cells)
}

/// Intersect a cell with the region.
pub fn clip_to_region(
    cell: &Polygon<f64>,
    region: &Region,
) -> Result<MultiPolygon<f64>, GeometryError> {
    if cell.exterior().0.len() < 4 {
        return Ok(MultiPolygon::new(vec![]));
    }

    if region.is_convex() {
        return Ok(clip_to_convex(cell, region));
    }

    // The boolean-ops backend can panic on pathological input.
    panic::catch_unwind(AssertUnwindSafe(|| cell.intersection(region.polygon()))).map_err(
        |payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            GeometryError::Intersection(message)
        },
    )
}

/// Sutherland-Hodgman against every edge of a convex region.
fn clip_to_convex(cell: &Polygon<f64>, region: &Region) -> MultiPolygon<f64> {
    let mut ring: Vec<(f64, f64)> = cell.exterior().coords().map(|c| (c.x, c.y)).collect();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    let mut boundary = region.vertices().to_vec();
    if region.polygon().signed_area() < 0.0 {
        boundary.reverse();
    }

    for (k, &p) in boundary.iter().enumerate() {
        let q = boundary[(k + 1) % boundary.len()];
        // Interior lies left of p -> q.
        let a = (q.1 - p.1, p.0 - q.0);
        ring = clip_half_plane(&ring, a, a.0 * p.0 + a.1 * p.1);
    }

    if ring.len() < 3 {
        return MultiPolygon::new(vec![]);
    }
    let exterior: Vec<Coord<f64>> = ring.into_iter().map(Coord::from).collect();
    MultiPolygon::new(vec![Polygon::new(LineString::new(exterior), vec![])])
}

fn is_empty(polygons: &MultiPolygon<f64>) -> bool {
    polygons.0.is_empty() || polygons.unsigned_area() <= 0.0
}

fn distinct_points(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut distinct: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for p in points {
        if !distinct.contains(p) {
            distinct.push(*p);
        }
    }
    distinct
}

/// Keep the part of a convex ring that is at least as close to `site` as to
/// `other`.
fn clip_to_bisector(ring: &[(f64, f64)], site: (f64, f64), other: (f64, f64)) -> Vec<(f64, f64)> {
    let a = (other.0 - site.0, other.1 - site.1);
    let c = (other.0 * other.0 + other.1 * other.1 - site.0 * site.0 - site.1 * site.1) / 2.0;
    clip_half_plane(ring, a, c)
}

/// Sutherland-Hodgman step: keep the part of a convex ring with `a·p <= c`.
fn clip_half_plane(ring: &[(f64, f64)], a: (f64, f64), c: f64) -> Vec<(f64, f64)> {
    if ring.is_empty() {
        return Vec::new();
    }

    let side = |p: (f64, f64)| a.0 * p.0 + a.1 * p.1 - c;

    let mut out = Vec::with_capacity(ring.len() + 1);
    for (k, &current) in ring.iter().enumerate() {
        let previous = ring[(k + ring.len() - 1) % ring.len()];
        let (s_prev, s_cur) = (side(previous), side(current));

        if s_cur <= 0.0 {
            if s_prev > 0.0 {
                out.push(crossing(previous, current, s_prev, s_cur));
            }
            out.push(current);
        } else if s_prev <= 0.0 {
            out.push(crossing(previous, current, s_prev, s_cur));
        }
    }
    out
}

fn crossing(p: (f64, f64), q: (f64, f64), sp: f64, sq: f64) -> (f64, f64) {
    let t = sp / (sp - sq);
    (p.0 + t * (q.0 - p.0), p.1 + t * (q.1 - p.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Region {
        Region::rectangle((0.0, 0.0), (1.0, 1.0)).unwrap()
    }

    /// Boolean-ops output is snapped, so areas are compared loosely.
    const AREA_EPS: f64 = 1e-6;

    fn total_area(cells: &[MultiPolygon<f64>]) -> f64 {
        cells.iter().map(|c| c.unsigned_area()).sum()
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude.
        let d = haversine((0.0, 0.0), (0.0, 1.0));
        assert!((d - 111_194.93).abs() < 1.0);
    }

    #[test]
    fn test_haversine_symmetric_and_zero() {
        let a = (-0.3763, 39.4699);
        let b = (-0.3701, 39.4752);
        assert_eq!(haversine(a, a), 0.0);
        assert!((haversine(a, b) - haversine(b, a)).abs() < 1e-9);
    }

    #[test]
    fn test_grid_index_scales_with_latitude() {
        // ~50 m cells: one lat cell is ~0.00045 degrees.
        assert_eq!(grid_index((0.0, 0.0), 50.0), (0, 0));
        assert_eq!(grid_index((0.0, 0.001), 50.0), (2, 0));

        // Longitude cells widen by 1/cos(lat).
        let equator = grid_index((0.01, 0.0), 50.0).1;
        let north = grid_index((0.01, 60.0), 50.0).1;
        assert!(north < equator);
    }

    #[test]
    fn test_two_sites_split_square() {
        let cells = voronoi_division(&[(0.25, 0.5), (0.75, 0.5)], &unit_square());
        assert_eq!(cells.len(), 2);
        assert!((cells[0].unsigned_area() - 0.5).abs() < AREA_EPS);
        assert!((cells[1].unsigned_area() - 0.5).abs() < AREA_EPS);
    }

    #[test]
    fn test_cells_cover_convex_region() {
        let points = [(0.1, 0.2), (0.8, 0.1), (0.5, 0.5), (0.3, 0.9), (0.9, 0.8)];
        let cells = voronoi_division(&points, &unit_square());
        assert_eq!(cells.len(), points.len());
        assert!((total_area(&cells) - 1.0).abs() < AREA_EPS);
    }

    #[test]
    fn test_cells_cover_non_convex_region() {
        let region =
            Region::new(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (1.0, 1.0), (0.0, 2.0)])
                .unwrap();
        let cells = voronoi_division(&[(0.5, 0.5), (1.5, 0.5)], &region);
        assert!((total_area(&cells) - region.area()).abs() < AREA_EPS);
    }

    #[test]
    fn test_collinear_sites() {
        let cells = voronoi_division(&[(0.2, 0.5), (0.5, 0.5), (0.8, 0.5)], &unit_square());
        assert_eq!(cells.len(), 3);
        assert!((cells[1].unsigned_area() - 0.3).abs() < AREA_EPS);
        assert!((total_area(&cells) - 1.0).abs() < AREA_EPS);
    }

    #[test]
    fn test_single_and_duplicate_sites_give_whole_region() {
        let region = unit_square();

        let single = voronoi_division(&[(0.3, 0.3)], &region);
        assert_eq!(single.len(), 1);
        assert!((single[0].unsigned_area() - 1.0).abs() < AREA_EPS);

        let duplicated = voronoi_division(&[(0.3, 0.3), (0.3, 0.3)], &region);
        assert_eq!(duplicated.len(), 1);
        assert!((duplicated[0].unsigned_area() - 1.0).abs() < AREA_EPS);
    }

    #[test]
    fn test_no_sites_give_whole_region() {
        let region =
            Region::new(vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (1.0, 1.0), (0.0, 2.0)])
                .unwrap();
        let cells = voronoi_division(&[], &region);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].unsigned_area(), region.area());
    }

    #[test]
    fn test_convex_clipping_is_exact() {
        let cells = voronoi_division(&[(0.2, 0.5), (0.5, 0.5), (0.8, 0.5)], &unit_square());
        assert!((cells[0].unsigned_area() - 0.35).abs() < 1e-12);
        assert!((cells[1].unsigned_area() - 0.3).abs() < 1e-12);
        assert!((cells[2].unsigned_area() - 0.35).abs() < 1e-12);

        let halves = voronoi_division(&[(0.0, 0.0), (1.0, 0.0)], &unit_square());
        assert!((total_area(&halves) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_clockwise_region_clips_like_counter_clockwise() {
        let clockwise = Region::new(vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]).unwrap();
        let points = [(0.1, 0.2), (0.8, 0.1), (0.5, 0.5)];

        let a = voronoi_division(&points, &clockwise);
        let b = voronoi_division(&points, &unit_square());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert!((x.unsigned_area() - y.unsigned_area()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_site_outside_region_drops_empty_cell() {
        // The far site's cell lies entirely outside the square.
        let cells = voronoi_division(&[(0.5, 0.5), (5.0, 0.5)], &unit_square());
        assert_eq!(cells.len(), 1);
        assert!((cells[0].unsigned_area() - 1.0).abs() < AREA_EPS);
    }

    #[test]
    fn test_corner_sites() {
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        let cells = voronoi_division(&corners, &unit_square());
        assert_eq!(cells.len(), 4);
        for cell in &cells {
            assert!((cell.unsigned_area() - 0.25).abs() < AREA_EPS);
        }
    }
}
