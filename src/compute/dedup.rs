//! Spatial deduplication of nearby sites.
//!
//! Points are bucketed into grid cells about `threshold_m` wide. A point is
//! compared only against kept points in its own and the eight neighbouring
//! cells, so the pass is linear on average. Points are processed in input
//! order and the first point of a cluster survives. Pairs straddling the 3x3
//! window are never compared, so a kept point may sit closer than the
//! threshold to another kept point outside its window.

use std::collections::HashMap;

use super::geometry::{Located, grid_index, haversine};

/// Grid of kept points keyed by `(lat_index, lon_index)`.
#[derive(Debug, Clone)]
pub struct DedupGrid {
    threshold_m: f64,
    cells: HashMap<(i64, i64), Vec<(f64, f64)>>,
}

impl DedupGrid {
    /// Create an empty grid for the given threshold in meters.
    pub fn new(threshold_m: f64) -> Self {
        Self {
            threshold_m,
            cells: HashMap::new(),
        }
    }

    /// Keep `coordinate` unless a kept point in its neighbourhood is closer
    /// than the threshold. Returns whether it was kept.
    pub fn insert(&mut self, coordinate: (f64, f64)) -> bool {
        let (lat_idx, lon_idx) = grid_index(coordinate, self.threshold_m);

        let is_similar = (-1..=1)
            .flat_map(|dy| {
                (-1..=1).map(move |dx| (lat_idx.saturating_add(dy), lon_idx.saturating_add(dx)))
            })
            .filter_map(|cell| self.cells.get(&cell))
            .flatten()
            .any(|&kept| haversine(coordinate, kept) < self.threshold_m);

        if is_similar {
            return false;
        }

        self.cells
            .entry((lat_idx, lon_idx))
            .or_default()
            .push(coordinate);
        true
    }

    /// Number of kept points.
    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Drop points that lie within `threshold_m` meters of an earlier kept point.
pub fn dedupe<T, I>(points: I, threshold_m: f64) -> Vec<T>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    let mut grid = DedupGrid::new(threshold_m);
    points
        .into_iter()
        .filter(|p| grid.insert(p.lon_lat()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CandidateSite;
    use proptest::prelude::*;

    const VALENCIA: (f64, f64) = (-0.3763, 39.4699);

    /// Offset a point by meters east/north (small-distance approximation).
    fn offset(origin: (f64, f64), east_m: f64, north_m: f64) -> (f64, f64) {
        let dlat = (north_m / 6_371_000.0).to_degrees();
        let dlon = (east_m / (6_371_000.0 * origin.1.to_radians().cos())).to_degrees();
        (origin.0 + dlon, origin.1 + dlat)
    }

    #[test]
    fn test_near_duplicate_removed() {
        let points = vec![VALENCIA, offset(VALENCIA, 10.0, 5.0), offset(VALENCIA, 500.0, 0.0)];
        let kept = dedupe(points.clone(), 50.0);
        assert_eq!(kept, vec![points[0], points[2]]);
    }

    #[test]
    fn test_first_seen_survives() {
        let a = offset(VALENCIA, 20.0, 0.0);
        let kept = dedupe(vec![a, VALENCIA], 50.0);
        assert_eq!(kept, vec![a]);
    }

    #[test]
    fn test_chain_is_order_dependent() {
        // a-b and b-c are within 50 m, a-c is not.
        let a = VALENCIA;
        let b = offset(VALENCIA, 40.0, 0.0);
        let c = offset(VALENCIA, 80.0, 0.0);

        assert_eq!(dedupe(vec![a, b, c], 50.0), vec![a, c]);
        assert_eq!(dedupe(vec![b, a, c], 50.0), vec![b]);
    }

    #[test]
    fn test_dedupes_candidate_sites() {
        let site = |id: &str, coordinate| CandidateSite {
            id: id.into(),
            coordinate,
            tag: "Gray".into(),
        };
        let sites = vec![
            site("a", VALENCIA),
            site("b", offset(VALENCIA, 1.0, 1.0)),
            site("c", offset(VALENCIA, 0.0, 300.0)),
        ];
        let kept: Vec<CandidateSite> = dedupe(sites, 50.0);
        let ids: Vec<&str> = kept.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_grid_len() {
        let mut grid = DedupGrid::new(50.0);
        assert!(grid.is_empty());
        assert!(grid.insert(VALENCIA));
        assert!(!grid.insert(VALENCIA));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_tiny_threshold_saturates_cells() {
        // Cell indices clamp to i64::MAX at this scale.
        let mut grid = DedupGrid::new(1e-300);
        assert_eq!(grid_index(VALENCIA, 1e-300).0, i64::MAX);

        assert!(grid.insert(VALENCIA));
        assert!(grid.insert(offset(VALENCIA, 1.0, 1.0)));
        assert!(!grid.insert(VALENCIA));
        assert_eq!(grid.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_close_pair_never_both_kept(
            east in -49.0f64..49.0,
            north in -49.0f64..49.0,
        ) {
            let q = offset(VALENCIA, east, north);
            prop_assume!(haversine(VALENCIA, q) < 50.0);
            prop_assert_eq!(dedupe(vec![VALENCIA, q], 50.0).len(), 1);
        }

        #[test]
        fn prop_far_pair_always_kept(
            bearing in 0.0f64..std::f64::consts::TAU,
            extra in 1.0f64..5_000.0,
        ) {
            let reach = 50.0 * std::f64::consts::SQRT_2 + extra;
            let q = offset(VALENCIA, reach * bearing.cos(), reach * bearing.sin());
            prop_assume!(haversine(VALENCIA, q) > 50.0 * std::f64::consts::SQRT_2);
            prop_assert_eq!(dedupe(vec![VALENCIA, q], 50.0).len(), 2);
        }
    }
}
