//! Scenario types: the service region and the sites a run chooses from.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use geo::{Area, Contains, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};

/// Region construction errors.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegionError {
    #[error("Region vertex {index} is not finite")]
    NonFiniteVertex { index: usize },
    #[error("Region needs at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),
    #[error("Region has zero area")]
    ZeroArea,
}

/// Errors raised while loading scenarios or parameter files.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Service region: a simple polygon of (longitude, latitude) vertices.
///
/// Serialized as its open vertex ring, `[[lon, lat], ...]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct Region {
    vertices: Vec<(f64, f64)>,
    polygon: Polygon<f64>,
    convex: bool,
}

impl Region {
    /// Build a region from its vertices. A repeated closing vertex is accepted.
    pub fn new(mut vertices: Vec<(f64, f64)>) -> Result<Self, RegionError> {
        if let Some(index) = vertices
            .iter()
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(RegionError::NonFiniteVertex { index });
        }

        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }

        let mut distinct: Vec<(f64, f64)> = Vec::with_capacity(vertices.len());
        for v in &vertices {
            if !distinct.contains(v) {
                distinct.push(*v);
            }
        }
        if distinct.len() < 3 {
            return Err(RegionError::TooFewVertices(distinct.len()));
        }

        let polygon = Polygon::new(LineString::from(vertices.clone()), vec![]);
        if polygon.unsigned_area() <= 0.0 {
            return Err(RegionError::ZeroArea);
        }

        let convex = turns_one_way(&vertices);
        Ok(Self {
            vertices,
            polygon,
            convex,
        })
    }

    /// Axis-aligned rectangle `(min_lon, min_lat)` to `(max_lon, max_lat)`.
    pub fn rectangle(min: (f64, f64), max: (f64, f64)) -> Result<Self, RegionError> {
        Self::new(vec![min, (max.0, min.1), max, (min.0, max.1)])
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    /// Planar area in squared coordinate units.
    pub fn area(&self) -> f64 {
        self.polygon.unsigned_area()
    }

    /// Whether every vertex turns the same way.
    pub fn is_convex(&self) -> bool {
        self.convex
    }

    /// Whether a coordinate lies strictly inside the region.
    pub fn contains(&self, coordinate: (f64, f64)) -> bool {
        self.polygon.contains(&Point::from(coordinate))
    }
}

fn turns_one_way(vertices: &[(f64, f64)]) -> bool {
    let n = vertices.len();
    let mut sign = 0.0;
    for i in 0..n {
        let (a, b, c) = (vertices[i], vertices[(i + 1) % n], vertices[(i + 2) % n]);
        let cross = (b.0 - a.0) * (c.1 - b.1) - (b.1 - a.1) * (c.0 - b.0);
        if cross == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

impl TryFrom<Vec<(f64, f64)>> for Region {
    type Error = RegionError;

    fn try_from(vertices: Vec<(f64, f64)>) -> Result<Self, Self::Error> {
        Self::new(vertices)
    }
}

impl From<Region> for Vec<(f64, f64)> {
    fn from(region: Region) -> Self {
        region.vertices
    }
}

/// A deployed or candidate resource site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSite {
    /// Source entity identifier.
    pub id: String,
    /// (longitude, latitude).
    pub coordinate: (f64, f64),
    /// Colour tag of the site.
    #[serde(default)]
    pub tag: String,
}

/// The deployed layout and the candidate pool a genome indexes into.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateSpace {
    /// Sites currently in service.
    #[serde(default)]
    pub deployed: Vec<CandidateSite>,
    /// Sites the search may choose from.
    pub candidates: Vec<CandidateSite>,
}

/// A full run input: region plus candidate space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub region: Region,
    #[serde(flatten)]
    pub space: CandidateSpace,
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Drop candidates that do not lie strictly inside the region. Returns the
    /// number removed.
    pub fn retain_within_region(&mut self) -> usize {
        let before = self.space.candidates.len();
        let region = &self.region;
        self.space
            .candidates
            .retain(|site| region.contains(site.coordinate));
        before - self.space.candidates.len()
    }
}

/// Supplies a fresh scenario snapshot at the start of a run.
pub trait CandidateSource {
    fn load(&self) -> Result<Scenario, ScenarioError>;
}

impl CandidateSource for Scenario {
    fn load(&self) -> Result<Scenario, ScenarioError> {
        Ok(self.clone())
    }
}

/// Reads the scenario from a JSON file on every load.
#[derive(Debug, Clone)]
pub struct JsonCandidateSource {
    path: PathBuf,
}

impl JsonCandidateSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CandidateSource for JsonCandidateSource {
    fn load(&self) -> Result<Scenario, ScenarioError> {
        Scenario::from_json_file(&self.path)
    }
}
