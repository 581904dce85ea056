use std::fmt;

use geo::Polygon;
use serde::{Deserialize, Serialize};

use crate::health::mask::distinct_vertex_count;
use crate::{Error, Result};

/// One canopy boundary in resampled pixel space: `[x, y]` = `[col, row]`, integer-valued.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPolygon {
    vertices: Vec<[f64; 2]>,
}

impl SegmentPolygon {
    /// Build from resampled-pixel vertices; fewer than three distinct points is an error.
    pub fn new(vertices: Vec<[f64; 2]>) -> Result<Self> {
        let distinct = distinct_vertex_count(&vertices);
        if distinct < 3 {
            return Err(Error::DegenerateGeometry(format!("polygon has {distinct} distinct point(s)")));
        }
        Ok(Self { vertices })
    }

    /// Scale native image-pixel label points into the resampled grid, truncating to whole pixels.
    /// Degenerate input is kept so the caller can report it per segment.
    pub fn from_label(points: &[[f64; 2]], scale_factor: f64) -> Self {
        let vertices = points.iter()
            .map(|p| [(p[0] * scale_factor).trunc(), (p[1] * scale_factor).trunc()])
            .collect();
        Self { vertices }
    }

    #[inline] pub fn vertices(&self) -> &[[f64; 2]] { &self.vertices }

    /// True if the polygon has fewer than three distinct vertices.
    #[inline] pub fn is_degenerate(&self) -> bool { distinct_vertex_count(&self.vertices) < 3 }
}

/// Zonal statistics of one segment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZonalResult {
    pub pixel_count: usize,
    /// Mean normalized vegetation index under the mask, in `[0, 1]`.
    pub vegetation_score: f64,
    /// Canopy height estimate; `None` when no elevation samples were found.
    pub height_meters: Option<f64>,
}

/// Ordinal health class, from weakest (0) to strongest (3) combined signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum HealthClass {
    Poor = 0,
    Fair = 1,
    Good = 2,
    Vigorous = 3,
}

impl HealthClass {
    /// Map an average score (percent) onto the four buckets `≤25, ≤50, ≤75, >75`.
    pub fn from_score(average: f64) -> Option<Self> {
        if !average.is_finite() { return None }
        Some(if average <= 25.0 { Self::Poor }
            else if average <= 50.0 { Self::Fair }
            else if average <= 75.0 { Self::Good }
            else { Self::Vigorous })
    }

    #[inline] pub fn as_u8(self) -> u8 { self as u8 }
}

impl From<HealthClass> for u8 {
    fn from(class: HealthClass) -> u8 { class.as_u8() }
}

impl TryFrom<u8> for HealthClass {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, String> {
        match value {
            0 => Ok(Self::Poor),
            1 => Ok(Self::Fair),
            2 => Ok(Self::Good),
            3 => Ok(Self::Vigorous),
            other => Err(format!("health class must be 0-3, got {other}")),
        }
    }
}

impl fmt::Display for HealthClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_u8()) }
}

/// A scored canopy segment with geographic geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSegment {
    /// Canopy outline in WGS84 longitude/latitude.
    pub geometry: Polygon<f64>,
    pub height_meters: Option<f64>,
    pub vegetation_score: f64,
    pub pixel_count: usize,
    pub estimated_age_bracket: Option<String>,
    pub health_class: Option<HealthClass>,
    pub area_m2: f64,
}
