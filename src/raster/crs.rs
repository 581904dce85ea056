use std::fmt;

use serde::{Deserialize, Serialize};

/// Coordinate reference system of a raster, identified by EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    /// Longitude/latitude in degrees (e.g. 4326, 4269).
    Geographic(u32),
    /// Planar coordinates in meters (e.g. UTM 326zz).
    Projected(u32),
}

impl Crs {
    /// WGS84 longitude/latitude.
    pub const WGS84: Crs = Crs::Geographic(4326);

    /// Classify a bare EPSG code. Codes in the 4000 block are geographic.
    pub fn from_epsg(code: u32) -> Self {
        if (4000..5000).contains(&code) { Crs::Geographic(code) } else { Crs::Projected(code) }
    }

    #[inline]
    pub fn epsg(&self) -> u32 {
        match *self { Crs::Geographic(code) | Crs::Projected(code) => code }
    }

    #[inline] pub fn is_geographic(&self) -> bool { matches!(self, Crs::Geographic(_)) }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}
