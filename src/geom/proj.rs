use geo::{Coord, MapCoords, Polygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};

use crate::raster::Crs;
use crate::{Error, Result};

/// Converts map coordinates in a raster's CRS to WGS84 longitude/latitude (degrees).
pub struct Reprojector {
    source: Crs,
    projections: Option<(Proj4, Proj4)>,
}

impl Reprojector {
    /// Build a reprojector from `source` to EPSG:4326.
    pub fn to_wgs84(source: Crs) -> Result<Self> {
        if source == Crs::WGS84 {
            return Ok(Self { source, projections: None });
        }

        let from = build(&proj4_string(source)?)?;
        let to = build(&proj4_string(Crs::WGS84)?)?;
        Ok(Self { source, projections: Some((from, to)) })
    }

    #[inline] pub fn source(&self) -> Crs { self.source }

    /// Reproject one `(x, y)` pair. Geographic input and output are in degrees.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let Some((from, to)) = &self.projections else { return Ok((x, y)) };

        // proj4rs works in radians for geographic systems.
        let mut point = if self.source.is_geographic() { (x.to_radians(), y.to_radians(), 0.0) } else { (x, y, 0.0) };
        transform(from, to, &mut point)
            .map_err(|e| Error::Projection(format!("{} -> EPSG:4326 failed at ({x}, {y}): {e}", self.source)))?;
        Ok((point.0.to_degrees(), point.1.to_degrees()))
    }

    /// Reproject every vertex of a polygon.
    pub fn polygon(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>> {
        polygon.try_map_coords(|coord: Coord<f64>| {
            let (x, y) = self.transform(coord.x, coord.y)?;
            Ok(Coord { x, y })
        })
    }
}

fn build(proj_string: &str) -> Result<Proj4> {
    Proj4::from_proj_string(proj_string)
        .map_err(|e| Error::Projection(format!("failed to build PROJ.4 '{proj_string}': {e}")))
}

/// PROJ.4 definition for the supported EPSG codes:
/// - geographic 4326 (WGS84) and 4269 (NAD83)
/// - UTM 326zz (WGS84 north), 327zz (WGS84 south), 269zz (NAD83 north)
fn proj4_string(crs: Crs) -> Result<String> {
    let code = crs.epsg();
    let utm = |zone: u32, south: bool, datum: &str| -> Result<String> {
        if !(1..=60).contains(&zone) {
            return Err(Error::config(format!("EPSG:{code} is not a valid UTM zone")));
        }
        let south = if south { " +south" } else { "" };
        Ok(format!("+proj=utm +zone={zone}{south} +datum={datum} +units=m +no_defs +type=crs"))
    };

    match code {
        4326 => Ok("+proj=longlat +datum=WGS84 +no_defs +type=crs".to_string()),
        4269 => Ok("+proj=longlat +datum=NAD83 +no_defs +type=crs".to_string()),
        32601..=32660 => utm(code - 32600, false, "WGS84"),
        32701..=32760 => utm(code - 32700, true, "WGS84"),
        26901..=26923 => utm(code - 26900, false, "NAD83"),
        _ => Err(Error::config(format!("unsupported CRS {crs} for reprojection"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::polygon;

    #[test]
    fn wgs84_is_identity() {
        let r = Reprojector::to_wgs84(Crs::WGS84).unwrap();
        assert_eq!(r.transform(39.2, -6.1).unwrap(), (39.2, -6.1));
    }

    #[test]
    fn utm_central_meridian_maps_to_zone_centre() {
        // Zone 37S central meridian is 39°E; the false easting puts it at x = 500 km.
        let r = Reprojector::to_wgs84(Crs::Projected(32737)).unwrap();
        let (lon, lat) = r.transform(500_000.0, 10_000_000.0).unwrap();
        assert_relative_eq!(lon, 39.0, epsilon = 1e-6);
        assert_relative_eq!(lat, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn northern_zone_round_numbers() {
        let r = Reprojector::to_wgs84(Crs::Projected(32633)).unwrap();
        let (lon, lat) = r.transform(500_000.0, 0.0).unwrap();
        assert_relative_eq!(lon, 15.0, epsilon = 1e-6);
        assert_relative_eq!(lat, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn polygon_vertices_are_reprojected() {
        let r = Reprojector::to_wgs84(Crs::Projected(32737)).unwrap();
        let square = polygon![(x: 500_000.0, y: 9_000_000.0), (x: 500_010.0, y: 9_000_000.0), (x: 500_010.0, y: 9_000_010.0)];
        let out = r.polygon(&square).unwrap();
        assert!(out.exterior().coords().all(|c| (38.9..39.1).contains(&c.x) && c.y < 0.0));
    }

    #[test]
    fn unsupported_codes_are_rejected() {
        assert!(matches!(Reprojector::to_wgs84(Crs::Projected(3857)), Err(Error::Configuration(_))));
        assert!(Reprojector::to_wgs84(Crs::Projected(32661)).is_err());
    }
}
