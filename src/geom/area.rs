use geo::{GeodesicArea, LineString, Polygon};

use crate::geom::Reprojector;
use crate::Result;

/// Rectangle `(min_x, min_y, max_x, max_y)` as a polygon, counter-clockwise from the lower left.
pub fn bounds_polygon((min_x, min_y, max_x, max_y): (f64, f64, f64, f64)) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![(min_x, min_y), (max_x, min_y), (max_x, max_y), (min_x, max_y), (min_x, min_y)]),
        vec![],
    )
}

/// Ground area (m²) of a map-space rectangle, measured on the WGS84 ellipsoid.
pub fn footprint_area(bounds: (f64, f64, f64, f64), reprojector: &Reprojector) -> Result<f64> {
    let footprint = reprojector.polygon(&bounds_polygon(bounds))?;
    Ok(footprint.geodesic_area_unsigned())
}
