use ndarray::{ArrayView2, Zip};

use crate::health::{mask::rasterize, SegmentPolygon, ZonalResult};

/// Added to the pixel count when averaging so an empty mask scores 0.
const COUNT_EPSILON: f64 = 1e-10;

/// Pixel count and mean vegetation index of `polygon` over `index`.
/// The height is left undefined; see [`crate::health::HeightExtractor`].
pub fn zonal_statistics(polygon: &SegmentPolygon, index: ArrayView2<f64>) -> ZonalResult {
    let mask = rasterize(polygon.vertices(), index.dim());

    let (pixel_count, sum) = Zip::from(&mask).and(&index)
        .fold((0usize, 0.0), |(count, sum), &inside, &value| {
            if inside { (count + 1, sum + value) } else { (count, sum) }
        });

    ZonalResult {
        pixel_count,
        vegetation_score: sum / (pixel_count as f64 + COUNT_EPSILON),
        height_meters: None,
    }
}
