use ndarray::{Array3, ArrayView2, Axis};

use crate::raster::{Affine, Crs};

/// Pixel data for one raster at one resolution: bands stacked as `(band, row, col)`
/// plus the affine transform and CRS that georeference them. Immutable once built.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    bands: Array3<f64>,
    transform: Affine,
    crs: Crs,
}

impl RasterGrid {
    pub fn new(bands: Array3<f64>, transform: Affine, crs: Crs) -> Self {
        Self { bands, transform, crs }
    }

    #[inline] pub fn band_count(&self) -> usize { self.bands.len_of(Axis(0)) }

    /// Grid shape as `(rows, cols)`.
    #[inline] pub fn shape(&self) -> (usize, usize) { (self.bands.len_of(Axis(1)), self.bands.len_of(Axis(2))) }

    #[inline] pub fn transform(&self) -> &Affine { &self.transform }

    #[inline] pub fn crs(&self) -> Crs { self.crs }

    /// View of a single band. Panics if `index` is out of range.
    #[inline] pub fn band(&self, index: usize) -> ArrayView2<'_, f64> { self.bands.index_axis(Axis(0), index) }

    #[inline] pub fn bands(&self) -> &Array3<f64> { &self.bands }

    /// Bounding box `(min_x, min_y, max_x, max_y)` in the grid's CRS.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let (rows, cols) = self.shape();
        self.transform.bounds(rows, cols)
    }
}
