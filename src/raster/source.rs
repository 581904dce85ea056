use ndarray::{Array3, Axis};

use crate::raster::{Affine, Crs};
use crate::Result;

/// An opened raster: pixel data plus georeferencing. Implementations may read lazily.
pub trait RasterSource {
    /// Number of bands.
    fn band_count(&self) -> usize;

    /// Native shape as `(rows, cols)`.
    fn shape(&self) -> (usize, usize);

    /// Read all bands as `(band, row, col)` floating-point samples.
    fn read(&self) -> Result<Array3<f64>>;

    /// Pixel → map transform, if the source is georeferenced.
    fn transform(&self) -> Option<Affine>;

    /// Coordinate reference system, if known.
    fn crs(&self) -> Option<Crs>;

    /// Bounding box `(min_x, min_y, max_x, max_y)` in the source CRS.
    fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let (rows, cols) = self.shape();
        self.transform().map(|t| t.bounds(rows, cols))
    }
}

/// A raster already held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryRaster {
    bands: Array3<f64>,
    transform: Option<Affine>,
    crs: Option<Crs>,
}

impl InMemoryRaster {
    pub fn new(bands: Array3<f64>, transform: Option<Affine>, crs: Option<Crs>) -> Self {
        Self { bands, transform, crs }
    }
}

impl RasterSource for InMemoryRaster {
    #[inline] fn band_count(&self) -> usize { self.bands.len_of(Axis(0)) }

    #[inline] fn shape(&self) -> (usize, usize) { (self.bands.len_of(Axis(1)), self.bands.len_of(Axis(2))) }

    fn read(&self) -> Result<Array3<f64>> { Ok(self.bands.clone()) }

    #[inline] fn transform(&self) -> Option<Affine> { self.transform }

    #[inline] fn crs(&self) -> Option<Crs> { self.crs }
}
