//! Resampling of an orthomosaic and its elevation model to a common ground sample distance.

use ndarray::{Array3, Axis};
use tracing::debug;

use crate::raster::{Crs, RasterGrid, RasterSource};
use crate::{Error, Result};

/// Meters per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_139.0;

/// Native horizontal pixel size of a source in meters.
///
/// For geographic sources the transform's horizontal step (degrees of longitude) is
/// converted at the latitude of the raster centre; projected sources are assumed metric.
pub fn native_pixel_size(source: &dyn RasterSource) -> Result<f64> {
    let transform = source.transform()
        .filter(|t| t.is_invertible())
        .ok_or_else(|| Error::config("raster has no valid geotransform"))?;
    let crs = source.crs()
        .ok_or_else(|| Error::config("raster has no CRS"))?;

    let (step_x, _) = transform.pixel_size();
    let size = match crs {
        Crs::Projected(_) => step_x,
        Crs::Geographic(_) => {
            let (rows, cols) = source.shape();
            let (_, min_y, _, max_y) = transform.bounds(rows, cols);
            let latitude = (min_y + max_y) / 2.0;
            step_x * METERS_PER_DEGREE * latitude.to_radians().cos()
        }
    };

    if !(size.is_finite() && size > 0.0) {
        return Err(Error::config(format!("native pixel size must be positive, got {size}")));
    }
    Ok(size)
}

/// Ratio of native pixel size to the target GSD; values above 1 upsample.
pub fn scale_factor(source: &dyn RasterSource, target_gsd: f64) -> Result<f64> {
    if !(target_gsd.is_finite() && target_gsd > 0.0) {
        return Err(Error::config(format!("target GSD must be positive, got {target_gsd}")));
    }
    Ok(native_pixel_size(source)? / target_gsd)
}

/// Output shape `(rows, cols)` for a native shape scaled by `scale_factor`.
#[inline]
pub fn scaled_shape((rows, cols): (usize, usize), scale_factor: f64) -> (usize, usize) {
    ((rows as f64 * scale_factor).round() as usize, (cols as f64 * scale_factor).round() as usize)
}

/// Resample a source by `scale_factor` with bilinear interpolation.
/// The returned grid's transform has its pixel-size terms divided by `scale_factor`.
pub fn resample(source: &dyn RasterSource, scale_factor: f64) -> Result<RasterGrid> {
    if !(scale_factor.is_finite() && scale_factor > 0.0) {
        return Err(Error::config(format!("scale factor must be positive, got {scale_factor}")));
    }
    let transform = source.transform()
        .filter(|t| t.is_invertible())
        .ok_or_else(|| Error::config("raster has no valid geotransform"))?;
    let crs = source.crs()
        .ok_or_else(|| Error::config("raster has no CRS"))?;

    let (rows, cols) = scaled_shape(source.shape(), scale_factor);
    debug!(?rows, ?cols, scale_factor, "resampling raster");
    let bands = resample_bilinear(&source.read()?, rows, cols);

    Ok(RasterGrid::new(bands, transform.scaled(scale_factor), crs))
}

/// Bilinear interpolation of every band onto a `rows × cols` grid, aligning pixel centres.
/// A NaN neighbour yields NaN.
pub fn resample_bilinear(bands: &Array3<f64>, rows: usize, cols: usize) -> Array3<f64> {
    let (count, in_rows, in_cols) = bands.dim();
    if in_rows == 0 || in_cols == 0 || rows == 0 || cols == 0 {
        return Array3::zeros((count, rows, cols));
    }

    // Source coordinate and blend weight along one axis.
    fn axis_samples(out_len: usize, in_len: usize) -> Vec<(usize, usize, f64)> {
        let ratio = in_len as f64 / out_len as f64;
        (0..out_len).map(|i| {
            let src = ((i as f64 + 0.5) * ratio - 0.5).clamp(0.0, (in_len - 1) as f64);
            let lo = src.floor() as usize;
            let hi = (lo + 1).min(in_len - 1);
            (lo, hi, src - lo as f64)
        }).collect()
    }

    let row_samples = axis_samples(rows, in_rows);
    let col_samples = axis_samples(cols, in_cols);

    let mut out = Array3::zeros((count, rows, cols));
    for (band_in, mut band_out) in bands.axis_iter(Axis(0)).zip(out.axis_iter_mut(Axis(0))) {
        for (r, &(r0, r1, wr)) in row_samples.iter().enumerate() {
            for (c, &(c0, c1, wc)) in col_samples.iter().enumerate() {
                let top = band_in[[r0, c0]] * (1.0 - wc) + band_in[[r0, c1]] * wc;
                let bottom = band_in[[r1, c0]] * (1.0 - wc) + band_in[[r1, c1]] * wc;
                band_out[[r, c]] = top * (1.0 - wr) + bottom * wr;
            }
        }
    }
    out
}

/// An orthomosaic and its elevation model resampled with the same scale factor.
#[derive(Debug, Clone)]
pub struct SampledPair {
    pub image: RasterGrid,
    pub elevation: RasterGrid,
    pub scale_factor: f64,
}

/// Resample `image` to `target_gsd` and apply the identical scale factor to `elevation`,
/// so label vertices scaled by that factor address both grids.
pub fn sample_pair(image: &dyn RasterSource, elevation: &dyn RasterSource, target_gsd: f64) -> Result<SampledPair> {
    let scale_factor = scale_factor(image, target_gsd)?;
    Ok(SampledPair {
        image: resample(image, scale_factor)?,
        elevation: resample(elevation, scale_factor)?,
        scale_factor,
    })
}
