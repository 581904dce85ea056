//! Visible Atmospherically Resistant Index from RGB bands.

use ndarray::{Array2, ArrayView2, Zip};

use crate::raster::RasterGrid;
use crate::{Error, Result};

/// Added to the VARI denominator to avoid division by zero.
pub const VARI_EPSILON: f64 = 1e-10;

/// Raw VARI: `(G - R) / (G + R - B + ε)`.
pub fn vari(red: ArrayView2<f64>, green: ArrayView2<f64>, blue: ArrayView2<f64>) -> Result<Array2<f64>> {
    for dim in [green.dim(), blue.dim()] {
        if dim != red.dim() {
            return Err(Error::ShapeMismatch { expected: red.dim(), actual: dim });
        }
    }

    let mut out = Array2::zeros(red.dim());
    Zip::from(&mut out).and(&red).and(&green).and(&blue)
        .par_for_each(|o, &r, &g, &b| *o = (g - r) / (g + r - b + VARI_EPSILON));
    Ok(out)
}

/// Min-max normalize to `[0, 1]`.
///
/// Non-finite samples are ignored when finding the range and become 0. A constant
/// (or entirely non-finite) grid has no range and normalizes to all zeros.
pub fn normalize(index: Array2<f64>) -> Array2<f64> {
    match finite_range(&index) {
        Some((min, max)) if max > min => normalized(index, min, max),
        _ => Array2::zeros(index.dim()),
    }
}

/// Like [`normalize`], but a grid without spread is a [`Error::NumericDegeneracy`].
pub fn normalize_strict(index: Array2<f64>) -> Result<Array2<f64>> {
    match finite_range(&index) {
        Some((min, max)) if max > min => Ok(normalized(index, min, max)),
        Some((min, _)) => Err(Error::NumericDegeneracy(format!("vegetation index is constant ({min})"))),
        None => Err(Error::NumericDegeneracy("vegetation index has no finite samples".into())),
    }
}

fn finite_range(index: &Array2<f64>) -> Option<(f64, f64)> {
    index.iter().copied().filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn normalized(mut index: Array2<f64>, min: f64, max: f64) -> Array2<f64> {
    let span = max - min;
    index.par_mapv_inplace(|v| if v.is_finite() { (v - min) / span } else { 0.0 });
    index
}

/// Normalized VARI of an RGB grid (bands 0, 1, 2 = red, green, blue).
pub fn vegetation_index(image: &RasterGrid) -> Result<Array2<f64>> {
    if image.band_count() < 3 {
        return Err(Error::config(format!("expected an RGB raster, found {} band(s)", image.band_count())));
    }
    Ok(normalize(vari(image.band(0), image.band(1), image.band(2))?))
}
