//! Affine pixel → geographic transform.

use serde::{Deserialize, Serialize};

/// Affine coefficients mapping pixel `(col, row)` to map coordinates `(x, y)`:
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
/// For north-up rasters `b` and `d` are zero and `e` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    /// North-up transform from an upper-left origin and pixel size.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self { a: pixel_width, b: 0.0, c: origin_x, d: 0.0, e: -pixel_height.abs(), f: origin_y }
    }

    /// Map coordinates of fractional pixel position `(col, row)`.
    #[inline]
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (self.a * col + self.b * row + self.c, self.d * col + self.e * row + self.f)
    }

    /// Map coordinates of the centre of pixel `(row, col)`.
    #[inline]
    pub fn xy_center(&self, row: f64, col: f64) -> (f64, f64) { self.apply(col + 0.5, row + 0.5) }

    /// Map coordinates of the upper-left corner of pixel `(row, col)`.
    #[inline]
    pub fn xy_corner(&self, row: f64, col: f64) -> (f64, f64) { self.apply(col, row) }

    #[inline] fn determinant(&self) -> f64 { self.a * self.e - self.b * self.d }

    /// True if the transform can be inverted.
    #[inline] pub fn is_invertible(&self) -> bool { self.determinant().abs() > 1e-15 && self.determinant().is_finite() }

    /// Fractional pixel position `(col, row)` of map coordinates, or `None` for a degenerate transform.
    pub fn inverse_apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !self.is_invertible() { return None }
        let det = self.determinant();
        let dx = x - self.c;
        let dy = y - self.f;
        let col = (self.e * dx - self.b * dy) / det;
        let row = (-self.d * dx + self.a * dy) / det;
        Some((col, row))
    }

    /// Integer pixel `(row, col)` containing map coordinates `(x, y)` (floor of the inverse).
    pub fn rowcol(&self, x: f64, y: f64) -> Option<(i64, i64)> {
        self.inverse_apply(x, y).map(|(col, row)| (row.floor() as i64, col.floor() as i64))
    }

    /// Transform for the same footprint sampled `scale_factor` times more densely:
    /// pixel-size terms are divided, origin and rotation terms are kept.
    pub fn scaled(&self, scale_factor: f64) -> Self {
        Self { a: self.a / scale_factor, e: self.e / scale_factor, ..*self }
    }

    /// Horizontal and vertical pixel steps in map units.
    #[inline] pub fn pixel_size(&self) -> (f64, f64) { (self.a.abs(), self.e.abs()) }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of a `rows × cols` grid.
    pub fn bounds(&self, rows: usize, cols: usize) -> (f64, f64, f64, f64) {
        let (rows, cols) = (rows as f64, cols as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(cols, 0.0),
            self.apply(0.0, rows),
            self.apply(cols, rows),
        ];
        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), &(x, y)| (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        )
    }
}
