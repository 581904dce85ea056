//! Scanline polygon rasterization.
//!
//! Pixel `(row, col)` covers `[col, col + 1) × [row, row + 1)` and is set when its
//! centre `(col + 0.5, row + 0.5)` lies inside the polygon under the even-odd rule,
//! so the result does not depend on winding direction.

use ndarray::Array2;
use smallvec::SmallVec;

/// Rasterize a closed polygon given as `[x, y]` vertices (x = column, y = row) into a
/// `rows × cols` mask. Fewer than three vertices, or zero area, yields an empty mask.
pub fn rasterize(vertices: &[[f64; 2]], (rows, cols): (usize, usize)) -> Array2<bool> {
    let mut mask = Array2::from_elem((rows, cols), false);
    if vertices.len() < 3 || rows == 0 || cols == 0 { return mask }

    let (min_y, max_y) = vertices.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v[1]), hi.max(v[1])));
    if !(min_y.is_finite() && max_y.is_finite()) { return mask }

    let first_row = (min_y - 0.5).ceil().max(0.0) as usize;
    let last_row = ((max_y - 0.5).floor().min(rows as f64 - 1.0)).max(-1.0);
    if last_row < 0.0 { return mask }
    let last_row = last_row as usize;

    let mut crossings: SmallVec<[f64; 16]> = SmallVec::new();
    for row in first_row..=last_row {
        let y = row as f64 + 0.5;

        crossings.clear();
        for (i, a) in vertices.iter().enumerate() {
            let b = &vertices[(i + 1) % vertices.len()];
            // Half-open in y so shared vertices are counted once; horizontal edges never cross.
            if (a[1] <= y) != (b[1] <= y) {
                crossings.push(a[0] + (y - a[1]) * (b[0] - a[0]) / (b[1] - a[1]));
            }
        }
        crossings.sort_by(f64::total_cmp);

        for span in crossings.chunks_exact(2) {
            // Columns whose centre satisfies span[0] <= col + 0.5 < span[1].
            let start = (span[0] - 0.5).ceil().clamp(0.0, cols as f64) as usize;
            let end = (span[1] - 0.5).ceil().clamp(0.0, cols as f64) as usize;
            for col in start..end {
                mask[[row, col]] = true;
            }
        }
    }
    mask
}

/// Number of pairwise-distinct vertices.
pub fn distinct_vertex_count(vertices: &[[f64; 2]]) -> usize {
    let mut seen: SmallVec<[[f64; 2]; 32]> = SmallVec::new();
    for v in vertices {
        if !seen.iter().any(|s| s == v) { seen.push(*v) }
    }
    seen.len()
}
