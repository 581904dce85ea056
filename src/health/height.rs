use ndarray::{ArrayView2, Zip};

use crate::health::{mask::rasterize, SegmentPolygon};
use crate::raster::Affine;

/// Default number of highest elevation samples averaged into a canopy height.
pub const DEFAULT_TOP_SAMPLES: usize = 10;

/// Estimates canopy apex height as the mean of the highest elevation samples under a segment.
#[derive(Debug, Clone, Copy)]
pub struct HeightExtractor {
    top_samples: usize,
}

impl Default for HeightExtractor {
    fn default() -> Self { Self { top_samples: DEFAULT_TOP_SAMPLES } }
}

impl HeightExtractor {
    pub fn new(top_samples: usize) -> Self { Self { top_samples: top_samples.max(1) } }

    #[inline] pub fn top_samples(&self) -> usize { self.top_samples }

    /// Map `polygon` from image pixels to elevation pixels via map coordinates, then
    /// average the top samples under it. `None` if no finite sample lies under the mask.
    pub fn extract(
        &self,
        polygon: &SegmentPolygon,
        image_transform: &Affine,
        elevation: ArrayView2<f64>,
        elevation_transform: &Affine,
    ) -> Option<f64> {
        let vertices = realign(polygon.vertices(), image_transform, elevation_transform)?;
        let mask = rasterize(&vertices, elevation.dim());

        let mut samples = Vec::new();
        Zip::from(&mask).and(&elevation).for_each(|&inside, &z| {
            if inside && z.is_finite() { samples.push(z) }
        });
        self.top_mean(samples)
    }

    /// Mean of the `top_samples` largest values, or `None` for an empty set.
    pub fn top_mean(&self, mut samples: Vec<f64>) -> Option<f64> {
        if samples.is_empty() { return None }
        samples.sort_unstable_by(|a, b| b.total_cmp(a));
        let top = &samples[..self.top_samples.min(samples.len())];
        Some(top.iter().sum::<f64>() / top.len() as f64)
    }
}

/// Image-pixel vertices (`[col, row]`, taken at pixel centres) to elevation-pixel vertices.
fn realign(vertices: &[[f64; 2]], image: &Affine, elevation: &Affine) -> Option<Vec<[f64; 2]>> {
    vertices.iter()
        .map(|&[col, row]| {
            let (x, y) = image.xy_center(row, col);
            elevation.rowcol(x, y).map(|(r, c)| [c as f64, r as f64])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn square(lo: f64, hi: f64) -> SegmentPolygon {
        SegmentPolygon::new(vec![[lo, lo], [hi, lo], [hi, hi], [lo, hi]]).unwrap()
    }

    #[test]
    fn top_mean_of_fewer_than_k_uses_all() {
        let extractor = HeightExtractor::default();
        assert_relative_eq!(extractor.top_mean(vec![1.0, 2.0, 3.0]).unwrap(), 2.0);
        assert_eq!(extractor.top_mean(vec![]), None);
    }

    #[test]
    fn top_mean_ignores_lower_samples() {
        let extractor = HeightExtractor::new(2);
        assert_relative_eq!(extractor.top_mean(vec![1.0, 9.0, 4.0, 7.0]).unwrap(), 8.0);
    }

    #[test]
    fn aligned_grids_average_top_values() {
        let transform = Affine::north_up(0.0, 100.0, 1.0, 1.0);
        let dem = Array2::from_shape_fn((20, 20), |(r, c)| (r * 20 + c) as f64);
        let extractor = HeightExtractor::default();
        let h = extractor.extract(&square(2.0, 8.0), &transform, dem.view(), &transform).unwrap();

        // Vertex centres shift by half a pixel and floor back to the same cell.
        let mut under: Vec<f64> = (2..8).flat_map(|r| (2..8).map(move |c| (r * 20 + c) as f64)).collect();
        under.sort_by(|a, b| b.total_cmp(a));
        let expected = under[..10].iter().sum::<f64>() / 10.0;
        assert_relative_eq!(h, expected, epsilon = 1e-9);
        assert!(h >= under[under.len() - 1] && h <= under[0]);
    }

    #[test]
    fn coarser_elevation_grid_is_realigned() {
        let image = Affine::north_up(0.0, 40.0, 1.0, 1.0);
        let elevation = Affine::north_up(0.0, 40.0, 2.0, 2.0);
        let dem = Array2::from_shape_fn((20, 20), |(r, c)| if (2..4).contains(&r) && (2..4).contains(&c) { 5.0 } else { 1.0 });
        // Image square [4, 8) lands on elevation cells [2, 4).
        let h = HeightExtractor::default().extract(&square(4.0, 8.0), &image, dem.view(), &elevation).unwrap();
        assert_relative_eq!(h, 5.0);
    }

    #[test]
    fn empty_or_nan_mask_has_no_height() {
        let transform = Affine::north_up(0.0, 10.0, 1.0, 1.0);
        let dem = Array2::from_elem((10, 10), f64::NAN);
        let extractor = HeightExtractor::default();
        assert_eq!(extractor.extract(&square(1.0, 5.0), &transform, dem.view(), &transform), None);

        let outside = Affine::north_up(1000.0, 10.0, 1.0, 1.0);
        let dem = Array2::from_elem((10, 10), 3.0);
        assert_eq!(extractor.extract(&square(1.0, 5.0), &outside, dem.view(), &transform), None);
    }
}
