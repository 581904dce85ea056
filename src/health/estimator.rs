//! Per-image health pipeline: resample, index, then score every labelled segment.

use geo::{Coord, LineString, Polygon};
use ndarray::ArrayView2;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::geom::Reprojector;
use crate::health::{
    vari::vegetation_index, zonal::zonal_statistics, ClassifiedSegment, HealthClassifier, HeightExtractor,
    SegmentPolygon, ZonalResult,
};
use crate::raster::{sample_pair, Affine, RasterSource, SampledPair};
use crate::Result;

/// Scores canopy segments of one orthomosaic against its elevation model.
#[derive(Debug, Clone)]
pub struct CanopyHealthEstimator {
    classifier: HealthClassifier,
    heights: HeightExtractor,
    target_gsd: f64,
}

impl CanopyHealthEstimator {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        Ok(Self {
            classifier: HealthClassifier::new(config.growth_table.clone(), config.target_gsd)?,
            heights: HeightExtractor::new(config.top_height_samples),
            target_gsd: config.target_gsd,
        })
    }

    #[inline] pub fn target_gsd(&self) -> f64 { self.target_gsd }

    #[inline] pub fn classifier(&self) -> &HealthClassifier { &self.classifier }

    /// Ground area of one resampled pixel in m².
    #[inline] pub fn pixel_area(&self) -> f64 { self.target_gsd * self.target_gsd }

    /// Resample both rasters and score each label polygon (native image-pixel points).
    pub fn estimate(
        &self,
        image: &dyn RasterSource,
        elevation: &dyn RasterSource,
        labels: &[Vec<[f64; 2]>],
    ) -> Result<Vec<ClassifiedSegment>> {
        let pair = sample_pair(image, elevation, self.target_gsd)?;
        self.estimate_sampled(&pair, labels)
    }

    /// Score each label polygon over an already resampled pair.
    pub fn estimate_sampled(&self, pair: &SampledPair, labels: &[Vec<[f64; 2]>]) -> Result<Vec<ClassifiedSegment>> {
        let vegetation = vegetation_index(&pair.image)?;
        let reprojector = Reprojector::to_wgs84(pair.image.crs())?;
        info!(segments = labels.len(), scale_factor = pair.scale_factor, "scoring canopy segments");

        labels.iter().enumerate()
            .map(|(id, points)| {
                let polygon = SegmentPolygon::from_label(points, pair.scale_factor);
                self.score_segment(id, &polygon, pair, vegetation.view(), &reprojector)
            })
            .collect()
    }

    fn score_segment(
        &self,
        id: usize,
        polygon: &SegmentPolygon,
        pair: &SampledPair,
        vegetation: ArrayView2<f64>,
        reprojector: &Reprojector,
    ) -> Result<ClassifiedSegment> {
        let mut zonal = zonal_statistics(polygon, vegetation);
        if polygon.is_degenerate() || zonal.pixel_count == 0 {
            debug!(id, "degenerate segment left unclassified");
            zonal = ZonalResult { height_meters: None, ..zonal };
        } else {
            zonal.height_meters = self.heights.extract(
                polygon,
                pair.image.transform(),
                pair.elevation.band(0),
                pair.elevation.transform(),
            );
        }

        let classification = self.classifier.classify(&zonal);
        let geometry = reprojector.polygon(&pixel_outline(polygon, pair.image.transform()))?;

        Ok(ClassifiedSegment {
            geometry,
            height_meters: zonal.height_meters,
            vegetation_score: zonal.vegetation_score,
            pixel_count: zonal.pixel_count,
            estimated_age_bracket: classification.age_bracket,
            health_class: classification.health_class,
            area_m2: zonal.pixel_count as f64 * self.pixel_area(),
        })
    }
}

/// Map-space outline of a pixel polygon, taking each vertex at its pixel's upper-left corner.
fn pixel_outline(polygon: &SegmentPolygon, transform: &Affine) -> Polygon<f64> {
    let ring: LineString<f64> = polygon.vertices().iter()
        .map(|&[col, row]| {
            let (x, y) = transform.xy_corner(row, col);
            Coord { x, y }
        })
        .collect();
    Polygon::new(ring, vec![])
}
