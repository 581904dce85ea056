//! Per-image pipeline (health → proximity graph → spacing) and the parallel batch over a directory.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::AnalysisConfig;
use crate::geom::{footprint_area, Reprojector};
use crate::health::{CanopyHealthEstimator, ClassifiedSegment};
use crate::io::{
    fs::{ensure_dir_exists, require_dir_exists},
    geojson::{health_collection, lines_collection, spacing_collection, write_geojson},
    labels::{count_label, outlines, read_labels, LabelShape},
    plots::{plot_and_stratum, PlotTable},
    summary::{write_summary, ImageSummary},
};
use crate::raster::{GeoTiffRaster, RasterSource};
use crate::spacing::{connection_lines, ConnectionLine, ProximityGraph, SpacingGraphBuilder, SpacingOptimizer, SpacingOutcome};

/// Image extensions picked up by [`discover_jobs`].
const IMAGE_EXTENSIONS: [&str; 4] = ["tif", "tiff", "png", "jpg"];

/// Suffix replacing the last `_` component of an image name to form its DEM name.
const DEM_SUFFIX: &str = "dem_dem_norm_utm.tif";

/// Directory layout of batch outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    #[inline] pub fn root(&self) -> &Path { &self.root }

    #[inline] pub fn health_dir(&self) -> PathBuf { self.root.join("Health_Results") }

    #[inline] pub fn spacing_dir(&self) -> PathBuf { self.root.join("WellSpace_Geojsons") }

    #[inline] pub fn lines_dir(&self) -> PathBuf { self.root.join("Line_Geojsons") }

    #[inline] pub fn summary_path(&self) -> PathBuf { self.root.join("summary.csv") }

    /// Create the root and every output directory.
    pub fn create(&self) -> Result<()> {
        for dir in [self.root.clone(), self.health_dir(), self.spacing_dir(), self.lines_dir()] {
            ensure_dir_exists(&dir)?;
        }
        Ok(())
    }
}

/// An image with its label file and elevation model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageJob {
    pub image: PathBuf,
    pub labels: PathBuf,
    pub dem: PathBuf,
}

impl ImageJob {
    /// Pair `image` with `<stem>.json` beside it and its DEM in `dem_dir`.
    pub fn for_image(image: &Path, dem_dir: &Path) -> Result<Self> {
        let name = file_name(image)?;
        let stem = image.file_stem().and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("[batch::ImageJob::for_image] Image has no file stem: {}", image.display()))?;
        Ok(Self {
            image: image.to_path_buf(),
            labels: image.with_file_name(format!("{stem}.json")),
            dem: dem_dir.join(dem_file_name(&name)),
        })
    }

    /// File name of the image.
    pub fn name(&self) -> String {
        self.image.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }

    /// File stem of the image, used to name the GeoJSON outputs.
    pub fn stem(&self) -> String {
        self.image.file_stem().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name().and_then(|n| n.to_str()).map(str::to_string)
        .ok_or_else(|| anyhow!("[batch::file_name] Path has no UTF-8 file name: {}", path.display()))
}

/// DEM file name for an image: the last `_` component is replaced, e.g.
/// `P2_19B_imagesRGB_orthomosaic.tif` → `P2_19B_imagesRGB_dem_dem_norm_utm.tif`.
pub fn dem_file_name(image_name: &str) -> String {
    match image_name.rsplit_once('_') {
        Some((prefix, _)) => format!("{prefix}_{DEM_SUFFIX}"),
        None => DEM_SUFFIX.to_string(),
    }
}

/// Images directly inside `image_dir` (no recursion), sorted by path.
pub fn discover_jobs(image_dir: &Path, dem_dir: &Path) -> Result<Vec<ImageJob>> {
    require_dir_exists(image_dir)?;

    let mut images: Vec<PathBuf> = WalkDir::new(image_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    images.sort();

    info!("Found {} images in {}", images.len(), image_dir.display());
    images.iter().map(|image| ImageJob::for_image(image, dem_dir)).collect()
}

/// Everything computed for one image.
#[derive(Debug, Clone)]
pub struct ImageAnalysis {
    pub segments: Vec<ClassifiedSegment>,
    pub graph: ProximityGraph,
    pub outcome: SpacingOutcome,
    pub lines: Vec<ConnectionLine>,
    pub summary: ImageSummary,
}

/// Runs the health and spacing stages with one configuration.
#[derive(Debug, Clone)]
pub struct ImagePipeline {
    config: AnalysisConfig,
    estimator: CanopyHealthEstimator,
    builder: SpacingGraphBuilder,
    optimizer: SpacingOptimizer,
}

impl ImagePipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate().context("[batch::ImagePipeline::new] Invalid configuration")?;
        Ok(Self {
            estimator: CanopyHealthEstimator::new(&config)?,
            builder: SpacingGraphBuilder::new(config.buffer_distance),
            optimizer: SpacingOptimizer::new(config.well_spacing_distance),
            config,
        })
    }

    #[inline] pub fn config(&self) -> &AnalysisConfig { &self.config }

    #[inline] pub fn estimator(&self) -> &CanopyHealthEstimator { &self.estimator }

    /// Build the proximity graph over segment centroids and optimize spacing.
    pub fn spacing(&self, segments: &[ClassifiedSegment]) -> (ProximityGraph, SpacingOutcome) {
        let graph = self.builder.build_from_segments(segments);
        let outcome = self.optimizer.optimize(&graph);
        (graph, outcome)
    }

    /// Score, graph and summarize one image already opened as raster sources.
    pub fn analyze(
        &self,
        name: &str,
        image: &dyn RasterSource,
        elevation: &dyn RasterSource,
        shapes: &[LabelShape],
    ) -> Result<ImageAnalysis> {
        let segments = self.estimator.estimate(image, elevation, &outlines(shapes))
            .with_context(|| format!("[batch::analyze] Failed to score segments of {name}"))?;
        let (graph, outcome) = self.spacing(&segments);
        let lines = connection_lines(&graph, &self.config.line_classes);

        let heights: Vec<f64> = segments.iter().filter_map(|s| s.height_meters).collect();
        let average_height = if heights.is_empty() { 0.0 } else { heights.iter().sum::<f64>() / heights.len() as f64 };
        let (plot, stratum) = plot_and_stratum(name).unzip();

        let summary = ImageSummary {
            image: name.to_string(),
            plot,
            stratum,
            total_trees: count_label(shapes, &self.config.tree_label),
            well_spaced_trees: outcome.well_spaced_count(),
            average_height,
            well_spaced_average_height: outcome.average_height,
            height_buckets: self.config.height_buckets.count(heights.iter().copied()),
            crown_closure_area: segments.iter().map(|s| s.area_m2).sum(),
            image_area: image_area(image).with_context(|| format!("[batch::analyze] Failed to measure {name}"))?,
            plot_record: None,
        };
        debug!(image = name, trees = summary.total_trees, well_spaced = summary.well_spaced_trees, "image analyzed");

        Ok(ImageAnalysis { segments, graph, outcome, lines, summary })
    }

    /// Open the job's rasters and labels, analyze, and write the three GeoJSON outputs.
    pub fn process(&self, job: &ImageJob, layout: &OutputLayout) -> Result<ImageSummary> {
        let name = job.name();
        info!("Processing {name}");

        let image = GeoTiffRaster::open(&job.image)
            .with_context(|| format!("[batch::process] Failed to open image {}", job.image.display()))?;
        let elevation = GeoTiffRaster::open(&job.dem)
            .with_context(|| format!("[batch::process] Failed to open DEM {}", job.dem.display()))?;
        let shapes = read_labels(&job.labels)?;

        let analysis = self.analyze(&name, &image, &elevation, &shapes)?;
        let palette = &self.config.palette;
        let file = format!("{}.geojson", job.stem());
        write_geojson(&layout.health_dir().join(&file), &health_collection(&analysis.segments, palette))?;
        write_geojson(&layout.spacing_dir().join(&file), &spacing_collection(&analysis.graph, &analysis.outcome))?;
        write_geojson(&layout.lines_dir().join(&file), &lines_collection(&analysis.lines, palette))?;

        info!("Finished {name}: {} trees, {} well spaced", analysis.summary.total_trees, analysis.summary.well_spaced_trees);
        Ok(analysis.summary)
    }
}

/// Geodesic area in m² of a raster's footprint.
pub fn image_area(raster: &dyn RasterSource) -> Result<f64> {
    let crs = raster.crs().ok_or_else(|| anyhow!("[batch::image_area] Raster has no CRS"))?;
    let bounds = raster.bounds().ok_or_else(|| anyhow!("[batch::image_area] Raster has no transform"))?;
    Ok(footprint_area(bounds, &Reprojector::to_wgs84(crs)?)?)
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One summary per successful image, sorted by image name.
    pub summaries: Vec<ImageSummary>,
    /// Images that failed, with the error chain.
    pub failures: Vec<(PathBuf, String)>,
}

/// Process every image in `image_dir` in parallel, writing outputs under `out_dir`.
///
/// A failing image is logged and left out of the summary; the rest still run.
pub fn run_batch(
    pipeline: &ImagePipeline,
    image_dir: &Path,
    dem_dir: &Path,
    out_dir: &Path,
    plots: Option<&PlotTable>,
) -> Result<BatchReport> {
    let layout = OutputLayout::new(out_dir);
    layout.create()?;
    let jobs = discover_jobs(image_dir, dem_dir)?;

    let results: Vec<(PathBuf, Result<ImageSummary>)> = jobs
        .par_iter()
        .map(|job| (job.image.clone(), pipeline.process(job, &layout)))
        .collect();

    let mut report = BatchReport::default();
    for (image, result) in results {
        match result {
            Ok(mut summary) => {
                if let (Some(table), Some(plot), Some(stratum)) = (plots, summary.plot, summary.stratum) {
                    summary.plot_record = table.lookup(plot, stratum).cloned();
                }
                report.summaries.push(summary);
            }
            Err(e) => {
                warn!("Skipping {}: {:#}", image.display(), e);
                report.failures.push((image, format!("{e:#}")));
            }
        }
    }
    report.summaries.sort_by(|a, b| a.image.cmp(&b.image));

    write_summary(&report.summaries, &layout.summary_path())?;
    info!(
        "Batch finished: {} succeeded, {} failed, summary at {}",
        report.summaries.len(), report.failures.len(), layout.summary_path().display()
    );
    Ok(report)
}
