use anyhow::{Context, Result};
use canopy::{
    io::{fs::assert_not_stdout, geojson::{health_collection, write_geojson}, labels::{outlines, read_labels}},
    raster::GeoTiffRaster,
    CanopyHealthEstimator,
};
use tracing::info;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::HealthArgs) -> Result<()> {
    assert_not_stdout(&args.output)?;

    let mut config = crate::load_config(cli)?;
    if let Some(gsd) = args.gsd { config.target_gsd = gsd; }
    config.validate().context("[health] Invalid configuration")?;

    info!("[health] reading {} and {}", args.image.display(), args.dem.display());
    let image = GeoTiffRaster::open(&args.image)?;
    let elevation = GeoTiffRaster::open(&args.dem)?;
    let shapes = read_labels(&args.labels)?;

    let estimator = CanopyHealthEstimator::new(&config)?;
    let segments = estimator.estimate(&image, &elevation, &outlines(&shapes))?;
    let classified = segments.iter().filter(|s| s.health_class.is_some()).count();
    info!("[health] classified {classified} of {} segments", segments.len());

    info!("[health] writing {}", args.output.display());
    write_geojson(&args.output, &health_collection(&segments, &config.palette))
}
