use anyhow::{Context, Result};
use canopy::{
    batch::ImagePipeline,
    config::AnalysisConfig,
    io::{fs::assert_not_stdout, geojson::{lines_collection, read_health_features, spacing_collection, write_geojson}},
    spacing::connection_lines,
};
use tracing::{info, warn};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::SpacingArgs) -> Result<()> {
    assert_not_stdout(&args.output)?;
    if let Some(lines) = &args.lines { assert_not_stdout(lines)?; }

    let config = with_overrides(crate::load_config(cli)?, args);
    let pipeline = ImagePipeline::new(config).context("[spacing] Invalid configuration")?;

    info!("[spacing] reading {}", args.health.display());
    let segments = read_health_features(&args.health)?;
    let (graph, outcome) = pipeline.spacing(&segments);
    info!(
        "[spacing] {} trees, {} edges, {} removed, {} well spaced (avg height {:.2} m)",
        graph.node_count(), graph.edge_count(), outcome.removed.len(), outcome.well_spaced_count(), outcome.average_height,
    );
    if !outcome.converged {
        warn!("[spacing] pass limit reached after {} iterations with conflicts remaining", outcome.iterations);
    }

    info!("[spacing] writing {}", args.output.display());
    write_geojson(&args.output, &spacing_collection(&graph, &outcome))?;

    if let Some(path) = &args.lines {
        let lines = connection_lines(&graph, &pipeline.config().line_classes);
        info!("[spacing] writing {} connection lines to {}", lines.len(), path.display());
        write_geojson(path, &lines_collection(&lines, &pipeline.config().palette))?;
    }
    Ok(())
}

fn with_overrides(mut config: AnalysisConfig, args: &crate::cli::SpacingArgs) -> AnalysisConfig {
    if let Some(buffer) = args.buffer { config.buffer_distance = buffer; }
    if let Some(spacing) = args.spacing { config.well_spacing_distance = spacing; }
    config
}
