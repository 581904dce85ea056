use anyhow::{bail, Result};
use canopy::{io::plots::PlotTable, run_batch, ImagePipeline};
use tracing::info;

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::BatchArgs) -> Result<()> {
    let out_dir = args.output.clone().unwrap_or("./results".into());
    if out_dir.as_os_str() == "-" {
        bail!("stdout is not supported; provide an output directory.");
    }

    let pipeline = ImagePipeline::new(crate::load_config(cli)?)?;
    let plots = args.plots.as_deref().map(PlotTable::read).transpose()?;
    if let Some(table) = &plots {
        info!("[batch] loaded {} plot records", table.len());
    }

    let report = run_batch(&pipeline, &args.images, &args.dems, &out_dir, plots.as_ref())?;
    for (image, error) in &report.failures {
        eprintln!("[batch] failed {}: {}", image.display(), error);
    }
    if report.summaries.is_empty() && !report.failures.is_empty() {
        bail!("[batch] all {} images failed", report.failures.len());
    }
    Ok(())
}
