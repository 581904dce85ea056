use std::path::PathBuf;

/// Canopy health and tree spacing CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "canopy", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Analysis configuration (JSON); defaults apply to missing fields
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Score labelled canopy segments of one image (forbids stdout)
    Health(HealthArgs),

    /// Optimize tree spacing from a health GeoJSON (forbids stdout)
    Spacing(SpacingArgs),

    /// Process every image in a directory (forbids stdout)
    Batch(BatchArgs),
}

#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// RGB orthomosaic GeoTIFF
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub image: PathBuf,

    /// Elevation model GeoTIFF covering the image
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub dem: PathBuf,

    /// Segment labels (labelme JSON)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub labels: PathBuf,

    /// Output health GeoJSON
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Override the target ground sample distance (m)
    #[arg(long)]
    pub gsd: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct SpacingArgs {
    /// Health GeoJSON produced by `canopy health`
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub health: PathBuf,

    /// Output well-spacing GeoJSON
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Also write connection lines between neighbouring trees
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub lines: Option<PathBuf>,

    /// Override the proximity buffer distance (m)
    #[arg(long)]
    pub buffer: Option<f64>,

    /// Override the well-spacing distance (m)
    #[arg(long)]
    pub spacing: Option<f64>,
}

#[derive(clap::Args, Debug)]
pub struct BatchArgs {
    /// Directory of orthomosaics with `<stem>.json` labels beside them
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub images: PathBuf,

    /// Directory of elevation models
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub dems: PathBuf,

    /// Output directory, defaults to "./results"
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Plot metadata CSV joined into the summary
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub plots: Option<PathBuf>,
}
