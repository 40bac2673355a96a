use clap::{Parser, Subcommand, command};
use std::path::PathBuf;

/// Research automation for the tangible water flow experiment
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// GRASS database directory holding the experiment location
    pub gisdbase: PathBuf,

    /// Location within the database
    #[arg(short, long, default_value = "tangible_water_flow")]
    pub location: String,

    /// Mapset the driver operates in
    #[arg(short, long, default_value = "analysis")]
    pub mapset: String,

    /// Number of experiment series
    #[arg(short, long, default_value_t = 2)]
    pub experiments: u32,

    #[command(subcommand)]
    pub driver: Driver,
}

#[derive(Subcommand, Debug)]
pub enum Driver {
    /// Re-grid scanned DEMs through a regularized tension spline
    Reinterpolate,
    /// Derive and render the reference terrain products
    Reference,
    /// Per-model products plus the experiment series statistics
    Analysis,
    /// Perspective renders of the reference and series products
    Render3d,
}

pub fn get_args() -> Args {
    Args::parse()
}
