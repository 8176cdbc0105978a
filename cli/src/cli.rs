use std::path::PathBuf;

/// C-oriented schematization of polygon subdivisions
#[derive(clap::Parser, Debug)]
#[command(name = "cschematize", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Schematize the polygons of a GeoJSON FeatureCollection
    Schematize(SchematizeArgs),
}

#[derive(clap::Args, Debug)]
pub struct SchematizeArgs {
    /// Input GeoJSON FeatureCollection
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Output GeoJSON file, defaults to "./schematized.geojson"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// JSON configuration file; flags below override its fields
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Number of orientations (2 is rectilinear, 4 is octilinear)
    #[arg(short = 'n', long)]
    pub orientations: Option<usize>,

    /// Maximum edge length as a fraction of the bounding box diagonal
    #[arg(long)]
    pub lambda: Option<f64>,

    /// Number of area-preserving edge-move pairs
    #[arg(short, long)]
    pub moves: Option<usize>,
}
