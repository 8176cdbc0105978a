use anyhow::{Context, Result};
use cschematize::{read_geojson, write_geojson, Config, Directions, Subdivision};
use tracing::info;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::SchematizeArgs) -> Result<()> {
    let out_path = args.output.clone().unwrap_or("./schematized.geojson".into());

    let mut config = match &args.config {
        Some(path) => {
            let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            Config::from_json(&bytes)?
        }
        None => Config::default(),
    };
    if let Some(n) = args.orientations { config.directions = Directions::Count(n); }
    if let Some(lambda) = args.lambda { config.lambda = lambda; }
    if let Some(moves) = args.moves { config.max_edge_moves = moves; }

    info!(input = %args.input.display(), "reading features");
    let collection = read_geojson(&args.input)?;

    let mut subdivision = Subdivision::new(&collection.geometries, config)?;
    subdivision.schematize()?;

    let output = collection.with_geometries(subdivision.to_multipolygons())?;
    info!(output = %out_path.display(), features = output.len(), "writing schematized features");
    write_geojson(&out_path, &output)?;

    Ok(())
}
