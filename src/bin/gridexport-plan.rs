//! # Grid Export Plan Preview
//!
//! Loads a run configuration and a local GeoJSON export of the tile catalog, then
//! prints the batch plan with the artifact name every tile would be exported as.
//! No remote service is contacted.
//!
//! ```bash
//! GRIDEXPORT_CONFIG=config/run.toml \
//! GRIDEXPORT_CATALOG_FILE=data/grid.geojson \
//!     gridexport-plan
//! ```

use anyhow::{Context, Result};
use gridexport_core::catalog::{CatalogReader, GeoJsonFileSource};
use gridexport_core::config::ConfigManager;
use gridexport_core::logging::init_structured_logging;
use gridexport_core::naming::ArtifactNamer;
use gridexport_core::orchestration::BatchPlan;
use gridexport_core::remote::Session;
use tracing::info;

const CONFIG_VAR: &str = "GRIDEXPORT_CONFIG";
const CATALOG_VAR: &str = "GRIDEXPORT_CATALOG_FILE";

#[tokio::main]
async fn main() -> Result<()> {
    init_structured_logging();

    let config_path =
        std::env::var(CONFIG_VAR).with_context(|| format!("{CONFIG_VAR} must be set"))?;
    let catalog_path =
        std::env::var(CATALOG_VAR).with_context(|| format!("{CATALOG_VAR} must be set"))?;

    let manager = ConfigManager::load_from_file(&config_path)
        .with_context(|| format!("loading configuration from {config_path}"))?;
    let config = manager.config();

    let source = GeoJsonFileSource::new(&catalog_path);
    let tiles = CatalogReader::from_config(config)
        .load(&source, &Session::new("local"))
        .await
        .with_context(|| format!("reading catalog from {catalog_path}"))?;

    let namer = ArtifactNamer::from_config(config)?;
    let plan = BatchPlan::partition(tiles, config.batch_size_value())?;
    info!(
        environment = manager.environment(),
        tiles = plan.tile_count(),
        batches = plan.batch_count(),
        "Plan computed"
    );

    println!(
        "{} tiles in {} batches of up to {} ({} -> {})",
        plan.tile_count(),
        plan.batch_count(),
        plan.batch_size(),
        config.window,
        config.output_location
    );
    for (batch_index, batch) in plan.batches().iter().enumerate() {
        println!("batch {}/{}", batch_index + 1, plan.batch_count());
        for tile in batch {
            let name = namer.name(tile.identifier(), &config.window, config.variant)?;
            println!("  {:<16} {}", tile.identifier(), name);
        }
    }

    Ok(())
}
