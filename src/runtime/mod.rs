use std::sync::Arc;

use clap::Parser;

use crate::catalog::Catalog;
use crate::cli::Cli;

mod commands;
mod logging;
mod settings;

pub use commands::sync_library;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let settings = settings::load_settings(cli.config.clone());
    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| settings.catalog.db_path.clone());
    let catalog = Arc::new(Catalog::open(&db_path)?);

    commands::execute(cli.command, &catalog, &settings)?;
    Ok(())
}
