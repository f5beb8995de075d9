#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the EMCI neighborhood pipeline.
//!
//! Every stage can run on its own, reading its predecessor's artifact from
//! the output directory, or all of them can run in order with `run`.
//!
//! Uses `indicatif-log-bridge` (via [`emci_cli_utils::init_logger`]) to
//! route `log` output through `indicatif::MultiProgress` so that log lines
//! and progress bars never fight for the terminal.

mod config;
mod paths;
mod pipeline;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use emci_parcel::registry::all_formats;

use crate::config::PipelineConfig;
use crate::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "emci_cli", about = "NYC neighborhood EMCI pipeline")]
struct Cli {
    /// Pipeline settings file
    #[arg(long, global = true, default_value = "emci.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the known parcel source formats
    Formats,
    /// Normalize every configured parcel extract into one table
    Normalize,
    /// Classify each parcel's change across years
    Classify,
    /// Score building demand and aggregate it per neighborhood
    Demand,
    /// Measure infrastructure density per neighborhood
    Density,
    /// Compose EMCI, normalize per year and forecast the trend
    Composite,
    /// Cluster and name neighborhoods for the reference year
    Cluster,
    /// Export one year of the composite table as `GeoJSON`
    Export {
        /// Observed year to export
        #[arg(long)]
        year: i32,
    },
    /// Run every stage in dependency order
    Run,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = emci_cli_utils::init_logger();
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Formats) {
        println!("{:<20} {:<8} {:<8} NAME", "ID", "VERSION", "READER");
        println!("{}", "-".repeat(60));
        for format in all_formats() {
            println!(
                "{:<20} {:<8} {:<8} {}",
                format.id,
                format.version,
                format.reader.to_string(),
                format.name
            );
        }
        return Ok(());
    }

    let start = Instant::now();
    let config = PipelineConfig::load(&cli.config)?;
    let pipeline = Pipeline::new(&config, &multi)?;

    match cli.command {
        Commands::Formats => {}
        Commands::Normalize => pipeline.normalize()?,
        Commands::Classify => pipeline.classify()?,
        Commands::Demand => pipeline.demand()?,
        Commands::Density => pipeline.density()?,
        Commands::Composite => pipeline.composite()?,
        Commands::Cluster => pipeline.cluster()?,
        Commands::Export { year } => pipeline.export(year)?,
        Commands::Run => pipeline.run()?,
    }

    log::info!("Done in {:.1?}", start.elapsed());
    Ok(())
}
