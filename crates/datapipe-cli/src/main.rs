//! datapipe CLI
//!
//! Command-line interface for shape inference and subscriber ingest

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

#[derive(Debug, Parser)]
#[command(name = "datapipe")]
#[command(about = "datapipe - Record shape tracking for data pipelines", long_about = None)]
struct Cli {
    /// TOML config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the shape of one JSON record
    Shape(commands::shape::ShapeArgs),
    /// Ingest an NDJSON file of data points for a subscriber
    Ingest(commands::ingest::IngestArgs),
    /// List the shapes stored for a subscriber
    Shapes(commands::shapes::ShapesArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = config::Config::load(cli.config.as_deref()).and_then(|config| {
        datapipe_core::logging_facility::init(config.log_profile);
        match cli.command {
            Commands::Shape(args) => commands::shape::execute(args),
            Commands::Ingest(args) => commands::ingest::execute(args, &config),
            Commands::Shapes(args) => commands::shapes::execute(args, &config),
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
