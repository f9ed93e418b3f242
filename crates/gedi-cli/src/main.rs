//! GEDI granule conversion tool.
//!
//! Converts GEDI HDF5 granules (L2A, L2B, L4A, L4C) into GeoParquet files,
//! and provides schema tooling around the conversion:
//! - `convert`: HDF5 granule to GeoParquet
//! - `dump-schema`: print the schema of a parquet or Arrow schema file
//! - `generate-schema`: build a schema file from a reference granule

mod convert;
mod dump_schema;
mod generate_schema;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "gedi-geoparquet")]
#[command(about = "Convert GEDI HDF5 granules to GeoParquet")]
struct Cli {
    /// Log level
    #[arg(long, env = "GEDI_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a GEDI HDF5 file to a GeoParquet file
    Convert(convert::Args),
    /// Print the schema of a .parquet or Arrow schema file
    DumpSchema(dump_schema::Args),
    /// Generate an Arrow schema file from a reference granule
    GenerateSchema(generate_schema::Args),
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Silence libhdf5's stderr diagnostics before any file is touched.
    gedi_hdf5::silence_hdf5_errors();

    match cli.command {
        Command::Convert(args) => convert::run(args),
        Command::DumpSchema(args) => dump_schema::run(args),
        Command::GenerateSchema(args) => generate_schema::run(args),
    }
}
