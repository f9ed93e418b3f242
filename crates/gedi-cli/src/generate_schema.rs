//! The `generate-schema` subcommand.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use gedi_hdf5::Hdf5Store;
use gedi_parquet::{generate_schema, write_schema_file};

#[derive(Parser, Debug)]
pub struct Args {
    /// Path to an existing GEDI HDF5 file to read structure from
    hdf5_file: PathBuf,

    /// Group within the file to build the schema from
    #[arg(short, long, default_value = "/BEAM0000")]
    group: String,

    /// Text file listing dataset or group paths (one per line) relative to
    /// the group; blank lines and # comments are skipped
    #[arg(long)]
    datasets: PathBuf,

    /// Path to write the Arrow schema file to
    #[arg(short, long)]
    output: PathBuf,
}

pub fn run(args: Args) -> Result<()> {
    let listing = std::fs::read_to_string(&args.datasets)
        .with_context(|| format!("reading {}", args.datasets.display()))?;
    let relative_paths: Vec<String> = listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    let store = Hdf5Store::open(&args.hdf5_file)
        .with_context(|| format!("opening {}", args.hdf5_file.display()))?;
    let schema = generate_schema(store.root()?.as_ref(), &args.group, &relative_paths)?;
    write_schema_file(&schema, &args.output)?;

    info!(
        group = %args.group,
        fields = schema.fields().len(),
        output = %args.output.display(),
        "schema written"
    );
    Ok(())
}
