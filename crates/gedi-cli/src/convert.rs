//! The `convert` subcommand.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use gedi_hdf5::{AttrValue, Hdf5Store};
use gedi_parquet::{write_parquet, Codec};
use gedi_scan::{assemble, ScanOptions};
use gedi_schema::{catalog_schema, geo_metadata_json, GEO_METADATA_KEY};

#[derive(Parser, Debug)]
pub struct Args {
    /// Path to an HDF5 GEDI file (L2A, L2B, L4A, or L4C) to convert
    input: PathBuf,

    /// Directory to write the resulting .parquet file to
    output_dir: PathBuf,

    /// Compression algorithm for the parquet output file
    #[arg(long, default_value = "zstd")]
    compression: String,

    /// Compression level for the codec; when omitted the writer picks the
    /// codec's default. Not every codec accepts a level.
    #[arg(long)]
    compression_level: Option<i32>,
}

pub fn run(args: Args) -> Result<()> {
    let codec: Codec = args.compression.parse()?;

    let store = Hdf5Store::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let root = store.root()?;

    let short_name = match root.attributes()?.get("short_name") {
        Some(AttrValue::Str(name)) => name.clone(),
        Some(other) => bail!(
            "short_name attribute of {} is not a string: {:?}",
            args.input.display(),
            other
        ),
        None => bail!(
            "{} has no top-level short_name attribute",
            args.input.display()
        ),
    };
    info!(collection = %short_name, "resolved collection");

    let schema = catalog_schema(&short_name)?;
    let scan = assemble(root, Some(schema))?;

    let stem = args
        .input
        .file_stem()
        .context("input path has no file name")?;
    let output = args.output_dir.join(stem).with_extension("parquet");
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let stream = scan.execute(ScanOptions::default())?;
    let rows = write_parquet(
        &output,
        scan.output_schema().clone(),
        stream,
        codec,
        args.compression_level,
        vec![(GEO_METADATA_KEY.to_string(), geo_metadata_json())],
    )?;

    info!(
        input = %args.input.display(),
        output = %output.display(),
        rows,
        "conversion complete"
    );
    Ok(())
}
