//! The `dump-schema` subcommand.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use gedi_parquet::{format_schema, read_parquet_schema, read_schema_file, DumpOptions};

#[derive(Parser, Debug)]
pub struct Args {
    /// Path to a .parquet file or an Arrow stream file containing a schema.
    /// Anything without a .parquet extension is treated as an Arrow stream.
    file: PathBuf,

    /// Show full metadata values instead of one ~80 character line each
    #[arg(long)]
    no_truncate_metadata: bool,

    /// Hide field-level key/value metadata
    #[arg(long)]
    no_field_metadata: bool,

    /// Hide schema-level key/value metadata
    #[arg(long)]
    no_schema_metadata: bool,
}

pub fn run(args: Args) -> Result<()> {
    let is_parquet = args
        .file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

    let options = DumpOptions {
        truncate_metadata: !args.no_truncate_metadata,
        show_field_metadata: !args.no_field_metadata,
        show_schema_metadata: !args.no_schema_metadata,
    };

    if is_parquet {
        let (schema, geo) = read_parquet_schema(&args.file)?;
        print!("{}", format_schema(&schema, &options));
        if let Some(geo) = geo {
            println!("Geo metadata: {}", geo);
        }
    } else {
        let schema = read_schema_file(&args.file)?;
        print!("{}", format_schema(&schema, &options));
    }
    Ok(())
}
