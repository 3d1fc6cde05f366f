//! Generate message artifacts from a directory of XML schemas.
//!
//! Usage:
//!   mavgen [OPTIONS] <SCHEMA_DIR> <OUTPUT_DIR>
//!
//! Every `*.xml` file in SCHEMA_DIR is compiled. Schema errors are printed as
//! `path: error` and make the exit status 1; all valid messages are still written.

use anyhow::Result;
use clap::Parser;
use mavgen::{default_workers, generate, Endianness, GenerateOptions};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// MAVLink-style message code generator
#[derive(Parser, Debug)]
#[command(name = "mavgen")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding the schema documents
    schema_dir: PathBuf,

    /// Directory the artifacts are written to
    output_dir: PathBuf,

    /// Compile threads (defaults to available parallelism)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Lay out payloads big-endian instead of little-endian
    #[arg(long)]
    big_endian: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| anyhow::anyhow!("invalid log filter: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let options = GenerateOptions {
        schema_dir: cli.schema_dir,
        output_dir: cli.output_dir,
        workers: cli.workers.unwrap_or_else(default_workers),
        endianness: if cli.big_endian {
            Endianness::Big
        } else {
            Endianness::Little
        },
    };
    let report = generate(&options)?;

    for doc in &report.documents {
        let path = doc.path.display();
        if let Some(e) = &doc.parse_error {
            eprintln!("{}: {}", path, e);
        }
        for e in &doc.schema_errors {
            eprintln!("{}: {}", path, e);
        }
    }
    println!(
        "mavgen: {} document(s), {} message(s), {} error(s)",
        report.documents.len(),
        report.message_count(),
        report.error_count()
    );
    if report.error_count() > 0 {
        std::process::exit(1);
    }
    Ok(())
}
