//! CLI entry point for the `mcasm` assembler.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use mcasm::{assemble, AssemblerConfig};
use microsim::RecordFormat;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;
use tracing as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Motorola S-records.
    Srec,
    /// Intel HEX.
    Ihex,
}

impl From<Format> for RecordFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Srec => Self::SRecord,
            Format::Ihex => Self::IntelHex,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Assemble a source file against a table-driven instruction set"
)]
struct Opts {
    /// Source file; its extension is replaced with `.asm`.
    #[arg(value_name = "SOURCE")]
    source: PathBuf,
    /// Object record format.
    #[arg(short, long, value_enum, default_value_t = Format::Srec)]
    format: Format,
    /// Do not print the listing or cross reference.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();
    let config = AssemblerConfig {
        record_format: opts.format.into(),
        ..AssemblerConfig::default()
    };

    let assembled = assemble(&opts.source, &config)
        .with_context(|| format!("assembling {}", opts.source.display()))?;
    let result = &assembled.result;

    println!("{}", result.pass1);
    if !opts.quiet {
        for entry in &result.listing {
            println!("{entry}");
        }
    }
    for error in result.pass1.errors.iter().chain(&result.pass2.errors) {
        eprintln!("{error}");
    }
    println!("{}", result.pass2);
    if !opts.quiet {
        println!();
        for line in result.cross_reference() {
            println!("{line}");
        }
    }
    Ok(())
}
