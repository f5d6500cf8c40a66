//! CLI entry point for the microcode simulator.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use microsim::{ControlUnit, Register, SimConfig};

use bitflags as _;
#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
#[cfg(test)]
use tempfile as _;
use thiserror as _;
use tracing as _;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run an assembled program against a microcode control store"
)]
struct Opts {
    /// Object file holding the assembled control store.
    #[arg(short, long, value_name = "OBJ")]
    microcode: PathBuf,
    /// Program counter at reset (decimal, `$hex` or `0xhex`).
    #[arg(short, long, value_parser = parse_address)]
    entry: Option<u16>,
    /// Number of fetch/decode/execute cycles to run.
    #[arg(short = 'n', long, default_value_t = 1)]
    instructions: usize,
    /// Object file holding the program image.
    #[arg(value_name = "PROGRAM_OBJ")]
    program: PathBuf,
}

fn parse_address(text: &str) -> Result<u16, String> {
    let text = text.trim();
    let parsed = if let Some(hex) = text.strip_prefix('$').or_else(|| text.strip_prefix("0x")) {
        u16::from_str_radix(hex, 16)
    } else {
        text.parse()
    };
    parsed.map_err(|err| format!("invalid address '{text}': {err}"))
}

fn print_registers(unit: &ControlUnit) {
    let regs = unit.registers();
    let line: Vec<String> = Register::ALL
        .iter()
        .map(|&reg| format!("{}={:04x}", reg.name(), regs.get(reg)))
        .collect();
    println!("{}", line.join(" "));
    println!(
        "ADDR={:04x} BUS={:04x} FLAGS={:?} MCP={:04x}",
        regs.address(),
        regs.bus(),
        regs.flags(),
        unit.micro_pc()
    );
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();
    let mut config = SimConfig::default();
    if let Some(entry) = opts.entry {
        config.reset_pc = entry;
    }
    let mut unit = ControlUnit::new(&config);

    let microcode = fs::read_to_string(&opts.microcode)
        .with_context(|| format!("reading {}", opts.microcode.display()))?;
    unit.load_microcode(&microcode)
        .with_context(|| format!("loading {}", opts.microcode.display()))?;

    let program = fs::read_to_string(&opts.program)
        .with_context(|| format!("reading {}", opts.program.display()))?;
    unit.load_program(&program)
        .with_context(|| format!("loading {}", opts.program.display()))?;

    for outcome in unit.run(opts.instructions)? {
        println!(
            "opcode {:02x} entry {:04x} steps {}",
            outcome.opcode, outcome.entry, outcome.micro_steps
        );
    }
    print_registers(&unit);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_address;

    #[test]
    fn parses_address_forms() {
        assert_eq!(parse_address("256"), Ok(256));
        assert_eq!(parse_address("$100"), Ok(256));
        assert_eq!(parse_address("0x100"), Ok(256));
        assert!(parse_address("$10000").is_err());
    }
}
