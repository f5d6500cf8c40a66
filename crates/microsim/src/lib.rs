//! Microcode-level simulator for the table-driven CPU toolchain.
//!
//! The crate also owns the object-record codec shared with the assembler,
//! since both sides read and write the same S-record / Intel HEX files.

/// Object-record encoding and decoding.
pub mod records;
pub use records::{
    decode, encode, encode_label, Payload, Record, RecordError, RecordFormat, MAX_RECORD_PAYLOAD,
};

/// Simulator failure taxonomy.
pub mod error;
pub use error::SimError;

/// Construction-time simulator configuration.
pub mod config;
pub use config::{
    SimConfig, DEFAULT_BRANCH_OFFSET, DEFAULT_CONTROL_STORE_WORDS, DEFAULT_MICROSTEP_BITS,
};

/// Register file and condition flags.
pub mod state;
pub use state::{Flags, Register, RegisterFile, REGISTER_COUNT};

/// Byte-addressed memory image.
pub mod memory;
pub use memory::{new_address_space, Memory, ADDRESS_SPACE_BYTES};

/// Control store and control-word layout.
pub mod control;
pub use control::{AluOp, BusSink, BusSource, ControlStore, ControlWord, CONTROL_WORD_BYTES};

/// Fetch/decode/execute over rising and falling edges.
pub mod execute;
pub use execute::{ControlUnit, CycleOutcome};

/// Object-file loading into memory and the control store.
pub mod image;
pub use image::{parse_object, LoadSummary};

use anyhow as _;
use clap as _;
use tracing_subscriber as _;

#[cfg(test)]
use tempfile as _;
