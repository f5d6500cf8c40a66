//! Table-driven two-pass assembler.
//!
//! The instruction set is data: built-in directives are compiled in, machine
//! instructions are imported with `isa` from an assembled microcode object.

/// Two-pass driver, listing and cross reference.
pub mod assembler;
/// Line code generation and object-record chunking.
pub mod encoder;
/// Per-line and fatal error types.
pub mod errors;
/// Operand expression evaluation.
pub mod expr;
/// Instruction-key synthesis and reserved register names.
pub mod mnemonic;
/// Source line splitting and string expansion.
pub mod parser;
/// Source/object file naming and loading.
pub mod source;
/// Symbol table, location counter and local-label scope.
pub mod symbols;
/// Instruction table, built-in directives and `isa` import.
pub mod table;

pub use assembler::{assemble, AssembleResult, AssembledFile, Assembler, AssemblerConfig};
pub use errors::{AssembleError, ImportError, LineError, LineErrorKind};

use anyhow as _;
use clap as _;
use tracing_subscriber as _;
