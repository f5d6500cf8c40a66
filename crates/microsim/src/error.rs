use thiserror::Error;

use crate::records::RecordError;

/// Failures raised while loading or running the control unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A control word sets bits with no assigned meaning.
    #[error("control word {word:#018x}: reserved bits {bits:#018x} set")]
    ReservedBits {
        /// Raw control word.
        word: u64,
        /// The offending bits.
        bits: u64,
    },
    /// The ALU field of a control word holds an unassigned code.
    #[error("control word {word:#018x}: invalid alu operation {code}")]
    InvalidAluOp {
        /// Raw control word.
        word: u64,
        /// Offending field value.
        code: u8,
    },
    /// The micro-program counter ran past the end of the control store.
    #[error("control store address {address:#06x} is beyond the {size}-word control store")]
    ControlStoreOverrun {
        /// Requested control-store address.
        address: usize,
        /// Control-store size in words.
        size: usize,
    },
    /// An object image could not be placed into memory or the control store.
    #[error("load failed: {0}")]
    Load(String),
    /// An object file contained a malformed record.
    #[error("line {line}: {source}")]
    Record {
        /// 1-based line number inside the object file.
        line: usize,
        /// Underlying record error.
        #[source]
        source: RecordError,
    },
}
