//! Instruction table: built-in directives plus imported machine instructions.
//!
//! Every line is dispatched through one lookup, directives included. Machine
//! instructions are not compiled in; they arrive via `isa`, which reads the
//! `<key>.instr` / `<key>.obytes` label pairs that `mch` left in an assembled
//! microcode object.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::errors::ImportError;

/// Directives that emit nothing themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// Blank, label-only or unknown line.
    Nop,
    /// `isa <name>`: import an instruction table.
    Isa,
    /// `org <addr>`: move the location counter.
    Org,
    /// `label = <expr>`: bind a value instead of the line address.
    Assign,
    /// `align <k>`: round the location counter up to a multiple of `k`.
    Align,
    /// `ds.b` / `bytes <n>`: reserve `n` bytes.
    ReserveBytes,
    /// `ds.w` / `words <n>`: reserve `n` words.
    ReserveWords,
    /// `mch <k>, <width>`: align and publish the label as an instruction.
    MicrocodeHeader,
}

impl Directive {
    /// Byte width used to print this directive's operands in the listing.
    #[must_use]
    pub const fn listing_width(self) -> usize {
        match self {
            Self::Org | Self::Assign => 2,
            Self::Nop | Self::Isa => 4,
            Self::Align | Self::ReserveBytes | Self::ReserveWords | Self::MicrocodeHeader => 1,
        }
    }
}

/// Byte width of each operand of an instruction or data directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperandWidth {
    /// One byte.
    Byte = 1,
    /// Two bytes, little-endian.
    Word = 2,
    /// Four bytes, little-endian.
    Dword = 4,
}

impl OperandWidth {
    /// Width in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        self as usize
    }

    /// Parses a width from its byte count.
    #[must_use]
    pub const fn from_bytes(bytes: i64) -> Option<Self> {
        match bytes {
            1 => Some(Self::Byte),
            2 => Some(Self::Word),
            4 => Some(Self::Dword),
            _ => None,
        }
    }
}

/// Encoding rule for one instruction-table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionRecord {
    /// A directive: no opcode, no operand bytes.
    NoOperand(Directive),
    /// Operand bytes only, each at the given width.
    OperandsOnly(OperandWidth),
    /// One control-store unit per operand.
    OneUnitPerOperand,
    /// An opcode byte followed by operands at `width`; `None` for operand-less
    /// instructions.
    Instruction {
        /// Opcode byte.
        opcode: u8,
        /// Operand width, if the instruction takes operands.
        width: Option<OperandWidth>,
    },
}

impl InstructionRecord {
    /// Location-counter advance for a line with `operands` operands.
    #[must_use]
    pub const fn size(self, operands: usize) -> usize {
        match self {
            Self::NoOperand(_) => 0,
            Self::OperandsOnly(width) => width.bytes() * operands,
            Self::OneUnitPerOperand => operands,
            Self::Instruction { width, .. } => match width {
                Some(width) => 1 + width.bytes() * operands,
                None => 1,
            },
        }
    }

    /// Byte width used to print operands in the listing.
    #[must_use]
    pub const fn listing_width(self) -> usize {
        match self {
            Self::NoOperand(directive) => directive.listing_width(),
            Self::OperandsOnly(width) => width.bytes(),
            Self::OneUnitPerOperand => 4,
            Self::Instruction { width, .. } => match width {
                Some(width) => width.bytes(),
                None => 4,
            },
        }
    }
}

const BUILTINS: [(&str, InstructionRecord); 16] = [
    ("", InstructionRecord::NoOperand(Directive::Nop)),
    ("isa", InstructionRecord::NoOperand(Directive::Isa)),
    ("org", InstructionRecord::NoOperand(Directive::Org)),
    ("=", InstructionRecord::NoOperand(Directive::Assign)),
    ("align", InstructionRecord::NoOperand(Directive::Align)),
    ("dc.b", InstructionRecord::OperandsOnly(OperandWidth::Byte)),
    ("dc.w", InstructionRecord::OperandsOnly(OperandWidth::Word)),
    ("byte", InstructionRecord::OperandsOnly(OperandWidth::Byte)),
    ("word", InstructionRecord::OperandsOnly(OperandWidth::Word)),
    ("dword", InstructionRecord::OperandsOnly(OperandWidth::Dword)),
    ("ds.b", InstructionRecord::NoOperand(Directive::ReserveBytes)),
    ("ds.w", InstructionRecord::NoOperand(Directive::ReserveWords)),
    ("bytes", InstructionRecord::NoOperand(Directive::ReserveBytes)),
    ("words", InstructionRecord::NoOperand(Directive::ReserveWords)),
    ("mch", InstructionRecord::NoOperand(Directive::MicrocodeHeader)),
    ("mc", InstructionRecord::OneUnitPerOperand),
];

/// Suffix of the symbol holding an imported instruction's opcode.
pub const INSTR_SUFFIX: &str = ".instr";
/// Suffix of the symbol holding an imported instruction's operand width.
pub const OBYTES_SUFFIX: &str = ".obytes";

/// Key → encoding rule map for one assembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionTable {
    records: HashMap<String, InstructionRecord>,
}

impl Default for InstructionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InstructionTable {
    /// Creates a table holding only the built-in directives.
    #[must_use]
    pub fn new() -> Self {
        let records = BUILTINS
            .iter()
            .map(|&(key, record)| (key.to_string(), record))
            .collect();
        Self { records }
    }

    /// Looks up the rule for a synthesized key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<InstructionRecord> {
        self.records.get(key).copied()
    }

    /// Returns `true` when `key` names a built-in directive.
    #[must_use]
    pub fn is_builtin(key: &str) -> bool {
        BUILTINS.iter().any(|&(name, _)| name == key)
    }

    /// Adds or replaces a machine instruction. Built-in keys are left untouched.
    ///
    /// Returns `true` when the entry was stored.
    pub fn insert(&mut self, key: impl Into<String>, opcode: u8, width: Option<OperandWidth>) -> bool {
        let key = key.into();
        if Self::is_builtin(&key) {
            warn!(key = %key, "import would shadow a built-in directive; ignored");
            return false;
        }
        self.records
            .insert(key, InstructionRecord::Instruction { opcode, width });
        true
    }

    /// Number of entries, built-ins included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always `false`: the built-ins are present from construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Imports the instructions described by an assembled microcode object file.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Io`] when the file cannot be read; the table is
    /// then unchanged.
    pub fn import_object(&mut self, path: &Path) -> Result<usize, ImportError> {
        let text = fs::read_to_string(path).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let count = self.import_text(&text);
        info!(count, path = %path.display(), "instructions loaded");
        Ok(count)
    }

    /// Imports instructions from object-file text and returns how many were added.
    ///
    /// Label records are paired by base name. Records that fail to decode,
    /// bases missing one half of the pair, and out-of-range values are skipped.
    pub fn import_text(&mut self, text: &str) -> usize {
        let mut opcodes: BTreeMap<String, u32> = BTreeMap::new();
        let mut widths: BTreeMap<String, u32> = BTreeMap::new();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record = match microsim::decode(line) {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(err) => {
                    warn!(line = index + 1, %err, "skipping malformed record");
                    continue;
                }
            };
            let Some(label) = record.label() else {
                continue;
            };
            if let Some(base) = label.strip_suffix(INSTR_SUFFIX) {
                opcodes.insert(base.to_string(), record.address);
            } else if let Some(base) = label.strip_suffix(OBYTES_SUFFIX) {
                widths.insert(base.to_string(), record.address);
            }
        }

        let mut count = 0;
        for (base, width) in widths {
            let Some(&opcode) = opcodes.get(&base) else {
                warn!(key = %base, "width without opcode; skipped");
                continue;
            };
            let Ok(opcode) = u8::try_from(opcode) else {
                warn!(key = %base, opcode, "opcode does not fit a byte; skipped");
                continue;
            };
            let width = match width {
                0 => None,
                other => match OperandWidth::from_bytes(i64::from(other)) {
                    Some(width) => Some(width),
                    None => {
                        warn!(key = %base, width = other, "unsupported operand width; skipped");
                        continue;
                    }
                },
            };
            if self.insert(base, opcode, width) {
                count += 1;
            }
        }
        count
    }
}
