//! Simulator configuration.

use crate::memory::ADDRESS_SPACE_BYTES;

/// Default control-store depth in 64-bit words (256 opcodes x 8 micro-steps).
pub const DEFAULT_CONTROL_STORE_WORDS: usize = 2048;
/// Default number of micro-step bits below the opcode in a control-store address.
pub const DEFAULT_MICROSTEP_BITS: u32 = 3;
/// Default offset ORed into the entry address for a taken flag-conditional entry.
pub const DEFAULT_BRANCH_OFFSET: usize = 4;

/// Construction-time configuration for a [`crate::ControlUnit`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SimConfig {
    /// Memory image size in bytes.
    pub memory_bytes: usize,
    /// Control-store depth in words.
    pub control_store_words: usize,
    /// Width of the micro-step counter in a control-store address.
    pub microstep_bits: u32,
    /// Offset selecting the alternate micro-sequence of a conditional opcode.
    pub branch_offset: usize,
    /// Program counter value after reset.
    pub reset_pc: u16,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            memory_bytes: ADDRESS_SPACE_BYTES,
            control_store_words: DEFAULT_CONTROL_STORE_WORDS,
            microstep_bits: DEFAULT_MICROSTEP_BITS,
            branch_offset: DEFAULT_BRANCH_OFFSET,
            reset_pc: 0,
        }
    }
}

impl SimConfig {
    /// Control-store address of the first micro-step for `opcode`.
    #[must_use]
    pub const fn entry_address(&self, opcode: u16) -> usize {
        (opcode as usize) << self.microstep_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_256_opcodes() {
        let config = SimConfig::default();
        assert_eq!(config.memory_bytes, 65536);
        assert_eq!(config.entry_address(0xFF) + 8, config.control_store_words);
        assert_eq!(config.entry_address(1), 8);
        assert_eq!(config.reset_pc, 0);
    }
}
