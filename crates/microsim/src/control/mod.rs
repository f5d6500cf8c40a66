//! Control store and control-word decoding.

pub mod word;

pub use word::{AluOp, BusSink, BusSource, ControlWord, CONTROL_WORD_BYTES};

use crate::error::SimError;

/// Microcode memory addressed by `opcode << microstep_bits | step`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlStore {
    words: Box<[u64]>,
}

impl ControlStore {
    /// Creates a store of `size` zeroed words.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            words: vec![0; size].into_boxed_slice(),
        }
    }

    /// Depth in words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` when the store has no words.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Raw word at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::ControlStoreOverrun`] when `address` is past the end.
    pub fn raw(&self, address: usize) -> Result<u64, SimError> {
        self.words
            .get(address)
            .copied()
            .ok_or(SimError::ControlStoreOverrun {
                address,
                size: self.words.len(),
            })
    }

    /// Decoded word at `address`.
    ///
    /// # Errors
    ///
    /// Returns an overrun or field-decoding [`SimError`].
    pub fn read(&self, address: usize) -> Result<ControlWord, SimError> {
        ControlWord::decode(self.raw(address)?)
    }

    /// Stores raw words starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Load`] when the words run past the end of the store.
    pub fn load_words(&mut self, address: usize, words: &[u64]) -> Result<(), SimError> {
        let end = address
            .checked_add(words.len())
            .filter(|&end| end <= self.words.len())
            .ok_or_else(|| {
                SimError::Load(format!(
                    "{} control words at {address:#06x} exceed the {}-word control store",
                    words.len(),
                    self.words.len()
                ))
            })?;
        self.words[address..end].copy_from_slice(words);
        Ok(())
    }

    /// Stores a record payload of little-endian 64-bit words starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Load`] when the payload is not a whole number of words
    /// or does not fit.
    pub fn load_bytes(&mut self, address: usize, bytes: &[u8]) -> Result<(), SimError> {
        let chunks = bytes.chunks_exact(CONTROL_WORD_BYTES);
        if !chunks.remainder().is_empty() {
            return Err(SimError::Load(format!(
                "control-store payload at {address:#06x} is {} bytes, not a multiple of {CONTROL_WORD_BYTES}",
                bytes.len()
            )));
        }
        let words: Vec<u64> = chunks
            .map(|chunk| {
                let mut raw = [0; CONTROL_WORD_BYTES];
                raw.copy_from_slice(chunk);
                u64::from_le_bytes(raw)
            })
            .collect();
        self.load_words(address, &words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_past_the_end_overrun() {
        let store = ControlStore::new(8);
        assert_eq!(
            store.raw(8),
            Err(SimError::ControlStoreOverrun {
                address: 8,
                size: 8
            })
        );
    }

    #[test]
    fn loads_little_endian_words() {
        let mut store = ControlStore::new(16);
        store
            .load_bytes(8, &[0, 0, 0, 0, 0, 0, 0, 0x08, 0x44, 0, 0, 0, 0, 0, 0, 0])
            .unwrap();
        assert_eq!(store.raw(8), Ok(word::END));
        assert_eq!(store.raw(9), Ok(0x44));
        assert!(store.read(8).unwrap().end);
    }

    #[test]
    fn rejects_partial_words_and_overflow() {
        let mut store = ControlStore::new(4);
        assert!(matches!(store.load_bytes(0, &[1, 2, 3, 4]), Err(SimError::Load(_))));
        assert!(matches!(store.load_words(3, &[1, 2]), Err(SimError::Load(_))));
        assert!(store.load_words(2, &[1, 2]).is_ok());
    }
}
