//! Byte-addressed memory image seen through the address latch.

use crate::error::SimError;

/// Size in bytes of the flat address space reachable by a 16-bit address latch.
pub const ADDRESS_SPACE_BYTES: usize = u16::MAX as usize + 1;

/// Allocates a zeroed backing store of `size` bytes.
#[must_use]
pub fn new_address_space(size: usize) -> Box<[u8]> {
    vec![0; size.max(1)].into_boxed_slice()
}

/// Byte-addressed RAM with little-endian 16-bit word access.
///
/// Addresses wrap modulo the image size, so an image smaller than
/// [`ADDRESS_SPACE_BYTES`] mirrors itself across the address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    bytes: Box<[u8]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(ADDRESS_SPACE_BYTES)
    }
}

impl Memory {
    /// Creates a zeroed memory image of `size` bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            bytes: new_address_space(size),
        }
    }

    /// Image size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when the image has no bytes. Never the case for a constructed image.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn index(&self, address: u16) -> usize {
        usize::from(address) % self.bytes.len()
    }

    /// Reads one byte.
    #[must_use]
    pub fn read_byte(&self, address: u16) -> u8 {
        self.bytes[self.index(address)]
    }

    /// Writes one byte.
    pub fn write_byte(&mut self, address: u16, value: u8) {
        let index = self.index(address);
        self.bytes[index] = value;
    }

    /// Reads a little-endian word from `address` and `address + 1`.
    #[must_use]
    pub fn read_word(&self, address: u16) -> u16 {
        u16::from_le_bytes([
            self.read_byte(address),
            self.read_byte(address.wrapping_add(1)),
        ])
    }

    /// Writes a little-endian word to `address` and `address + 1`.
    pub fn write_word(&mut self, address: u16, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.write_byte(address, low);
        self.write_byte(address.wrapping_add(1), high);
    }

    /// Copies `data` into the image starting at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Load`] when the data would run past the end of the image.
    pub fn load(&mut self, address: u32, data: &[u8]) -> Result<(), SimError> {
        let start = usize::try_from(address).unwrap_or(usize::MAX);
        let end = start.checked_add(data.len()).filter(|&end| end <= self.bytes.len());
        let Some(end) = end else {
            return Err(SimError::Load(format!(
                "{} bytes at {address:#06x} exceed the {}-byte memory image",
                data.len(),
                self.bytes.len()
            )));
        };
        self.bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Read-only view of the whole image.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}
