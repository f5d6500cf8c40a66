//! Register-file state for the microcode control unit.

mod registers;

pub use registers::{Flags, Register, RegisterFile, REGISTER_COUNT};
