use bitflags::bitflags;

/// Number of bus-addressable registers held in [`RegisterFile`].
pub const REGISTER_COUNT: usize = 15;

bitflags! {
    /// Condition flags held in the flags register.
    ///
    /// Bit positions match the flag-mask field of a control word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
    pub struct Flags: u16 {
        /// Carry out of bit 15, or borrow.
        const C = 1 << 0;
        /// Zero result.
        const Z = 1 << 1;
        /// Negative result (bit 15 set).
        const N = 1 << 2;
        /// Signed overflow.
        const V = 1 << 3;
        /// Break.
        const B = 1 << 4;
        /// Interrupt enable.
        const I = 1 << 5;
    }
}

/// Register that can drive or latch the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    A = 0,
    B = 1,
    X = 2,
    Y = 3,
    T = 4,
    N = 5,
    R = 6,
    O = 7,
    /// Stack pointer.
    Sp = 8,
    /// Return-stack pointer.
    Rsp = 9,
    /// Program counter.
    Pc = 10,
    /// Working register.
    W = 11,
    /// First ALU input latch.
    Alu1 = 12,
    /// Second ALU input latch.
    Alu2 = 13,
    /// ALU result latch.
    AluResult = 14,
}

impl Register {
    /// Ordered list of every bus-addressable register.
    pub const ALL: [Self; REGISTER_COUNT] = [
        Self::A,
        Self::B,
        Self::X,
        Self::Y,
        Self::T,
        Self::N,
        Self::R,
        Self::O,
        Self::Sp,
        Self::Rsp,
        Self::Pc,
        Self::W,
        Self::Alu1,
        Self::Alu2,
        Self::AluResult,
    ];

    /// Returns the array index for this register.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short display name used in register dumps.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::X => "X",
            Self::Y => "Y",
            Self::T => "T",
            Self::N => "N",
            Self::R => "R",
            Self::O => "O",
            Self::Sp => "SP",
            Self::Rsp => "RSP",
            Self::Pc => "PC",
            Self::W => "W",
            Self::Alu1 => "ALU1",
            Self::Alu2 => "ALU2",
            Self::AluResult => "ALUR",
        }
    }
}

/// Complete register-transfer state of the control unit.
///
/// Every transfer passes through `bus`; there are no register-to-register paths.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    registers: [u16; REGISTER_COUNT],
    address: u16,
    bus: u16,
    flags: Flags,
}

impl RegisterFile {
    /// Creates a register file with every register cleared and `PC` at `pc`.
    #[must_use]
    pub fn with_pc(pc: u16) -> Self {
        let mut file = Self::default();
        file.set(Register::Pc, pc);
        file
    }

    /// Reads a register.
    #[must_use]
    pub const fn get(&self, reg: Register) -> u16 {
        self.registers[reg.index()]
    }

    /// Writes a register.
    pub const fn set(&mut self, reg: Register, value: u16) {
        self.registers[reg.index()] = value;
    }

    /// Adds a signed amount to a register with 16-bit wraparound.
    pub const fn adjust(&mut self, reg: Register, delta: i16) {
        self.registers[reg.index()] = self.registers[reg.index()].wrapping_add_signed(delta);
    }

    /// Reads the program counter.
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.get(Register::Pc)
    }

    /// Reads the address latch.
    #[must_use]
    pub const fn address(&self) -> u16 {
        self.address
    }

    /// Writes the address latch.
    pub const fn set_address(&mut self, value: u16) {
        self.address = value;
    }

    /// Reads the shared bus.
    #[must_use]
    pub const fn bus(&self) -> u16 {
        self.bus
    }

    /// Drives the shared bus.
    pub const fn set_bus(&mut self, value: u16) {
        self.bus = value;
    }

    /// Reads the flags register.
    #[must_use]
    pub const fn flags(&self) -> Flags {
        self.flags
    }

    /// Replaces the flags register.
    pub const fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    /// Replaces the flags register from a raw bus value.
    pub const fn set_flags_bits(&mut self, bits: u16) {
        self.flags = Flags::from_bits_truncate(bits);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_indices_are_dense() {
        for (i, reg) in Register::ALL.iter().enumerate() {
            assert_eq!(reg.index(), i);
        }
    }

    #[test]
    fn adjust_wraps_at_sixteen_bits() {
        let mut regs = RegisterFile::default();
        regs.adjust(Register::Sp, -2);
        assert_eq!(regs.get(Register::Sp), 0xFFFE);
        regs.adjust(Register::Sp, 2);
        assert_eq!(regs.get(Register::Sp), 0);
    }

    #[test]
    fn flags_from_bus_drop_undefined_bits() {
        let mut regs = RegisterFile::default();
        regs.set_flags_bits(0xFF03);
        assert_eq!(regs.flags(), Flags::C | Flags::Z);
    }

    #[test]
    fn with_pc_sets_only_the_program_counter() {
        let regs = RegisterFile::with_pc(0x0200);
        assert_eq!(regs.pc(), 0x0200);
        assert_eq!(regs.get(Register::A), 0);
        assert_eq!(regs.address(), 0);
        assert_eq!(regs.bus(), 0);
    }
}
