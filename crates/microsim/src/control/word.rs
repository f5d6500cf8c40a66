//! Bit-field layout of a 64-bit control word and its structured decoding.
//!
//! Every bus source and every bus sink owns one bit, so a single step may drive
//! the bus from several sources and latch it into several sinks.

use bitflags::bitflags;

use crate::error::SimError;
use crate::state::{Flags, Register};

/// Bytes per control word in an object payload.
pub const CONTROL_WORD_BYTES: usize = 8;

/// Shift of the 20-bit bus-source set.
pub const SOURCE_SHIFT: u32 = 0;
/// Shift of the 19-bit bus-sink set.
pub const SINK_SHIFT: u32 = 20;
/// Shift of the 4-bit ALU operation field.
pub const ALU_SHIFT: u32 = 39;
/// Shift of the 6-bit flag-mask field.
pub const FLAG_MASK_SHIFT: u32 = 43;

const SOURCE_MASK: u64 = 0xF_FFFF;
const SINK_MASK: u64 = 0x7_FFFF;
const ALU_MASK: u64 = 0x0F;
const FLAG_MASK: u64 = 0x3F;

/// Set the masked flags on the rising edge.
pub const SET_FLAGS: u64 = 1 << 49;
/// Clear the masked flags on the rising edge.
pub const CLEAR_FLAGS: u64 = 1 << 50;
/// Flag-conditional entry: decode branches when any masked flag is set.
pub const CONDITIONAL: u64 = 1 << 51;
/// Pre-decrement `SP` by two.
pub const SP_MINUS2: u64 = 1 << 52;
/// Pre-decrement `RSP` by two.
pub const RSP_MINUS2: u64 = 1 << 53;
/// Post-increment `SP` by two.
pub const SP_PLUS2: u64 = 1 << 54;
/// Post-increment `RSP` by two.
pub const RSP_PLUS2: u64 = 1 << 55;
/// Post-increment `PC` by one.
pub const PC_PLUS1: u64 = 1 << 56;
/// Post-increment `PC` by two.
pub const PC_PLUS2: u64 = 1 << 57;
/// Instruction prefetch over the direct `PC` to address-latch path.
pub const FETCH: u64 = 1 << 58;
/// Last word of a micro-sequence.
pub const END: u64 = 1 << 59;

/// Bits with no assigned meaning.
pub const RESERVED: u64 = 0xF000_0000_0000_0000;

/// Bit of [`Register::A`] in both selector sets; the other registers follow in
/// [`Register::ALL`] order.
const REGISTER_BIT: u32 = 3;

bitflags! {
    /// Bus drivers selected for the rising edge.
    ///
    /// When more than one is set the bus carries the bitwise OR of their values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BusSource: u32 {
        /// Byte at the address latch.
        const MEMORY_BYTE = 1 << 0;
        /// Little-endian word at the address latch.
        const MEMORY_WORD = 1 << 1;
        /// The address latch itself.
        const ADDRESS = 1 << 2;
        /// Register A.
        const A = 1 << 3;
        /// Register B.
        const B = 1 << 4;
        /// Register X.
        const X = 1 << 5;
        /// Register Y.
        const Y = 1 << 6;
        /// Register T.
        const T = 1 << 7;
        /// Register N.
        const N = 1 << 8;
        /// Register R.
        const R = 1 << 9;
        /// Register O.
        const O = 1 << 10;
        /// Stack pointer.
        const SP = 1 << 11;
        /// Return-stack pointer.
        const RSP = 1 << 12;
        /// Program counter.
        const PC = 1 << 13;
        /// Working register.
        const W = 1 << 14;
        /// First ALU input latch.
        const ALU1 = 1 << 15;
        /// Second ALU input latch.
        const ALU2 = 1 << 16;
        /// ALU result latch.
        const ALU_RESULT = 1 << 17;
        /// The working register with its bytes exchanged.
        const W_SWAPPED = 1 << 18;
        /// The flags register.
        const FLAGS = 1 << 19;
    }
}

bitflags! {
    /// Bus receivers selected for the falling edge.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BusSink: u32 {
        /// Byte at the address latch (low byte of the bus).
        const MEMORY_BYTE = 1 << 0;
        /// Little-endian word at the address latch.
        const MEMORY_WORD = 1 << 1;
        /// The address latch.
        const ADDRESS = 1 << 2;
        /// Register A.
        const A = 1 << 3;
        /// Register B.
        const B = 1 << 4;
        /// Register X.
        const X = 1 << 5;
        /// Register Y.
        const Y = 1 << 6;
        /// Register T.
        const T = 1 << 7;
        /// Register N.
        const N = 1 << 8;
        /// Register R.
        const R = 1 << 9;
        /// Register O.
        const O = 1 << 10;
        /// Stack pointer.
        const SP = 1 << 11;
        /// Return-stack pointer.
        const RSP = 1 << 12;
        /// Program counter.
        const PC = 1 << 13;
        /// Working register.
        const W = 1 << 14;
        /// First ALU input latch.
        const ALU1 = 1 << 15;
        /// Second ALU input latch.
        const ALU2 = 1 << 16;
        /// ALU result latch.
        const ALU_RESULT = 1 << 17;
        /// The flags register.
        const FLAGS = 1 << 18;
    }
}

impl BusSource {
    /// The source bit of `reg`.
    #[must_use]
    pub const fn register(reg: Register) -> Self {
        Self::from_bits_retain(1 << (REGISTER_BIT + reg as u32))
    }
}

impl BusSink {
    /// The sink bit of `reg`.
    #[must_use]
    pub const fn register(reg: Register) -> Self {
        Self::from_bits_retain(1 << (REGISTER_BIT + reg as u32))
    }
}

/// ALU operation performed on the rising edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum AluOp {
    #[default]
    None = 0,
    Add = 1,
    Sub = 2,
    And = 3,
    Or = 4,
    Xor = 5,
    Inc = 6,
    Dec = 7,
    Shl = 8,
    Shr = 9,
}

impl AluOp {
    /// Decodes the 4-bit ALU field.
    #[must_use]
    pub const fn from_u4(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Add),
            2 => Some(Self::Sub),
            3 => Some(Self::And),
            4 => Some(Self::Or),
            5 => Some(Self::Xor),
            6 => Some(Self::Inc),
            7 => Some(Self::Dec),
            8 => Some(Self::Shl),
            9 => Some(Self::Shr),
            _ => None,
        }
    }
}

/// One control word decoded into named fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ControlWord {
    /// Rising-edge bus drivers.
    pub sources: BusSource,
    /// Falling-edge bus receivers.
    pub sinks: BusSink,
    /// Rising-edge ALU operation.
    pub alu: AluOp,
    /// Flags addressed by set/clear and by conditional entry.
    pub flag_mask: Flags,
    /// Set the masked flags.
    pub set_flags: bool,
    /// Clear the masked flags.
    pub clear_flags: bool,
    /// Branch into the alternate sequence when a masked flag is set.
    pub conditional: bool,
    /// `SP -= 2` before the transfer.
    pub sp_pre_decrement: bool,
    /// `RSP -= 2` before the transfer.
    pub rsp_pre_decrement: bool,
    /// `SP += 2` after the transfer.
    pub sp_post_increment: bool,
    /// `RSP += 2` after the transfer.
    pub rsp_post_increment: bool,
    /// `PC += 1` after the transfer.
    pub pc_plus1: bool,
    /// `PC += 2` after the transfer.
    pub pc_plus2: bool,
    /// Prefetch: address latch takes `PC`, then `PC` advances.
    pub fetch: bool,
    /// Terminates the micro-sequence once applied.
    pub end: bool,
}

impl ControlWord {
    /// Decodes a raw 64-bit control word.
    ///
    /// # Errors
    ///
    /// Returns a [`SimError`] when a reserved bit is set or the ALU field holds
    /// an unassigned code.
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode(word: u64) -> Result<Self, SimError> {
        if word & RESERVED != 0 {
            return Err(SimError::ReservedBits {
                word,
                bits: word & RESERVED,
            });
        }
        let alu_code = ((word >> ALU_SHIFT) & ALU_MASK) as u8;
        let Some(alu) = AluOp::from_u4(alu_code) else {
            return Err(SimError::InvalidAluOp {
                word,
                code: alu_code,
            });
        };

        Ok(Self {
            sources: BusSource::from_bits_retain(((word >> SOURCE_SHIFT) & SOURCE_MASK) as u32),
            sinks: BusSink::from_bits_retain(((word >> SINK_SHIFT) & SINK_MASK) as u32),
            alu,
            flag_mask: Flags::from_bits_truncate(((word >> FLAG_MASK_SHIFT) & FLAG_MASK) as u16),
            set_flags: word & SET_FLAGS != 0,
            clear_flags: word & CLEAR_FLAGS != 0,
            conditional: word & CONDITIONAL != 0,
            sp_pre_decrement: word & SP_MINUS2 != 0,
            rsp_pre_decrement: word & RSP_MINUS2 != 0,
            sp_post_increment: word & SP_PLUS2 != 0,
            rsp_post_increment: word & RSP_PLUS2 != 0,
            pc_plus1: word & PC_PLUS1 != 0,
            pc_plus2: word & PC_PLUS2 != 0,
            fetch: word & FETCH != 0,
            end: word & END != 0,
        })
    }

    /// Packs the fields back into a raw control word.
    #[must_use]
    pub fn encode(&self) -> u64 {
        let fields = transfer(self.sources, self.sinks, 0) | alu(self.alu) | flag_mask(self.flag_mask);
        [
            (self.set_flags, SET_FLAGS),
            (self.clear_flags, CLEAR_FLAGS),
            (self.conditional, CONDITIONAL),
            (self.sp_pre_decrement, SP_MINUS2),
            (self.rsp_pre_decrement, RSP_MINUS2),
            (self.sp_post_increment, SP_PLUS2),
            (self.rsp_post_increment, RSP_PLUS2),
            (self.pc_plus1, PC_PLUS1),
            (self.pc_plus2, PC_PLUS2),
            (self.fetch, FETCH),
            (self.end, END),
        ]
        .into_iter()
        .filter(|(set, _)| *set)
        .fold(fields, |word, (_, bit)| word | bit)
    }
}

/// Composes a control word that moves `sources` to `sinks` with extra single-bit controls.
#[must_use]
pub const fn transfer(sources: BusSource, sinks: BusSink, extra: u64) -> u64 {
    (sources.bits() as u64) << SOURCE_SHIFT | (sinks.bits() as u64) << SINK_SHIFT | extra
}

/// Composes the ALU field of a control word.
#[must_use]
pub const fn alu(op: AluOp) -> u64 {
    (op as u64) << ALU_SHIFT
}

/// Composes the flag-mask field of a control word.
#[must_use]
pub const fn flag_mask(flags: Flags) -> u64 {
    (flags.bits() as u64) << FLAG_MASK_SHIFT
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn zero_word_is_a_no_op() {
        assert_eq!(ControlWord::decode(0), Ok(ControlWord::default()));
    }

    #[test]
    fn end_bit_alone() {
        let word = ControlWord::decode(END).unwrap();
        assert!(word.end);
        assert!(word.sources.is_empty());
        assert!(word.sinks.is_empty());
    }

    #[rstest]
    #[case(Register::A, BusSource::A, BusSink::A)]
    #[case(Register::Sp, BusSource::SP, BusSink::SP)]
    #[case(Register::Pc, BusSource::PC, BusSink::PC)]
    #[case(Register::W, BusSource::W, BusSink::W)]
    #[case(Register::AluResult, BusSource::ALU_RESULT, BusSink::ALU_RESULT)]
    fn register_bits_follow_register_order(
        #[case] reg: Register,
        #[case] source: BusSource,
        #[case] sink: BusSink,
    ) {
        assert_eq!(BusSource::register(reg), source);
        assert_eq!(BusSink::register(reg), sink);
    }

    #[test]
    fn every_register_has_a_distinct_bit() {
        let sources = Register::ALL
            .iter()
            .fold(BusSource::empty(), |set, &reg| set | BusSource::register(reg));
        let sinks = Register::ALL
            .iter()
            .fold(BusSink::empty(), |set, &reg| set | BusSink::register(reg));
        assert_eq!(sources.bits().count_ones(), 15);
        assert_eq!(sinks.bits().count_ones(), 15);
        assert!(!sources.intersects(BusSource::W_SWAPPED | BusSource::FLAGS));
        assert!(!sinks.contains(BusSink::FLAGS));
    }

    #[test]
    fn sinks_decode_independently() {
        let raw = transfer(BusSource::X, BusSink::A | BusSink::ALU1 | BusSink::MEMORY_BYTE, END);
        let word = ControlWord::decode(raw).unwrap();
        assert_eq!(word.sources, BusSource::X);
        assert_eq!(word.sinks, BusSink::A | BusSink::ALU1 | BusSink::MEMORY_BYTE);
        assert!(word.end);
    }

    #[test]
    fn rejects_reserved_bits_and_unassigned_alu_codes() {
        assert_eq!(
            ControlWord::decode(1 << 60),
            Err(SimError::ReservedBits {
                word: 1 << 60,
                bits: 1 << 60
            })
        );
        assert!(matches!(
            ControlWord::decode(10 << ALU_SHIFT),
            Err(SimError::InvalidAluOp { code: 10, .. })
        ));
    }

    #[test]
    fn decodes_flag_mask_and_counters() {
        let raw = flag_mask(Flags::Z | Flags::C) | CONDITIONAL | SP_MINUS2 | PC_PLUS2 | FETCH;
        let word = ControlWord::decode(raw).unwrap();
        assert_eq!(word.flag_mask, Flags::Z | Flags::C);
        assert!(word.conditional);
        assert!(word.sp_pre_decrement);
        assert!(word.pc_plus2);
        assert!(word.fetch);
        assert!(!word.end);
        assert!(!word.pc_plus1);
    }

    proptest! {
        #[test]
        fn decode_then_encode_preserves_valid_words(
            selects in 0u64..(1 << ALU_SHIFT),
            op in 0u64..=9,
            rest in any::<u64>(),
        ) {
            let raw = selects | op << ALU_SHIFT | (rest & !RESERVED & !((1 << FLAG_MASK_SHIFT) - 1));
            let word = ControlWord::decode(raw).unwrap();
            prop_assert_eq!(word.encode(), raw);
        }
    }
}
