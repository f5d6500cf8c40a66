//! 16-bit ALU and the flag updates it produces.

use crate::control::AluOp;
use crate::state::Flags;

/// Result of one ALU operation before it is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluOutcome {
    /// 16-bit result.
    pub result: u16,
    /// Carry out of bit 15 (add, inc, shl), borrow (sub, dec) or the bit shifted out (shr).
    pub carry: bool,
    /// Signed overflow, only produced by add and sub.
    pub overflow: Option<bool>,
}

impl AluOutcome {
    /// Applies this outcome to `flags`: `Z`, `N` and `C` always, `V` when produced.
    #[must_use]
    pub fn update(self, mut flags: Flags) -> Flags {
        flags.set(Flags::Z, self.result == 0);
        flags.set(Flags::N, self.result & 0x8000 != 0);
        flags.set(Flags::C, self.carry);
        if let Some(overflow) = self.overflow {
            flags.set(Flags::V, overflow);
        }
        flags
    }
}

/// Evaluates `op` over the two input latches. `AluOp::None` produces nothing.
#[must_use]
pub const fn evaluate(op: AluOp, a: u16, b: u16) -> Option<AluOutcome> {
    let outcome = match op {
        AluOp::None => return None,
        AluOp::Add => {
            let (result, carry) = a.overflowing_add(b);
            AluOutcome {
                result,
                carry,
                overflow: Some((a ^ result) & (b ^ result) & 0x8000 != 0),
            }
        }
        AluOp::Sub => {
            let (result, borrow) = a.overflowing_sub(b);
            AluOutcome {
                result,
                carry: borrow,
                overflow: Some((a ^ b) & (a ^ result) & 0x8000 != 0),
            }
        }
        AluOp::And => logical(a & b),
        AluOp::Or => logical(a | b),
        AluOp::Xor => logical(a ^ b),
        AluOp::Inc => {
            let (result, carry) = a.overflowing_add(1);
            AluOutcome {
                result,
                carry,
                overflow: None,
            }
        }
        AluOp::Dec => {
            let (result, borrow) = a.overflowing_sub(1);
            AluOutcome {
                result,
                carry: borrow,
                overflow: None,
            }
        }
        AluOp::Shl => AluOutcome {
            result: a << 1,
            carry: a & 0x8000 != 0,
            overflow: None,
        },
        AluOp::Shr => AluOutcome {
            result: a >> 1,
            carry: a & 1 != 0,
            overflow: None,
        },
    };
    Some(outcome)
}

const fn logical(result: u16) -> AluOutcome {
    AluOutcome {
        result,
        carry: false,
        overflow: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AluOp::Add, 0x0001, 0x0002, 0x0003, false)]
    #[case(AluOp::Add, 0xFFFF, 0x0001, 0x0000, true)]
    #[case(AluOp::Sub, 0x0005, 0x0003, 0x0002, false)]
    #[case(AluOp::Sub, 0x0000, 0x0001, 0xFFFF, true)]
    #[case(AluOp::And, 0x0F0F, 0x00FF, 0x000F, false)]
    #[case(AluOp::Or, 0x0F00, 0x00F0, 0x0FF0, false)]
    #[case(AluOp::Xor, 0xFFFF, 0x0F0F, 0xF0F0, false)]
    #[case(AluOp::Inc, 0xFFFF, 0x1234, 0x0000, true)]
    #[case(AluOp::Dec, 0x0000, 0x1234, 0xFFFF, true)]
    #[case(AluOp::Shl, 0x8001, 0x0000, 0x0002, true)]
    #[case(AluOp::Shr, 0x0003, 0x0000, 0x0001, true)]
    fn evaluates_sixteen_bit_ops(
        #[case] op: AluOp,
        #[case] a: u16,
        #[case] b: u16,
        #[case] result: u16,
        #[case] carry: bool,
    ) {
        let outcome = evaluate(op, a, b).unwrap();
        assert_eq!(outcome.result, result);
        assert_eq!(outcome.carry, carry);
    }

    #[test]
    fn none_produces_nothing() {
        assert_eq!(evaluate(AluOp::None, 1, 2), None);
    }

    #[test]
    fn flags_follow_result() {
        let zero = evaluate(AluOp::Add, 0xFFFF, 1).unwrap().update(Flags::empty());
        assert_eq!(zero, Flags::Z | Flags::C);

        let negative = evaluate(AluOp::Add, 0x7FFF, 1).unwrap().update(Flags::C | Flags::I);
        assert_eq!(negative, Flags::N | Flags::V | Flags::I);
    }

    #[test]
    fn logical_ops_keep_overflow_flag() {
        let flags = evaluate(AluOp::And, 1, 1).unwrap().update(Flags::V | Flags::C);
        assert_eq!(flags, Flags::V);
    }
}
