//! Instruction-key synthesis from a mnemonic and its operand shapes.
//!
//! The key is the mnemonic, a dot, then one discriminator per operand:
//! the register name for a register operand, `#` for an immediate and `(`
//! for an indirect operand. Operands of any other shape add nothing. Leading
//! and trailing dots are trimmed, so an operand-less `nop` keys as `nop`.
//!
//! ```text
//! lda #5        -> lda.#
//! lda (zp,x)    -> lda.(x)
//! lda (zp),y    -> lda.(y
//! tx t,a        -> tx.ta
//! jsr target    -> jsr
//! ```

/// Register names recognised as operands. `x)` closes an indexed-indirect form.
pub const REGISTERS: [&str; 7] = ["a", "b", "x", "y", "x)", "t", "n"];

/// Mnemonic of the microcode-word directive, whose key ignores operand shapes.
pub const MICROCODE_WORD: &str = "mc";

const IMMEDIATE_MARKER: char = '#';
const INDIRECT_MARKER: char = '(';

/// Returns `true` when `operand` is one of the reserved register names.
#[must_use]
pub fn is_register(operand: &str) -> bool {
    REGISTERS.contains(&operand)
}

/// Builds the instruction-table key for `mnemonic` with raw `operands`.
///
/// Depends only on the operand text, never on resolved values.
#[must_use]
pub fn synthesize_key(mnemonic: &str, operands: &[String]) -> String {
    if mnemonic.is_empty() {
        return String::new();
    }
    if mnemonic == MICROCODE_WORD {
        return MICROCODE_WORD.to_string();
    }

    let mut key = format!("{mnemonic}.");
    for operand in operands {
        if is_register(operand) {
            key.push_str(operand);
        } else if operand.starts_with(IMMEDIATE_MARKER) {
            key.push(IMMEDIATE_MARKER);
        } else if operand.starts_with(INDIRECT_MARKER) {
            key.push(INDIRECT_MARKER);
        }
    }
    key.trim_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn ops(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[rstest]
    #[case("lda", &["#5"], "lda.#")]
    #[case("lda", &["(zp", "x)"], "lda.(x)")]
    #[case("lda", &["(zp)", "y"], "lda.(y")]
    #[case("jsr", &["(vector)"], "jsr.(")]
    #[case("tx", &["t", "a"], "tx.ta")]
    #[case("jsr", &["target"], "jsr")]
    #[case("nop", &[], "nop")]
    #[case("dc.b", &["1", "2", "3"], "dc.b")]
    #[case("org", &["$10"], "org")]
    #[case("=", &["5"], "=")]
    #[case("mc", &["#1", "(2"], "mc")]
    #[case("", &["a"], "")]
    #[case("ld", &["t", "#1"], "ld.t#")]
    fn synthesizes(#[case] mnemonic: &str, #[case] operands: &[&str], #[case] expected: &str) {
        assert_eq!(synthesize_key(mnemonic, &ops(operands)), expected);
    }

    #[test]
    fn registers_are_case_sensitive() {
        assert!(is_register("x"));
        assert!(is_register("x)"));
        assert!(!is_register("X"));
        assert!(!is_register("y)"));
    }

    proptest! {
        #[test]
        fn key_ignores_operand_values(a in 0u32..100_000, b in 0u32..100_000) {
            let first = synthesize_key("lda", &[format!("#{a}"), "x".to_string()]);
            let second = synthesize_key("lda", &[format!("#{b}"), "x".to_string()]);
            prop_assert_eq!(first, second);
        }
    }
}
