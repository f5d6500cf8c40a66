//! Operand expression evaluator.
//!
//! A small Pratt parser over integer literals, symbol names and the usual
//! arithmetic, shift and bitwise operators. Precedence, loosest first:
//! `|`, `^`, `&`, `<< >>`, `+ -`, `* / %`, then unary `- + ~`.
//!
//! Literals are decimal, `$hex`, `%binary`, `0xhex` or `0bbinary`. In operand
//! position `*` is the current location counter and `%` starts a binary
//! literal; between operands they multiply and take the remainder.
//!
//! Symbols that are not yet defined make the whole expression
//! [`Evaluation::Unresolved`]; that is how forward references surface in
//! pass 1. Genuinely malformed text is an [`ExprError`].

use thiserror::Error;

use crate::symbols::SymbolTable;

/// Outcome of evaluating a well-formed expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Every symbol was defined.
    Value(i64),
    /// The named symbol is not defined yet.
    Unresolved(String),
}

/// Malformed expression text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    /// Nothing left to evaluate.
    #[error("empty expression")]
    Empty,
    /// A character that cannot start or continue an expression.
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    /// A literal with no digits or with digits outside its radix.
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    /// The expression stopped where an operand was required.
    #[error("expression ends where an operand is expected")]
    UnexpectedEnd,
    /// Integer division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Shift by a negative amount.
    #[error("negative shift count {0}")]
    NegativeShift(i64),
}

/// Evaluates operand text against the symbol table.
///
/// Addressing markers `#`, `(` and `)` are removed first, so `#len+1` and
/// `(ptr)` evaluate as `len+1` and `ptr`. Names starting with `.` are local
/// labels and are qualified with the current scope before lookup.
///
/// # Errors
///
/// Returns an [`ExprError`] when the text is not a well-formed expression.
pub fn evaluate(text: &str, symbols: &SymbolTable) -> Result<Evaluation, ExprError> {
    let cleaned: String = text.chars().filter(|c| !matches!(c, '#' | '(' | ')')).collect();
    let mut parser = Parser {
        chars: cleaned.chars().collect(),
        pos: 0,
        symbols,
        unresolved: None,
    };
    parser.skip_ws();
    if parser.peek().is_none() {
        return Err(ExprError::Empty);
    }
    let value = parser.expression(0)?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        return Err(ExprError::UnexpectedChar(c));
    }
    Ok(match parser.unresolved {
        Some(name) => Evaluation::Unresolved(name),
        None => Evaluation::Value(value.unwrap_or_default()),
    })
}

/// Returns `true` when `c` can appear in a symbol name after its first character.
#[must_use]
pub const fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

const fn is_symbol_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '.'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Or,
    Xor,
    And,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    /// Left and right binding power.
    const fn binding_power(self) -> (u8, u8) {
        match self {
            Self::Or => (1, 2),
            Self::Xor => (3, 4),
            Self::And => (5, 6),
            Self::Shl | Self::Shr => (7, 8),
            Self::Add | Self::Sub => (9, 10),
            Self::Mul | Self::Div | Self::Rem => (11, 12),
        }
    }
}

const PREFIX_POWER: u8 = 13;

/// `None` in a partial value means a symbol on that branch is unresolved.
type Partial = Option<i64>;

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    symbols: &'a SymbolTable,
    unresolved: Option<String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expression(&mut self, min_power: u8) -> Result<Partial, ExprError> {
        let mut lhs = self.prefix()?;
        loop {
            self.skip_ws();
            let Some((op, len)) = self.infix_operator()? else {
                break;
            };
            let (left, right) = op.binding_power();
            if left < min_power {
                break;
            }
            self.pos += len;
            let rhs = self.expression(right)?;
            lhs = apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn infix_operator(&self) -> Result<Option<(BinOp, usize)>, ExprError> {
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let op = match (c, self.peek_at(1)) {
            ('<', Some('<')) => (BinOp::Shl, 2),
            ('>', Some('>')) => (BinOp::Shr, 2),
            ('|', _) => (BinOp::Or, 1),
            ('^', _) => (BinOp::Xor, 1),
            ('&', _) => (BinOp::And, 1),
            ('+', _) => (BinOp::Add, 1),
            ('-', _) => (BinOp::Sub, 1),
            ('*', _) => (BinOp::Mul, 1),
            ('/', _) => (BinOp::Div, 1),
            ('%', _) => (BinOp::Rem, 1),
            _ => return Err(ExprError::UnexpectedChar(c)),
        };
        Ok(Some(op))
    }

    fn prefix(&mut self) -> Result<Partial, ExprError> {
        self.skip_ws();
        let c = self.peek().ok_or(ExprError::UnexpectedEnd)?;
        match c {
            '-' | '+' | '~' => {
                self.pos += 1;
                let operand = self.expression(PREFIX_POWER)?;
                Ok(operand.map(|v| match c {
                    '-' => v.wrapping_neg(),
                    '~' => !v,
                    _ => v,
                }))
            }
            '*' => {
                self.pos += 1;
                Ok(Some(self.symbols.location()))
            }
            '$' => {
                self.pos += 1;
                self.number(16, "$")
            }
            '%' => {
                self.pos += 1;
                self.number(2, "%")
            }
            '0' if matches!(self.peek_at(1), Some('x' | 'X')) => {
                self.pos += 2;
                self.number(16, "0x")
            }
            '0' if matches!(self.peek_at(1), Some('b' | 'B'))
                && self.peek_at(2).is_some_and(|d| d == '0' || d == '1') =>
            {
                self.pos += 2;
                self.number(2, "0b")
            }
            c if c.is_ascii_digit() => self.number(10, ""),
            c if is_symbol_start(c) => Ok(self.symbol()),
            c => Err(ExprError::UnexpectedChar(c)),
        }
    }

    fn number(&mut self, radix: u32, prefix: &str) -> Result<Partial, ExprError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos]
            .iter()
            .filter(|&&c| c != '_')
            .collect();
        i64::from_str_radix(&digits, radix)
            .map(Some)
            .map_err(|_| ExprError::InvalidNumber(format!("{prefix}{digits}")))
    }

    fn symbol(&mut self) -> Partial {
        let start = self.pos;
        while self.peek().is_some_and(is_symbol_char) {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        let name = self.symbols.qualify(&name);
        let value = self.symbols.get(&name);
        if value.is_none() && self.unresolved.is_none() {
            self.unresolved = Some(name);
        }
        value
    }
}

fn apply(op: BinOp, lhs: Partial, rhs: Partial) -> Result<Partial, ExprError> {
    let (Some(a), Some(b)) = (lhs, rhs) else {
        return Ok(None);
    };
    let value = match op {
        BinOp::Or => a | b,
        BinOp::Xor => a ^ b,
        BinOp::And => a & b,
        BinOp::Shl => shift_left(a, b)?,
        BinOp::Shr => shift_right(a, b)?,
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => floor_div(a, b)?,
        BinOp::Rem => a.wrapping_sub(floor_div(a, b)?.wrapping_mul(b)),
    };
    Ok(Some(value))
}

fn shift_amount(amount: i64) -> Result<u32, ExprError> {
    u32::try_from(amount).map_err(|_| ExprError::NegativeShift(amount))
}

/// Bits shifted past the top are lost; shifting by 64 or more yields 0.
fn shift_left(value: i64, amount: i64) -> Result<i64, ExprError> {
    Ok(value.checked_shl(shift_amount(amount)?).unwrap_or(0))
}

/// Arithmetic shift; shifting by 64 or more leaves only the sign.
fn shift_right(value: i64, amount: i64) -> Result<i64, ExprError> {
    let fill = if value < 0 { -1 } else { 0 };
    Ok(value.checked_shr(shift_amount(amount)?).unwrap_or(fill))
}

/// Division rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> Result<i64, ExprError> {
    if b == 0 {
        return Err(ExprError::DivisionByZero);
    }
    let q = a.wrapping_div(b);
    Ok(if (a.wrapping_rem(b) != 0) && ((a < 0) != (b < 0)) { q - 1 } else { q })
}
