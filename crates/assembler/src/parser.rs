//! Source line parser.
//!
//! Line syntax:
//!
//! ```text
//! [label | .local]   mnemonic   [operand[,operand]...]   [; comment]
//! ```
//!
//! A label is whatever starts in the first column; a line that begins with
//! whitespace has none. Quoted strings are expanded into comma-separated
//! character codes before the comment is stripped, so a `;` inside quotes
//! survives as `59`.

use crate::symbols::SymbolTable;

/// One source line split into its fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number.
    pub number: usize,
    /// Label text as written, empty when absent.
    pub label: String,
    /// Mnemonic text, empty for blank and label-only lines.
    pub mnemonic: String,
    /// Operand texts, trimmed, in source order.
    pub operands: Vec<String>,
}

/// Splits one raw source line into label, mnemonic and operands.
#[must_use]
pub fn parse_line(text: &str, number: usize) -> SourceLine {
    let expanded = expand_strings(text.trim_end());
    let code = expanded
        .split_once(';')
        .map_or(expanded.as_str(), |(code, _)| code)
        .replace('\t', " ");

    let (label, rest) = match code.find(' ') {
        Some(0) => ("", code.as_str()),
        Some(i) => (&code[..i], &code[i..]),
        None => (code.as_str(), ""),
    };

    let rest = rest.trim();
    let (mnemonic, rest) = rest.split_once(' ').unwrap_or((rest, ""));
    let rest = rest.trim();
    let operands = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(|op| op.trim().to_string()).collect()
    };

    SourceLine {
        number,
        label: label.to_string(),
        mnemonic: mnemonic.to_string(),
        operands,
    }
}

/// Parses a line and applies its label to the local-label scope.
///
/// A local label is rewritten to `<scope>_<suffix>` using the scope in force
/// before this line. A non-local label becomes the scope for everything that
/// is resolved afterwards, including this line's own operands.
#[must_use]
pub fn parse_scoped(text: &str, number: usize, symbols: &mut SymbolTable) -> SourceLine {
    let mut line = parse_line(text, number);
    if !line.label.is_empty() {
        line.label = symbols.enter_label(&line.label);
    }
    line
}

/// Replaces each quoted string with the comma-separated codes of its characters.
///
/// Single quotes are treated as double quotes. An unterminated string runs to
/// the end of the line.
#[must_use]
pub fn expand_strings(text: &str) -> String {
    let normalized = text.replace('\'', "\"");
    let mut out = String::with_capacity(normalized.len());
    let mut rest = normalized.as_str();

    while let Some(open) = rest.find('"') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let (body, tail) = after
            .find('"')
            .map_or((after, ""), |close| (&after[..close], &after[close + 1..]));
        let codes: Vec<String> = body.chars().map(|c| u32::from(c).to_string()).collect();
        out.push(' ');
        out.push_str(&codes.join(", "));
        rest = tail;
    }
    out.push_str(rest);
    out
}
