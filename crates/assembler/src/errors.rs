//! Structured error reporting for the assembler.
//!
//! Two tiers:
//! - [`LineError`]: recoverable, tied to one source line, accumulated per pass
//!   and counted at the end of it.
//! - [`AssembleError`]: fatal, stops the run before or after the passes.

use std::io;
use std::path::PathBuf;

use microsim::RecordError;
use thiserror::Error;

use crate::expr::ExprError;

/// A recoverable diagnostic for one source line.
#[derive(Debug, Error)]
#[error("line {line}: {kind}")]
pub struct LineError {
    /// 1-based source line number.
    pub line: usize,
    /// What went wrong.
    #[source]
    pub kind: LineErrorKind,
}

impl LineError {
    /// Creates a diagnostic for `line`.
    #[must_use]
    pub const fn new(line: usize, kind: LineErrorKind) -> Self {
        Self { line, kind }
    }
}

/// Classification of per-line diagnostics.
#[derive(Debug, Error)]
pub enum LineErrorKind {
    /// No instruction-table entry for the synthesized key.
    #[error("unknown instruction '{0}'")]
    UnknownInstruction(String),
    /// A symbol still undefined in the encoding pass.
    #[error("unresolved symbol '{0}'")]
    UnresolvedSymbol(String),
    /// Operand text that is not a valid expression.
    #[error("bad operand: {0}")]
    Expression(#[from] ExprError),
    /// A directive whose operand is missing or unresolved.
    #[error("directive '{0}' needs a resolved operand")]
    DirectiveOperand(String),
    /// The location counter would leave the `i64` range.
    #[error("location counter overflows")]
    LocationOverflow,
    /// The line's bytes could not be written as an object record.
    #[error(transparent)]
    Record(#[from] RecordError),
    /// An `isa` import file could not be read.
    #[error(transparent)]
    Import(#[from] ImportError),
}

/// Failure to import an instruction table.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The object file could not be opened or read.
    #[error("cannot read instruction set {path}: {source}")]
    Io {
        /// Resolved path of the object file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
}

/// Fatal assembly failure.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// The primary source file could not be read.
    #[error("cannot read source {path}: {source}")]
    SourceRead {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// The object file could not be written.
    #[error("cannot write object {path}: {source}")]
    ObjectWrite {
        /// Path that was written.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_error_display_includes_line_number() {
        let err = LineError::new(12, LineErrorKind::UnknownInstruction("frob.#".into()));
        assert_eq!(err.to_string(), "line 12: unknown instruction 'frob.#'");
    }

    #[test]
    fn expression_errors_convert() {
        let kind: LineErrorKind = ExprError::DivisionByZero.into();
        assert_eq!(kind.to_string(), "bad operand: division by zero");
    }

    #[test]
    fn import_error_names_the_path() {
        let err = ImportError::Io {
            path: PathBuf::from("cpu.obj"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.to_string(), "cannot read instruction set cpu.obj: missing");
    }
}
