//! Two-pass assembler driver.
//!
//! Both passes run the same per-line pipeline:
//!
//! 1. parse the line and apply its label to the local-label scope
//! 2. synthesize the instruction key from the raw operand shapes
//! 3. resolve operands, dropping register names
//! 4. look the key up and run any directive
//! 5. bind the label and advance the location counter
//!
//! Pass 1 only collects symbols. Pass 2 starts with every symbol known,
//! encodes each line, writes object records and builds the listing. Symbols
//! survive from pass 1 to pass 2. Each pass starts from the same instruction
//! table and repeats its own `isa` imports, so a line sees the same
//! instructions in both passes.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use microsim::{encode_label, RecordError, RecordFormat, DEFAULT_MICROSTEP_BITS};
use tracing::{debug, info, warn};

use crate::encoder::{encode_line, object_records, Output};
use crate::errors::{AssembleError, LineError, LineErrorKind};
use crate::expr::{evaluate, Evaluation, ExprError};
use crate::mnemonic::{is_register, synthesize_key};
use crate::parser::{parse_scoped, SourceLine};
use crate::source::{import_path, read_source, with_suffix};
use crate::symbols::{align_up, SymbolTable};
use crate::table::{Directive, InstructionRecord, InstructionTable, INSTR_SUFFIX, OBYTES_SUFFIX};

/// Settings for one assembler instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerConfig {
    /// Suffix forced onto the source file name.
    pub source_suffix: String,
    /// Suffix of the object file written next to the source and of `isa` imports.
    pub object_suffix: String,
    /// Encoding of the object file.
    pub record_format: RecordFormat,
    /// Directory for relative `isa` names; the source directory when `None`.
    pub import_dir: Option<PathBuf>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            source_suffix: "asm".to_string(),
            object_suffix: "obj".to_string(),
            record_format: RecordFormat::SRecord,
            import_dir: None,
        }
    }
}

/// One operand after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Fully evaluated.
    Value(i64),
    /// Refers to a symbol that is not defined yet.
    Unresolved {
        /// Operand text as written.
        text: String,
        /// First undefined symbol, fully qualified.
        symbol: String,
    },
    /// Not a valid expression.
    Invalid {
        /// Operand text as written.
        text: String,
        /// Why evaluation failed.
        error: ExprError,
    },
}

impl Operand {
    /// The resolved value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<i64> {
        match self {
            Self::Value(value) => Some(*value),
            _ => None,
        }
    }
}

/// Diagnostics and per-line addresses of one pass.
#[derive(Debug)]
pub struct PassReport {
    /// Pass number, 1 or 2.
    pub pass: u8,
    /// Every recoverable error found, in line order.
    pub errors: Vec<LineError>,
    /// Address of each source line, indexed by line number minus one.
    pub addresses: Vec<i64>,
}

impl PassReport {
    const fn new(pass: u8) -> Self {
        Self {
            pass,
            errors: Vec::new(),
            addresses: Vec::new(),
        }
    }

    /// Number of errors counted in this pass.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    fn push(&mut self, line: usize, kind: LineErrorKind) {
        self.errors.push(LineError::new(line, kind));
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pass {}: {} errors found", self.pass, self.error_count())
    }
}

/// One pass-2 line as shown in the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// 1-based source line number.
    pub line: usize,
    /// Address of the line.
    pub address: i64,
    /// Emitted bytes; control words appear little-endian.
    pub bytes: Vec<u8>,
    /// Qualified label, empty when absent.
    pub label: String,
    /// Synthesized instruction key.
    pub key: String,
    /// Operands after register names were dropped.
    pub operands: Vec<Operand>,
    /// Byte width used to print operand values.
    pub width: usize,
}

fn format_value(value: i64, width: usize) -> String {
    match width {
        1 => format!("${value:02x}"),
        2 => format!("${value:04x}"),
        _ => format!("${value:08x}"),
    }
}

impl fmt::Display for ListingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes: String = self.bytes.iter().map(|b| format!("{b:02x} ")).collect();
        bytes.truncate(20);
        let operands: Vec<String> = self
            .operands
            .iter()
            .map(|operand| match operand {
                Operand::Value(value) => format_value(*value, self.width),
                Operand::Unresolved { text, .. } | Operand::Invalid { text, .. } => text.clone(),
            })
            .collect();
        let text = format!(
            "{:4} {:04x} {:20} {:16} {:10} {}",
            self.line,
            self.address,
            bytes,
            self.label,
            self.key,
            operands.join(", ")
        );
        f.write_str(text.trim_end())
    }
}

/// Everything produced by assembling one source text.
#[derive(Debug)]
pub struct AssembleResult {
    /// Symbol-collection pass.
    pub pass1: PassReport,
    /// Encoding pass.
    pub pass2: PassReport,
    /// One entry per source line.
    pub listing: Vec<ListingEntry>,
    /// Object records, data first, then label records and any end-of-file record.
    pub object: Vec<String>,
    /// Final symbol table.
    pub symbols: SymbolTable,
}

impl AssembleResult {
    /// Object file contents, one record per line.
    #[must_use]
    pub fn object_text(&self) -> String {
        let mut text = self.object.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }

    /// Errors of both passes together.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.pass1.error_count() + self.pass2.error_count()
    }

    /// Alphabetical cross reference of every symbol.
    #[must_use]
    pub fn cross_reference(&self) -> Vec<String> {
        self.symbols
            .iter()
            .map(|(name, value)| {
                let shown = if value < 0 {
                    format!("-${:04X}", value.unsigned_abs())
                } else {
                    format!("${value:04X}")
                };
                format!("{name:20} = {shown:>10}")
            })
            .collect()
    }
}

/// A source file assembled to disk.
#[derive(Debug)]
pub struct AssembledFile {
    /// Source path after suffix normalisation.
    pub source: PathBuf,
    /// Object file that was written.
    pub object: PathBuf,
    /// Assembly output.
    pub result: AssembleResult,
}

#[derive(Debug, Default)]
struct Emission {
    listing: Vec<ListingEntry>,
    object: Vec<String>,
}

struct LineContext<'a> {
    pass: u8,
    line: &'a SourceLine,
    key: &'a str,
    operands: &'a [Operand],
}

/// Assembler state threaded through both passes: symbols, instructions and config.
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    config: AssemblerConfig,
    symbols: SymbolTable,
    /// Table every pass starts from.
    table: InstructionTable,
    /// Table of the pass in progress, `isa` imports included.
    active: InstructionTable,
}

impl Assembler {
    /// Creates an assembler holding only the built-in directives.
    #[must_use]
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            config,
            symbols: SymbolTable::new(),
            table: InstructionTable::new(),
            active: InstructionTable::new(),
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Instruction table every pass starts from. `isa` imports never land here.
    #[must_use]
    pub const fn table(&self) -> &InstructionTable {
        &self.table
    }

    /// Mutable starting table, for preloading instructions.
    pub const fn table_mut(&mut self) -> &mut InstructionTable {
        &mut self.table
    }

    /// Drops all symbols and imported instructions.
    pub fn reset(&mut self) {
        self.symbols = SymbolTable::new();
        self.table = InstructionTable::new();
        self.active = InstructionTable::new();
    }

    /// Assembles source text with both passes.
    ///
    /// Symbols start empty. Both passes start from [`Self::table`], so imports
    /// made by one run are gone before the next.
    pub fn assemble_text(&mut self, text: &str) -> AssembleResult {
        self.symbols = SymbolTable::new();

        let pass1 = self.run_pass(1, text, None);
        info!(pass = 1, errors = pass1.error_count(), "pass complete");

        let mut emission = Emission::default();
        let pass2 = self.run_pass(2, text, Some(&mut emission));
        self.write_labels(&mut emission.object);
        info!(pass = 2, errors = pass2.error_count(), "pass complete");

        for (line, (first, second)) in pass1.addresses.iter().zip(&pass2.addresses).enumerate() {
            if first != second {
                warn!(line = line + 1, first, second, "passes disagree on line address");
            }
        }

        AssembleResult {
            pass1,
            pass2,
            listing: emission.listing,
            object: emission.object,
            symbols: self.symbols.clone(),
        }
    }

    fn run_pass(&mut self, pass: u8, text: &str, mut emission: Option<&mut Emission>) -> PassReport {
        self.symbols.begin_pass();
        self.active = self.table.clone();
        let mut report = PassReport::new(pass);

        for (index, raw) in text.lines().enumerate() {
            let line = parse_scoped(raw, index + 1, &mut self.symbols);
            let key = synthesize_key(&line.mnemonic, &line.operands);
            let operands = self.resolve_operands(&line.operands);
            let ctx = LineContext {
                pass,
                line: &line,
                key: &key,
                operands: &operands,
            };

            let record = self.lookup(&ctx, &mut report);
            let mut address = self.symbols.location();
            if let InstructionRecord::NoOperand(directive) = record {
                address = self.run_directive(directive, &ctx, address, &mut report);
            }
            self.bind_label(&ctx, record, address);

            let size = i64::try_from(record.size(operands.len())).unwrap_or(i64::MAX);
            self.advance(&ctx, size, &mut report);
            report.addresses.push(address);

            if let Some(emission) = emission.as_deref_mut() {
                self.emit_line(&ctx, record, address, &mut report, emission);
            }
        }
        report
    }

    fn resolve_operands(&self, raw: &[String]) -> Vec<Operand> {
        raw.iter()
            .filter(|text| !text.is_empty() && !is_register(text))
            .map(|text| match evaluate(text, &self.symbols) {
                Ok(Evaluation::Value(value)) => Operand::Value(value),
                Ok(Evaluation::Unresolved(symbol)) => Operand::Unresolved {
                    text: text.clone(),
                    symbol,
                },
                Err(error) => Operand::Invalid {
                    text: text.clone(),
                    error,
                },
            })
            .collect()
    }

    fn lookup(&self, ctx: &LineContext<'_>, report: &mut PassReport) -> InstructionRecord {
        if let Some(record) = self.active.get(ctx.key) {
            return record;
        }
        warn!(pass = ctx.pass, line = ctx.line.number, key = ctx.key, "unknown instruction");
        report.push(
            ctx.line.number,
            LineErrorKind::UnknownInstruction(ctx.key.to_string()),
        );
        InstructionRecord::NoOperand(Directive::Nop)
    }

    /// Value of a directive operand. Problems are reported in pass 2 only.
    fn directive_operand(
        ctx: &LineContext<'_>,
        index: usize,
        report: &mut PassReport,
    ) -> Option<i64> {
        let kind = match ctx.operands.get(index) {
            Some(Operand::Value(value)) => return Some(*value),
            Some(Operand::Invalid { error, .. }) => LineErrorKind::Expression(error.clone()),
            Some(Operand::Unresolved { .. }) | None => {
                LineErrorKind::DirectiveOperand(ctx.key.to_string())
            }
        };
        if ctx.pass == 2 {
            report.push(ctx.line.number, kind);
        }
        None
    }

    /// Moves the location counter forward, reporting overflow in pass 2.
    fn advance(&mut self, ctx: &LineContext<'_>, amount: i64, report: &mut PassReport) {
        if !self.symbols.advance(amount) {
            Self::overflow(ctx, report);
        }
    }

    /// Aligns the location counter and returns the new value.
    fn align(&mut self, ctx: &LineContext<'_>, alignment: i64, report: &mut PassReport) -> i64 {
        let location = self.symbols.location();
        let Some(aligned) = align_up(location, alignment) else {
            Self::overflow(ctx, report);
            return location;
        };
        self.symbols.set_location(aligned);
        aligned
    }

    fn overflow(ctx: &LineContext<'_>, report: &mut PassReport) {
        if ctx.pass == 2 {
            warn!(line = ctx.line.number, "location counter overflow");
            report.push(ctx.line.number, LineErrorKind::LocationOverflow);
        }
    }

    /// Runs a directive and returns the line's address.
    fn run_directive(
        &mut self,
        directive: Directive,
        ctx: &LineContext<'_>,
        address: i64,
        report: &mut PassReport,
    ) -> i64 {
        match directive {
            Directive::Nop => return address,
            Directive::Isa => {
                self.import(ctx, report);
                return address;
            }
            _ => {}
        }

        let Some(value) = Self::directive_operand(ctx, 0, report) else {
            return address;
        };
        match directive {
            Directive::Org => {
                let origin = value.max(0);
                self.symbols.set_location(origin);
                origin
            }
            Directive::ReserveBytes => {
                self.advance(ctx, value.max(0), report);
                address
            }
            Directive::ReserveWords => {
                self.advance(ctx, value.max(0).saturating_mul(2), report);
                address
            }
            Directive::Align => self.align(ctx, value, report),
            Directive::MicrocodeHeader => {
                let aligned = self.align(ctx, value, report);
                if !ctx.line.label.is_empty() {
                    let width = if ctx.operands.len() > 1 {
                        Self::directive_operand(ctx, 1, report).unwrap_or(0)
                    } else {
                        0
                    };
                    let label = &ctx.line.label;
                    self.symbols
                        .define(format!("{label}{INSTR_SUFFIX}"), aligned >> DEFAULT_MICROSTEP_BITS);
                    self.symbols.define(format!("{label}{OBYTES_SUFFIX}"), width);
                }
                aligned
            }
            Directive::Assign | Directive::Nop | Directive::Isa => address,
        }
    }

    fn import(&mut self, ctx: &LineContext<'_>, report: &mut PassReport) {
        let Some(name) = ctx.line.operands.first().filter(|name| !name.is_empty()) else {
            if ctx.pass == 2 {
                report.push(
                    ctx.line.number,
                    LineErrorKind::DirectiveOperand(ctx.key.to_string()),
                );
            }
            return;
        };
        let dir = self
            .config
            .import_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let path = import_path(name, &dir, &self.config.object_suffix);
        match self.active.import_object(&path) {
            Ok(count) => debug!(line = ctx.line.number, count, "isa import"),
            Err(err) => {
                warn!(line = ctx.line.number, %err, "isa import failed");
                report.push(ctx.line.number, err.into());
            }
        }
    }

    fn bind_label(&mut self, ctx: &LineContext<'_>, record: InstructionRecord, address: i64) {
        let label = &ctx.line.label;
        if label.is_empty() {
            return;
        }
        if record == InstructionRecord::NoOperand(Directive::Assign) {
            if let Some(value) = ctx.operands.first().and_then(Operand::value) {
                self.symbols.define(label.clone(), value);
            }
        } else {
            self.symbols.define(label.clone(), address);
        }
    }

    fn emit_line(
        &self,
        ctx: &LineContext<'_>,
        record: InstructionRecord,
        address: i64,
        report: &mut PassReport,
        emission: &mut Emission,
    ) {
        let mut fatal = false;
        if !matches!(record, InstructionRecord::NoOperand(_)) {
            for operand in ctx.operands {
                match operand {
                    Operand::Value(_) => {}
                    Operand::Unresolved { symbol, .. } => {
                        warn!(line = ctx.line.number, symbol = %symbol, "unresolved symbol");
                        report.push(
                            ctx.line.number,
                            LineErrorKind::UnresolvedSymbol(symbol.clone()),
                        );
                        fatal = true;
                    }
                    Operand::Invalid { error, .. } => {
                        report.push(ctx.line.number, LineErrorKind::Expression(error.clone()));
                        fatal = true;
                    }
                }
            }
        }

        let output = if fatal {
            Output::Bytes(Vec::new())
        } else {
            let values: Vec<i64> = ctx.operands.iter().filter_map(Operand::value).collect();
            encode_line(record, &values)
        };

        if !output.is_empty() {
            let records = u32::try_from(address)
                .map_err(|_| RecordError::AddressTooWide(u32::MAX))
                .and_then(|start| object_records(self.config.record_format, start, &output));
            match records {
                Ok(records) => emission.object.extend(records),
                Err(err) => report.push(ctx.line.number, err.into()),
            }
        }

        debug!(
            line = ctx.line.number,
            address,
            key = ctx.key,
            len = output.len(),
            "assembled"
        );
        emission.listing.push(ListingEntry {
            line: ctx.line.number,
            address,
            bytes: output.to_bytes(),
            label: ctx.line.label.clone(),
            key: ctx.key.to_string(),
            operands: ctx.operands.to_vec(),
            width: record.listing_width(),
        });
    }

    /// Appends a label record for every symbol that fits a record address.
    fn write_labels(&self, object: &mut Vec<String>) {
        let format = self.config.record_format;
        for (name, value) in self.symbols.iter() {
            let Ok(address) = u32::try_from(value) else {
                continue;
            };
            match encode_label(format, address, name) {
                Ok(record) => object.push(record),
                Err(err) => warn!(symbol = name, %err, "label record skipped"),
            }
        }
        if let Some(end) = format.end_of_file() {
            object.push(end.to_string());
        }
    }
}

/// Assembles a source file and writes its object file beside it.
///
/// The source name has its extension replaced by `config.source_suffix`; the
/// object file uses `config.object_suffix`. Relative `isa` names resolve
/// against `config.import_dir`, or the source directory when unset.
///
/// # Errors
///
/// Returns an [`AssembleError`] when the source cannot be read or the object
/// file cannot be written. Line errors never fail the run.
pub fn assemble(path: &Path, config: &AssemblerConfig) -> Result<AssembledFile, AssembleError> {
    let source = with_suffix(path, &config.source_suffix);
    let text = read_source(&source)?;

    let mut config = config.clone();
    if config.import_dir.is_none() {
        let dir = source
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        config.import_dir = Some(dir);
    }
    let object = with_suffix(&source, &config.object_suffix);

    let mut assembler = Assembler::new(config);
    let result = assembler.assemble_text(&text);

    fs::write(&object, result.object_text()).map_err(|source| AssembleError::ObjectWrite {
        path: object.clone(),
        source,
    })?;
    info!(object = %object.display(), records = result.object.len(), "object written");

    Ok(AssembledFile {
        source,
        object,
        result,
    })
}
