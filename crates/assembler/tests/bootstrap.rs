//! Bootstrap flow: assemble microcode, import it, assemble a program, run it.

use std::fs;

use mcasm::{assemble, AssemblerConfig};
use microsim::{ControlUnit, Register};

use anyhow as _;
use clap as _;
use proptest as _;
use rstest as _;
use thiserror as _;
use tracing as _;
use tracing_subscriber as _;

const MICROCODE: &str = "\
; control-word fields
FETCH       = 1 << 58
END         = 1 << 59
MEM_BYTE    = 1
SINK_A      = 1 << 23

nop         mch 8
            mc END
lda.#       mch 8, 1
            mc FETCH
            mc MEM_BYTE | SINK_A | END
";

const PROGRAM: &str = "\
            isa micro
            org 0
start       lda #5
            nop
";

#[test]
fn program_runs_on_its_own_microcode() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("micro.asm"), MICROCODE).unwrap();
    fs::write(dir.path().join("prog.asm"), PROGRAM).unwrap();
    let config = AssemblerConfig::default();

    let micro = assemble(&dir.path().join("micro"), &config).unwrap();
    assert_eq!(micro.result.error_count(), 0);
    assert_eq!(micro.result.symbols.get("lda.#.instr"), Some(1));

    let prog = assemble(&dir.path().join("prog.asm"), &config).unwrap();
    assert_eq!(prog.result.error_count(), 0);
    assert_eq!(prog.result.listing[2].bytes, [1, 5]);

    let mut unit = ControlUnit::default();
    unit.load_microcode(&fs::read_to_string(&micro.object).unwrap())
        .unwrap();
    let summary = unit
        .load_program(&fs::read_to_string(&prog.object).unwrap())
        .unwrap();
    assert_eq!(summary.labels.get("start"), Some(&0));

    let outcomes = unit.run(2).unwrap();
    assert_eq!(outcomes[0].opcode, 1);
    assert_eq!(outcomes[0].micro_steps, 2);
    assert_eq!(outcomes[1].opcode, 0);
    assert_eq!(unit.registers().get(Register::A), 5);
    assert_eq!(unit.registers().pc(), 3);
}

#[test]
fn intel_hex_objects_work_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("micro.asm"), MICROCODE).unwrap();
    fs::write(dir.path().join("prog.asm"), PROGRAM).unwrap();
    let config = AssemblerConfig {
        record_format: microsim::RecordFormat::IntelHex,
        ..AssemblerConfig::default()
    };

    let micro = assemble(&dir.path().join("micro"), &config).unwrap();
    let prog = assemble(&dir.path().join("prog"), &config).unwrap();
    assert_eq!(prog.result.error_count(), 0);

    let mut unit = ControlUnit::default();
    unit.load_microcode(&fs::read_to_string(&micro.object).unwrap())
        .unwrap();
    unit.load_program(&fs::read_to_string(&prog.object).unwrap())
        .unwrap();
    unit.run(1).unwrap();
    assert_eq!(unit.registers().get(Register::A), 5);
}
