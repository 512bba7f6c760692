#![allow(dead_code)]

use tal_asm::{AssembleError, ErrorKind, NestedAssembly, assemble_source, assemble_source_with};
use tal_unit::CompileUnit;

/// Assemble top-level code into a fresh unit.
pub fn assemble(text: &str) -> Result<CompileUnit, AssembleError> {
    let mut unit = CompileUnit::new();
    assemble_source(&mut unit, text)?;
    Ok(unit)
}

/// Assemble a procedure body with the given locals.
pub fn assemble_proc(locals: &[&str], text: &str) -> Result<CompileUnit, AssembleError> {
    let mut unit = CompileUnit::in_procedure(locals.iter().copied());
    assemble_source(&mut unit, text)?;
    Ok(unit)
}

/// Assemble with `eval`/`expr` compiled as nested assembly.
pub fn assemble_nested(text: &str) -> Result<CompileUnit, AssembleError> {
    let mut unit = CompileUnit::new();
    let mut compiler = NestedAssembly::new();
    assemble_source_with(&mut unit, &mut compiler, text)?;
    Ok(unit)
}

/// The error kind of a failed assembly.
pub fn failure(text: &str) -> ErrorKind {
    match assemble(text) {
        Ok(unit) => panic!("expected failure, got code {:?}", unit.code()),
        Err(err) => err.kind,
    }
}

/// Mnemonics of the assembled code, in order.
pub fn mnemonics(unit: &CompileUnit) -> Vec<&'static str> {
    tal_isa::decode(unit.code())
        .expect("valid code")
        .iter()
        .map(|insn| insn.opcode.mnemonic())
        .collect()
}

/// Join commands with newlines.
pub fn lines(commands: &[&str]) -> String {
    commands.join("\n")
}
