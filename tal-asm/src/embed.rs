//! Compilation of `eval` and `expr` operands at assembly time.

use tal_unit::CompileUnit;

use crate::assembler::Assembler;
use crate::error::Result;
use crate::source::{self, CommandLine};

/// What an embedded operand holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedKind {
    Script,
    Expression,
}

/// Compiles embedded scripts and expressions into a unit.
///
/// The assembler zeroes the unit's `current_stack_depth` and
/// `max_stack_depth` before calling [`compile`](Self::compile); the compiler
/// leaves them holding the net and peak stack effect of the code it
/// appended. Exception ranges it adds are re-homed by the assembler.
pub trait ScriptCompiler {
    fn compile(
        &mut self,
        unit: &mut CompileUnit,
        kind: EmbeddedKind,
        source: &str,
        line: u32,
    ) -> Result<()>;
}

/// Treats embedded operands as nested assembly code.
///
/// Nested code must leave exactly one value, like a script does.
#[derive(Debug, Default)]
pub struct NestedAssembly {
    depth: u32,
}

impl NestedAssembly {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScriptCompiler for NestedAssembly {
    fn compile(
        &mut self,
        unit: &mut CompileUnit,
        kind: EmbeddedKind,
        source: &str,
        line: u32,
    ) -> Result<()> {
        let commands = source::parse(source, line)?;
        self.depth += 1;
        log::debug!(
            "nested {kind:?} at line {line}: {} commands, depth {}",
            commands.len(),
            self.depth
        );
        let result = assemble_nested(unit, self, &commands);
        self.depth -= 1;
        result
    }
}

fn assemble_nested(
    unit: &mut CompileUnit,
    compiler: &mut dyn ScriptCompiler,
    commands: &[CommandLine],
) -> Result<()> {
    let mut asm = Assembler::new(unit).with_compiler(compiler);
    for cmd in commands {
        asm.assemble_line(cmd)?;
    }
    asm.finish()
}
