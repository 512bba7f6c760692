use std::collections::HashMap;
use std::ops::Range;

use log::debug;
use tal_unit::{Checkpoint, CompileUnit};

use crate::block::{BasicBlock, BlockId};
use crate::embed::ScriptCompiler;
use crate::error::{AssembleError, ErrorKind, Result};
use crate::source::CommandLine;

/// Assembles command lines into a [`CompileUnit`].
///
/// Feed commands with [`assemble_line`](Self::assemble_line), then call
/// [`finish`](Self::finish). Code is appended after whatever the unit
/// already holds. If any step fails the unit is restored to its state at
/// [`Assembler::new`] and the assembler refuses further input.
pub struct Assembler<'a> {
    pub(crate) unit: &'a mut CompileUnit,
    pub(crate) compiler: Option<&'a mut dyn ScriptCompiler>,
    pub(crate) blocks: Vec<BasicBlock>,
    /// Block receiving emitted code.
    pub(crate) current: BlockId,
    pub(crate) labels: HashMap<String, BlockId>,
    /// Line of the command being assembled, or the last one seen.
    pub(crate) line: u32,
    checkpoint: Checkpoint,
    aborted: bool,
}

impl<'a> Assembler<'a> {
    pub fn new(unit: &'a mut CompileUnit) -> Self {
        let checkpoint = unit.checkpoint();
        let entry = BasicBlock::new(unit.code_len(), 1);
        Self {
            unit,
            compiler: None,
            blocks: vec![entry],
            current: 0,
            labels: HashMap::new(),
            line: 1,
            checkpoint,
            aborted: false,
        }
    }

    /// Compile `eval`/`expr` operands with `compiler` instead of deferring
    /// them to run time.
    pub fn with_compiler(mut self, compiler: &'a mut dyn ScriptCompiler) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Assemble one command.
    pub fn assemble_line(&mut self, cmd: &CommandLine) -> Result<()> {
        self.ensure_live()?;
        self.line = cmd.line;
        if self.current == 0 && self.blocks[0].original_start == self.unit.code_len() {
            self.blocks[0].start_line = cmd.line;
        }
        let result = self
            .assemble_command(cmd)
            .map_err(|kind| AssembleError::at(cmd.line, kind));
        if result.is_err() {
            self.abort();
        }
        result
    }

    /// Resolve jumps, build exception ranges and verify the stack.
    pub fn finish(mut self) -> Result<()> {
        self.ensure_live()?;
        let result = self.run_passes();
        if result.is_err() {
            self.abort();
        }
        result
    }

    fn run_passes(&mut self) -> Result<()> {
        debug!(
            "finishing assembly: {} blocks, {} bytes",
            self.blocks.len(),
            self.unit.code_len() - self.blocks[0].original_start
        );
        self.resolve_labels()?;
        self.relax_jumps()?;
        self.fill_jump_offsets()?;
        self.process_catches()?;
        self.check_no_throw()?;
        self.check_stack()?;
        debug!(
            "assembled {} bytes, max stack depth {}",
            self.unit.code_len() - self.blocks[0].start,
            self.unit.max_stack_depth
        );
        Ok(())
    }

    fn ensure_live(&self) -> Result<()> {
        if self.aborted {
            Err(AssembleError::new(ErrorKind::Aborted))
        } else {
            Ok(())
        }
    }

    fn abort(&mut self) {
        self.unit.rollback(self.checkpoint);
        self.aborted = true;
    }

    /// Append a block starting at the current end of code.
    pub(crate) fn alloc_block(&mut self) -> std::result::Result<BlockId, ErrorKind> {
        self.blocks
            .try_reserve(1)
            .map_err(|_| ErrorKind::Resource("basic block arena"))?;
        self.blocks
            .push(BasicBlock::new(self.unit.code_len(), self.line));
        Ok(self.blocks.len() - 1)
    }

    /// Code bytes of a block at its current position.
    pub(crate) fn block_range(&self, id: BlockId) -> Range<usize> {
        let end = match self.blocks[id].successor {
            Some(next) => self.blocks[next].start,
            None => self.unit.code_len(),
        };
        self.blocks[id].start..end
    }

    /// Build an error located at a block's line span.
    pub(crate) fn flow_error(&self, id: BlockId, kind: ErrorKind) -> AssembleError {
        let first = self.blocks[id].start_line;
        let last = match self.blocks[id].successor {
            Some(next) => self.blocks[next].start_line,
            None => self.line,
        };
        AssembleError::in_block(kind, first, last.max(first))
    }

    /// Final block in program order.
    pub(crate) fn last_block(&self) -> BlockId {
        self.blocks.len() - 1
    }
}

/// Assemble a sequence of commands into `unit`.
pub fn assemble<'c, I>(unit: &mut CompileUnit, commands: I) -> Result<()>
where
    I: IntoIterator<Item = &'c CommandLine>,
{
    let mut asm = Assembler::new(unit);
    for cmd in commands {
        asm.assemble_line(cmd)?;
    }
    asm.finish()
}

/// Tokenize and assemble source text into `unit`.
pub fn assemble_source(unit: &mut CompileUnit, text: &str) -> Result<()> {
    let commands = crate::source::parse(text, 1)?;
    assemble(unit, &commands)
}

/// Like [`assemble_source`], compiling `eval`/`expr` operands with `compiler`.
pub fn assemble_source_with(
    unit: &mut CompileUnit,
    compiler: &mut dyn ScriptCompiler,
    text: &str,
) -> Result<()> {
    let commands = crate::source::parse(text, 1)?;
    let mut asm = Assembler::new(unit).with_compiler(compiler);
    for cmd in &commands {
        asm.assemble_line(cmd)?;
    }
    asm.finish()
}
