//! Human-readable disassembly of a compile unit.

use std::fmt;

use tal_isa::{DecodeError, Instruction, Operand, decode};
use tal_unit::{AuxData, CompileUnit, RangeKind};

use crate::operand::CHAR_CLASSES;

/// A decoded unit, ready to print.
pub struct Listing<'a> {
    unit: &'a CompileUnit,
    instructions: Vec<Instruction>,
}

impl<'a> Listing<'a> {
    pub fn new(unit: &'a CompileUnit) -> Result<Self, DecodeError> {
        Ok(Self {
            unit,
            instructions: decode(unit.code())?,
        })
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.unit;
        writeln!(
            f,
            "Code {} bytes, {} literals, {} exception ranges, max stack depth {}, max exception depth {}",
            unit.code_len(),
            unit.literals().len(),
            unit.exception_ranges().len(),
            unit.max_stack_depth,
            unit.max_except_depth,
        )?;

        for insn in &self.instructions {
            write!(f, "  ({}) {}", insn.offset, insn.opcode)?;
            let mut notes = Vec::new();
            for op in &insn.operands {
                match *op {
                    Operand::Imm(v) => write!(f, " {v}")?,
                    Operand::Local(slot) => {
                        write!(f, " %v{slot}")?;
                        if let Some(name) = unit.locals().and_then(|t| t.name(slot)) {
                            notes.push(format!("var \"{name}\""));
                        }
                    }
                    Operand::Literal(index) => {
                        write!(f, " {index}")?;
                        if let Some(value) = unit.literals().get(index) {
                            notes.push(format!("{value:?}"));
                        }
                    }
                    Operand::Aux(index) => write!(f, " {index}")?,
                    Operand::JumpOffset(rel) => {
                        write!(f, " {rel:+}")?;
                        notes.push(format!("pc {}", insn.offset as i64 + i64::from(rel)));
                    }
                    Operand::CharClass(class) => {
                        let name = CHAR_CLASSES.get(usize::from(class)).unwrap_or(&"?");
                        write!(f, " {name}")?;
                    }
                }
            }
            if !notes.is_empty() {
                write!(f, "\t# {}", notes.join(", "))?;
            }
            writeln!(f)?;
        }

        if !unit.exception_ranges().is_empty() {
            writeln!(f, "  Exception ranges:")?;
            for (i, range) in unit.exception_ranges().iter().enumerate() {
                let end = (range.code_offset + range.num_code_bytes).saturating_sub(1);
                write!(
                    f,
                    "    {i}: level {}, pc {}-{}",
                    range.nesting_level, range.code_offset, end
                )?;
                match range.kind {
                    RangeKind::Catch => {
                        writeln!(f, ", catch {}", range.catch_offset.unwrap_or_default())?
                    }
                    RangeKind::Loop => writeln!(
                        f,
                        ", loop, break {}, continue {}",
                        range.break_offset.unwrap_or_default(),
                        range.continue_offset.unwrap_or_default()
                    )?,
                }
            }
        }

        if !unit.literals().is_empty() {
            writeln!(f, "  Literals:")?;
            for (i, value) in unit.literals().iter().enumerate() {
                writeln!(f, "    {i}: {value:?}")?;
            }
        }

        if !unit.aux_data().is_empty() {
            writeln!(f, "  Aux data:")?;
            for (i, aux) in unit.aux_data().iter().enumerate() {
                match aux {
                    AuxData::JumpTable(table) => {
                        let entries: Vec<String> = table
                            .iter()
                            .map(|(key, offset)| format!("{key:?} {offset:+}"))
                            .collect();
                        writeln!(f, "    {i}: jump table {{{}}}", entries.join(", "))?;
                    }
                }
            }
        }
        Ok(())
    }
}
