//! Per-command emission and block splitting.

use std::collections::hash_map::Entry;

use indexmap::IndexMap;
use log::{debug, trace};
use tal_isa::encoding::{push_int1, push_int4};
use tal_isa::{Opcode, OpcodeFlags};
use tal_unit::{AuxData, JumpTable};

use crate::assembler::Assembler;
use crate::block::{BlockFlags, ForeignRanges, JumpTableMirror, JumpWidth};
use crate::descriptor::{self, Descriptor, Shape};
use crate::embed::EmbeddedKind;
use crate::error::ErrorKind;
use crate::operand::{self, parse_bool, parse_int};
use crate::source::{CommandLine, Word, split_list};

type Result<T> = std::result::Result<T, ErrorKind>;

/// `regexp` flags: advanced syntax, plus case folding when requested.
const REG_ADVANCED: i64 = 3;
const REG_NOCASE: i64 = 8;

impl Assembler<'_> {
    pub(crate) fn assemble_command(&mut self, cmd: &CommandLine) -> Result<()> {
        let Some((first, rest)) = cmd.words.split_first() else {
            return Ok(());
        };
        let name = literal(first)?;
        let desc = descriptor::find(name)
            .ok_or_else(|| ErrorKind::UnknownInstruction(name.to_owned()))?;
        if rest.len() != desc.shape.arity() {
            return Err(ErrorKind::WrongArgs(desc.usage()));
        }
        let args = rest.iter().map(literal).collect::<Result<Vec<_>>>()?;
        trace!("line {}: {} {:?}", cmd.line, desc.name, args);

        match desc.shape {
            Shape::None => self.emit(desc, &[], 0),
            Shape::Push => self.emit_push(args[0]),
            Shape::Bool => {
                let value = parse_bool(args[0])?;
                self.emit(desc, &[Imm::One(i64::from(value))], 0)
            }
            Shape::BoolLvt4 => {
                let value = parse_bool(args[0])?;
                let slot = self.local(args[1])?;
                self.emit(
                    desc,
                    &[Imm::One(i64::from(value)), Imm::Four(i64::from(slot))],
                    0,
                )
            }
            Shape::Clock => {
                let selector = operand::check_clock_selector(parse_int(args[0])?)?;
                self.emit(desc, &[Imm::One(selector.into())], 0)
            }
            Shape::Concat1 => {
                let count = operand::check_one_byte(parse_int(args[0])?)?;
                let count = operand::check_positive(count)?;
                self.emit(desc, &[Imm::One(count.into())], count.into())
            }
            Shape::List | Shape::Reverse => {
                let count = operand::check_nonnegative(parse_int(args[0])?)?;
                self.emit(desc, &[Imm::Four(count.into())], count.into())
            }
            Shape::Over => {
                let count = operand::check_nonnegative(parse_int(args[0])?)?;
                self.emit(desc, &[Imm::Four(count.into())], i64::from(count) + 1)
            }
            Shape::LindexMulti => {
                let count = operand::check_positive(parse_int(args[0])?)?;
                self.emit(desc, &[Imm::Four(count.into())], count.into())
            }
            Shape::LsetFlat => {
                let count = operand::check_at_least_two(parse_int(args[0])?)?;
                self.emit(desc, &[Imm::Four(count.into())], count.into())
            }
            Shape::DictGet | Shape::DictGetDef => {
                let count = operand::check_positive(parse_int(args[0])?)?;
                let extra = if desc.shape == Shape::DictGet { 1 } else { 2 };
                self.emit(desc, &[Imm::Four(count.into())], i64::from(count) + extra)
            }
            Shape::DictSet | Shape::DictUnset => {
                let count = operand::check_positive(parse_int(args[0])?)?;
                let slot = self.local(args[1])?;
                let consumed = i64::from(count) + i64::from(desc.shape == Shape::DictSet);
                self.emit(
                    desc,
                    &[Imm::Four(count.into()), Imm::Four(slot.into())],
                    consumed,
                )
            }
            Shape::Invoke => {
                let count = operand::check_positive(parse_int(args[0])?)?;
                self.emit_sized(desc, count as u32, count.into())
            }
            Shape::Index => {
                let index = operand::parse_index(args[0])?;
                self.emit(desc, &[Imm::Four(index.into())], 0)
            }
            Shape::Lvt => {
                let slot = self.local(args[0])?;
                self.emit_sized(desc, slot, 0)
            }
            Shape::Lvt1 => {
                let slot = self.local_one_byte(args[0])?;
                self.emit(desc, &[Imm::One(slot.into())], 0)
            }
            Shape::Lvt1Sint1 => {
                let slot = self.local_one_byte(args[0])?;
                let imm = operand::check_signed_byte(parse_int(args[1])?)?;
                self.emit(desc, &[Imm::One(slot.into()), Imm::One(imm.into())], 0)
            }
            Shape::Lvt4 => {
                let slot = self.local(args[0])?;
                self.emit(desc, &[Imm::Four(slot.into())], 0)
            }
            Shape::Sint1 => {
                let imm = operand::check_signed_byte(parse_int(args[0])?)?;
                self.emit(desc, &[Imm::One(imm.into())], 0)
            }
            Shape::Sint4Lvt4 => {
                let imm = parse_int(args[0])?;
                let slot = self.local(args[1])?;
                self.emit(desc, &[Imm::Four(imm.into()), Imm::Four(slot.into())], 0)
            }
            Shape::Regexp => {
                let nocase = parse_bool(args[0])?;
                let flags = REG_ADVANCED | if nocase { REG_NOCASE } else { 0 };
                self.emit(desc, &[Imm::One(flags)], 0)
            }
            Shape::StrClass => {
                let class = operand::parse_char_class(args[0])?;
                self.emit(desc, &[Imm::One(class.into())], 0)
            }
            Shape::Jump => self.emit_jump(desc, args[0], JumpWidth::Narrow),
            Shape::Jump4 => self.emit_jump(desc, args[0], JumpWidth::Wide),
            Shape::JumpTable => self.emit_jump_table(desc, args[0]),
            Shape::BeginCatch => self.begin_catch(desc, args[0]),
            Shape::EndCatch => self.end_catch(desc),
            Shape::Label => self.define_label(args[0]),
            Shape::Eval => self.emit_embedded(desc, args[0]),
        }
    }

    /// Emit `desc.opcode` followed by `operands`, then apply the stack effect.
    fn emit(&mut self, desc: &Descriptor, operands: &[Imm], count: i64) -> Result<()> {
        self.emit_opcode(desc.opcode, operands)?;
        let (consumed, produced) = desc.stack_effect(count);
        self.blocks[self.current].apply_stack_effect(consumed, produced);
        Ok(())
    }

    /// Emit the narrow form when `operand` fits a byte, the wide one otherwise.
    fn emit_sized(&mut self, desc: &Descriptor, operand: u32, count: i64) -> Result<()> {
        let (opcode, imm) = if operand <= 0xff {
            (desc.opcode, Imm::One(operand.into()))
        } else {
            (desc.wide_opcode(), Imm::Four(operand.into()))
        };
        self.emit_opcode(opcode, &[imm])?;
        let (consumed, produced) = desc.stack_effect(count);
        self.blocks[self.current].apply_stack_effect(consumed, produced);
        Ok(())
    }

    fn emit_opcode(&mut self, opcode: Opcode, operands: &[Imm]) -> Result<()> {
        let size = 1 + operands.iter().map(Imm::width).sum::<usize>();
        self.unit.reserve_code(size)?;
        let code = self.unit.code_mut();
        code.push(opcode.raw());
        for imm in operands {
            match *imm {
                Imm::One(v) => push_int1(code, v),
                Imm::Four(v) => push_int4(code, v),
            }
        }
        Ok(())
    }

    /// Push a literal with push1 or push4.
    pub(crate) fn emit_push(&mut self, value: &str) -> Result<()> {
        let index = self.unit.register_literal(value);
        let (opcode, imm) = if index <= 0xff {
            (Opcode::PUSH1, Imm::One(index.into()))
        } else {
            (Opcode::PUSH4, Imm::Four(index.into()))
        };
        self.emit_opcode(opcode, &[imm])?;
        self.blocks[self.current].apply_stack_effect(0, 1);
        Ok(())
    }

    /// Close the current block and open the next one.
    ///
    /// An empty current block is reused instead, so only the final block
    /// can be empty.
    pub(crate) fn start_block(&mut self, flags: BlockFlags, jump_label: Option<&str>) -> Result<()> {
        let here = self.unit.code_len();
        let line = self.line;
        let current = &mut self.blocks[self.current];
        if current.original_start == here {
            current.start_line = line;
            return Ok(());
        }
        current.jump_label = jump_label.map(str::to_owned);
        current.flags |= flags;
        let next = self.alloc_block()?;
        self.blocks[self.current].successor = Some(next);
        trace!("block {} starts at {here}, line {line}", next);
        self.current = next;
        Ok(())
    }

    /// Record the block-ending instruction about to be emitted.
    fn mark_jump_site(&mut self, width: Option<JumpWidth>) {
        let offset = self.unit.code_len();
        let bb = &mut self.blocks[self.current];
        bb.jump_offset = Some(offset);
        bb.jump_line = self.line;
        bb.jump_width = width;
    }

    fn emit_jump(&mut self, desc: &Descriptor, label: &str, width: JumpWidth) -> Result<()> {
        self.mark_jump_site(Some(width));
        let placeholder = match width {
            JumpWidth::Narrow => Imm::One(0),
            JumpWidth::Wide => Imm::Four(0),
        };
        self.emit(desc, &[placeholder], 0)?;
        let conditional = desc
            .opcode
            .info()
            .is_some_and(|info| info.flags().contains(OpcodeFlags::CONDITIONAL));
        let flags = if conditional {
            BlockFlags::FALLTHROUGH
        } else {
            BlockFlags::empty()
        };
        self.start_block(flags, Some(label))
    }

    fn emit_jump_table(&mut self, desc: &Descriptor, table: &str) -> Result<()> {
        let elements = split_list(table)?;
        if elements.len() % 2 != 0 {
            return Err(ErrorKind::OddJumpTable);
        }
        let mut entries = IndexMap::with_capacity(elements.len() / 2);
        for pair in elements.chunks_exact(2) {
            let (key, label) = (&pair[0], &pair[1]);
            if entries.contains_key(key) {
                return Err(ErrorKind::DuplicateJumpTableEntry(key.clone()));
            }
            entries.insert(key.clone(), label.clone());
        }

        let aux_index = self
            .unit
            .create_aux_data(AuxData::JumpTable(JumpTable::default()));
        self.mark_jump_site(None);
        self.emit(desc, &[Imm::Four(aux_index.into())], 0)?;
        self.blocks[self.current].jump_table = Some(JumpTableMirror {
            aux_index,
            entries,
            targets: Vec::new(),
        });
        self.start_block(BlockFlags::JUMP_TABLE | BlockFlags::FALLTHROUGH, None)
    }

    fn begin_catch(&mut self, desc: &Descriptor, handler: &str) -> Result<()> {
        self.mark_jump_site(None);
        // Operand becomes the exception range index once ranges are built.
        self.emit(desc, &[Imm::Four(0)], 0)?;
        self.blocks[self.current].flags |= BlockFlags::BEGIN_CATCH;
        self.start_block(BlockFlags::FALLTHROUGH, Some(handler))
    }

    fn end_catch(&mut self, desc: &Descriptor) -> Result<()> {
        self.blocks[self.current].flags |= BlockFlags::END_CATCH;
        self.emit(desc, &[], 0)?;
        self.start_block(BlockFlags::FALLTHROUGH, None)
    }

    fn define_label(&mut self, name: &str) -> Result<()> {
        self.start_block(BlockFlags::FALLTHROUGH, None)?;
        let current = self.current;
        match self.labels.entry(name.to_owned()) {
            Entry::Occupied(_) => return Err(ErrorKind::DuplicateLabel(name.to_owned())),
            Entry::Vacant(slot) => {
                slot.insert(current);
            }
        }
        let bb = &mut self.blocks[current];
        match &bb.label {
            Some(first) => debug!("label \"{name}\" names the same code as \"{first}\""),
            None => bb.label = Some(name.to_owned()),
        }
        Ok(())
    }

    fn emit_embedded(&mut self, desc: &Descriptor, text: &str) -> Result<()> {
        if self.compiler.is_none() {
            self.emit_push(text)?;
            return self.emit(desc, &[], 0);
        }
        let kind = if desc.opcode == Opcode::EXPR_STK {
            EmbeddedKind::Expression
        } else {
            EmbeddedKind::Script
        };

        self.start_block(BlockFlags::FALLTHROUGH, None)?;
        let saved_depth = self.unit.current_stack_depth;
        let saved_max = self.unit.max_stack_depth;
        self.unit.current_stack_depth = 0;
        self.unit.max_stack_depth = 0;
        let range_base = self.unit.exception_ranges().len();
        let code_before = self.unit.code_len();

        let result = match self.compiler.as_deref_mut() {
            Some(compiler) => compiler.compile(self.unit, kind, text, self.line),
            None => Ok(()),
        };

        let (net, peak) = (self.unit.current_stack_depth, self.unit.max_stack_depth);
        self.unit.current_stack_depth = saved_depth;
        self.unit.max_stack_depth = saved_max;
        result.map_err(|err| ErrorKind::Embedded(err.to_string()))?;

        let bb = &mut self.blocks[self.current];
        bb.max_depth = bb.max_depth.max(bb.final_depth + i64::from(peak));
        bb.final_depth += i64::from(net);

        let mut ranges = self.unit.take_exception_ranges(range_base);
        if !ranges.is_empty() {
            let except_depth = self.unit.except_depth;
            for range in &mut ranges {
                range.nesting_level = range.nesting_level.saturating_sub(except_depth);
                range.relocate(-(code_before as isize));
            }
            debug!(
                "embedded code at line {} brought {} exception ranges",
                self.line,
                ranges.len()
            );
            let code_len = self.unit.code_len() - code_before;
            self.blocks[self.current].foreign.push(ForeignRanges {
                base: range_base as u32,
                code_len,
                ranges,
            });
        }
        self.start_block(BlockFlags::FALLTHROUGH, None)
    }

    /// Compiled-local slot of a simple variable name.
    fn local(&mut self, name: &str) -> Result<u32> {
        if !operand::is_local_scalar(name) {
            return Err(ErrorKind::BadVarName(name.to_owned()));
        }
        Ok(self.unit.resolve_local(name)?)
    }

    fn local_one_byte(&mut self, name: &str) -> Result<i32> {
        let slot = self.local(name)?;
        let slot = i32::try_from(slot).unwrap_or(i32::MAX);
        operand::check_one_byte(slot)
    }
}

/// An immediate operand and its encoded width.
#[derive(Debug, Clone, Copy)]
enum Imm {
    One(i64),
    Four(i64),
}

impl Imm {
    fn width(&self) -> usize {
        match self {
            Imm::One(_) => 1,
            Imm::Four(_) => 4,
        }
    }
}

fn literal(word: &Word) -> Result<&str> {
    match word {
        Word::Literal(text) => Ok(text),
        Word::Substituted(_) => Err(ErrorKind::Substitution),
    }
}
