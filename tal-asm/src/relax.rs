//! Label resolution, jump relaxation and offset fill-in.

use std::ops::Range;

use log::{debug, trace};
use tal_isa::encoding::{store_int1, store_int4};

use crate::assembler::Assembler;
use crate::block::{BlockFlags, JumpWidth};
use crate::error::{AssembleError, ErrorKind, Result};

/// Signed range of a one-byte jump offset.
const NARROW_RANGE: Range<i64> = -0x80..0x80;

/// Extra bytes a widened jump takes.
const WIDENING: usize = 3;

impl Assembler<'_> {
    /// Bind every jump, handler and jump-table label to its block.
    pub(crate) fn resolve_labels(&mut self) -> Result<()> {
        for id in 0..self.blocks.len() {
            let bb = &self.blocks[id];
            let line = bb.jump_line;
            let target = match &bb.jump_label {
                Some(label) => Some(self.lookup_label(label, line)?),
                None => None,
            };
            let table_targets = match &bb.jump_table {
                Some(table) => table
                    .entries
                    .iter()
                    .map(|(_, label)| self.lookup_label(label, line))
                    .collect::<Result<Vec<_>>>()?,
                None => Vec::new(),
            };

            let bb = &mut self.blocks[id];
            bb.jump_target = target;
            if let Some(table) = &mut bb.jump_table {
                table.targets = table_targets;
            }
        }
        Ok(())
    }

    fn lookup_label(&self, label: &str, line: u32) -> Result<usize> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| AssembleError::at(line, ErrorKind::UndefinedLabel(label.to_owned())))
    }

    /// Widen narrow jumps whose targets are out of reach until none are,
    /// then move the code to make room.
    pub(crate) fn relax_jumps(&mut self) -> Result<()> {
        let lengths: Vec<usize> = (0..self.blocks.len())
            .map(|id| self.block_range(id).len())
            .collect();
        let code_start = self.blocks[0].original_start;

        let mut pass = 0;
        loop {
            pass += 1;
            let mut at = code_start;
            for (bb, len) in self.blocks.iter_mut().zip(&lengths) {
                bb.start = at;
                at += len + bb.growth();
            }

            let mut widened = 0;
            for id in 0..self.blocks.len() {
                let bb = &self.blocks[id];
                let (Some(JumpWidth::Narrow), Some(offset), Some(target)) =
                    (bb.jump_width, bb.jump_offset, bb.jump_target)
                else {
                    continue;
                };
                let at = bb.start + (offset - bb.original_start);
                let distance = self.blocks[target].start as i64 - at as i64;
                if !NARROW_RANGE.contains(&distance) {
                    trace!("widening jump at line {} (distance {distance})", bb.jump_line);
                    let bb = &mut self.blocks[id];
                    bb.jump_width = Some(JumpWidth::Wide);
                    bb.flags |= BlockFlags::WIDENED;
                    widened += 1;
                }
            }
            if widened == 0 {
                break;
            }
            debug!("relaxation pass {pass} widened {widened} jumps");
        }

        self.relocate(&lengths)
    }

    /// Move every block to its relaxed position, last block first.
    fn relocate(&mut self, lengths: &[usize]) -> Result<()> {
        let growth: usize = self.blocks.iter().map(|bb| bb.growth()).sum();
        if growth == 0 {
            return Ok(());
        }

        let plan: Vec<(Range<usize>, usize)> = self
            .blocks
            .iter()
            .zip(lengths)
            .filter(|(bb, _)| bb.start != bb.original_start)
            .map(|(bb, &len)| (bb.original_start..bb.original_start + len, bb.start))
            .collect();
        debug!("relocating {} blocks, code grows by {growth} bytes", plan.len());

        self.unit
            .reserve_code(growth)
            .map_err(|err| AssembleError::new(err.into()))?;
        let code = self.unit.code_mut();
        code.resize(code.len() + growth, 0);
        for (from, to) in plan.into_iter().rev() {
            code.copy_within(from, to);
        }

        for bb in &mut self.blocks {
            let Some(offset) = bb.jump_offset else {
                continue;
            };
            let moved = bb.start + (offset - bb.original_start);
            bb.jump_offset = Some(moved);
            if bb.flags.contains(BlockFlags::WIDENED) {
                code[moved] += 1;
                code[moved + 1..moved + 5].fill(0);
            }
        }
        Ok(())
    }

    /// Write jump offsets and jump-table entries for the final layout.
    pub(crate) fn fill_jump_offsets(&mut self) -> Result<()> {
        for id in 0..self.blocks.len() {
            let bb = &self.blocks[id];
            let Some(offset) = bb.jump_offset else {
                continue;
            };

            if let (Some(width), Some(target)) = (bb.jump_width, bb.jump_target) {
                let delta = self.blocks[target].start as i64 - offset as i64;
                let code = self.unit.code_mut();
                match width {
                    JumpWidth::Narrow => store_int1(code, offset + 1, delta),
                    JumpWidth::Wide => store_int4(code, offset + 1, delta),
                }
            }

            if let Some(table) = &bb.jump_table {
                let aux = self
                    .unit
                    .jump_table_mut(table.aux_index)
                    .map_err(|err| AssembleError::new(err.into()))?;
                for ((key, _), &target) in table.entries.iter().zip(&table.targets) {
                    let delta = self.blocks[target].start as i64 - offset as i64;
                    aux.insert(key.as_str(), delta as i32);
                }
            }
        }
        Ok(())
    }
}
