//! Exception contexts: catch-state propagation, the no-throw check, and
//! synthesis of exception ranges.

use log::{debug, trace};
use tal_isa::encoding::{read_uint4, store_int4};
use tal_isa::{Opcode, instruction_size};
use tal_unit::ExceptionRange;

use crate::assembler::Assembler;
use crate::block::{BlockFlags, BlockId, CatchState};
use crate::error::{AssembleError, ErrorKind, Result};

/// Work item: block, enclosing catch, state and catch depth on entry.
type CatchVisit = (BlockId, Option<BlockId>, CatchState, u32);

impl Assembler<'_> {
    pub(crate) fn process_catches(&mut self) -> Result<()> {
        self.propagate_catch_states()?;

        let last = self.last_block();
        if matches!(
            self.blocks[last].catch_state,
            CatchState::Inside | CatchState::Caught
        ) {
            return Err(self.flow_error(last, ErrorKind::UnclosedCatch));
        }

        self.build_exception_ranges()?;
        self.restore_embedded_ranges()
    }

    /// Label every reachable block with its enclosing catch and state.
    fn propagate_catch_states(&mut self) -> Result<()> {
        let mut work: Vec<CatchVisit> = vec![(0, None, CatchState::Outside, 0)];
        while let Some((id, enclosing, state, depth)) = work.pop() {
            let bb = &mut self.blocks[id];
            if bb.catch_state == CatchState::Unknown {
                bb.enclosing_catch = enclosing;
                bb.catch_depth = depth;
            } else if bb.enclosing_catch != enclosing {
                return Err(self.flow_error(id, ErrorKind::InconsistentCatch));
            }
            if state <= bb.catch_state {
                continue;
            }
            bb.catch_state = state;

            let mut fallthrough = (enclosing, state, depth);
            let mut jump = (enclosing, state, depth);
            if bb.flags.contains(BlockFlags::BEGIN_CATCH) {
                fallthrough = (Some(id), CatchState::Inside, depth + 1);
                jump = (Some(id), CatchState::Caught, depth + 1);
            } else if bb.flags.contains(BlockFlags::END_CATCH) {
                let Some(catch) = enclosing else {
                    return Err(self.flow_error(id, ErrorKind::EndCatchWithoutBegin));
                };
                let outer = &self.blocks[catch];
                fallthrough = (outer.enclosing_catch, outer.catch_state, depth - 1);
            }

            let bb = &self.blocks[id];
            if let Some(table) = &bb.jump_table {
                for &target in &table.targets {
                    work.push((target, enclosing, state, depth));
                }
            }
            if let Some(target) = bb.jump_target {
                work.push((target, jump.0, jump.1, jump.2));
            }
            if bb.flags.contains(BlockFlags::FALLTHROUGH)
                && let Some(next) = bb.successor
            {
                work.push((next, fallthrough.0, fallthrough.1, fallthrough.2));
            }
        }
        Ok(())
    }

    /// Reject throwing instructions in blocks that run after an exception
    /// was caught but before `endCatch`.
    pub(crate) fn check_no_throw(&self) -> Result<()> {
        let code = self.unit.code();
        for id in 0..self.blocks.len() {
            if self.blocks[id].catch_state != CatchState::Caught {
                continue;
            }
            let range = self.block_range(id);
            let mut at = range.start;
            while at < range.end {
                let opcode = Opcode(code[at]);
                if opcode.can_throw() {
                    return Err(
                        self.flow_error(id, ErrorKind::ThrowAfterCatch(opcode.mnemonic()))
                    );
                }
                at += instruction_size(code, at)
                    .map_err(|err| AssembleError::new(ErrorKind::Embedded(err.to_string())))?;
            }
        }
        Ok(())
    }

    /// Walk blocks in program order, opening a range when a block first
    /// enters a catch and closing it when control leaves the catch.
    fn build_exception_ranges(&mut self) -> Result<()> {
        let max_depth = self
            .blocks
            .iter()
            .map(|bb| bb.catch_depth as usize)
            .max()
            .unwrap_or(0);
        if max_depth == 0 {
            return Ok(());
        }

        let mut open = OpenCatches {
            catches: vec![None; max_depth],
            indices: vec![None; max_depth],
        };
        let mut open_depth = 0;
        for id in 0..self.blocks.len() {
            let start = self.blocks[id].start;
            let depth = self.blocks[id].catch_depth as usize;
            let caught = self.blocks[id].catch_state == CatchState::Caught;

            while open_depth > depth {
                open_depth -= 1;
                self.close_range(&mut open, open_depth, start);
            }

            // Catches that no longer enclose this block, or whose exception
            // has been caught here.
            let mut catch = self.blocks[id].enclosing_catch;
            for level in (0..depth).rev() {
                let innermost_caught = caught && level + 1 == depth;
                if level < open_depth
                    && open.catches[level].is_some()
                    && (open.catches[level] != catch || innermost_caught)
                {
                    self.close_range(&mut open, level, start);
                }
                catch = catch.and_then(|c| self.blocks[c].enclosing_catch);
            }

            let mut catch = self.blocks[id].enclosing_catch;
            for level in (0..depth).rev() {
                let Some(c) = catch else { break };
                let innermost_caught = caught && level + 1 == depth;
                if open.catches[level].is_none() && !innermost_caught {
                    let handler = self.blocks[c].jump_target.map_or(start, |h| self.blocks[h].start);
                    let nesting = self.unit.except_depth + level as u32;
                    let index = self
                        .unit
                        .add_exception_range(ExceptionRange::catch(nesting, start, handler));
                    trace!("range {index} opens at {start}, handler {handler}, level {nesting}");
                    open.catches[level] = Some(c);
                    open.indices[level] = Some(index);
                }
                catch = self.blocks[c].enclosing_catch;
            }
            open_depth = depth;

            if id > 0 && self.blocks[id - 1].flags.contains(BlockFlags::BEGIN_CATCH) {
                let index = depth
                    .checked_sub(1)
                    .and_then(|level| open.indices[level])
                    .map_or(-1, i64::from);
                store_int4(self.unit.code_mut(), start - 4, index);
            }
        }

        let end = self.unit.code_len();
        while open_depth > 0 {
            open_depth -= 1;
            self.close_range(&mut open, open_depth, end);
        }
        Ok(())
    }

    fn close_range(&mut self, open: &mut OpenCatches, level: usize, end: usize) {
        open.catches[level] = None;
        if let Some(index) = open.indices[level].take()
            && let Some(range) = self.unit.exception_range_mut(index)
        {
            range.num_code_bytes = end - range.code_offset;
            trace!("range {index} closes at {end}");
        }
    }

    /// Append ranges from embedded compilations at their final position and
    /// depth, and point their `beginCatch` operands at the new indices.
    fn restore_embedded_ranges(&mut self) -> Result<()> {
        for id in 0..self.blocks.len() {
            if self.blocks[id].foreign.is_empty() {
                continue;
            }
            let start = self.blocks[id].start;
            let nesting = self.unit.except_depth + self.blocks[id].catch_depth;
            for foreign in std::mem::take(&mut self.blocks[id].foreign) {
                let new_base = self.unit.exception_ranges().len() as u32;
                let count = foreign.ranges.len() as u32;
                for mut range in foreign.ranges {
                    range.nesting_level += nesting;
                    range.relocate(start as isize);
                    self.unit.add_exception_range(range);
                }
                debug!(
                    "moved {count} embedded ranges from index {} to {new_base}",
                    foreign.base
                );

                let old = foreign.base..foreign.base + count;
                let code = self.unit.code_mut();
                let mut at = start;
                while at < start + foreign.code_len {
                    if code[at] == Opcode::BEGIN_CATCH4.raw() {
                        let index = read_uint4(code, at + 1);
                        if old.contains(&index) {
                            let moved = index - foreign.base + new_base;
                            store_int4(code, at + 1, i64::from(moved));
                        }
                    }
                    at += instruction_size(code, at).map_err(|err| {
                        AssembleError::new(ErrorKind::Embedded(err.to_string()))
                    })?;
                }
            }
        }
        Ok(())
    }
}

/// Catches with an open range, indexed by nesting level.
struct OpenCatches {
    catches: Vec<Option<BlockId>>,
    indices: Vec<Option<u32>>,
}
