//! Stack-depth verification over the block graph.

use log::debug;

use crate::assembler::Assembler;
use crate::block::{BlockFlags, BlockId};
use crate::error::{AssembleError, ErrorKind, Result};

impl Assembler<'_> {
    /// Check that every path agrees on the stack depth at each block, that
    /// nothing pops below its floor, and that the code leaves one value.
    pub(crate) fn check_stack(&mut self) -> Result<()> {
        for bb in &mut self.blocks {
            bb.flags.remove(BlockFlags::VISITED);
        }

        let mut max_depth: i64 = 0;
        let mut work: Vec<(BlockId, i64)> = vec![(0, 0)];
        while let Some((id, depth)) = work.pop() {
            let bb = &self.blocks[id];
            if bb.flags.contains(BlockFlags::VISITED) {
                if bb.initial_depth != depth {
                    return Err(self.flow_error(id, ErrorKind::InconsistentStack));
                }
                continue;
            }

            let low = depth + bb.min_depth;
            if low < 0 {
                return Err(self.flow_error(id, ErrorKind::StackUnderflow));
            }
            if let Some(catch) = bb.enclosing_catch {
                let floor = &self.blocks[catch];
                if floor.flags.contains(BlockFlags::VISITED)
                    && low < floor.initial_depth + floor.final_depth
                {
                    return Err(self.flow_error(id, ErrorKind::PopBelowCatch));
                }
            }
            max_depth = max_depth.max(depth + bb.max_depth);

            let exit = depth + bb.final_depth;
            if let Some(table) = &bb.jump_table {
                work.extend(table.targets.iter().rev().map(|&t| (t, exit)));
            }
            if let Some(target) = bb.jump_target {
                work.push((target, exit));
            }
            if bb.flags.contains(BlockFlags::FALLTHROUGH)
                && let Some(next) = bb.successor
            {
                work.push((next, exit));
            }

            let bb = &mut self.blocks[id];
            bb.flags |= BlockFlags::VISITED;
            bb.initial_depth = depth;
        }

        let peak = i32::try_from(max_depth + i64::from(self.unit.current_stack_depth))
            .map_err(|_| AssembleError::new(ErrorKind::StackTooDeep))?;
        let unit = &mut *self.unit;
        unit.max_stack_depth = unit.max_stack_depth.max(peak);

        let last = self.last_block();
        let bb = &self.blocks[last];
        if !bb.flags.contains(BlockFlags::VISITED) {
            debug!("end of code is unreachable");
            return Ok(());
        }
        let depth = bb.initial_depth + bb.final_depth;
        match depth {
            1 => {}
            0 => {
                debug!("code leaves nothing on the stack; pushing empty result");
                self.emit_push("")
                    .map_err(|kind| AssembleError::at(self.line, kind))?;
            }
            _ => return Err(self.flow_error(last, ErrorKind::UnbalancedExit(depth))),
        }
        let unit = &mut *self.unit;
        unit.current_stack_depth = unit.current_stack_depth.saturating_add(1);
        unit.max_stack_depth = unit.max_stack_depth.max(unit.current_stack_depth);
        Ok(())
    }
}
