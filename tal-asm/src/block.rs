//! Basic blocks, stored in an arena and addressed by index.

use indexmap::IndexMap;
use tal_unit::ExceptionRange;

/// Index of a basic block within the assembler's arena.
pub type BlockId = usize;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BlockFlags: u8 {
        /// Control can fall off the end into the successor.
        const FALLTHROUGH = 1 << 0;
        /// Ends with a jump table.
        const JUMP_TABLE = 1 << 1;
        /// Ends with `beginCatch`; the jump target is the handler.
        const BEGIN_CATCH = 1 << 2;
        /// Ends with `endCatch`.
        const END_CATCH = 1 << 3;
        /// Seen by the current traversal.
        const VISITED = 1 << 4;
        /// The block's jump was relaxed from narrow to wide.
        const WIDENED = 1 << 5;
    }
}

/// Encoding width of a block-ending jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpWidth {
    /// One-byte offset; may still be widened.
    Narrow,
    /// Four-byte offset.
    Wide,
}

/// Exception context of a block, ordered from least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CatchState {
    #[default]
    Unknown,
    Outside,
    Inside,
    /// Reachable after an exception was caught but before `endCatch`.
    Caught,
}

/// `jumpTable` operand, kept symbolic until labels resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpTableMirror {
    pub aux_index: u32,
    /// Key to label, in source order.
    pub entries: IndexMap<String, String>,
    /// Resolved target of each entry.
    pub targets: Vec<BlockId>,
}

/// Exception ranges produced by an embedded compilation, held until the
/// enclosing block's final position and catch depth are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignRanges {
    /// Index the first range had in the unit when it was compiled.
    pub base: u32,
    /// Length of the embedded code, which starts at the block start.
    pub code_len: usize,
    /// Ranges with offsets relative to the block start and nesting levels
    /// relative to the enclosing exception depth.
    pub ranges: Vec<ExceptionRange>,
}

#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    /// Offset of the first byte before relaxation.
    pub original_start: usize,
    /// Offset of the first byte; updated by relaxation.
    pub start: usize,
    pub start_line: u32,
    /// First label naming the block.
    pub label: Option<String>,

    /// Offset of the block-ending jump, jump table or `beginCatch`.
    pub jump_offset: Option<usize>,
    pub jump_line: u32,
    pub jump_width: Option<JumpWidth>,
    pub jump_label: Option<String>,
    pub jump_target: Option<BlockId>,
    pub jump_table: Option<JumpTableMirror>,

    /// Lexically next block.
    pub successor: Option<BlockId>,

    /// Stack depths relative to block entry.
    pub initial_depth: i64,
    pub min_depth: i64,
    pub max_depth: i64,
    pub final_depth: i64,

    pub catch_state: CatchState,
    pub catch_depth: u32,
    pub enclosing_catch: Option<BlockId>,
    pub foreign: Vec<ForeignRanges>,

    pub flags: BlockFlags,
}

impl BasicBlock {
    pub fn new(start: usize, line: u32) -> Self {
        Self {
            original_start: start,
            start,
            start_line: line,
            ..Self::default()
        }
    }

    pub fn adjust_depth(&mut self, delta: i64) {
        let depth = self.final_depth + delta;
        self.min_depth = self.min_depth.min(depth);
        self.max_depth = self.max_depth.max(depth);
        self.final_depth = depth;
    }

    /// Pop `consumed` values, then push `produced`.
    pub fn apply_stack_effect(&mut self, consumed: i64, produced: i64) {
        self.adjust_depth(-consumed);
        self.adjust_depth(produced);
    }

    /// Bytes the block grew by during relaxation.
    pub fn growth(&self) -> usize {
        if self.flags.contains(BlockFlags::WIDENED) { 3 } else { 0 }
    }

    pub fn ends_with_jump(&self) -> bool {
        self.jump_width.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_tracks_extremes() {
        let mut bb = BasicBlock::new(0, 1);
        bb.apply_stack_effect(0, 1);
        bb.apply_stack_effect(0, 1);
        bb.apply_stack_effect(2, 1);
        bb.apply_stack_effect(3, 0);
        assert_eq!(bb.max_depth, 2);
        assert_eq!(bb.min_depth, -2);
        assert_eq!(bb.final_depth, -2);
    }

    #[test]
    fn depth_does_not_wrap_at_i32_bounds() {
        let mut bb = BasicBlock::new(0, 1);
        let max = i64::from(i32::MAX);
        bb.apply_stack_effect(0, max);
        bb.apply_stack_effect(0, max);
        assert_eq!(bb.max_depth, 2 * max);
        bb.apply_stack_effect(3 * max, 0);
        assert_eq!(bb.min_depth, -max);
    }

    #[test]
    fn catch_states_are_ordered() {
        assert!(CatchState::Unknown < CatchState::Outside);
        assert!(CatchState::Outside < CatchState::Inside);
        assert!(CatchState::Inside < CatchState::Caught);
    }
}
