use serde::Serialize;

/// What an exception range handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeKind {
    Catch,
    Loop,
}

/// One entry of the interpreter's exception range table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionRange {
    pub kind: RangeKind,
    /// Static nesting depth; 0 is outermost.
    pub nesting_level: u32,
    pub code_offset: usize,
    pub num_code_bytes: usize,
    /// Handler entry point, for catch ranges.
    pub catch_offset: Option<usize>,
    /// Loop exits, for loop ranges.
    pub break_offset: Option<usize>,
    pub continue_offset: Option<usize>,
}

impl ExceptionRange {
    pub fn catch(nesting_level: u32, code_offset: usize, catch_offset: usize) -> Self {
        Self {
            kind: RangeKind::Catch,
            nesting_level,
            code_offset,
            num_code_bytes: 0,
            catch_offset: Some(catch_offset),
            break_offset: None,
            continue_offset: None,
        }
    }

    pub fn loop_range(
        nesting_level: u32,
        code_offset: usize,
        break_offset: usize,
        continue_offset: usize,
    ) -> Self {
        Self {
            kind: RangeKind::Loop,
            nesting_level,
            code_offset,
            num_code_bytes: 0,
            catch_offset: None,
            break_offset: Some(break_offset),
            continue_offset: Some(continue_offset),
        }
    }

    /// Shift every code offset in the range by `delta` bytes.
    pub fn relocate(&mut self, delta: isize) {
        let shift = |off: usize| off.saturating_add_signed(delta);
        self.code_offset = shift(self.code_offset);
        self.catch_offset = self.catch_offset.map(shift);
        self.break_offset = self.break_offset.map(shift);
        self.continue_offset = self.continue_offset.map(shift);
    }
}
