use serde::Serialize;

use crate::auxdata::{AuxData, JumpTable};
use crate::error::{Error, Result};
use crate::exception::ExceptionRange;
use crate::literal::LiteralPool;
use crate::local::LocalTable;

/// The compilation environment the assembler appends into.
///
/// A unit may already hold code when assembly starts; everything the
/// assembler produces is appended after it.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CompileUnit {
    code: Vec<u8>,
    literals: LiteralPool,
    locals: Option<LocalTable>,
    aux_data: Vec<AuxData>,
    exception_ranges: Vec<ExceptionRange>,
    /// Exception nesting depth of the code being compiled.
    pub except_depth: u32,
    pub max_except_depth: u32,
    /// Values left on the stack by the code compiled so far.
    pub current_stack_depth: i32,
    pub max_stack_depth: i32,
}

/// State of a unit that [`CompileUnit::rollback`] restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    code_len: usize,
    literal_count: usize,
    local_count: usize,
    aux_count: usize,
    range_count: usize,
    max_except_depth: u32,
    current_stack_depth: i32,
    max_stack_depth: i32,
}

impl CompileUnit {
    /// A unit for top-level code, which has no local variable table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A unit for a procedure body with the given initial local names.
    pub fn in_procedure<I, S>(locals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            locals: Some(LocalTable::new(locals)),
            ..Self::default()
        }
    }

    // --- Code ---

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn code_mut(&mut self) -> &mut Vec<u8> {
        &mut self.code
    }

    pub fn code_len(&self) -> usize {
        self.code.len()
    }

    /// Make room for `additional` more code bytes.
    pub fn reserve_code(&mut self, additional: usize) -> Result<()> {
        self.code
            .try_reserve(additional)
            .map_err(|_| Error::OutOfMemory("code buffer"))
    }

    // --- Literals ---

    pub fn register_literal(&mut self, value: &str) -> u32 {
        self.literals.intern(value)
    }

    pub fn literals(&self) -> &LiteralPool {
        &self.literals
    }

    // --- Locals ---

    /// Slot for a local variable, created on first use.
    ///
    /// Fails when the unit is not a procedure body.
    pub fn resolve_local(&mut self, name: &str) -> Result<u32> {
        match &mut self.locals {
            Some(table) => Ok(table.find_or_create(name)),
            None => Err(Error::NotInProcedure(name.to_owned())),
        }
    }

    pub fn locals(&self) -> Option<&LocalTable> {
        self.locals.as_ref()
    }

    // --- Auxiliary data ---

    pub fn create_aux_data(&mut self, data: AuxData) -> u32 {
        self.aux_data.push(data);
        (self.aux_data.len() - 1) as u32
    }

    pub fn aux_data(&self) -> &[AuxData] {
        &self.aux_data
    }

    pub fn jump_table_mut(&mut self, index: u32) -> Result<&mut JumpTable> {
        match self.aux_data.get_mut(index as usize) {
            Some(AuxData::JumpTable(table)) => Ok(table),
            None => Err(Error::NoSuchAuxData(index)),
        }
    }

    // --- Exception ranges ---

    pub fn add_exception_range(&mut self, range: ExceptionRange) -> u32 {
        self.max_except_depth = self.max_except_depth.max(range.nesting_level + 1);
        self.exception_ranges.push(range);
        (self.exception_ranges.len() - 1) as u32
    }

    pub fn exception_ranges(&self) -> &[ExceptionRange] {
        &self.exception_ranges
    }

    pub fn exception_range_mut(&mut self, index: u32) -> Option<&mut ExceptionRange> {
        self.exception_ranges.get_mut(index as usize)
    }

    /// Remove and return every exception range from index `start` on.
    pub fn take_exception_ranges(&mut self, start: usize) -> Vec<ExceptionRange> {
        self.exception_ranges
            .drain(start.min(self.exception_ranges.len())..)
            .collect()
    }

    // --- Atomicity ---

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            code_len: self.code.len(),
            literal_count: self.literals.len(),
            local_count: self.locals.as_ref().map_or(0, LocalTable::len),
            aux_count: self.aux_data.len(),
            range_count: self.exception_ranges.len(),
            max_except_depth: self.max_except_depth,
            current_stack_depth: self.current_stack_depth,
            max_stack_depth: self.max_stack_depth,
        }
    }

    /// Discard everything added since `cp` was taken.
    pub fn rollback(&mut self, cp: Checkpoint) {
        log::debug!(
            "rolling back unit: code {} -> {}, literals {} -> {}",
            self.code.len(),
            cp.code_len,
            self.literals.len(),
            cp.literal_count
        );
        self.code.truncate(cp.code_len);
        self.literals.truncate(cp.literal_count);
        if let Some(table) = &mut self.locals {
            table.truncate(cp.local_count);
        }
        self.aux_data.truncate(cp.aux_count);
        self.exception_ranges.truncate(cp.range_count);
        self.max_except_depth = cp.max_except_depth;
        self.current_stack_depth = cp.current_stack_depth;
        self.max_stack_depth = cp.max_stack_depth;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locals_need_a_procedure() {
        let mut top = CompileUnit::new();
        assert_eq!(
            top.resolve_local("x"),
            Err(Error::NotInProcedure("x".into()))
        );

        let mut body = CompileUnit::in_procedure(["a", "b"]);
        assert_eq!(body.resolve_local("b"), Ok(1));
        assert_eq!(body.resolve_local("c"), Ok(2));
        assert_eq!(body.locals().unwrap().len(), 3);
    }

    #[test]
    fn rollback_restores_everything() {
        let mut unit = CompileUnit::in_procedure(["a"]);
        unit.code_mut().push(1);
        unit.register_literal("x");
        let cp = unit.checkpoint();

        unit.code_mut().extend_from_slice(&[2, 3]);
        unit.register_literal("y");
        unit.resolve_local("z").unwrap();
        unit.create_aux_data(AuxData::JumpTable(JumpTable::default()));
        unit.add_exception_range(ExceptionRange::catch(2, 0, 1));
        unit.max_stack_depth = 9;

        unit.rollback(cp);
        assert_eq!(unit.code(), &[1]);
        assert_eq!(unit.literals().len(), 1);
        assert_eq!(unit.locals().unwrap().len(), 1);
        assert!(unit.aux_data().is_empty());
        assert!(unit.exception_ranges().is_empty());
        assert_eq!(unit.max_except_depth, 0);
        assert_eq!(unit.max_stack_depth, 0);
    }

    #[test]
    fn take_exception_ranges_drains_tail() {
        let mut unit = CompileUnit::new();
        unit.add_exception_range(ExceptionRange::catch(0, 0, 4));
        unit.add_exception_range(ExceptionRange::catch(1, 1, 3));
        let taken = unit.take_exception_ranges(1);
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].nesting_level, 1);
        assert_eq!(unit.exception_ranges().len(), 1);
    }

    #[test]
    fn jump_table_lookup() {
        let mut unit = CompileUnit::new();
        let idx = unit.create_aux_data(AuxData::JumpTable(JumpTable::default()));
        unit.jump_table_mut(idx).unwrap().insert("a", 4);
        assert_eq!(unit.aux_data()[0].as_jump_table().unwrap().get("a"), Some(4));
        assert_eq!(unit.jump_table_mut(7), Err(Error::NoSuchAuxData(7)));
    }
}
