//! Interned literal pool.

use indexmap::IndexSet;
use serde::Serialize;

/// Literal values referenced by `push` instructions, deduplicated by value.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct LiteralPool {
    values: IndexSet<String>,
}

impl LiteralPool {
    /// Return the index of `value`, adding it if not yet present.
    pub fn intern(&mut self, value: &str) -> u32 {
        if let Some(idx) = self.values.get_index_of(value) {
            return idx as u32;
        }
        self.values.insert_full(value.to_owned()).0 as u32
    }

    pub fn get(&self, idx: u32) -> Option<&str> {
        self.values.get_index(idx as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(String::as_str)
    }

    /// Drop every literal interned after the first `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_deduplicates() {
        let mut pool = LiteralPool::default();
        assert_eq!(pool.intern("a"), 0);
        assert_eq!(pool.intern("b"), 1);
        assert_eq!(pool.intern("a"), 0);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(1), Some("b"));
    }

    #[test]
    fn truncate_forgets_removed_values() {
        let mut pool = LiteralPool::default();
        pool.intern("keep");
        pool.intern("drop");
        pool.truncate(1);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.intern("drop"), 1);
        assert_eq!(pool.intern("keep"), 0);
    }
}
