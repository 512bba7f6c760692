//! Auxiliary data records referenced from the bytecode by index.

use indexmap::IndexMap;
use serde::Serialize;

/// A jump table: case value to code offset relative to the `jumpTable`
/// instruction. Entries keep their insertion order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct JumpTable {
    entries: IndexMap<String, i32>,
}

impl JumpTable {
    /// Set the offset for `key`, returning the previous offset if any.
    pub fn insert(&mut self, key: impl Into<String>, offset: i32) -> Option<i32> {
        self.entries.insert(key.into(), offset)
    }

    pub fn get(&self, key: &str) -> Option<i32> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuxData {
    JumpTable(JumpTable),
}

impl AuxData {
    pub fn as_jump_table(&self) -> Option<&JumpTable> {
        match self {
            AuxData::JumpTable(table) => Some(table),
        }
    }
}
