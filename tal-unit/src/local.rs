use indexmap::IndexSet;
use serde::Serialize;

/// Compiled local variable slots of a procedure body.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LocalTable {
    names: IndexSet<String>,
}

impl LocalTable {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn find(&self, name: &str) -> Option<u32> {
        self.names.get_index_of(name).map(|i| i as u32)
    }

    /// Slot of `name`, allocating a fresh slot on first use.
    pub fn find_or_create(&mut self, name: &str) -> u32 {
        if let Some(slot) = self.find(name) {
            return slot;
        }
        self.names.insert_full(name.to_owned()).0 as u32
    }

    pub fn name(&self, slot: u32) -> Option<&str> {
        self.names.get_index(slot as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.names.truncate(len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_follow_declaration_order() {
        let mut table = LocalTable::new(["a", "b"]);
        assert_eq!(table.find("b"), Some(1));
        assert_eq!(table.find_or_create("c"), 2);
        assert_eq!(table.find_or_create("a"), 0);
        assert_eq!(table.name(2), Some("c"));
        table.truncate(2);
        assert_eq!(table.find("c"), None);
        assert_eq!(table.find_or_create("d"), 2);
    }
}
