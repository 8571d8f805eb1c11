//! Write-once dictionaries of grammar definitions
//!
//! Dictionaries are filled through a [`DictionaryBuilder`] while a definition
//! document is read, then frozen and handed to later phases by reference.

use crate::model::{Component, Field, Segment, SegmentGroup};
use std::collections::BTreeMap;
use tracing::warn;

/// Data element id -> definition
pub type ComponentDictionary = Dictionary<Component>;
/// Composite id -> definition
pub type FieldDictionary = Dictionary<Field>;
/// Segment code -> definition
pub type SegmentDictionary = Dictionary<Segment>;

/// Read-only id -> definition map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary<T> {
    entries: BTreeMap<String, T>,
}

impl<T> Dictionary<T> {
    /// Get a definition by id
    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    /// Check if a definition exists
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(id, value)| (id.as_str(), value))
    }
}

impl<T> Default for Dictionary<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl SegmentDictionary {
    /// Index the top level segments of a definitions group by segment code
    pub fn from_group(group: &SegmentGroup) -> Self {
        let mut builder = DictionaryBuilder::new();
        for segment in group.segments() {
            builder.insert(segment.segcode.clone(), segment.clone());
        }
        builder.build()
    }
}

/// Accumulates definitions; the first definition registered for an id wins
#[derive(Debug)]
pub struct DictionaryBuilder<T> {
    entries: BTreeMap<String, T>,
}

impl<T> DictionaryBuilder<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register a definition. Returns `false` (and keeps the existing entry)
    /// when the id is already defined.
    pub fn insert(&mut self, id: impl Into<String>, value: T) -> bool {
        let id = id.into();
        if self.entries.contains_key(&id) {
            warn!("Duplicate definition for id {}, keeping the first", id);
            return false;
        }
        self.entries.insert(id, value);
        true
    }

    pub fn build(self) -> Dictionary<T> {
        Dictionary {
            entries: self.entries,
        }
    }
}

impl<T> Default for DictionaryBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
