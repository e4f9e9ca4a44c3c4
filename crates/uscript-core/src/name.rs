//! Case-insensitive interned names.
//!
//! Every identifier the compiler stores (field names, enum tags, labels,
//! function friendly names) is interned once into a [`NameTable`]. Two names
//! compare equal when their table indices are equal, so lookups never compare
//! text. Interning ignores ASCII case, matching the language's identifier rules.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use xxhash_rust::xxh64::xxh64;

/// An interned identifier.
///
/// Cloning is cheap. Equality and hashing use the table index only.
#[derive(Clone)]
pub struct Name {
    index: u32,
    text: Rc<str>,
}

impl Name {
    /// Index of this name in its table. Written into bytecode verbatim.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The spelling this name was first interned with.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether this is the reserved `None` name (index 0).
    #[inline]
    pub fn is_none(&self) -> bool {
        self.index == 0
    }

    /// Case-insensitive comparison against raw text.
    pub fn matches(&self, text: &str) -> bool {
        self.text.eq_ignore_ascii_case(text)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for Name {}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.text)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Interning table. Index 0 is always `None`.
pub struct NameTable {
    entries: Vec<Rc<str>>,
    /// xxh64 of the lowercased spelling -> candidate indices.
    lookup: FxHashMap<u64, Vec<u32>>,
}

impl NameTable {
    /// Create a table holding only `None`.
    pub fn new() -> Self {
        let mut table = Self {
            entries: Vec::new(),
            lookup: FxHashMap::default(),
        };
        table.intern("None");
        table
    }

    fn key(text: &str) -> u64 {
        let lower: Vec<u8> = text.bytes().map(|b| b.to_ascii_lowercase()).collect();
        xxh64(&lower, 0)
    }

    /// Intern `text`, returning the existing name if one matches ignoring case.
    pub fn intern(&mut self, text: &str) -> Name {
        if let Some(name) = self.find(text) {
            return name;
        }
        let index = self.entries.len() as u32;
        let text: Rc<str> = Rc::from(text);
        self.entries.push(text.clone());
        self.lookup.entry(Self::key(&text)).or_default().push(index);
        Name { index, text }
    }

    /// Look up a name without interning it.
    pub fn find(&self, text: &str) -> Option<Name> {
        let candidates = self.lookup.get(&Self::key(text))?;
        candidates.iter().find_map(|&index| {
            let entry = &self.entries[index as usize];
            entry.eq_ignore_ascii_case(text).then(|| Name {
                index,
                text: entry.clone(),
            })
        })
    }

    /// Resolve an index back into a name.
    pub fn get(&self, index: u32) -> Option<Name> {
        self.entries.get(index as usize).map(|text| Name {
            index,
            text: text.clone(),
        })
    }

    /// The reserved `None` name.
    pub fn none(&self) -> Name {
        Name {
            index: 0,
            text: self.entries[0].clone(),
        }
    }

    /// Number of interned names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: `None` is interned on construction.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_index_zero() {
        let table = NameTable::new();
        assert!(table.none().is_none());
        assert_eq!(table.find("none").map(|n| n.index()), Some(0));
    }

    #[test]
    fn interning_ignores_case() {
        let mut table = NameTable::new();
        let a = table.intern("Location");
        let b = table.intern("LOCATION");
        assert_eq!(a, b);
        assert_eq!(b.as_str(), "Location");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn distinct_names_differ() {
        let mut table = NameTable::new();
        let a = table.intern("Pitch");
        let b = table.intern("Yaw");
        assert_ne!(a, b);
        assert!(table.find("Roll").is_none());
        assert_eq!(table.get(b.index()), Some(b));
    }
}
