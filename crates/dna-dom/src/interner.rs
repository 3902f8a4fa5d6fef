//! String Interner - Deduplicate tag and attribute names
//!
//! Component trees repeat the same handful of names ("div", "slot", "name")
//! thousands of times, so elements store a 4-byte id instead of a `String`.

use std::collections::HashMap;

/// Interned string ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct InternedString(pub u32);

impl InternedString {
    /// Empty string
    pub const EMPTY: InternedString = InternedString(0);
}

/// String interner for tag and attribute names
#[derive(Debug)]
pub struct StringInterner {
    /// Map from string content to index
    map: HashMap<Box<str>, u32>,
    /// Strings by index
    strings: Vec<Box<str>>,
}

impl StringInterner {
    /// Create a new interner with the names components use most pre-interned
    pub fn new() -> Self {
        let mut interner = Self {
            map: HashMap::with_capacity(64),
            strings: Vec::with_capacity(64),
        };

        // Index 0 is always the empty string
        interner.intern("");

        const COMMON: &[&str] = &[
            "div", "span", "p", "slot", "template", "ul", "li", "button",
            "id", "class", "name", "is", "style",
        ];
        for name in COMMON {
            interner.intern(name);
        }

        interner
    }

    /// Intern a string, returning the existing ID when already present
    pub fn intern(&mut self, s: &str) -> InternedString {
        if let Some(&index) = self.map.get(s) {
            return InternedString(index);
        }

        let index = self.strings.len() as u32;
        self.strings.push(s.into());
        self.map.insert(s.into(), index);
        InternedString(index)
    }

    /// Intern an HTML name (tag/attribute), which is ASCII case-insensitive
    pub fn intern_name(&mut self, s: &str) -> InternedString {
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            self.intern(&s.to_ascii_lowercase())
        } else {
            self.intern(s)
        }
    }

    /// Look up a string without interning it
    pub fn lookup(&self, s: &str) -> Option<InternedString> {
        self.map.get(s).map(|&idx| InternedString(idx))
    }

    /// Get the string for an interned ID
    #[inline]
    pub fn get(&self, id: InternedString) -> &str {
        self.strings.get(id.0 as usize).map(|s| &**s).unwrap_or("")
    }

    /// Number of interned strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut interner = StringInterner::new();
        let id1 = interner.intern("x-card");
        let id2 = interner.intern("x-card");
        assert_eq!(id1, id2);
        assert_eq!(interner.get(id1), "x-card");
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let mut interner = StringInterner::new();
        let lower = interner.intern_name("x-card");
        let upper = interner.intern_name("X-Card");
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_lookup_does_not_intern() {
        let interner = StringInterner::new();
        let before = interner.len();
        assert!(interner.lookup("never-seen").is_none());
        assert_eq!(interner.len(), before);
        assert_eq!(interner.lookup(""), Some(InternedString::EMPTY));
    }
}
