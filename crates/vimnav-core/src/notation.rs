#![forbid(unsafe_code)]

//! Key sequence notation.
//!
//! Bindings are written as plain strings. Parsing rules:
//!
//! | Binding       | Keys                          |
//! |---------------|-------------------------------|
//! | `""`          | none (unbound)                |
//! | `"gg"`        | `g`, `g`                      |
//! | `"Escape"`    | `Escape` (whole-string name)  |
//! | `"g<Escape>"` | `g`, `Escape`                 |
//! | `"<"`         | `<` (no closing bracket)      |
//! | `"<foo>"`     | `<`, `f`, `o`, `o`, `>`       |
//!
//! Parsing never fails: malformed `<...>` groups are read as literal
//! characters. `Display` writes the compact form back out, so
//! `parse(seq.to_string()) == seq` for every sequence that `parse` produces.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::event::{Key, NamedKey};

/// An ordered, possibly empty run of key symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeySequence(Vec<Key>);

impl KeySequence {
    #[must_use]
    pub fn new(keys: Vec<Key>) -> Self {
        Self(keys)
    }

    /// Parse binding notation. See the module docs for the grammar.
    #[must_use]
    pub fn parse(notation: &str) -> Self {
        if notation.chars().nth(1).is_some()
            && let Some(named) = NamedKey::from_dom(notation)
        {
            return Self(vec![Key::Named(named)]);
        }

        let mut keys = Vec::with_capacity(notation.len());
        let mut rest = notation;
        while let Some(c) = rest.chars().next() {
            if c == '<'
                && let Some(end) = rest.find('>')
                && let Some(named) = NamedKey::from_dom(&rest[1..end])
            {
                keys.push(Key::Named(named));
                rest = &rest[end + 1..];
                continue;
            }
            keys.push(Key::Char(c));
            rest = &rest[c.len_utf8()..];
        }
        Self(keys)
    }

    #[must_use]
    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Empty sequences are unbound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn matches(&self, keys: &[Key]) -> bool {
        self.0 == keys
    }

    /// True if `keys` is a strict, non-empty prefix of this sequence.
    #[must_use]
    pub fn extends(&self, keys: &[Key]) -> bool {
        !keys.is_empty() && self.0.len() > keys.len() && self.0.starts_with(keys)
    }
}

impl From<&str> for KeySequence {
    fn from(notation: &str) -> Self {
        Self::parse(notation)
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [Key::Named(named)] = self.0.as_slice() {
            return named.fmt(f);
        }
        for key in &self.0 {
            match key {
                Key::Char(c) => write!(f, "{c}")?,
                Key::Named(named) => write!(f, "<{named}>")?,
            }
        }
        Ok(())
    }
}

impl Serialize for KeySequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeySequence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let notation = String::deserialize(deserializer)?;
        Ok(Self::parse(&notation))
    }
}
