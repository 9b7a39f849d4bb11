//! String interning for identifiers and names.
//!
//! Interning maps each distinct string to a small copyable `Atom` so that
//! name comparisons during analysis are integer comparisons, never string
//! comparisons. Atoms are only meaningful together with the `Interner` that
//! produced them.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// An interned string handle.
///
/// Atoms are cheap to copy and compare. Resolving an atom back to its text
/// requires the owning [`Interner`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Atom(pub u32);

impl Atom {
    /// Sentinel for "no name" (e.g. an unlabeled loop).
    pub const NONE: Self = Self(u32::MAX);

    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

/// Append-only string interner.
#[derive(Debug, Default)]
pub struct Interner {
    map: FxHashMap<String, Atom>,
    strings: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its atom. Repeated calls with equal
    /// strings return equal atoms.
    pub fn intern(&mut self, text: &str) -> Atom {
        if let Some(&atom) = self.map.get(text) {
            return atom;
        }
        let atom = Atom(self.strings.len() as u32);
        self.strings.push(text.to_string());
        self.map.insert(text.to_string(), atom);
        atom
    }

    /// Resolve an atom back to its text.
    pub fn resolve(&self, atom: Atom) -> Option<&str> {
        if atom.is_none() {
            return None;
        }
        self.strings.get(atom.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
