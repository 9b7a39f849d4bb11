//! Stable-expression keys.
//!
//! A stable expression is one whose value cannot change between two
//! observation points without an intervening assignment: a local, a
//! parameter, a read-only property reachable through a stable accessor
//! chain, or an implicit receiver. Only these receive flow facts.
//!
//! Keys are interned to dense `StableKeyId`s so fact tables are flat maps
//! over small integers.

use rustc_hash::FxHashMap;

use crate::symbols::SymbolId;

/// Interned handle for a stable expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StableKeyId(pub u32);

/// The shape of a trackable entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StableKey {
    /// A local variable or parameter.
    Local(SymbolId),
    /// A property read `base.prop` where `prop` has a stable accessor.
    /// `base` is itself a stable key, so chains like `a.b.c` nest.
    Property {
        base: StableKeyId,
        property: SymbolId,
    },
    /// The implicit receiver at a given scope depth. Nested closures and
    /// extension contexts each contribute their own depth; narrowing one
    /// never affects another.
    Receiver { depth: u32 },
}

/// Intern table for stable keys, one per analyzed compilation unit.
#[derive(Debug, Default)]
pub struct StableKeys {
    keys: Vec<StableKey>,
    map: FxHashMap<StableKey, StableKeyId>,
}

impl StableKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, key: StableKey) -> StableKeyId {
        if let Some(&id) = self.map.get(&key) {
            return id;
        }
        let id = StableKeyId(self.keys.len() as u32);
        self.keys.push(key.clone());
        self.map.insert(key, id);
        id
    }

    pub fn local(&mut self, symbol: SymbolId) -> StableKeyId {
        self.intern(StableKey::Local(symbol))
    }

    pub fn property(&mut self, base: StableKeyId, property: SymbolId) -> StableKeyId {
        self.intern(StableKey::Property { base, property })
    }

    pub fn receiver(&mut self, depth: u32) -> StableKeyId {
        self.intern(StableKey::Receiver { depth })
    }

    pub fn get(&self, id: StableKeyId) -> Option<&StableKey> {
        self.keys.get(id.0 as usize)
    }

    /// Look up an already-interned key without creating it.
    pub fn lookup(&self, key: &StableKey) -> Option<StableKeyId> {
        self.map.get(key).copied()
    }

    /// The symbol a key ultimately reads, when it has one.
    pub fn symbol_of(&self, id: StableKeyId) -> Option<SymbolId> {
        match self.get(id)? {
            StableKey::Local(sym) => Some(*sym),
            StableKey::Property { property, .. } => Some(*property),
            StableKey::Receiver { .. } => None,
        }
    }

    /// Whether `id` is a property key rooted at (or equal to) `base`.
    /// Used to invalidate `a.b.c` when `a` or `a.b` is reassigned.
    pub fn is_rooted_at(&self, id: StableKeyId, base: StableKeyId) -> bool {
        if id == base {
            return true;
        }
        match self.get(id) {
            Some(StableKey::Property { base: b, .. }) => self.is_rooted_at(*b, base),
            _ => false,
        }
    }

    pub fn is_property(&self, id: StableKeyId) -> bool {
        matches!(self.get(id), Some(StableKey::Property { .. }))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate all interned key ids.
    pub fn ids(&self) -> impl Iterator<Item = StableKeyId> + '_ {
        (0..self.keys.len() as u32).map(StableKeyId)
    }
}
