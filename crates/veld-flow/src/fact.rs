//! Flow facts: per-key type refinements.
//!
//! A fact maps stable keys to their narrowed types. Absence means the
//! declared/enhanced type with no extra knowledge (lattice top for that
//! key); an entry is always strictly more precise than the declared type.
//! The meet of two facts keeps a key only when both sides refine it, at
//! the union of their refinements, the knowledge both paths agree on.

use rustc_hash::FxHashMap;
use veld_ast::StableKeyId;
use veld_common::limits::MAX_REFINEMENT_CANDIDATES;
use veld_types::{TypeId, TypeInterner};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlowFact {
    narrowed: FxHashMap<StableKeyId, TypeId>,
}

impl FlowFact {
    pub fn new() -> Self {
        Self::default()
    }

    /// The narrowed type of a key, if any refinement holds here.
    pub fn get(&self, key: StableKeyId) -> Option<TypeId> {
        self.narrowed.get(&key).copied()
    }

    /// Install a refinement. Entries that are not strictly below the
    /// declared type, or whose candidate set has grown past the tracking
    /// limit, are dropped instead: precision loss, never unsoundness.
    pub fn set(&mut self, types: &TypeInterner, key: StableKeyId, ty: TypeId, declared: TypeId) {
        if ty == declared || types.is_subtype(declared, ty) {
            self.narrowed.remove(&key);
            return;
        }
        if types.union_members(types.strip_null(ty)).len() > MAX_REFINEMENT_CANDIDATES {
            self.narrowed.remove(&key);
            return;
        }
        self.narrowed.insert(key, ty);
    }

    pub fn clear(&mut self, key: StableKeyId) {
        self.narrowed.remove(&key);
    }

    pub fn retain(&mut self, mut keep: impl FnMut(StableKeyId, TypeId) -> bool) {
        self.narrowed.retain(|&k, &mut t| keep(k, t));
    }

    /// Pointwise meet: for each key refined on both sides, the union of the
    /// two refinements; keys refined on only one side are dropped. Entries
    /// whose union climbs back to the declared type are dropped too.
    pub fn meet(
        &mut self,
        types: &TypeInterner,
        other: &FlowFact,
        declared: impl Fn(StableKeyId) -> TypeId,
    ) {
        let mut merged = FxHashMap::default();
        for (&key, &ty) in &self.narrowed {
            let Some(other_ty) = other.get(key) else {
                continue;
            };
            if ty == other_ty {
                merged.insert(key, ty);
                continue;
            }
            let joined = types.union(vec![ty, other_ty]);
            let base = declared(key);
            if joined != base && !types.is_subtype(base, joined) {
                merged.insert(key, joined);
            }
        }
        self.narrowed = merged;
    }

    pub fn len(&self) -> usize {
        self.narrowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.narrowed.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StableKeyId, TypeId)> + '_ {
        self.narrowed.iter().map(|(&k, &t)| (k, t))
    }
}
