//! Subtype, intersection, and closed-set complement queries.
//!
//! These are the three operations narrowing is built from: a true `is`
//! branch intersects, a false branch over a sealed hierarchy subtracts,
//! and branch merges union. All of them are conservative: when a relation
//! cannot be proven the query degrades toward the declared type rather
//! than inventing precision.

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::def::ClassId;
use crate::intern::{TypeData, TypeId, TypeInterner};

impl TypeInterner {
    /// Is `sub` a (transitive, reflexive) subclass of `sup`?
    pub fn is_subclass(&self, sub: ClassId, sup: ClassId) -> bool {
        if sub == sup {
            return true;
        }
        let mut seen = FxHashSet::default();
        let mut stack = vec![sub];
        while let Some(c) = stack.pop() {
            if !seen.insert(c) {
                continue;
            }
            for &parent in &self.class(c).supertypes {
                if parent == sup {
                    return true;
                }
                stack.push(parent);
            }
        }
        false
    }

    /// The closed variant set of a sealed class: every concrete leaf of its
    /// sealed sub-hierarchy. `None` when the class is not sealed (the set
    /// is open and complement is not representable).
    pub fn sealed_variants(&self, class: ClassId) -> Option<Vec<ClassId>> {
        if !self.class(class).sealed {
            return None;
        }
        let mut variants = Vec::new();
        let mut stack = vec![class];
        let mut seen = FxHashSet::default();
        while let Some(c) = stack.pop() {
            if !seen.insert(c) {
                continue;
            }
            for &sub in &self.class(c).subclasses {
                if self.class(sub).sealed {
                    stack.push(sub);
                } else {
                    variants.push(sub);
                }
            }
        }
        variants.sort();
        Some(variants)
    }

    /// Structural subtyping. `Nothing` is bottom, `Any` is top, `Error` is
    /// compatible in both directions so one bad type does not cascade.
    pub fn is_subtype(&self, a: TypeId, b: TypeId) -> bool {
        if a == b || a == TypeId::ERROR || b == TypeId::ERROR || b == TypeId::ANY {
            return true;
        }
        if a == TypeId::NOTHING {
            return true;
        }
        match (self.data(a), self.data(b)) {
            (TypeData::Nullable(x), TypeData::Nullable(y)) => self.is_subtype(x, y),
            // A non-null type fits into the nullable version of a supertype.
            (_, TypeData::Nullable(y)) => self.is_subtype(a, y),
            // A nullable type never fits a non-null target.
            (TypeData::Nullable(_), _) => false,
            (TypeData::Union(members), _) => members.iter().all(|&m| self.is_subtype(m, b)),
            (_, TypeData::Union(members)) => members.iter().any(|&m| self.is_subtype(a, m)),
            (TypeData::Class(c), TypeData::Class(d)) => self.is_subclass(c, d),
            (TypeData::App(c, _), TypeData::Class(d)) => self.is_subclass(c, d),
            // Generic applications are invariant in their arguments.
            (TypeData::App(c, ref xs), TypeData::App(d, ref ys)) => {
                self.is_subclass(c, d) && xs == ys
            }
            _ => false,
        }
    }

    /// Canonical union of the given types.
    ///
    /// Flattens nested unions, removes duplicates and subsumed members,
    /// factors nullability out to a single outer `?`, and collapses
    /// singletons. An empty union is `Nothing` (the unreachable merge).
    pub fn union(&self, types: Vec<TypeId>) -> TypeId {
        let mut members: Vec<TypeId> = Vec::with_capacity(types.len());
        let mut nullable = false;
        let mut stack = types;
        while let Some(t) = stack.pop() {
            match self.data(t) {
                TypeData::Nothing => {}
                TypeData::Any => return TypeId::ANY,
                TypeData::Nullable(inner) => {
                    nullable = true;
                    stack.push(inner);
                }
                TypeData::Union(inner) => stack.extend(inner),
                _ => {
                    if !members.contains(&t) {
                        members.push(t);
                    }
                }
            }
        }
        // Drop members subsumed by another member.
        let mut kept: Vec<TypeId> = Vec::with_capacity(members.len());
        for &m in &members {
            let subsumed = members
                .iter()
                .any(|&o| o != m && self.is_subtype(m, o) && !self.is_subtype(o, m));
            if !subsumed {
                kept.push(m);
            }
        }
        kept.sort();
        kept.dedup();
        let core = match kept.len() {
            0 => TypeId::NOTHING,
            1 => kept[0],
            _ => self.intern(TypeData::Union(kept)),
        };
        if nullable { self.nullable(core) } else { core }
    }

    /// The most specific type for a value known to be both `declared` and
    /// `checked`, the true branch of `declared is checked`.
    ///
    /// When the two are unrelated classes the result is `checked`: an
    /// interface implementation may relate them at runtime, so assuming
    /// emptiness would be unsound in the other direction, and the check
    /// itself just held.
    pub fn intersect(&self, declared: TypeId, checked: TypeId) -> TypeId {
        if declared == checked || declared == TypeId::ANY || declared == TypeId::ERROR {
            return checked;
        }
        if checked == TypeId::ANY {
            return declared;
        }
        let both_nullable = self.is_nullable(declared) && self.is_nullable(checked);
        let core = self.intersect_non_null(self.strip_null(declared), self.strip_null(checked));
        if both_nullable {
            self.nullable(core)
        } else {
            core
        }
    }

    fn intersect_non_null(&self, declared: TypeId, checked: TypeId) -> TypeId {
        if self.is_subtype(declared, checked) {
            return declared;
        }
        if self.is_subtype(checked, declared) {
            return checked;
        }
        if let TypeData::Union(members) = self.data(declared) {
            let compatible: Vec<TypeId> = members
                .iter()
                .filter_map(|&m| {
                    if self.is_subtype(m, checked) {
                        Some(m)
                    } else if self.is_subtype(checked, m) {
                        Some(checked)
                    } else {
                        None
                    }
                })
                .collect();
            return self.union(compatible);
        }
        trace!(?declared, ?checked, "unrelated intersect, keeping checked type");
        checked
    }

    /// The false-branch complement: `declared` minus `checked`, defined
    /// only when `declared`'s variant set is closed (a sealed hierarchy or
    /// an existing union). Returns `None` for open types, where the caller
    /// leaves the refinement unchanged. Nullability survives subtraction
    /// of a non-null `checked`: `null` never passes an `is` check.
    pub fn closed_complement(&self, declared: TypeId, checked: TypeId) -> Option<TypeId> {
        let was_nullable = self.is_nullable(declared);
        let core = self.strip_null(declared);
        let rest = match self.data(core) {
            TypeData::Union(members) => {
                let remaining: Vec<TypeId> = members
                    .iter()
                    .copied()
                    .filter(|&m| !self.is_subtype(m, checked))
                    .collect();
                Some(self.union(remaining))
            }
            TypeData::Class(c) => {
                let variants = self.sealed_variants(c)?;
                let remaining: Vec<TypeId> = variants
                    .iter()
                    .map(|&v| self.class_type(v))
                    .filter(|&v| !self.is_subtype(v, checked))
                    .collect();
                Some(self.union(remaining))
            }
            _ => None,
        }?;
        if was_nullable && !self.is_nullable(checked) {
            Some(self.nullable(rest))
        } else {
            Some(rest)
        }
    }

    /// Members of a union, or the type itself for non-unions. Test helper
    /// and `when`-exhaustiveness input.
    pub fn union_members(&self, id: TypeId) -> Vec<TypeId> {
        match self.data(id) {
            TypeData::Union(members) => members,
            _ => vec![id],
        }
    }
}
