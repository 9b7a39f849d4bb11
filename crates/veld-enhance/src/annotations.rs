//! Externally supplied nullability metadata.
//!
//! Annotations arrive keyed by declaration and type position (a path of
//! generic-argument indices from the root). Class-level argument
//! annotations are recorded separately and inherited by every subtype
//! that keeps the argument position, so a narrowing valid against the
//! supertype's signature stays valid when a subtype is substituted.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use veld_types::{ClassId, TypeInterner};

/// Identity of a foreign declaration, the enhancement cache key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeclId(pub u32);

/// Nullability of one type position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nullability {
    NonNull,
    Nullable,
    /// Unknown either way. The analyzer treats this as top: nothing is
    /// assumed, nothing is flagged.
    Platform,
}

/// A path into a type tree: generic-argument indices from the root.
/// The empty path is the root position itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct TypePosition(SmallVec<[u32; 4]>);

impl TypePosition {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, index: u32) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }
}

/// All external annotation data for one compilation session. Immutable
/// once loaded; shared by reference across parallel enhancements.
#[derive(Debug, Default)]
pub struct AnnotationTable {
    by_position: FxHashMap<(DeclId, TypePosition), Nullability>,
    class_args: FxHashMap<(ClassId, u32), Nullability>,
}

impl AnnotationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an annotation on one position of one declaration.
    pub fn annotate(&mut self, decl: DeclId, position: TypePosition, nullability: Nullability) {
        self.by_position.insert((decl, position), nullability);
    }

    /// Record an annotation on a class's generic-argument position,
    /// inherited by subtypes.
    pub fn annotate_class_arg(&mut self, class: ClassId, index: u32, nullability: Nullability) {
        self.class_args.insert((class, index), nullability);
    }

    pub fn position(&self, decl: DeclId, position: &TypePosition) -> Option<Nullability> {
        self.by_position
            .get(&(decl, position.clone()))
            .copied()
    }

    /// The annotation a class inherits for an argument position: its own,
    /// or the nearest annotated supertype's.
    pub fn inherited_arg(
        &self,
        types: &TypeInterner,
        class: ClassId,
        index: u32,
    ) -> Option<Nullability> {
        let mut seen = FxHashSet::default();
        let mut queue = vec![class];
        while let Some(c) = queue.pop() {
            if !seen.insert(c) {
                continue;
            }
            if let Some(&n) = self.class_args.get(&(c, index)) {
                return Some(n);
            }
            queue.extend(types.class(c).supertypes.iter().copied());
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.by_position.is_empty() && self.class_args.is_empty()
    }
}
