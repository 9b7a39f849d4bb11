//! Type interning.
//!
//! `TypeData` values are hash-consed into `TypeId`s. The interner is shared
//! immutably across parallel per-function analyses; interning and class
//! registration go through interior mutability (`DashMap` plus an
//! append-only store behind an `RwLock`), so concurrent readers never block
//! each other on the hot equality path, which is plain `TypeId`
//! comparison.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::RwLock;
use veld_common::interner::Atom;

use crate::def::{ClassDef, ClassId};

/// An interned type handle. Equality of handles is equality of types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const ANY: Self = Self(0);
    pub const ERROR: Self = Self(1);
    pub const NOTHING: Self = Self(2);
    pub const UNIT: Self = Self(3);
    pub const BOOLEAN: Self = Self(4);
    pub const INT: Self = Self(5);
    pub const LONG: Self = Self(6);
    pub const DOUBLE: Self = Self(7);
    pub const STRING: Self = Self(8);
    pub const CHAR: Self = Self(9);
    /// The type of the `null` literal: `Nothing?`.
    pub const NULL: Self = Self(10);

    const INTRINSIC_COUNT: u32 = 11;

    pub const fn is_intrinsic(self) -> bool {
        self.0 < Self::INTRINSIC_COUNT
    }
}

/// Structural type representation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Any,
    Error,
    Nothing,
    Unit,
    Boolean,
    Int,
    Long,
    Double,
    String,
    Char,
    /// A non-generic class, interface, or object type.
    Class(ClassId),
    /// A generic application `C<A1, ..., An>`.
    App(ClassId, Vec<TypeId>),
    /// `T?`. The inner type is always the non-nullable form.
    Nullable(TypeId),
    /// A canonical union of pairwise non-subsuming, non-nullable members,
    /// sorted by `TypeId`. Produced by closed-set complement and branch
    /// merges; the surface language has no union syntax.
    Union(Vec<TypeId>),
}

/// Hash-consing interner plus class registry.
pub struct TypeInterner {
    map: DashMap<TypeData, TypeId>,
    types: RwLock<Vec<TypeData>>,
    classes: RwLock<Vec<ClassDef>>,
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeInterner {
    pub fn new() -> Self {
        let interner = Self {
            map: DashMap::default(),
            types: RwLock::new(Vec::new()),
            classes: RwLock::new(Vec::new()),
        };
        // Intrinsics are interned first so their ids match the constants.
        for data in [
            TypeData::Any,
            TypeData::Error,
            TypeData::Nothing,
            TypeData::Unit,
            TypeData::Boolean,
            TypeData::Int,
            TypeData::Long,
            TypeData::Double,
            TypeData::String,
            TypeData::Char,
            TypeData::Nullable(TypeId::NOTHING),
        ] {
            interner.intern(data);
        }
        interner
    }

    /// Intern a type, returning its id. Idempotent.
    pub fn intern(&self, data: TypeData) -> TypeId {
        if let Some(id) = self.map.get(&data) {
            return *id;
        }
        let mut types = self.types.write().expect("type store poisoned");
        // Re-check under the write lock: a racing intern may have won.
        if let Some(id) = self.map.get(&data) {
            return *id;
        }
        let id = TypeId(types.len() as u32);
        types.push(data.clone());
        self.map.insert(data, id);
        id
    }

    /// Structural data for an id. Clones; `TypeData` is small.
    pub fn data(&self, id: TypeId) -> TypeData {
        self.types.read().expect("type store poisoned")[id.0 as usize].clone()
    }

    pub fn len(&self) -> usize {
        self.types.read().expect("type store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        false // intrinsics are always present
    }

    // =========================================================================
    // Class registry
    // =========================================================================

    /// Register a class-like declaration. Supertype edges are recorded both
    /// ways so sealed hierarchies know their variant sets.
    pub fn register_class(
        &self,
        name: Atom,
        supertypes: &[ClassId],
        sealed: bool,
        arity: u8,
    ) -> ClassId {
        let mut classes = self.classes.write().expect("class registry poisoned");
        let id = ClassId(classes.len() as u32);
        classes.push(ClassDef {
            name,
            supertypes: SmallVec::from_slice(supertypes),
            sealed,
            subclasses: Vec::new(),
            arity,
        });
        for &sup in supertypes {
            classes[sup.0 as usize].subclasses.push(id);
        }
        id
    }

    pub fn class(&self, id: ClassId) -> ClassDef {
        self.classes.read().expect("class registry poisoned")[id.0 as usize].clone()
    }

    pub fn class_count(&self) -> usize {
        self.classes.read().expect("class registry poisoned").len()
    }

    /// The type of a non-generic class.
    pub fn class_type(&self, class: ClassId) -> TypeId {
        self.intern(TypeData::Class(class))
    }

    /// The type of a generic application.
    pub fn app_type(&self, class: ClassId, args: Vec<TypeId>) -> TypeId {
        if args.is_empty() {
            return self.class_type(class);
        }
        self.intern(TypeData::App(class, args))
    }

    // =========================================================================
    // Nullability
    // =========================================================================

    /// `T?` for a given `T`. Already-nullable types are unchanged.
    pub fn nullable(&self, id: TypeId) -> TypeId {
        match self.data(id) {
            TypeData::Nullable(_) | TypeData::Any | TypeData::Error => id,
            _ => self.intern(TypeData::Nullable(id)),
        }
    }

    /// Strip nullability: `T?` becomes `T`. `Nothing?` (the null literal
    /// type) strips to `Nothing`.
    pub fn strip_null(&self, id: TypeId) -> TypeId {
        match self.data(id) {
            TypeData::Nullable(inner) => inner,
            _ => id,
        }
    }

    pub fn is_nullable(&self, id: TypeId) -> bool {
        matches!(self.data(id), TypeData::Nullable(_) | TypeData::Any)
    }

    // =========================================================================
    // Display (tests and tracing)
    // =========================================================================

    /// Render a type for diagnostics. `names` resolves class name atoms.
    pub fn display(&self, id: TypeId, names: &veld_common::interner::Interner) -> String {
        match self.data(id) {
            TypeData::Any => "Any".into(),
            TypeData::Error => "<error>".into(),
            TypeData::Nothing => "Nothing".into(),
            TypeData::Unit => "Unit".into(),
            TypeData::Boolean => "Boolean".into(),
            TypeData::Int => "Int".into(),
            TypeData::Long => "Long".into(),
            TypeData::Double => "Double".into(),
            TypeData::String => "String".into(),
            TypeData::Char => "Char".into(),
            TypeData::Class(c) => names
                .resolve(self.class(c).name)
                .unwrap_or("<class>")
                .to_string(),
            TypeData::App(c, args) => {
                let base = names
                    .resolve(self.class(c).name)
                    .unwrap_or("<class>")
                    .to_string();
                let args = args
                    .iter()
                    .map(|&a| self.display(a, names))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{base}<{args}>")
            }
            TypeData::Nullable(inner) => format!("{}?", self.display(inner, names)),
            TypeData::Union(members) => members
                .iter()
                .map(|&m| self.display(m, names))
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}
