//! Class definitions and identifiers.

use smallvec::SmallVec;
use veld_common::interner::Atom;

/// Identifier of a registered class, interface, or object declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    pub const INVALID: Self = Self(u32::MAX);

    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

/// A class-like declaration as the type relations see it.
///
/// Only the facts relevant to narrowing are kept: the supertype edges and
/// whether the declaration is sealed, i.e. its direct subclasses form a
/// closed set known at registration time.
#[derive(Clone, Debug)]
pub struct ClassDef {
    pub name: Atom,
    pub supertypes: SmallVec<[ClassId; 2]>,
    pub sealed: bool,
    /// Direct subclasses, recorded when each subclass is registered.
    /// Meaningful for exhaustiveness only when `sealed` is true.
    pub subclasses: Vec<ClassId>,
    /// Number of generic parameters on the declaration.
    pub arity: u8,
}
