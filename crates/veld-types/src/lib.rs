//! Interned structural types for the veld compiler.
//!
//! Types are interned into a [`TypeInterner`] so that equality is `TypeId`
//! comparison. The interner also owns the class registry (supertype edges,
//! sealed hierarchies), which the relation queries consult for subtyping,
//! intersection, and closed-set complement. Those are the operations the
//! smart-cast analyzer narrows with.

mod def;
mod intern;
mod relations;

pub use def::{ClassDef, ClassId};
pub use intern::{TypeData, TypeId, TypeInterner};
