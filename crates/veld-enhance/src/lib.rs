//! External-annotation nullability enhancement.
//!
//! Foreign (cross-ecosystem) declarations arrive with baseline types that
//! say nothing about nullability. Before flow analysis, each such
//! declaration is enhanced: every type position gets a nullability and a
//! record of where it came from, with explicit source markers beating
//! external annotations beating the inferred default. Unannotated
//! positions stay at platform nullability, which the smart-cast analyzer
//! treats as top.
//!
//! Results are cached per declaration for the compilation session and
//! recomputation is structurally idempotent, so the cache may be filled
//! concurrently without coordination.

mod annotations;
mod enhancer;
mod model;

pub use annotations::{AnnotationTable, DeclId, Nullability, TypePosition};
pub use enhancer::Enhancer;
pub use model::{EnhancedType, NullabilityOrigin};
