//! Resolved AST arena and symbol model.
//!
//! The parser and resolver are upstream of this crate; what arrives here is
//! already bound: every name reference is a `SymbolId`, every expression
//! carries its resolved `TypeId`, and every capability the flow analyses
//! need (mutability, capture, accessor stability, closure invocation order)
//! is a flag computed at resolution time, never re-derived during
//! analysis.
//!
//! Nodes live in an arena and are addressed by `NodeId`; analyses attach
//! facts in side tables keyed by ids, never by pointers into the tree.

mod arena;
mod builder;
mod keys;
mod symbols;

pub use arena::{AstArena, Node, NodeId, NodeKind, WhenBranch};
pub use builder::AstBuilder;
pub use keys::{StableKey, StableKeyId, StableKeys};
pub use symbols::{InvocationOrder, Symbol, SymbolFlags, SymbolId, SymbolTable};
