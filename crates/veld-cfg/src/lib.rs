//! Control-flow graphs for function and initializer bodies.
//!
//! The builder translates a resolved AST body into basic blocks with
//! tagged edges. Short-circuit boolean operators compile into explicit
//! conditional edges so each operand's narrowing context is distinct;
//! try/finally regions route every exit path through a single finally
//! entry block; closures become detached sub-graphs linked by may-invoke
//! edges that carry the resolver's execution-order guarantee.
//!
//! Unreachable and non-terminating code are normal, representable
//! outcomes. Only internal inconsistencies in the input tree (a jump to a
//! label with no enclosing match) fail the build.

mod builder;
mod error;
mod graph;

pub use builder::CfgBuilder;
pub use error::CfgBuildError;
pub use graph::{
    BasicBlock, BlockFlags, BlockId, CfgId, ControlFlowGraph, Edge, EdgeKind, JumpKind, Op,
};
