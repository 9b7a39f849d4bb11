//! Flow analyses over veld control-flow graphs.
//!
//! `framework` is the generic forward worklist solver; `smartcast`
//! instantiates it with type-refinement facts to produce the immutable
//! [`SmartCastTable`]; `assign` instantiates it a second time for
//! definite-assignment checking. Reachability itself lives on the CFG;
//! [`unreachable_spans`] projects dead blocks onto source spans for the
//! diagnostics consumer.
//!
//! Each analysis reads only immutable shared inputs and writes only its
//! own result, so independent function bodies can run on parallel workers
//! with nothing to clean up on cancellation.

mod assign;
mod fact;
mod framework;
mod smartcast;
mod table;

pub use assign::{InitFact, UseBeforeInit, check_definite_assignment};
pub use fact::FlowFact;
pub use framework::{Analysis, Fixpoint, solve};
pub use smartcast::SmartCastAnalyzer;
pub use table::{ProgramPoint, SmartCastTable};

use veld_ast::AstArena;
use veld_cfg::{ControlFlowGraph, Op};
use veld_common::span::Span;

/// Source spans of operations in unreachable blocks, for unreachable-code
/// reporting.
pub fn unreachable_spans(cfg: &ControlFlowGraph, arena: &AstArena) -> Vec<Span> {
    let mut spans = Vec::new();
    for block in cfg.dead_blocks() {
        for op in &cfg.block(block).ops {
            let node = match *op {
                Op::Eval(node) => node,
                Op::Write { value, .. } => value,
                Op::Declare { init, .. } => match init {
                    Some(node) => node,
                    None => continue,
                },
            };
            spans.push(arena.span(node));
        }
    }
    spans
}
