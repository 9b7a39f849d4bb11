//! Generic forward worklist dataflow.
//!
//! The solver is parameterized over an [`Analysis`]: a fact lattice with a
//! meet, a block transfer, and a per-edge refinement hook. A block's
//! incoming fact is the meet over its reachable predecessors' outgoing
//! facts, each refined by the connecting edge first. Iteration starts
//! optimistic (a block no computed predecessor has reached yet
//! contributes nothing) and reprocesses a block whenever a predecessor's
//! out-fact changes, which converges to the least fixed point for any
//! monotone transfer over a finite-height lattice.
//!
//! Dead blocks are never processed; their facts stay absent and they are
//! excluded from every meet. A per-block pass ceiling backstops
//! termination: past it the incoming fact is widened to the analysis'
//! most conservative value before transfer.

use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashSet};
use tracing::{debug, trace};
use veld_cfg::{BlockId, ControlFlowGraph, Edge};
use veld_common::limits::MAX_FIXPOINT_PASSES_PER_BLOCK;

/// One dataflow analysis over a CFG.
pub trait Analysis {
    type Fact: Clone + PartialEq + std::fmt::Debug;

    /// Fact holding at the function entry.
    fn entry_fact(&self, cfg: &ControlFlowGraph) -> Self::Fact;

    /// Meet `other` into `acc`, pointwise. Keeps only what both sides know.
    fn meet(&self, acc: &mut Self::Fact, other: &Self::Fact);

    /// Refine a predecessor's out-fact by the edge it travels, before it
    /// joins the meet at the target.
    fn refine_edge(
        &self,
        cfg: &ControlFlowGraph,
        from: BlockId,
        edge: &Edge,
        fact: &mut Self::Fact,
    );

    /// Apply the block's operations to the fact, in place.
    fn transfer_block(&self, cfg: &ControlFlowGraph, block: BlockId, fact: &mut Self::Fact);

    /// Drop the fact to the analysis' most conservative value. Only called
    /// when a block exceeds the fixed-point pass ceiling.
    fn widen(&self, fact: &mut Self::Fact);
}

/// Converged per-block facts. `None` marks a block the solver never
/// reached (dead, or cut off by infeasible edges): its fact is bottom and
/// it contributed to no meet.
#[derive(Debug)]
pub struct Fixpoint<F> {
    pub block_in: Vec<Option<F>>,
    pub block_out: Vec<Option<F>>,
    /// Total transfer passes across all blocks.
    pub passes: usize,
    /// Whether any block hit the pass ceiling and was widened.
    pub widened: bool,
}

impl<F> Fixpoint<F> {
    pub fn entry_of(&self, block: BlockId) -> Option<&F> {
        self.block_in[block.0 as usize].as_ref()
    }

    pub fn exit_of(&self, block: BlockId) -> Option<&F> {
        self.block_out[block.0 as usize].as_ref()
    }
}

/// Run `analysis` over `cfg` to its least fixed point.
pub fn solve<A: Analysis>(cfg: &ControlFlowGraph, analysis: &A) -> Fixpoint<A::Fact> {
    let n = cfg.block_count();
    let mut block_in: Vec<Option<A::Fact>> = (0..n).map(|_| None).collect();
    let mut block_out: Vec<Option<A::Fact>> = (0..n).map(|_| None).collect();
    let mut block_passes = vec![0usize; n];
    let mut passes = 0usize;
    let mut widened = false;

    let mut worklist: IndexSet<BlockId, FxBuildHasher> = IndexSet::default();
    worklist.extend(reverse_postorder(cfg));

    while let Some(block) = worklist.shift_remove_index(0) {
        let i = block.0 as usize;

        let mut incoming: Option<A::Fact> = if block == cfg.entry() {
            Some(analysis.entry_fact(cfg))
        } else {
            None
        };
        for &pred in cfg.preds(block) {
            let Some(out) = &block_out[pred.0 as usize] else {
                continue;
            };
            for edge in cfg.succs(pred) {
                if edge.to != block {
                    continue;
                }
                let mut contrib = out.clone();
                analysis.refine_edge(cfg, pred, edge, &mut contrib);
                match &mut incoming {
                    None => incoming = Some(contrib),
                    Some(acc) => analysis.meet(acc, &contrib),
                }
            }
        }
        // No computed predecessor yet; a later out-fact change re-queues us.
        let Some(mut fact) = incoming else {
            continue;
        };

        block_passes[i] += 1;
        passes += 1;
        if block_passes[i] > MAX_FIXPOINT_PASSES_PER_BLOCK {
            debug!(block = block.0, "pass ceiling hit, widening");
            analysis.widen(&mut fact);
            widened = true;
        }

        if block_in[i].as_ref() == Some(&fact) && block_out[i].is_some() {
            continue;
        }
        block_in[i] = Some(fact.clone());
        analysis.transfer_block(cfg, block, &mut fact);
        let changed = block_out[i].as_ref() != Some(&fact);
        block_out[i] = Some(fact);
        if changed {
            for edge in cfg.succs(block) {
                if cfg.is_reachable(edge.to) {
                    worklist.insert(edge.to);
                }
            }
        }
    }

    trace!(blocks = n, passes, widened, "fixpoint converged");
    Fixpoint {
        block_in,
        block_out,
        passes,
        widened,
    }
}

/// Live blocks in reverse postorder, the seeding order that reaches a
/// fixed point in the fewest passes for reducible graphs.
fn reverse_postorder(cfg: &ControlFlowGraph) -> Vec<BlockId> {
    let mut postorder = Vec::with_capacity(cfg.block_count());
    let mut visited = FxHashSet::default();
    // Iterative DFS; the second stack entry marks the post-visit.
    let mut stack = vec![(cfg.entry(), false)];
    while let Some((block, post)) = stack.pop() {
        if post {
            postorder.push(block);
            continue;
        }
        if !visited.insert(block) || !cfg.is_reachable(block) {
            continue;
        }
        stack.push((block, true));
        for edge in cfg.succs(block) {
            if !visited.contains(&edge.to) {
                stack.push((edge.to, false));
            }
        }
    }
    postorder.reverse();
    postorder
}
