//! CFG data model: blocks, edges, operations.

use bitflags::bitflags;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use veld_ast::{InvocationOrder, NodeId, StableKeyId, SymbolId};

/// Index of a basic block within one [`ControlFlowGraph`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub const ENTRY: Self = Self(0);
}

/// Index of a closure sub-graph within its enclosing graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CfgId(pub u32);

bitflags! {
    /// Block attributes computed during construction and finalization.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct BlockFlags: u8 {
        /// Not reachable from entry along feasible edges. Dead blocks are
        /// kept for diagnostics but contribute no facts downstream.
        const DEAD = 1 << 0;
        /// A loop header: a merge point with at least one back-edge.
        const LOOP_HEADER = 1 << 1;
        /// The single entry block of a finally region.
        const FINALLY_ENTRY = 1 << 2;
    }
}

/// Why a jump edge leaves its source block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JumpKind {
    Break,
    Continue,
    Return,
    Throw,
}

/// Tag of a directed edge. Edges are immutable once the graph is built.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EdgeKind {
    Normal,
    /// Taken when the tagged condition node evaluated to true.
    ConditionalTrue(NodeId),
    /// Taken when the tagged condition node evaluated to false.
    ConditionalFalse(NodeId),
    /// Taken when the tagged expression evaluated to a non-null value.
    /// The elvis split emits these; the tag is the left operand, not the
    /// elvis itself, so a narrowing consumer tests exactly the expression
    /// that was checked.
    NonNull(NodeId),
    /// Taken when the tagged expression evaluated to null.
    Null(NodeId),
    Jump(JumpKind),
    /// May transfer control from any operation that can raise.
    Exceptional,
    /// Control may divert into the closure sub-graph `cfg` before (or
    /// instead of, or long after) continuing at the edge target. The
    /// execution-order guarantee is a first-class attribute: facts flow
    /// through only for [`InvocationOrder::InPlace`].
    MayInvoke {
        cfg: CfgId,
        order: InvocationOrder,
    },
}

/// A directed edge to another block in the same graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub to: BlockId,
    pub kind: EdgeKind,
}

/// A low-level operation inside a block, in evaluation order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Op {
    /// Evaluate an expression for its value or effects.
    Eval(NodeId),
    /// Write `value` into a stable expression.
    Write { key: StableKeyId, value: NodeId },
    /// Introduce a local, optionally initialized.
    Declare {
        symbol: SymbolId,
        init: Option<NodeId>,
    },
}

/// A maximal straight-line sequence of operations.
#[derive(Clone, Debug, Default)]
pub struct BasicBlock {
    pub ops: Vec<Op>,
    pub succs: SmallVec<[Edge; 2]>,
    pub preds: SmallVec<[BlockId; 2]>,
    pub flags: BlockFlags,
}

impl BasicBlock {
    pub fn is_dead(&self) -> bool {
        self.flags.contains(BlockFlags::DEAD)
    }

    pub fn is_loop_header(&self) -> bool {
        self.flags.contains(BlockFlags::LOOP_HEADER)
    }
}

/// The control-flow graph of one function or initializer body.
///
/// Invariant (established by `finalize`): every block is reachable from
/// the entry, or carries [`BlockFlags::DEAD`] and is excluded from
/// dataflow propagation. There is a single entry and a single exit block;
/// return, uncaught-throw, and fallthrough paths all converge on the exit
/// with their edge tags preserved.
#[derive(Debug)]
pub struct ControlFlowGraph {
    pub(crate) blocks: Vec<BasicBlock>,
    pub(crate) entry: BlockId,
    pub(crate) exit: BlockId,
    pub(crate) sub_cfgs: Vec<ControlFlowGraph>,
}

impl ControlFlowGraph {
    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn exit(&self) -> BlockId {
        self.exit
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0 as usize]
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len() as u32).map(BlockId)
    }

    pub fn succs(&self, id: BlockId) -> &[Edge] {
        &self.block(id).succs
    }

    pub fn preds(&self, id: BlockId) -> &[BlockId] {
        &self.block(id).preds
    }

    pub fn is_reachable(&self, id: BlockId) -> bool {
        !self.block(id).is_dead()
    }

    /// Blocks excluded from dataflow, exposed for unreachable-code
    /// diagnostics.
    pub fn dead_blocks(&self) -> Vec<BlockId> {
        self.block_ids().filter(|&b| !self.is_reachable(b)).collect()
    }

    pub fn sub_cfg(&self, id: CfgId) -> &ControlFlowGraph {
        &self.sub_cfgs[id.0 as usize]
    }

    pub fn sub_cfg_count(&self) -> usize {
        self.sub_cfgs.len()
    }

    /// Populate predecessor lists and mark unreachable blocks dead.
    ///
    /// Traversal does not continue *through* blocks the builder already
    /// marked dead (e.g. the implicit else of an exhaustive `when`), so
    /// their downstream-only successors stay dead too.
    pub(crate) fn finalize(&mut self) {
        for b in &mut self.blocks {
            b.preds.clear();
        }
        for id in 0..self.blocks.len() {
            let succs: SmallVec<[Edge; 2]> = self.blocks[id].succs.clone();
            for edge in succs {
                let preds = &mut self.blocks[edge.to.0 as usize].preds;
                if !preds.contains(&BlockId(id as u32)) {
                    preds.push(BlockId(id as u32));
                }
            }
        }

        let mut reached = FxHashSet::default();
        let mut stack = vec![self.entry];
        while let Some(b) = stack.pop() {
            if !reached.insert(b) {
                continue;
            }
            if self.block(b).is_dead() {
                continue;
            }
            for edge in self.succs(b) {
                stack.push(edge.to);
            }
        }
        for id in 0..self.blocks.len() {
            let block = BlockId(id as u32);
            if !reached.contains(&block) || self.block(block).is_dead() {
                self.blocks[id].flags |= BlockFlags::DEAD;
            }
        }
    }
}
