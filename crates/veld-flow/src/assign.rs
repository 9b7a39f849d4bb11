//! Definite-assignment analysis.
//!
//! A second instantiation of the dataflow framework: the fact is the set
//! of locals definitely initialized on every path, met by intersection.
//! Reads of a body-declared local outside that set are use-before-init
//! sites for the diagnostics consumer.

use rustc_hash::FxHashSet;
use veld_ast::{AstArena, NodeId, NodeKind, StableKey, StableKeys, SymbolFlags, SymbolId, SymbolTable};
use veld_cfg::{BlockId, CfgId, ControlFlowGraph, Edge, EdgeKind, JumpKind, Op};

use crate::framework::{self, Analysis};

/// Locals proven initialized on every path to a point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InitFact {
    initialized: FxHashSet<SymbolId>,
}

impl InitFact {
    pub fn contains(&self, sym: SymbolId) -> bool {
        self.initialized.contains(&sym)
    }
}

/// A read of a local that may execute before any write to it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UseBeforeInit {
    pub node: NodeId,
    pub symbol: SymbolId,
}

/// Check one body (and its closure sub-graphs) for use-before-init.
pub fn check_definite_assignment(
    arena: &AstArena,
    symbols: &SymbolTable,
    keys: &StableKeys,
    cfg: &ControlFlowGraph,
) -> Vec<UseBeforeInit> {
    let mut locals = FxHashSet::default();
    collect_locals(cfg, &mut locals);

    let cx = DefiniteAssignment {
        arena,
        symbols,
        keys,
        locals,
    };
    let mut uses = Vec::new();
    cx.check_into(cfg, cx.params(), &mut uses);
    uses.sort_by_key(|u| u.node);
    uses
}

fn collect_locals(cfg: &ControlFlowGraph, locals: &mut FxHashSet<SymbolId>) {
    for block in cfg.block_ids() {
        for op in &cfg.block(block).ops {
            if let Op::Declare { symbol, .. } = *op {
                locals.insert(symbol);
            }
        }
    }
    for i in 0..cfg.sub_cfg_count() {
        collect_locals(cfg.sub_cfg(CfgId(i as u32)), locals);
    }
}

struct DefiniteAssignment<'a> {
    arena: &'a AstArena,
    symbols: &'a SymbolTable,
    keys: &'a StableKeys,
    /// Symbols declared somewhere in the analyzed body tree; only these
    /// can be used-before-init (everything else arrived initialized).
    locals: FxHashSet<SymbolId>,
}

impl DefiniteAssignment<'_> {
    fn params(&self) -> InitFact {
        let mut fact = InitFact::default();
        for (id, sym) in self.symbols.iter() {
            if sym.flags.contains(SymbolFlags::PARAMETER) {
                fact.initialized.insert(id);
            }
        }
        fact
    }

    fn check_into(&self, cfg: &ControlFlowGraph, entry: InitFact, uses: &mut Vec<UseBeforeInit>) {
        let pass = InitPass { cx: self, entry };
        let fixpoint = framework::solve(cfg, &pass);

        for block in cfg.block_ids() {
            let Some(fact) = fixpoint.entry_of(block) else {
                continue;
            };
            let mut fact = fact.clone();
            for op in &cfg.block(block).ops {
                if let Op::Eval(node) = *op
                    && let Some(sym) = self.read_local(node)
                    && self.locals.contains(&sym)
                    && !fact.contains(sym)
                {
                    uses.push(UseBeforeInit { node, symbol: sym });
                }
                self.transfer_op(&mut fact, op);
            }

            // A closure body sees whatever was initialized at its
            // invocation site; initialization is never undone later, so
            // the same fact is sound for deferred invocation too.
            for edge in cfg.succs(block) {
                if let EdgeKind::MayInvoke { cfg: sub, .. } = edge.kind
                    && let Some(out) = fixpoint.exit_of(block)
                {
                    self.check_into(cfg.sub_cfg(sub), out.clone(), uses);
                }
            }
        }
    }

    fn read_local(&self, node: NodeId) -> Option<SymbolId> {
        if let NodeKind::Read(key) = self.arena.get(node)?.kind
            && let Some(StableKey::Local(sym)) = self.keys.get(key)
        {
            return Some(*sym);
        }
        None
    }

    fn transfer_op(&self, fact: &mut InitFact, op: &Op) {
        match *op {
            Op::Declare { symbol, init } => {
                // Parameter declarations (catch clauses) are bound by the
                // runtime before the body runs.
                if init.is_some() || self.symbols.flags(symbol).contains(SymbolFlags::PARAMETER) {
                    fact.initialized.insert(symbol);
                } else {
                    fact.initialized.remove(&symbol);
                }
            }
            Op::Write { key, .. } => {
                if let Some(StableKey::Local(sym)) = self.keys.get(key) {
                    fact.initialized.insert(*sym);
                }
            }
            Op::Eval(_) => {}
        }
    }
}

struct InitPass<'a, 'b> {
    cx: &'b DefiniteAssignment<'a>,
    entry: InitFact,
}

impl Analysis for InitPass<'_, '_> {
    type Fact = InitFact;

    fn entry_fact(&self, _cfg: &ControlFlowGraph) -> InitFact {
        self.entry.clone()
    }

    fn meet(&self, acc: &mut InitFact, other: &InitFact) {
        acc.initialized.retain(|s| other.initialized.contains(s));
    }

    fn refine_edge(
        &self,
        cfg: &ControlFlowGraph,
        from: BlockId,
        edge: &Edge,
        fact: &mut InitFact,
    ) {
        // An exception may fire before any given write in the raising
        // block actually executed.
        if matches!(
            edge.kind,
            EdgeKind::Exceptional | EdgeKind::Jump(JumpKind::Throw)
        ) {
            for op in &cfg.block(from).ops {
                match *op {
                    Op::Declare { symbol, .. } => {
                        fact.initialized.remove(&symbol);
                    }
                    Op::Write { key, .. } => {
                        if let Some(StableKey::Local(sym)) = self.cx.keys.get(key) {
                            fact.initialized.remove(sym);
                        }
                    }
                    Op::Eval(_) => {}
                }
            }
        }
    }

    fn transfer_block(&self, cfg: &ControlFlowGraph, block: BlockId, fact: &mut InitFact) {
        for op in &cfg.block(block).ops {
            self.cx.transfer_op(fact, op);
        }
    }

    fn widen(&self, fact: &mut InitFact) {
        fact.initialized.clear();
    }
}
