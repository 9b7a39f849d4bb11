//! The smart-cast analyzer.
//!
//! Instantiates the dataflow framework over a CFG with [`FlowFact`]s.
//! Narrowing comes from conditional edges (`is` checks, null checks,
//! equality to literals), from the elvis split's non-null/null edges,
//! from non-null assertions, and from assignments whose right side
//! carries facts of its own. Refinements are
//! invalidated on reassignment (including chains rooted at the written
//! key), across deferred may-invoke edges, and along exceptional edges
//! for anything the raising block itself established.
//!
//! Captured-and-reassigned symbols never receive a refinement anywhere in
//! the body: any closure may rewrite them between observation and use.

use rustc_hash::FxHashMap;
use tracing::trace;
use veld_ast::{
    AstArena, NodeId, NodeKind, StableKey, StableKeyId, StableKeys, SymbolFlags, SymbolTable,
};
use veld_cfg::{BlockId, ControlFlowGraph, Edge, EdgeKind, JumpKind, Op};
use veld_types::{TypeId, TypeInterner};

use crate::fact::FlowFact;
use crate::framework::{self, Analysis, Fixpoint};
use crate::table::{ProgramPoint, SmartCastTable};

/// Per-function smart-cast analysis over shared, immutable inputs.
pub struct SmartCastAnalyzer<'a> {
    arena: &'a AstArena,
    symbols: &'a SymbolTable,
    keys: &'a StableKeys,
    types: &'a TypeInterner,
    /// Declared/enhanced type per stable key, harvested once from the
    /// resolver-typed read sites.
    declared: FxHashMap<StableKeyId, TypeId>,
}

impl<'a> SmartCastAnalyzer<'a> {
    pub fn new(
        arena: &'a AstArena,
        symbols: &'a SymbolTable,
        keys: &'a StableKeys,
        types: &'a TypeInterner,
    ) -> Self {
        let mut declared = FxHashMap::default();
        for id in 0..arena.len() as u32 {
            let node = NodeId(id);
            if let Some(data) = arena.get(node)
                && let NodeKind::Read(key) = data.kind
            {
                declared.entry(key).or_insert(data.ty);
            }
        }
        // Keys interned at declaration but never read still need a type.
        for key in keys.ids() {
            if let Some(sym) = keys.symbol_of(key) {
                declared.entry(key).or_insert(symbols.declared_ty(sym));
            }
        }
        Self {
            arena,
            symbols,
            keys,
            types,
            declared,
        }
    }

    /// Run the analysis over `cfg` and every closure sub-graph, producing
    /// the immutable side table.
    pub fn analyze(&self, cfg: &ControlFlowGraph) -> SmartCastTable {
        let mut table = SmartCastTable::default();
        self.analyze_into(cfg, FlowFact::new(), &mut table);
        table
    }

    fn analyze_into(&self, cfg: &ControlFlowGraph, entry: FlowFact, table: &mut SmartCastTable) {
        let pass = NarrowingPass { cx: self, entry };
        let fixpoint = framework::solve(cfg, &pass);
        self.record(cfg, &fixpoint, table);

        // Closure sub-graphs: an in-place closure starts from the facts at
        // its invocation site; a deferred one starts cold.
        for block in cfg.block_ids() {
            if !cfg.is_reachable(block) {
                continue;
            }
            for edge in cfg.succs(block) {
                if let EdgeKind::MayInvoke { cfg: sub, order } = edge.kind {
                    let sub_entry = if order.is_in_place() {
                        fixpoint.exit_of(block).cloned().unwrap_or_default()
                    } else {
                        FlowFact::new()
                    };
                    trace!(block = block.0, ?order, "descending into closure");
                    self.analyze_into(cfg.sub_cfg(sub), sub_entry, table);
                }
            }
        }
    }

    /// Replay each live block from its converged in-fact, recording the
    /// narrowed type at every stable read that has one.
    fn record(&self, cfg: &ControlFlowGraph, fixpoint: &Fixpoint<FlowFact>, table: &mut SmartCastTable) {
        for block in cfg.block_ids() {
            let Some(entry) = fixpoint.entry_of(block) else {
                continue;
            };
            let mut fact = entry.clone();
            for (i, op) in cfg.block(block).ops.iter().enumerate() {
                if let Op::Eval(node) = *op
                    && let Some(data) = self.arena.get(node)
                    && let NodeKind::Read(key) = data.kind
                    && let Some(ty) = fact.get(key)
                {
                    let point = ProgramPoint {
                        block,
                        op: i as u32,
                    };
                    table.record(node, point, ty);
                }
                self.transfer_op(&mut fact, op);
            }
        }
    }

    // =========================================================================
    // Declared types and key capabilities
    // =========================================================================

    fn declared_of(&self, key: StableKeyId) -> TypeId {
        self.declared.get(&key).copied().unwrap_or(TypeId::ANY)
    }

    fn current(&self, fact: &FlowFact, key: StableKeyId) -> TypeId {
        fact.get(key).unwrap_or_else(|| self.declared_of(key))
    }

    /// Whether a key may carry a refinement at all. Any captured-and-
    /// reassigned symbol in the chain suppresses narrowing for the whole
    /// body.
    fn refinable(&self, key: StableKeyId) -> bool {
        let mut k = key;
        loop {
            match self.keys.get(k) {
                Some(StableKey::Local(sym)) => {
                    return !self
                        .symbols
                        .flags(*sym)
                        .contains(SymbolFlags::CAPTURED_MUTATED);
                }
                Some(StableKey::Property { base, property }) => {
                    if self
                        .symbols
                        .flags(*property)
                        .contains(SymbolFlags::CAPTURED_MUTATED)
                    {
                        return false;
                    }
                    k = *base;
                }
                Some(StableKey::Receiver { .. }) | None => return true,
            }
        }
    }

    /// Whether a refinement survives a deferred closure boundary: only
    /// chains made entirely of immutable symbols do.
    fn survives_deferred(&self, key: StableKeyId) -> bool {
        let mut k = key;
        loop {
            match self.keys.get(k) {
                Some(StableKey::Local(sym)) => {
                    return !self.symbols.flags(*sym).contains(SymbolFlags::MUTABLE);
                }
                Some(StableKey::Property { base, property }) => {
                    if self.symbols.flags(*property).contains(SymbolFlags::MUTABLE) {
                        return false;
                    }
                    k = *base;
                }
                Some(StableKey::Receiver { .. }) | None => return true,
            }
        }
    }

    /// The stable key a condition subject refers to, seen through `!!`.
    fn subject_key(&self, node: NodeId) -> Option<StableKeyId> {
        match &self.arena.get(node)?.kind {
            NodeKind::Read(key) => Some(*key),
            NodeKind::NotNullAssert(inner) => self.subject_key(*inner),
            _ => None,
        }
    }

    fn is_null_literal(&self, node: NodeId) -> bool {
        self.arena
            .get(node)
            .is_some_and(|d| matches!(d.kind, NodeKind::Literal) && d.ty == TypeId::NULL)
    }

    fn is_literal(&self, node: NodeId) -> bool {
        self.arena
            .get(node)
            .is_some_and(|d| matches!(d.kind, NodeKind::Literal))
    }

    // =========================================================================
    // Condition refinement (edge hook)
    // =========================================================================

    fn apply_condition(&self, fact: &mut FlowFact, node: NodeId, positive: bool) {
        let Some(data) = self.arena.get(node) else {
            return;
        };
        match data.kind.clone() {
            NodeKind::Not(inner) => self.apply_condition(fact, inner, !positive),
            NodeKind::IsCheck {
                subject,
                checked,
                negated,
            } => {
                self.apply_is(fact, subject, checked, positive != negated);
            }
            NodeKind::Eq { lhs, rhs, negated } => {
                self.apply_eq(fact, lhs, rhs, positive != negated);
            }
            // An elvis in condition position branches on its *value*. The
            // null test of its left operand lives on the dedicated
            // non-null/null edges of the elvis split, not here; the value
            // being true says nothing about the left operand.
            _ => {}
        }
    }

    fn apply_is(&self, fact: &mut FlowFact, subject: NodeId, checked: TypeId, holds: bool) {
        let Some(key) = self.subject_key(subject) else {
            return;
        };
        if !self.refinable(key) {
            return;
        }
        let declared = self.declared_of(key);
        let current = self.current(fact, key);
        if holds {
            let narrowed = self.types.intersect(current, checked);
            trace!(key = key.0, "is-check narrows");
            fact.set(self.types, key, narrowed, declared);
        } else if let Some(rest) = self.types.closed_complement(current, checked) {
            fact.set(self.types, key, rest, declared);
        }
    }

    fn apply_eq(&self, fact: &mut FlowFact, lhs: NodeId, rhs: NodeId, equal: bool) {
        if self.is_null_literal(rhs) {
            self.apply_null_check(fact, lhs, equal);
            return;
        }
        if self.is_null_literal(lhs) {
            self.apply_null_check(fact, rhs, equal);
            return;
        }
        // Equality to a non-null literal: the equal branch takes the
        // literal's exact type. The unequal branch learns nothing.
        if !equal {
            return;
        }
        let (subject, literal) = if self.is_literal(rhs) {
            (lhs, rhs)
        } else if self.is_literal(lhs) {
            (rhs, lhs)
        } else {
            return;
        };
        let Some(key) = self.subject_key(subject) else {
            return;
        };
        if !self.refinable(key) {
            return;
        }
        let declared = self.declared_of(key);
        let current = self.current(fact, key);
        let narrowed = self.types.intersect(current, self.arena.ty(literal));
        fact.set(self.types, key, narrowed, declared);
    }

    fn apply_null_check(&self, fact: &mut FlowFact, subject: NodeId, is_null: bool) {
        let Some(key) = self.subject_key(subject) else {
            return;
        };
        if !self.refinable(key) {
            return;
        }
        let declared = self.declared_of(key);
        let current = self.current(fact, key);
        let narrowed = if is_null {
            // The value is exactly `null` here; for a non-null declared
            // type this bottoms out at `Nothing`.
            self.types.intersect(current, TypeId::NULL)
        } else {
            self.types.strip_null(current)
        };
        fact.set(self.types, key, narrowed, declared);
    }

    // =========================================================================
    // Operation transfer
    // =========================================================================

    fn transfer_op(&self, fact: &mut FlowFact, op: &Op) {
        match *op {
            Op::Eval(node) => {
                if let Some(data) = self.arena.get(node)
                    && let NodeKind::NotNullAssert(inner) = data.kind
                    && let Some(key) = self.subject_key(inner)
                    && self.refinable(key)
                {
                    let declared = self.declared_of(key);
                    let current = self.current(fact, key);
                    fact.set(self.types, key, self.types.strip_null(current), declared);
                }
            }
            Op::Write { key, value } => {
                self.invalidate_rooted(fact, key);
                if self.refinable(key) {
                    let declared = self.declared_of(key);
                    let ty = self.value_type(fact, value);
                    fact.set(self.types, key, ty, declared);
                }
            }
            Op::Declare { symbol, init } => {
                if let Some(key) = self.keys.lookup(&StableKey::Local(symbol)) {
                    self.invalidate_rooted(fact, key);
                    if let Some(init) = init
                        && self.refinable(key)
                    {
                        let declared = self.declared_of(key);
                        let ty = self.value_type(fact, init);
                        fact.set(self.types, key, ty, declared);
                    }
                }
            }
        }
    }

    /// The most precise type known for a value expression under `fact`.
    fn value_type(&self, fact: &FlowFact, node: NodeId) -> TypeId {
        let Some(data) = self.arena.get(node) else {
            return TypeId::ERROR;
        };
        match &data.kind {
            NodeKind::Read(key) => fact.get(*key).unwrap_or(data.ty),
            NodeKind::NotNullAssert(inner) => self.types.strip_null(self.value_type(fact, *inner)),
            NodeKind::Elvis { lhs, rhs } => {
                let non_null_lhs = self.types.strip_null(self.value_type(fact, *lhs));
                let rhs_ty = self.value_type(fact, *rhs);
                self.types.union(vec![non_null_lhs, rhs_ty])
            }
            _ => data.ty,
        }
    }

    /// Drop the refinement of `key` and of every property chain rooted
    /// at it.
    fn invalidate_rooted(&self, fact: &mut FlowFact, key: StableKeyId) {
        fact.retain(|k, _| !self.keys.is_rooted_at(k, key));
    }

    /// Along an exceptional edge, anything the raising block itself
    /// established may not have happened yet; drop those gains.
    fn kill_block_effects(&self, cfg: &ControlFlowGraph, from: BlockId, fact: &mut FlowFact) {
        for op in &cfg.block(from).ops {
            match *op {
                Op::Write { key, .. } => self.invalidate_rooted(fact, key),
                Op::Declare { symbol, .. } => {
                    if let Some(key) = self.keys.lookup(&StableKey::Local(symbol)) {
                        self.invalidate_rooted(fact, key);
                    }
                }
                Op::Eval(node) => {
                    if let Some(data) = self.arena.get(node)
                        && let NodeKind::NotNullAssert(inner) = data.kind
                        && let Some(key) = self.subject_key(inner)
                    {
                        fact.clear(key);
                    }
                }
            }
        }
    }
}

/// One solver run: the shared analyzer plus this graph's entry fact.
struct NarrowingPass<'a, 'b> {
    cx: &'b SmartCastAnalyzer<'a>,
    entry: FlowFact,
}

impl Analysis for NarrowingPass<'_, '_> {
    type Fact = FlowFact;

    fn entry_fact(&self, _cfg: &ControlFlowGraph) -> FlowFact {
        self.entry.clone()
    }

    fn meet(&self, acc: &mut FlowFact, other: &FlowFact) {
        acc.meet(self.cx.types, other, |k| self.cx.declared_of(k));
    }

    fn refine_edge(
        &self,
        cfg: &ControlFlowGraph,
        from: BlockId,
        edge: &Edge,
        fact: &mut FlowFact,
    ) {
        match edge.kind {
            EdgeKind::ConditionalTrue(node) => self.cx.apply_condition(fact, node, true),
            EdgeKind::ConditionalFalse(node) => self.cx.apply_condition(fact, node, false),
            EdgeKind::NonNull(subject) => self.cx.apply_null_check(fact, subject, false),
            EdgeKind::Null(subject) => self.cx.apply_null_check(fact, subject, true),
            EdgeKind::MayInvoke { order, .. } => {
                if !order.is_in_place() {
                    fact.retain(|k, _| self.cx.survives_deferred(k));
                }
            }
            EdgeKind::Exceptional | EdgeKind::Jump(JumpKind::Throw) => {
                self.cx.kill_block_effects(cfg, from, fact);
            }
            EdgeKind::Normal | EdgeKind::Jump(_) => {}
        }
    }

    fn transfer_block(&self, cfg: &ControlFlowGraph, block: BlockId, fact: &mut FlowFact) {
        for op in &cfg.block(block).ops {
            self.cx.transfer_op(fact, op);
        }
    }

    fn widen(&self, fact: &mut FlowFact) {
        *fact = FlowFact::new();
    }
}
