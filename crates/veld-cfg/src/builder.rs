//! CFG construction.
//!
//! A single recursive descent over the resolved tree maintains the block
//! under construction, a stack of lexically enclosing jump targets, and a
//! stack of open try/finally regions. Jumps that cross finally regions
//! are routed through each region's single entry block, with the eventual
//! continuation recorded on the region and wired up when it closes; the
//! graph stays linear in nesting depth, never exponential.

use smallvec::SmallVec;
use tracing::trace;
use veld_ast::{AstArena, NodeId, NodeKind};
use veld_common::interner::Atom;
use veld_common::limits::MAX_CFG_BUILD_DEPTH;

use crate::error::CfgBuildError;
use crate::graph::{
    BasicBlock, BlockFlags, BlockId, CfgId, ControlFlowGraph, Edge, EdgeKind, JumpKind, Op,
};

/// An enclosing loop a `break`/`continue` may target.
struct LoopTarget {
    label: Atom,
    break_to: BlockId,
    continue_to: BlockId,
    /// Depth of the finally stack when the loop was entered; jumps out of
    /// the loop route through every frame above this depth.
    finally_depth: usize,
}

/// An open finally region. Routes collect the (kind, continuation) pairs
/// of every jump that crossed the region; they become edges out of the
/// finally sub-graph when the region closes.
struct FinallyFrame {
    entry: BlockId,
    routes: Vec<(JumpKind, BlockId)>,
    normal_entry: bool,
}

/// An enclosing try with catch clauses; raising operations target its
/// catch entries.
#[derive(Clone)]
struct HandlerFrame {
    catch_entries: SmallVec<[BlockId; 2]>,
    finally_depth: usize,
}

/// Builds one [`ControlFlowGraph`] per function or initializer body.
pub struct CfgBuilder<'a> {
    arena: &'a AstArena,
    blocks: Vec<BasicBlock>,
    /// Incoming-edge counts, maintained eagerly so liveness of a join
    /// block is known the moment the builder moves into it.
    incoming: Vec<u32>,
    exit: BlockId,
    current: BlockId,
    /// Whether the current block is reachable from what was built so far.
    live: bool,
    loops: Vec<LoopTarget>,
    finallys: Vec<FinallyFrame>,
    handlers: Vec<HandlerFrame>,
    sub_cfgs: Vec<ControlFlowGraph>,
    depth: u32,
}

impl<'a> CfgBuilder<'a> {
    /// Build the CFG for `body`. Fails only on internal inconsistencies
    /// of the input tree; unreachable and non-terminating code build
    /// normally.
    pub fn build(arena: &'a AstArena, body: NodeId) -> Result<ControlFlowGraph, CfgBuildError> {
        let mut builder = Self {
            arena,
            blocks: vec![BasicBlock::default(), BasicBlock::default()],
            incoming: vec![0, 0],
            exit: BlockId(1),
            current: BlockId::ENTRY,
            live: true,
            loops: Vec::new(),
            finallys: Vec::new(),
            handlers: Vec::new(),
            sub_cfgs: Vec::new(),
            depth: 0,
        };
        builder.build_node(body)?;
        let exit = builder.exit;
        builder.goto(exit, EdgeKind::Normal);
        let mut graph = ControlFlowGraph {
            blocks: builder.blocks,
            entry: BlockId::ENTRY,
            exit: builder.exit,
            sub_cfgs: builder.sub_cfgs,
        };
        graph.finalize();
        trace!(
            blocks = graph.block_count(),
            sub_cfgs = graph.sub_cfg_count(),
            "built cfg"
        );
        Ok(graph)
    }

    // =========================================================================
    // Block plumbing
    // =========================================================================

    fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock::default());
        self.incoming.push(0);
        id
    }

    fn add_edge(&mut self, from: BlockId, to: BlockId, kind: EdgeKind) {
        let edge = Edge { to, kind };
        let succs = &mut self.blocks[from.0 as usize].succs;
        if succs.contains(&edge) {
            return;
        }
        succs.push(edge);
        self.incoming[to.0 as usize] += 1;
    }

    /// Emit an edge from the current block if it is live, then leave the
    /// current block as-is (the caller moves on).
    fn goto(&mut self, to: BlockId, kind: EdgeKind) {
        if self.live {
            let from = self.current;
            self.add_edge(from, to, kind);
        }
    }

    /// Make `block` current; it is live iff anything jumps into it.
    fn move_to(&mut self, block: BlockId) {
        self.live = self.incoming[block.0 as usize] > 0;
        self.current = block;
    }

    fn push_op(&mut self, op: Op) {
        self.blocks[self.current.0 as usize].ops.push(op);
    }

    fn mark(&mut self, block: BlockId, flags: BlockFlags) {
        self.blocks[block.0 as usize].flags |= flags;
    }

    /// After an unconditional jump: continue in a fresh block that nothing
    /// targets. Code built there is dead but still represented.
    fn terminate(&mut self) {
        let dead = self.new_block();
        self.current = dead;
        self.live = false;
    }

    // =========================================================================
    // Jump routing through finally regions
    // =========================================================================

    /// Wire a jump from the current block toward `target`, routing through
    /// every finally frame above `target_finally_depth`. The innermost
    /// crossed frame receives the edge; each crossed frame records the
    /// next hop so the finally sub-graph re-dispatches outward when it
    /// closes.
    fn jump_path(
        &mut self,
        kind: JumpKind,
        target: BlockId,
        target_finally_depth: usize,
        edge_kind: EdgeKind,
    ) {
        if !self.live {
            return;
        }
        if self.finallys.len() <= target_finally_depth {
            let from = self.current;
            self.add_edge(from, target, edge_kind);
            return;
        }
        let innermost = self.finallys.len() - 1;
        let from = self.current;
        let entry = self.finallys[innermost].entry;
        self.add_edge(from, entry, edge_kind);
        for i in (target_finally_depth..self.finallys.len()).rev() {
            let next = if i == target_finally_depth {
                target
            } else {
                self.finallys[i - 1].entry
            };
            let routes = &mut self.finallys[i].routes;
            if !routes.contains(&(kind, next)) {
                routes.push((kind, next));
            }
        }
    }

    /// Record that the operation just emitted may raise: exceptional edges
    /// to every enclosing catch entry, plus a propagation path through all
    /// finallys to the function exit.
    fn can_raise(&mut self) {
        if !self.live {
            return;
        }
        let handlers = self.handlers.clone();
        for frame in handlers.iter().rev() {
            for &catch_entry in &frame.catch_entries {
                self.jump_path(
                    JumpKind::Throw,
                    catch_entry,
                    frame.finally_depth,
                    EdgeKind::Exceptional,
                );
            }
        }
        let exit = self.exit;
        self.jump_path(JumpKind::Throw, exit, 0, EdgeKind::Exceptional);
    }

    // =========================================================================
    // Recursive descent
    // =========================================================================

    fn build_node(&mut self, node: NodeId) -> Result<(), CfgBuildError> {
        self.depth += 1;
        if self.depth > MAX_CFG_BUILD_DEPTH {
            return Err(CfgBuildError::NestingTooDeep {
                span: self.arena.span(node),
            });
        }
        let result = self.build_node_inner(node);
        self.depth -= 1;
        result
    }

    fn build_node_inner(&mut self, node: NodeId) -> Result<(), CfgBuildError> {
        let Some(data) = self.arena.get(node) else {
            return Ok(());
        };
        match data.kind.clone() {
            NodeKind::Literal | NodeKind::Read(_) | NodeKind::OpaqueRead => {
                self.push_op(Op::Eval(node));
            }
            NodeKind::Call { callee, args } => {
                if let Some(callee) = callee {
                    self.build_node(callee)?;
                }
                for arg in args {
                    self.build_node(arg)?;
                }
                self.push_op(Op::Eval(node));
                self.can_raise();
            }
            NodeKind::Assign { target, value } => {
                self.build_node(value)?;
                match target {
                    Some(key) => self.push_op(Op::Write { key, value }),
                    None => self.push_op(Op::Eval(node)),
                }
            }
            NodeKind::VarDecl { symbol, init } => {
                if let Some(init) = init {
                    self.build_node(init)?;
                }
                self.push_op(Op::Declare { symbol, init });
            }
            NodeKind::Block(stmts) => {
                for stmt in stmts {
                    self.build_node(stmt)?;
                }
            }
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let then_b = self.new_block();
                let else_b = self.new_block();
                let after = self.new_block();
                self.build_condition(cond, then_b, else_b)?;
                self.move_to(then_b);
                self.build_node(then_branch)?;
                self.goto(after, EdgeKind::Normal);
                self.move_to(else_b);
                if let Some(else_branch) = else_branch {
                    self.build_node(else_branch)?;
                }
                self.goto(after, EdgeKind::Normal);
                self.move_to(after);
            }
            NodeKind::While { label, cond, body } => {
                let header = self.new_block();
                let body_b = self.new_block();
                let after = self.new_block();
                self.mark(header, BlockFlags::LOOP_HEADER);
                self.goto(header, EdgeKind::Normal);
                self.move_to(header);
                self.build_condition(cond, body_b, after)?;
                self.loops.push(LoopTarget {
                    label,
                    break_to: after,
                    continue_to: header,
                    finally_depth: self.finallys.len(),
                });
                self.move_to(body_b);
                self.build_node(body)?;
                self.goto(header, EdgeKind::Normal);
                self.loops.pop();
                self.move_to(after);
            }
            NodeKind::DoWhile { label, body, cond } => {
                let body_b = self.new_block();
                let cond_b = self.new_block();
                let after = self.new_block();
                self.mark(body_b, BlockFlags::LOOP_HEADER);
                self.goto(body_b, EdgeKind::Normal);
                self.loops.push(LoopTarget {
                    label,
                    break_to: after,
                    continue_to: cond_b,
                    finally_depth: self.finallys.len(),
                });
                self.move_to(body_b);
                self.build_node(body)?;
                self.goto(cond_b, EdgeKind::Normal);
                self.loops.pop();
                self.move_to(cond_b);
                self.build_condition(cond, body_b, after)?;
                self.move_to(after);
            }
            NodeKind::Break { label } => {
                let (target, depth) = self.resolve_loop(label, node, false)?;
                self.jump_path(
                    JumpKind::Break,
                    target,
                    depth,
                    EdgeKind::Jump(JumpKind::Break),
                );
                self.terminate();
            }
            NodeKind::Continue { label } => {
                let (target, depth) = self.resolve_loop(label, node, true)?;
                self.jump_path(
                    JumpKind::Continue,
                    target,
                    depth,
                    EdgeKind::Jump(JumpKind::Continue),
                );
                self.terminate();
            }
            NodeKind::Return { value } => {
                if let Some(value) = value {
                    self.build_node(value)?;
                }
                let exit = self.exit;
                self.jump_path(JumpKind::Return, exit, 0, EdgeKind::Jump(JumpKind::Return));
                self.terminate();
            }
            NodeKind::Throw { value } => {
                self.build_node(value)?;
                let handlers = self.handlers.clone();
                for frame in handlers.iter().rev() {
                    for &catch_entry in &frame.catch_entries {
                        self.jump_path(
                            JumpKind::Throw,
                            catch_entry,
                            frame.finally_depth,
                            EdgeKind::Jump(JumpKind::Throw),
                        );
                    }
                }
                let exit = self.exit;
                self.jump_path(JumpKind::Throw, exit, 0, EdgeKind::Jump(JumpKind::Throw));
                self.terminate();
            }
            NodeKind::Try {
                body,
                catches,
                finally,
            } => {
                self.build_try(body, &catches, finally)?;
            }
            NodeKind::Catch { body, .. } => {
                // Catch clauses are consumed by `build_try`; a stray one
                // degrades to its body.
                self.build_node(body)?;
            }
            NodeKind::And { .. } | NodeKind::Or { .. } | NodeKind::Not(_) => {
                // Boolean expression in value position: compile the
                // short-circuit blocks anyway so operand narrowing
                // contexts stay distinct, then rejoin.
                let t = self.new_block();
                let f = self.new_block();
                let after = self.new_block();
                self.build_condition(node, t, f)?;
                self.move_to(t);
                self.goto(after, EdgeKind::Normal);
                self.move_to(f);
                self.goto(after, EdgeKind::Normal);
                self.move_to(after);
            }
            NodeKind::Elvis { lhs, rhs } => {
                self.build_node(lhs)?;
                let rhs_b = self.new_block();
                let after = self.new_block();
                self.goto(after, EdgeKind::NonNull(lhs));
                self.goto(rhs_b, EdgeKind::Null(lhs));
                self.move_to(rhs_b);
                self.build_node(rhs)?;
                self.goto(after, EdgeKind::Normal);
                self.move_to(after);
            }
            NodeKind::Eq { lhs, rhs, .. } => {
                self.build_node(lhs)?;
                self.build_node(rhs)?;
                self.push_op(Op::Eval(node));
            }
            NodeKind::IsCheck { subject, .. } => {
                self.build_node(subject)?;
                self.push_op(Op::Eval(node));
            }
            NodeKind::NotNullAssert(operand) => {
                self.build_node(operand)?;
                self.push_op(Op::Eval(node));
                self.can_raise();
            }
            NodeKind::When {
                subject,
                branches,
                else_body,
                exhaustive,
            } => {
                if let Some(subject) = subject {
                    self.build_node(subject)?;
                }
                let after = self.new_block();
                for branch in &branches {
                    let body_b = self.new_block();
                    let next_b = self.new_block();
                    self.build_condition(branch.condition, body_b, next_b)?;
                    self.move_to(body_b);
                    self.build_node(branch.body)?;
                    self.goto(after, EdgeKind::Normal);
                    self.move_to(next_b);
                }
                if let Some(else_body) = else_body {
                    self.build_node(else_body)?;
                    self.goto(after, EdgeKind::Normal);
                } else if exhaustive {
                    // All variants covered: the implicit else path cannot
                    // execute. Keep the block for diagnostics, dead.
                    let implicit_else = self.current;
                    self.mark(implicit_else, BlockFlags::DEAD);
                    self.goto(after, EdgeKind::Normal);
                } else {
                    self.goto(after, EdgeKind::Normal);
                }
                self.move_to(after);
            }
            NodeKind::Lambda { body, order } => {
                let sub = CfgBuilder::build(self.arena, body)?;
                let cfg = CfgId(self.sub_cfgs.len() as u32);
                self.sub_cfgs.push(sub);
                self.push_op(Op::Eval(node));
                let cont = self.new_block();
                self.goto(cont, EdgeKind::MayInvoke { cfg, order });
                self.move_to(cont);
            }
        }
        Ok(())
    }

    /// Compile a boolean expression into explicit conditional edges.
    /// `&&`/`||` introduce an intermediate block per operand so each
    /// operand is evaluated under the previous operand's branch fact;
    /// `!` swaps the targets.
    fn build_condition(
        &mut self,
        node: NodeId,
        true_target: BlockId,
        false_target: BlockId,
    ) -> Result<(), CfgBuildError> {
        let Some(data) = self.arena.get(node) else {
            return Ok(());
        };
        match data.kind.clone() {
            NodeKind::And { lhs, rhs } => {
                let mid = self.new_block();
                self.build_condition(lhs, mid, false_target)?;
                self.move_to(mid);
                self.build_condition(rhs, true_target, false_target)?;
            }
            NodeKind::Or { lhs, rhs } => {
                let mid = self.new_block();
                self.build_condition(lhs, true_target, mid)?;
                self.move_to(mid);
                self.build_condition(rhs, true_target, false_target)?;
            }
            NodeKind::Not(operand) => {
                self.build_condition(operand, false_target, true_target)?;
            }
            _ => {
                self.build_node(node)?;
                self.goto(true_target, EdgeKind::ConditionalTrue(node));
                self.goto(false_target, EdgeKind::ConditionalFalse(node));
            }
        }
        Ok(())
    }

    fn build_try(
        &mut self,
        body: NodeId,
        catches: &[NodeId],
        finally: Option<NodeId>,
    ) -> Result<(), CfgBuildError> {
        let after = self.new_block();
        let finally_entry = if finally.is_some() {
            let entry = self.new_block();
            self.mark(entry, BlockFlags::FINALLY_ENTRY);
            self.finallys.push(FinallyFrame {
                entry,
                routes: Vec::new(),
                normal_entry: false,
            });
            Some(entry)
        } else {
            None
        };

        let catch_entries: SmallVec<[BlockId; 2]> =
            catches.iter().map(|_| self.new_block()).collect();
        if !catch_entries.is_empty() {
            self.handlers.push(HandlerFrame {
                catch_entries: catch_entries.clone(),
                finally_depth: self.finallys.len(),
            });
        }

        self.build_node(body)?;
        self.leave_region_normally(finally_entry, after);

        if !catch_entries.is_empty() {
            self.handlers.pop();
        }

        for (&entry, &catch) in catch_entries.iter().zip(catches) {
            self.move_to(entry);
            // Catch entries have only exceptional predecessors; they are
            // live whenever any raising operation targeted them.
            if let Some(node) = self.arena.get(catch)
                && let NodeKind::Catch { param, body } = node.kind.clone()
            {
                self.push_op(Op::Declare {
                    symbol: param,
                    init: None,
                });
                self.build_node(body)?;
            }
            self.leave_region_normally(finally_entry, after);
        }

        if let Some(entry) = finally_entry
            && let Some(finally_body) = finally
        {
            let frame = self.finallys.pop().expect("finally frame pushed above");
            self.move_to(entry);
            self.build_node(finally_body)?;
            if self.live {
                if frame.normal_entry {
                    let from = self.current;
                    self.add_edge(from, after, EdgeKind::Normal);
                }
                let from = self.current;
                for (kind, target) in frame.routes {
                    self.add_edge(from, target, EdgeKind::Jump(kind));
                }
            }
        }

        self.move_to(after);
        Ok(())
    }

    /// Normal fallthrough out of a try body or catch clause: into the
    /// finally entry when one is open, straight to the continuation
    /// otherwise.
    fn leave_region_normally(&mut self, finally_entry: Option<BlockId>, after: BlockId) {
        if !self.live {
            return;
        }
        match finally_entry {
            Some(entry) => {
                let frame = self.finallys.last_mut().expect("open finally frame");
                frame.normal_entry = true;
                self.goto(entry, EdgeKind::Normal);
            }
            None => self.goto(after, EdgeKind::Normal),
        }
    }

    /// Resolve the loop a `break`/`continue` targets. An absent label
    /// means the innermost loop; a present label must name an enclosing
    /// one, otherwise the input tree is inconsistent.
    fn resolve_loop(
        &mut self,
        label: Atom,
        node: NodeId,
        is_continue: bool,
    ) -> Result<(BlockId, usize), CfgBuildError> {
        let found = if label.is_none() {
            self.loops.last()
        } else {
            self.loops.iter().rev().find(|l| l.label == label)
        };
        match found {
            Some(target) => {
                let to = if is_continue {
                    target.continue_to
                } else {
                    target.break_to
                };
                Ok((to, target.finally_depth))
            }
            None => Err(CfgBuildError::UnresolvedLabel {
                label,
                span: self.arena.span(node),
            }),
        }
    }
}
