//! Programmatic construction of resolved ASTs.
//!
//! Parsing and resolution are upstream of this workspace, so tests (and
//! any embedding frontend) build bodies through this builder, which plays
//! the resolver's role: it interns names, allocates symbols with their
//! capability flags, resolves reads to stable keys, and attaches resolved
//! types to every node.

use veld_common::interner::{Atom, Interner};
use veld_common::span::Span;
use veld_types::TypeId;

use crate::arena::{AstArena, NodeId, NodeKind, WhenBranch};
use crate::keys::{StableKeyId, StableKeys};
use crate::symbols::{InvocationOrder, SymbolFlags, SymbolId, SymbolTable};

/// Builder over one compilation unit's arenas.
#[derive(Debug, Default)]
pub struct AstBuilder {
    pub arena: AstArena,
    pub symbols: SymbolTable,
    pub keys: StableKeys,
    pub names: Interner,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_span(&self) -> Span {
        let n = self.arena.len() as u32;
        Span::new(n, n + 1)
    }

    pub fn node(&mut self, kind: NodeKind, ty: TypeId) -> NodeId {
        let span = self.next_span();
        self.arena.alloc(kind, ty, span)
    }

    // =========================================================================
    // Symbols and keys
    // =========================================================================

    pub fn val(&mut self, name: &str, ty: TypeId) -> SymbolId {
        let name = self.names.intern(name);
        self.symbols.add(name, ty, SymbolFlags::empty())
    }

    pub fn var(&mut self, name: &str, ty: TypeId) -> SymbolId {
        let name = self.names.intern(name);
        self.symbols.add(name, ty, SymbolFlags::MUTABLE)
    }

    pub fn param(&mut self, name: &str, ty: TypeId) -> SymbolId {
        let name = self.names.intern(name);
        self.symbols.add(name, ty, SymbolFlags::PARAMETER)
    }

    /// A read-only property with a stable accessor, usable in stable keys.
    pub fn stable_property(&mut self, name: &str, ty: TypeId) -> SymbolId {
        let name = self.names.intern(name);
        self.symbols.add(name, ty, SymbolFlags::STABLE_ACCESSOR)
    }

    pub fn key_of(&mut self, symbol: SymbolId) -> StableKeyId {
        self.keys.local(symbol)
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// A read of a local or parameter.
    pub fn read(&mut self, symbol: SymbolId) -> NodeId {
        let ty = self.symbols.declared_ty(symbol);
        let key = self.keys.local(symbol);
        self.node(NodeKind::Read(key), ty)
    }

    /// A stable property read `base.prop`.
    pub fn read_property(&mut self, base: StableKeyId, property: SymbolId) -> NodeId {
        let ty = self.symbols.declared_ty(property);
        let key = self.keys.property(base, property);
        self.node(NodeKind::Read(key), ty)
    }

    /// A read of the implicit receiver at the given scope depth.
    pub fn read_receiver(&mut self, depth: u32, ty: TypeId) -> NodeId {
        let key = self.keys.receiver(depth);
        self.node(NodeKind::Read(key), ty)
    }

    pub fn opaque_read(&mut self, ty: TypeId) -> NodeId {
        self.node(NodeKind::OpaqueRead, ty)
    }

    pub fn lit(&mut self, ty: TypeId) -> NodeId {
        self.node(NodeKind::Literal, ty)
    }

    pub fn null_lit(&mut self) -> NodeId {
        self.node(NodeKind::Literal, TypeId::NULL)
    }

    pub fn call(&mut self, callee: Option<NodeId>, args: Vec<NodeId>, ty: TypeId) -> NodeId {
        self.node(NodeKind::Call { callee, args }, ty)
    }

    pub fn assign(&mut self, symbol: SymbolId, value: NodeId) -> NodeId {
        let key = self.keys.local(symbol);
        self.node(
            NodeKind::Assign {
                target: Some(key),
                value,
            },
            TypeId::UNIT,
        )
    }

    pub fn var_decl(&mut self, symbol: SymbolId, init: Option<NodeId>) -> NodeId {
        // Intern the key eagerly so definite-assignment can track the
        // local even if the body never reads it.
        self.keys.local(symbol);
        self.node(NodeKind::VarDecl { symbol, init }, TypeId::UNIT)
    }

    pub fn block(&mut self, stmts: Vec<NodeId>) -> NodeId {
        self.node(NodeKind::Block(stmts), TypeId::UNIT)
    }

    pub fn if_(&mut self, cond: NodeId, then_branch: NodeId, else_branch: Option<NodeId>) -> NodeId {
        self.node(
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            },
            TypeId::UNIT,
        )
    }

    pub fn while_(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.labeled_while(Atom::NONE, cond, body)
    }

    pub fn labeled_while(&mut self, label: Atom, cond: NodeId, body: NodeId) -> NodeId {
        self.node(NodeKind::While { label, cond, body }, TypeId::UNIT)
    }

    pub fn do_while(&mut self, body: NodeId, cond: NodeId) -> NodeId {
        self.node(
            NodeKind::DoWhile {
                label: Atom::NONE,
                body,
                cond,
            },
            TypeId::UNIT,
        )
    }

    pub fn break_(&mut self) -> NodeId {
        self.node(NodeKind::Break { label: Atom::NONE }, TypeId::NOTHING)
    }

    pub fn break_to(&mut self, label: Atom) -> NodeId {
        self.node(NodeKind::Break { label }, TypeId::NOTHING)
    }

    pub fn continue_(&mut self) -> NodeId {
        self.node(NodeKind::Continue { label: Atom::NONE }, TypeId::NOTHING)
    }

    pub fn continue_to(&mut self, label: Atom) -> NodeId {
        self.node(NodeKind::Continue { label }, TypeId::NOTHING)
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        self.node(NodeKind::Return { value }, TypeId::NOTHING)
    }

    pub fn throw(&mut self, value: NodeId) -> NodeId {
        self.node(NodeKind::Throw { value }, TypeId::NOTHING)
    }

    pub fn try_(&mut self, body: NodeId, catches: Vec<NodeId>, finally: Option<NodeId>) -> NodeId {
        self.node(
            NodeKind::Try {
                body,
                catches,
                finally,
            },
            TypeId::UNIT,
        )
    }

    pub fn catch(&mut self, param: SymbolId, body: NodeId) -> NodeId {
        self.node(NodeKind::Catch { param, body }, TypeId::UNIT)
    }

    pub fn and(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.node(NodeKind::And { lhs, rhs }, TypeId::BOOLEAN)
    }

    pub fn or(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.node(NodeKind::Or { lhs, rhs }, TypeId::BOOLEAN)
    }

    pub fn not(&mut self, operand: NodeId) -> NodeId {
        self.node(NodeKind::Not(operand), TypeId::BOOLEAN)
    }

    pub fn elvis(&mut self, lhs: NodeId, rhs: NodeId, ty: TypeId) -> NodeId {
        self.node(NodeKind::Elvis { lhs, rhs }, ty)
    }

    pub fn eq(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.node(
            NodeKind::Eq {
                lhs,
                rhs,
                negated: false,
            },
            TypeId::BOOLEAN,
        )
    }

    pub fn neq(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.node(
            NodeKind::Eq {
                lhs,
                rhs,
                negated: true,
            },
            TypeId::BOOLEAN,
        )
    }

    /// `subject == null`.
    pub fn eq_null(&mut self, subject: NodeId) -> NodeId {
        let null = self.null_lit();
        self.eq(subject, null)
    }

    /// `subject != null`.
    pub fn neq_null(&mut self, subject: NodeId) -> NodeId {
        let null = self.null_lit();
        self.neq(subject, null)
    }

    pub fn is_check(&mut self, subject: NodeId, checked: TypeId) -> NodeId {
        self.node(
            NodeKind::IsCheck {
                subject,
                checked,
                negated: false,
            },
            TypeId::BOOLEAN,
        )
    }

    pub fn not_is_check(&mut self, subject: NodeId, checked: TypeId) -> NodeId {
        self.node(
            NodeKind::IsCheck {
                subject,
                checked,
                negated: true,
            },
            TypeId::BOOLEAN,
        )
    }

    pub fn not_null_assert(&mut self, operand: NodeId, ty: TypeId) -> NodeId {
        self.node(NodeKind::NotNullAssert(operand), ty)
    }

    pub fn when(
        &mut self,
        subject: Option<NodeId>,
        branches: Vec<WhenBranch>,
        else_body: Option<NodeId>,
        exhaustive: bool,
    ) -> NodeId {
        self.node(
            NodeKind::When {
                subject,
                branches,
                else_body,
                exhaustive,
            },
            TypeId::UNIT,
        )
    }

    pub fn lambda(&mut self, body: NodeId, order: InvocationOrder) -> NodeId {
        self.node(NodeKind::Lambda { body, order }, TypeId::ANY)
    }
}
