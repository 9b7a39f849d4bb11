//! The resolved AST arena.
//!
//! One tagged variant per node kind, dispatched by exhaustive matching in
//! the CFG builder. Child links are `NodeId`s into the same arena.

use veld_common::interner::Atom;
use veld_common::span::Span;
use veld_types::TypeId;

use crate::keys::StableKeyId;
use crate::symbols::{InvocationOrder, SymbolId};

/// Index of a node in an [`AstArena`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: Self = Self(u32::MAX);

    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

/// One branch of a `when` expression. The condition is a full boolean
/// expression over the subject (the resolver desugars `is T ->` and
/// `value ->` forms into `IsCheck`/`Eq` nodes against a subject read).
#[derive(Clone, Debug)]
pub struct WhenBranch {
    pub condition: NodeId,
    pub body: NodeId,
}

/// A resolved AST node kind.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// A literal. The node's `ty` is the literal's exact resolved type;
    /// the `null` literal carries [`TypeId::NULL`].
    Literal,
    /// A read of a stable expression (local, parameter, stable property
    /// chain, or implicit receiver).
    Read(StableKeyId),
    /// A read whose value may change through an unknown accessor. Never
    /// receives narrowed facts.
    OpaqueRead,
    Call {
        callee: Option<NodeId>,
        args: Vec<NodeId>,
    },
    /// An assignment. `target` is `None` when the left side is not a
    /// stable expression (the write still evaluates, it just kills no
    /// trackable refinement of its own).
    Assign {
        target: Option<StableKeyId>,
        value: NodeId,
    },
    VarDecl {
        symbol: SymbolId,
        init: Option<NodeId>,
    },
    Block(Vec<NodeId>),
    If {
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    While {
        label: Atom,
        cond: NodeId,
        body: NodeId,
    },
    DoWhile {
        label: Atom,
        body: NodeId,
        cond: NodeId,
    },
    Break {
        label: Atom,
    },
    Continue {
        label: Atom,
    },
    Return {
        value: Option<NodeId>,
    },
    Throw {
        value: NodeId,
    },
    Try {
        body: NodeId,
        catches: Vec<NodeId>,
        finally: Option<NodeId>,
    },
    Catch {
        param: SymbolId,
        body: NodeId,
    },
    And {
        lhs: NodeId,
        rhs: NodeId,
    },
    Or {
        lhs: NodeId,
        rhs: NodeId,
    },
    Not(NodeId),
    /// `lhs ?: rhs`. Evaluates `rhs` only when `lhs` is null.
    Elvis {
        lhs: NodeId,
        rhs: NodeId,
    },
    Eq {
        lhs: NodeId,
        rhs: NodeId,
        negated: bool,
    },
    /// `subject is T` (or `!is` when negated).
    IsCheck {
        subject: NodeId,
        checked: TypeId,
        negated: bool,
    },
    /// `operand!!`. Asserts non-null, throws otherwise.
    NotNullAssert(NodeId),
    When {
        subject: Option<NodeId>,
        branches: Vec<WhenBranch>,
        else_body: Option<NodeId>,
        /// Resolver-computed: a sealed subject whose branches cover every
        /// variant. The implicit else path is then unreachable.
        exhaustive: bool,
    },
    /// A closure. `order` is the resolver-supplied execution-order
    /// guarantee recorded on the may-invoke edge.
    Lambda {
        body: NodeId,
        order: InvocationOrder,
    },
}

/// A resolved AST node: kind, resolved type, and source span.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub ty: TypeId,
    pub span: Span,
}

/// Append-only node arena for one compilation unit.
#[derive(Debug, Default)]
pub struct AstArena {
    nodes: Vec<Node>,
}

impl AstArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: NodeKind, ty: TypeId, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, ty, span });
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    /// Resolved type of a node. `Error` for missing nodes.
    pub fn ty(&self, id: NodeId) -> TypeId {
        self.get(id).map_or(TypeId::ERROR, |n| n.ty)
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.get(id).map_or(Span::EMPTY, |n| n.span)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
