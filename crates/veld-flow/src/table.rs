//! The immutable smart-cast side table.

use rustc_hash::FxHashMap;
use veld_ast::NodeId;
use veld_cfg::BlockId;
use veld_types::TypeId;

/// A position inside a CFG: a block and an operation index within it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProgramPoint {
    pub block: BlockId,
    pub op: u32,
}

/// Narrowed types per read site, keyed by the read's node id (each node is
/// evaluated at exactly one program point, recorded alongside). Built once
/// the fixed point has converged; immutable afterwards.
#[derive(Debug, Default)]
pub struct SmartCastTable {
    casts: FxHashMap<NodeId, (ProgramPoint, TypeId)>,
}

impl SmartCastTable {
    /// The narrowed type of a stable-expression read, when one applies.
    pub fn narrowed(&self, node: NodeId) -> Option<TypeId> {
        self.casts.get(&node).map(|&(_, ty)| ty)
    }

    /// Where a recorded narrowing was observed.
    pub fn point_of(&self, node: NodeId) -> Option<ProgramPoint> {
        self.casts.get(&node).map(|&(p, _)| p)
    }

    pub fn len(&self) -> usize {
        self.casts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.casts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, ProgramPoint, TypeId)> + '_ {
        self.casts.iter().map(|(&n, &(p, t))| (n, p, t))
    }

    pub(crate) fn record(&mut self, node: NodeId, point: ProgramPoint, ty: TypeId) {
        self.casts.insert(node, (point, ty));
    }
}
