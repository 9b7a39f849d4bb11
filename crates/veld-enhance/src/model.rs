//! Enhanced types: structural types with per-position nullability and its
//! provenance.

use serde::{Deserialize, Serialize};
use veld_types::{TypeData, TypeId, TypeInterner};

use crate::Nullability;

/// Where a position's nullability came from. Precedence is declaration
/// order: source beats annotation beats default.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullabilityOrigin {
    ExplicitSource,
    ExternalAnnotation,
    InferredDefault,
}

/// A declared type with nullability filled in at every position.
///
/// `ty` is the non-null structural core at this position; nullability is
/// carried separately so its origin stays queryable. `args` mirror the
/// core's generic arguments, enhanced recursively.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedType {
    pub ty: TypeId,
    pub nullability: Nullability,
    pub origin: NullabilityOrigin,
    pub args: Vec<EnhancedType>,
}

impl EnhancedType {
    /// A position with no information at any precedence level.
    pub fn platform(ty: TypeId) -> Self {
        Self {
            ty,
            nullability: Nullability::Platform,
            origin: NullabilityOrigin::InferredDefault,
            args: Vec::new(),
        }
    }

    /// Project back onto an interned type, for installation as a symbol's
    /// declared type. Platform nullability stays non-null structurally;
    /// the analyzer treats it as top and assumes nothing either way.
    pub fn to_type(&self, types: &TypeInterner) -> TypeId {
        let core = if self.args.is_empty() {
            self.ty
        } else if let TypeData::App(class, _) = types.data(self.ty) {
            let args = self.args.iter().map(|a| a.to_type(types)).collect();
            types.app_type(class, args)
        } else {
            self.ty
        };
        match self.nullability {
            Nullability::Nullable => types.nullable(core),
            Nullability::NonNull | Nullability::Platform => core,
        }
    }
}
