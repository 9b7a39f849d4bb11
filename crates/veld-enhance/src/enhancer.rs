//! The enhancement pass and its session cache.

use dashmap::DashMap;
use tracing::trace;
use veld_common::limits::MAX_ENHANCEMENT_DEPTH;
use veld_types::{TypeData, TypeId, TypeInterner};

use crate::annotations::{AnnotationTable, DeclId, Nullability, TypePosition};
use crate::model::{EnhancedType, NullabilityOrigin};

/// Enhances foreign declarations' baseline types with external
/// nullability data. Pure and total: missing annotations fall back to
/// platform nullability, never an error.
///
/// The cache is shared process-wide for a compilation session. Enhancement
/// is idempotent, so concurrent duplicate computation is harmless: either
/// write wins and both are structurally equal.
pub struct Enhancer<'a> {
    types: &'a TypeInterner,
    annotations: &'a AnnotationTable,
    cache: DashMap<DeclId, EnhancedType>,
}

impl<'a> Enhancer<'a> {
    pub fn new(types: &'a TypeInterner, annotations: &'a AnnotationTable) -> Self {
        Self {
            types,
            annotations,
            cache: DashMap::default(),
        }
    }

    /// The enhanced type of a declaration, computed once and cached.
    pub fn enhance(&self, decl: DeclId, baseline: TypeId) -> EnhancedType {
        if let Some(hit) = self.cache.get(&decl) {
            return hit.value().clone();
        }
        let enhanced = self.enhance_position(decl, baseline, &TypePosition::root(), None, 0);
        trace!(decl = decl.0, "enhanced declaration");
        self.cache.entry(decl).or_insert(enhanced).clone()
    }

    pub fn cached(&self, decl: DeclId) -> Option<EnhancedType> {
        self.cache.get(&decl).map(|e| e.value().clone())
    }

    fn enhance_position(
        &self,
        decl: DeclId,
        ty: TypeId,
        position: &TypePosition,
        inherited: Option<Nullability>,
        depth: u32,
    ) -> EnhancedType {
        if depth > MAX_ENHANCEMENT_DEPTH {
            return EnhancedType::platform(ty);
        }

        // Structural nullability is explicit source and beats everything.
        let (core, explicit) = match self.types.data(ty) {
            TypeData::Nullable(inner) => (inner, Some(Nullability::Nullable)),
            _ => (ty, None),
        };
        let (nullability, origin) = if let Some(n) = explicit {
            (n, NullabilityOrigin::ExplicitSource)
        } else if let Some(n) = self.annotations.position(decl, position) {
            (n, NullabilityOrigin::ExternalAnnotation)
        } else if let Some(n) = inherited {
            (n, NullabilityOrigin::ExternalAnnotation)
        } else {
            (Nullability::Platform, NullabilityOrigin::InferredDefault)
        };

        let args = match self.types.data(core) {
            TypeData::App(class, args) => args
                .iter()
                .enumerate()
                .map(|(i, &arg)| {
                    let index = i as u32;
                    let inherited = self.annotations.inherited_arg(self.types, class, index);
                    self.enhance_position(decl, arg, &position.child(index), inherited, depth + 1)
                })
                .collect(),
            _ => Vec::new(),
        };

        EnhancedType {
            ty: core,
            nullability,
            origin,
            args,
        }
    }
}
