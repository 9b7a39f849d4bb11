//! Nullability enhancement: precedence, generic positions, supertype
//! argument inheritance, and the session cache.

use veld_common::interner::Interner;
use veld_enhance::{
    AnnotationTable, DeclId, Enhancer, Nullability, NullabilityOrigin, TypePosition,
};
use veld_types::{ClassId, TypeId, TypeInterner};

struct Fixture {
    types: TypeInterner,
    collection: ClassId,
    list: ClassId,
}

/// A tiny foreign class library: `List<T> : Collection<T>`.
fn library() -> Fixture {
    let types = TypeInterner::new();
    let mut names = Interner::new();
    let collection = types.register_class(names.intern("Collection"), &[], false, 1);
    let list = types.register_class(names.intern("List"), &[collection], false, 1);
    Fixture {
        types,
        collection,
        list,
    }
}

#[test]
fn unannotated_declaration_stays_platform() {
    let f = library();
    let table = AnnotationTable::new();
    let enhancer = Enhancer::new(&f.types, &table);

    let enhanced = enhancer.enhance(DeclId(0), TypeId::STRING);
    assert_eq!(enhanced.nullability, Nullability::Platform);
    assert_eq!(enhanced.origin, NullabilityOrigin::InferredDefault);
    assert_eq!(enhanced.to_type(&f.types), TypeId::STRING);
}

#[test]
fn structural_nullable_beats_external_annotation() {
    let f = library();
    let mut table = AnnotationTable::new();
    table.annotate(DeclId(1), TypePosition::root(), Nullability::NonNull);
    let enhancer = Enhancer::new(&f.types, &table);

    let baseline = f.types.nullable(TypeId::STRING);
    let enhanced = enhancer.enhance(DeclId(1), baseline);
    assert_eq!(enhanced.nullability, Nullability::Nullable);
    assert_eq!(enhanced.origin, NullabilityOrigin::ExplicitSource);
    assert_eq!(enhanced.ty, TypeId::STRING);
    assert_eq!(enhanced.to_type(&f.types), baseline);
}

#[test]
fn root_annotation_makes_return_non_null() {
    let f = library();
    let mut table = AnnotationTable::new();
    table.annotate(DeclId(2), TypePosition::root(), Nullability::NonNull);
    let enhancer = Enhancer::new(&f.types, &table);

    let enhanced = enhancer.enhance(DeclId(2), TypeId::STRING);
    assert_eq!(enhanced.nullability, Nullability::NonNull);
    assert_eq!(enhanced.origin, NullabilityOrigin::ExternalAnnotation);
    assert_eq!(enhanced.to_type(&f.types), TypeId::STRING);
}

#[test]
fn annotation_on_generic_argument_position() {
    let f = library();
    let mut table = AnnotationTable::new();
    table.annotate(
        DeclId(3),
        TypePosition::root().child(0),
        Nullability::Nullable,
    );
    let enhancer = Enhancer::new(&f.types, &table);

    let baseline = f.types.app_type(f.list, vec![TypeId::STRING]);
    let enhanced = enhancer.enhance(DeclId(3), baseline);
    assert_eq!(enhanced.nullability, Nullability::Platform);
    assert_eq!(enhanced.args.len(), 1);
    assert_eq!(enhanced.args[0].nullability, Nullability::Nullable);
    assert_eq!(enhanced.args[0].origin, NullabilityOrigin::ExternalAnnotation);

    let expected = f
        .types
        .app_type(f.list, vec![f.types.nullable(TypeId::STRING)]);
    assert_eq!(enhanced.to_type(&f.types), expected);
}

#[test]
fn class_argument_annotation_is_inherited_by_subtype() {
    let f = library();
    let mut table = AnnotationTable::new();
    table.annotate_class_arg(f.collection, 0, Nullability::NonNull);
    let enhancer = Enhancer::new(&f.types, &table);

    // The declaration itself is unannotated; List inherits the element
    // annotation from Collection.
    let baseline = f.types.app_type(f.list, vec![TypeId::STRING]);
    let enhanced = enhancer.enhance(DeclId(4), baseline);
    assert_eq!(enhanced.args[0].nullability, Nullability::NonNull);
    assert_eq!(enhanced.args[0].origin, NullabilityOrigin::ExternalAnnotation);
}

#[test]
fn declaration_annotation_beats_inherited_class_argument() {
    let f = library();
    let mut table = AnnotationTable::new();
    table.annotate_class_arg(f.collection, 0, Nullability::NonNull);
    table.annotate(
        DeclId(5),
        TypePosition::root().child(0),
        Nullability::Nullable,
    );
    let enhancer = Enhancer::new(&f.types, &table);

    let baseline = f.types.app_type(f.list, vec![TypeId::STRING]);
    let enhanced = enhancer.enhance(DeclId(5), baseline);
    assert_eq!(enhanced.args[0].nullability, Nullability::Nullable);
}

#[test]
fn nested_arguments_each_get_their_own_position() {
    let f = library();
    let mut table = AnnotationTable::new();
    // List<List<String>>: outer element platform, inner element nullable.
    table.annotate(
        DeclId(6),
        TypePosition::root().child(0).child(0),
        Nullability::Nullable,
    );
    let enhancer = Enhancer::new(&f.types, &table);

    let inner = f.types.app_type(f.list, vec![TypeId::STRING]);
    let baseline = f.types.app_type(f.list, vec![inner]);
    let enhanced = enhancer.enhance(DeclId(6), baseline);
    assert_eq!(enhanced.args[0].nullability, Nullability::Platform);
    assert_eq!(enhanced.args[0].args[0].nullability, Nullability::Nullable);
}

#[test]
fn depth_limit_falls_back_to_platform() {
    let f = library();
    let mut table = AnnotationTable::new();
    table.annotate_class_arg(f.collection, 0, Nullability::NonNull);
    let enhancer = Enhancer::new(&f.types, &table);

    // Nest well past the enhancement depth limit. The outer layers carry
    // the inherited annotation; the deepest remainder is left platform
    // instead of recursing without bound.
    let mut ty = TypeId::STRING;
    for _ in 0..150 {
        ty = f.types.app_type(f.list, vec![ty]);
    }
    let enhanced = enhancer.enhance(DeclId(7), ty);

    let mut cursor = &enhanced;
    assert_eq!(cursor.args[0].nullability, Nullability::NonNull);
    while !cursor.args.is_empty() {
        cursor = &cursor.args[0];
    }
    assert_eq!(cursor.nullability, Nullability::Platform);
    assert_eq!(cursor.origin, NullabilityOrigin::InferredDefault);
}

#[test]
fn enhancement_is_cached_per_declaration() {
    let f = library();
    let mut table = AnnotationTable::new();
    table.annotate(DeclId(8), TypePosition::root(), Nullability::NonNull);
    let enhancer = Enhancer::new(&f.types, &table);

    assert!(enhancer.cached(DeclId(8)).is_none());
    let first = enhancer.enhance(DeclId(8), TypeId::STRING);
    assert_eq!(enhancer.cached(DeclId(8)), Some(first.clone()));
    let second = enhancer.enhance(DeclId(8), TypeId::STRING);
    assert_eq!(first, second);
}

#[test]
fn enhanced_types_serialize_for_annotation_dumps() {
    let f = library();
    let mut table = AnnotationTable::new();
    table.annotate(
        DeclId(10),
        TypePosition::root().child(0),
        Nullability::Nullable,
    );
    let enhancer = Enhancer::new(&f.types, &table);

    let baseline = f.types.app_type(f.list, vec![TypeId::STRING]);
    let enhanced = enhancer.enhance(DeclId(10), baseline);
    let json = serde_json::to_string(&enhanced).unwrap();
    assert!(json.contains("\"Nullable\""));
    assert_eq!(
        serde_json::from_str::<veld_enhance::EnhancedType>(&json).unwrap(),
        enhanced
    );
}

#[test]
fn concurrent_enhancement_agrees() {
    let f = library();
    let mut table = AnnotationTable::new();
    table.annotate(
        DeclId(9),
        TypePosition::root().child(0),
        Nullability::Nullable,
    );
    let enhancer = Enhancer::new(&f.types, &table);
    let baseline = f.types.app_type(f.list, vec![TypeId::STRING]);

    let (a, b) = std::thread::scope(|s| {
        let ta = s.spawn(|| enhancer.enhance(DeclId(9), baseline));
        let tb = s.spawn(|| enhancer.enhance(DeclId(9), baseline));
        (ta.join().unwrap(), tb.join().unwrap())
    });
    assert_eq!(a, b);
    assert_eq!(enhancer.cached(DeclId(9)), Some(a));
}
