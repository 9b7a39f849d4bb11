use veld_common::interner::Interner;
use veld_types::{TypeData, TypeId, TypeInterner};

struct Shapes {
    types: TypeInterner,
    shape: TypeId,
    circle: TypeId,
    square: TypeId,
    triangle: TypeId,
}

fn sealed_shapes() -> Shapes {
    let mut names = Interner::new();
    let types = TypeInterner::new();
    let shape = types.register_class(names.intern("Shape"), &[], true, 0);
    let circle = types.register_class(names.intern("Circle"), &[shape], false, 0);
    let square = types.register_class(names.intern("Square"), &[shape], false, 0);
    let triangle = types.register_class(names.intern("Triangle"), &[shape], false, 0);
    Shapes {
        circle: types.class_type(circle),
        square: types.class_type(square),
        triangle: types.class_type(triangle),
        shape: types.class_type(shape),
        types,
    }
}

#[test]
fn subclass_is_subtype_of_sealed_parent() {
    let s = sealed_shapes();
    assert!(s.types.is_subtype(s.circle, s.shape));
    assert!(!s.types.is_subtype(s.shape, s.circle));
    assert!(s.types.is_subtype(TypeId::NOTHING, s.circle));
    assert!(s.types.is_subtype(s.circle, TypeId::ANY));
}

#[test]
fn nullable_subtyping_is_one_directional() {
    let s = sealed_shapes();
    let shape_opt = s.types.nullable(s.shape);
    assert!(s.types.is_subtype(s.shape, shape_opt));
    assert!(!s.types.is_subtype(shape_opt, s.shape));
    assert!(s.types.is_subtype(TypeId::NULL, shape_opt));
    assert!(!s.types.is_subtype(TypeId::NULL, s.shape));
}

#[test]
fn union_canonicalizes_and_collapses() {
    let s = sealed_shapes();
    // Subsumed member dropped: Circle | Shape = Shape.
    assert_eq!(s.types.union(vec![s.circle, s.shape]), s.shape);
    // Duplicates collapse; singleton unwraps.
    assert_eq!(s.types.union(vec![s.circle, s.circle]), s.circle);
    // Empty union is the unreachable type.
    assert_eq!(s.types.union(vec![]), TypeId::NOTHING);
    // Order does not matter.
    let a = s.types.union(vec![s.circle, s.square]);
    let b = s.types.union(vec![s.square, s.circle]);
    assert_eq!(a, b);
    // Nullability factors out to a single outer marker.
    let n = s.types.union(vec![s.types.nullable(s.circle), s.square]);
    assert!(s.types.is_nullable(n));
    assert_eq!(s.types.strip_null(n), a);
}

#[test]
fn intersect_picks_the_more_specific_side() {
    let s = sealed_shapes();
    assert_eq!(s.types.intersect(s.shape, s.circle), s.circle);
    assert_eq!(s.types.intersect(s.circle, s.shape), s.circle);
    // Nullable declared type intersected with a non-null check loses `?`.
    let shape_opt = s.types.nullable(s.shape);
    assert_eq!(s.types.intersect(shape_opt, s.circle), s.circle);
    // Union declared type keeps only compatible members.
    let cs = s.types.union(vec![s.circle, s.square]);
    assert_eq!(s.types.intersect(cs, s.circle), s.circle);
}

#[test]
fn closed_complement_subtracts_sealed_variants() {
    let s = sealed_shapes();
    let rest = s
        .types
        .closed_complement(s.shape, s.circle)
        .expect("Shape is sealed");
    assert_eq!(rest, s.types.union(vec![s.square, s.triangle]));

    // Subtracting everything leaves Nothing.
    let only = s.types.closed_complement(rest, rest).expect("union is closed");
    assert_eq!(only, TypeId::NOTHING);

    // Open types have no complement.
    assert_eq!(s.types.closed_complement(s.circle, s.square), None);
    assert_eq!(s.types.closed_complement(TypeId::STRING, TypeId::INT), None);
}

#[test]
fn complement_of_nullable_sealed_type_keeps_null() {
    let s = sealed_shapes();
    let shape_opt = s.types.nullable(s.shape);
    let rest = s
        .types
        .closed_complement(shape_opt, s.circle)
        .expect("Shape? is closed modulo null");
    assert!(s.types.is_nullable(rest));
    assert_eq!(
        s.types.strip_null(rest),
        s.types.union(vec![s.square, s.triangle])
    );
}

#[test]
fn interning_is_idempotent_and_shared() {
    let s = sealed_shapes();
    let a = s.types.intern(TypeData::Nullable(s.circle));
    let b = s.types.nullable(s.circle);
    assert_eq!(a, b);
    // Nullable of nullable is a no-op.
    assert_eq!(s.types.nullable(b), b);
}

#[test]
fn sealed_variants_flatten_nested_sealed_levels() {
    let mut names = Interner::new();
    let types = TypeInterner::new();
    let expr = types.register_class(names.intern("Expr"), &[], true, 0);
    let leaf = types.register_class(names.intern("Leaf"), &[expr], false, 0);
    let binary = types.register_class(names.intern("Binary"), &[expr], true, 0);
    let add = types.register_class(names.intern("Add"), &[binary], false, 0);
    let mul = types.register_class(names.intern("Mul"), &[binary], false, 0);

    let mut variants = types.sealed_variants(expr).expect("sealed");
    variants.sort();
    let mut expected = vec![leaf, add, mul];
    expected.sort();
    assert_eq!(variants, expected);
}
