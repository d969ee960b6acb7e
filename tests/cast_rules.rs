use f90asr::asr::{Asr, BinOpKind, CastKind, CmpOp, Constant, ExprKind, TType};
use f90asr::semantics::cast::{cast_for_assignment, cast_kind, insert_cast, result_type_of_binop, CastSide, OpFamily};
use f90asr::semantics::fold;
use pretty_assertions::assert_eq;

#[test]
fn test_integer_promotes_to_real() {
    let r = result_type_of_binop(OpFamily::Arithmetic, &TType::Integer(4), &TType::Real(4));
    assert_eq!(r, Some((TType::Real(4), CastSide::Left)));
    let r = result_type_of_binop(OpFamily::Arithmetic, &TType::Real(8), &TType::Integer(8));
    assert_eq!(r, Some((TType::Real(8), CastSide::Right)));
}

#[test]
fn test_kind_promotion_within_a_category() {
    let r = result_type_of_binop(OpFamily::Arithmetic, &TType::Real(4), &TType::Real(8));
    assert_eq!(r, Some((TType::Real(8), CastSide::Left)));
    let r = result_type_of_binop(OpFamily::Arithmetic, &TType::Integer(8), &TType::Integer(4));
    assert_eq!(r, Some((TType::Integer(8), CastSide::Right)));
}

#[test]
fn test_complex_dominates_real_of_any_kind() {
    let r = result_type_of_binop(OpFamily::Arithmetic, &TType::Real(8), &TType::Complex(4));
    assert_eq!(r, Some((TType::Complex(4), CastSide::Left)));
}

#[test]
fn test_same_types_need_no_cast() {
    let r = result_type_of_binop(OpFamily::Arithmetic, &TType::Integer(4), &TType::Integer(4));
    assert_eq!(r, Some((TType::Integer(4), CastSide::None)));
}

#[test]
fn test_mixed_families_are_rejected() {
    assert_eq!(
        result_type_of_binop(OpFamily::Arithmetic, &TType::Logical(4), &TType::Integer(4)),
        None
    );
    assert_eq!(
        result_type_of_binop(OpFamily::Logical, &TType::Integer(4), &TType::Integer(4)),
        None
    );
    let s = TType::character(Some(3));
    assert_eq!(result_type_of_binop(OpFamily::Arithmetic, &s, &s), None);
    assert!(result_type_of_binop(OpFamily::Comparison, &s, &TType::character(Some(5))).is_some());
    assert!(result_type_of_binop(OpFamily::Concatenation, &s, &TType::character(None)).is_some());
}

#[test]
fn test_cast_kinds() {
    assert_eq!(cast_kind(&TType::Integer(4), &TType::Real(8)), Some(CastKind::IntegerToReal));
    assert_eq!(cast_kind(&TType::Real(8), &TType::Integer(4)), Some(CastKind::RealToInteger));
    assert_eq!(cast_kind(&TType::Complex(4), &TType::Real(4)), Some(CastKind::ComplexToReal));
    assert_eq!(cast_kind(&TType::Logical(4), &TType::Integer(4)), Some(CastKind::LogicalToInteger));
    assert_eq!(cast_kind(&TType::character(Some(1)), &TType::Integer(4)), None);
}

#[test]
fn test_insert_cast_folds_constants() {
    let mut asr = Asr::new();
    let two = asr.constant(Constant::Integer(2), TType::Integer(4), 0..1);
    let cast = insert_cast(&mut asr, two, &TType::Real(8), 0..1).expect("integer converts to real");
    assert!(matches!(
        asr.expr(cast).kind,
        ExprKind::Cast {
            kind: CastKind::IntegerToReal,
            ..
        }
    ));
    assert_eq!(asr.expr_type(cast), &TType::Real(8));
    assert_eq!(asr.const_value(cast), Some(&Constant::Real(2.0)));
}

#[test]
fn test_insert_cast_is_identity_on_equal_types() {
    let mut asr = Asr::new();
    let x = asr.constant(Constant::Real(1.5), TType::Real(4), 0..1);
    assert_eq!(insert_cast(&mut asr, x, &TType::Real(4), 0..1), Ok(x));
}

#[test]
fn test_insert_cast_rejects_character() {
    let mut asr = Asr::new();
    let s = asr.constant(Constant::Str("ab".into()), TType::character(Some(2)), 0..2);
    let err = insert_cast(&mut asr, s, &TType::Integer(4), 0..2).unwrap_err();
    assert_eq!(err.message, "Cannot convert character(len=2) to integer(4)");
}

#[test]
fn test_narrowing_assignment_is_flagged() {
    let mut asr = Asr::new();
    let x = asr.constant(Constant::Real(2.75), TType::Real(8), 0..1);
    let (cast, narrowing) = cast_for_assignment(&mut asr, x, &TType::Integer(4), 0..1).expect("real assigns to integer");
    assert!(narrowing);
    assert_eq!(asr.const_value(cast), Some(&Constant::Integer(2)));

    let y = asr.constant(Constant::Integer(3), TType::Integer(4), 0..1);
    let (_, narrowing) = cast_for_assignment(&mut asr, y, &TType::Real(4), 0..1).expect("integer assigns to real");
    assert!(!narrowing);
}

#[test]
fn test_assignment_of_logical_to_integer_is_rejected() {
    let mut asr = Asr::new();
    let b = asr.constant(Constant::Logical(true), TType::Logical(4), 0..1);
    let result = cast_for_assignment(&mut asr, b, &TType::Integer(4), 0..1);
    assert!(result.is_err());
}

#[test]
fn test_integer_folding_wraps_to_kind() {
    let big = Constant::Integer(i32::MAX as i64);
    let one = Constant::Integer(1);
    assert_eq!(
        fold::binop(BinOpKind::Add, &TType::Integer(4), &big, &one),
        Some(Constant::Integer(i32::MIN as i64))
    );
    assert_eq!(
        fold::binop(BinOpKind::Add, &TType::Integer(8), &big, &one),
        Some(Constant::Integer(i32::MAX as i64 + 1))
    );
}

#[test]
fn test_division_by_zero_does_not_fold() {
    let z = Constant::Integer(0);
    assert_eq!(fold::binop(BinOpKind::Div, &TType::Integer(4), &Constant::Integer(7), &z), None);
    assert_eq!(
        fold::binop(BinOpKind::Div, &TType::Real(8), &Constant::Real(1.0), &Constant::Real(0.0)),
        None
    );
}

#[test]
fn test_integer_power() {
    let ty = TType::Integer(4);
    assert_eq!(
        fold::binop(BinOpKind::Pow, &ty, &Constant::Integer(2), &Constant::Integer(10)),
        Some(Constant::Integer(1024))
    );
    assert_eq!(
        fold::binop(BinOpKind::Pow, &ty, &Constant::Integer(2), &Constant::Integer(-1)),
        Some(Constant::Integer(0))
    );
    assert_eq!(
        fold::binop(BinOpKind::Pow, &ty, &Constant::Integer(-1), &Constant::Integer(-3)),
        Some(Constant::Integer(-1))
    );
}

#[test]
fn test_character_comparison_pads_with_blanks() {
    let a = Constant::Str("ab".into());
    let b = Constant::Str("ab  ".into());
    assert_eq!(fold::compare(CmpOp::Eq, &a, &b), Some(Constant::Logical(true)));
    assert_eq!(
        fold::compare(CmpOp::Lt, &a, &Constant::Str("b".into())),
        Some(Constant::Logical(true))
    );
}

#[test]
fn test_elementwise_folding_broadcasts_scalars() {
    let v = Constant::Array(vec![Constant::Integer(1), Constant::Integer(2)]);
    assert_eq!(
        fold::binop(BinOpKind::Mul, &TType::Integer(4), &v, &Constant::Integer(3)),
        Some(Constant::Array(vec![Constant::Integer(3), Constant::Integer(6)]))
    );
}

#[test]
fn test_real_to_integer_truncates_toward_zero() {
    assert_eq!(
        fold::cast(CastKind::RealToInteger, &Constant::Real(-2.9), &TType::Integer(4)),
        Some(Constant::Integer(-2))
    );
    assert_eq!(
        fold::cast(CastKind::RealToInteger, &Constant::Real(1e20), &TType::Integer(4)),
        None
    );
}
