mod common;

use common::*;
use f90asr::asr::{type_name, Asr, BinOpKind, CastKind, Constant, Dimension, ExprKind, SymbolKind, TType};
use f90asr::ast::{Attribute, Decl, DimSpec, Entity, Expr, Stmt, TypeSpec, VarDecl};
use f90asr::SemanticErrorKind;
use pretty_assertions::assert_eq;

fn parameter(ts: TypeSpec, name: &str, value: Expr) -> Decl {
    Decl::Var(VarDecl::new(ts, vec![Entity::new(name).init(value)]).attr(Attribute::Parameter))
}

#[test]
fn test_mixed_arithmetic_casts_the_integer_operand() {
    let u = unit(vec![program(
        "p",
        vec![
            Decl::var(TypeSpec::integer(), &["i"]),
            Decl::var(TypeSpec::real_kind(8), &["x"]),
        ],
        vec![Stmt::assign(Expr::name("x"), Expr::add(Expr::name("i"), Expr::real("1.5d0")))],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let value = assigned_value(&a.asr, &["p"], 0);
    assert_eq!(a.asr.expr_type(value), &TType::Real(8));
    let ExprKind::BinOp { left, op, .. } = a.asr.expr(value).kind else {
        panic!("expected a binary operation");
    };
    assert_eq!(op, BinOpKind::Add);
    assert!(matches!(
        a.asr.expr(left).kind,
        ExprKind::Cast {
            kind: CastKind::IntegerToReal,
            ..
        }
    ));
    assert!(a.lints.is_empty());
}

#[test]
fn test_parameters_fold_into_expressions() {
    let u = unit(vec![program(
        "p",
        vec![
            parameter(TypeSpec::integer(), "n", Expr::add(Expr::int("2"), Expr::int("3"))),
            Decl::var(TypeSpec::integer(), &["m"]),
        ],
        vec![Stmt::assign(Expr::name("m"), Expr::mul(Expr::name("n"), Expr::int("2")))],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let value = assigned_value(&a.asr, &["p"], 0);
    assert_eq!(a.asr.const_int(value), Some(10));
}

#[test]
fn test_kind_parameter_selects_literal_and_variable_kinds() {
    let u = unit(vec![program(
        "p",
        vec![
            parameter(TypeSpec::integer(), "dp", Expr::call("kind", vec![Expr::real("1.0d0")])),
            Decl::Var(VarDecl::new(TypeSpec::Real(Some(Expr::name("dp"))), vec![Entity::new("x")])),
        ],
        vec![Stmt::assign(Expr::name("x"), Expr::real("2.5_dp"))],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    assert_eq!(var_type(&a.asr, &["p", "x"]), TType::Real(8));
    let value = assigned_value(&a.asr, &["p"], 0);
    assert_eq!(a.asr.expr_type(value), &TType::Real(8));
    assert_eq!(a.asr.const_value(value), Some(&Constant::Real(2.5)));
}

#[test]
fn test_unsupported_kind_is_rejected() {
    let u = unit(vec![program("p", vec![Decl::var(TypeSpec::integer_kind(3), &["i"])], vec![])]);
    assert!(analyze(&u).is_err());
}

#[test]
fn test_narrowing_assignment_emits_a_lint() {
    let u = unit(vec![program(
        "p",
        vec![Decl::var(TypeSpec::integer(), &["i"])],
        vec![Stmt::assign(Expr::name("i"), Expr::real("2.75"))],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    assert_eq!(a.lints.len(), 1);
    assert_eq!(a.lints[0].name, "implicit_narrowing");
    assert_eq!(
        a.lints[0].message,
        "Assignment converts real(4) to integer(4) and may lose information"
    );
    let value = assigned_value(&a.asr, &["p"], 0);
    assert_eq!(a.asr.const_int(value), Some(2));
}

#[test]
fn test_implicit_none_rejects_undeclared_names() {
    let u = unit(vec![program(
        "p",
        vec![Decl::var(TypeSpec::integer(), &["x"])],
        vec![Stmt::assign(Expr::name("x"), Expr::name("y"))],
    )]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::UndeclaredVariable);
    assert_eq!(err.message, "Variable 'y' is not declared");
}

#[test]
fn test_default_implicit_typing_when_enabled() {
    let mut prog = match program("p", vec![], vec![Stmt::assign(Expr::name("k"), Expr::int("1"))]) {
        f90asr::ast::ProgramUnit::Program(p) => p,
        _ => unreachable!(),
    };
    prog.implicit.clear();
    let u = unit(vec![f90asr::ast::ProgramUnit::Program(prog)]);

    assert!(analyze(&u).is_err());

    let settings = f90asr::SemaSettings {
        default_implicit_typing: true,
        ..Default::default()
    };
    let a = analyze_with(&u, &settings).expect("k is implicitly an integer");
    assert_eq!(var_type(&a.asr, &["p", "k"]), TType::Integer(4));
}

#[test]
fn test_logical_operands_are_required_for_and() {
    let u = unit(vec![program(
        "p",
        vec![
            Decl::var(TypeSpec::integer(), &["i"]),
            Decl::var(TypeSpec::logical(), &["b"]),
        ],
        vec![Stmt::assign(Expr::name("b"), Expr::and(Expr::name("i"), Expr::logical(true)))],
    )]);
    assert!(analyze(&u).is_err());
}

#[test]
fn test_comparison_yields_logical_and_folds() {
    let u = unit(vec![program(
        "p",
        vec![Decl::var(TypeSpec::logical(), &["b"])],
        vec![Stmt::assign(Expr::name("b"), Expr::lt(Expr::int("1"), Expr::real("1.5")))],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let value = assigned_value(&a.asr, &["p"], 0);
    assert_eq!(a.asr.expr_type(value), &TType::Logical(4));
    assert_eq!(a.asr.const_value(value), Some(&Constant::Logical(true)));
}

#[test]
fn test_string_concatenation_adds_lengths() {
    let u = unit(vec![program(
        "p",
        vec![Decl::var(TypeSpec::character(5), &["s"])],
        vec![Stmt::assign(Expr::name("s"), Expr::concat(Expr::string("ab"), Expr::string("cde")))],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let value = assigned_value(&a.asr, &["p"], 0);
    assert_eq!(a.asr.expr_type(value), &TType::character(Some(5)));
    assert_eq!(a.asr.const_value(value), Some(&Constant::Str("abcde".into())));
}

#[test]
fn test_scalar_intrinsic_is_imported_once() {
    let u = unit(vec![program(
        "p",
        vec![Decl::var(TypeSpec::real(), &["x", "y"])],
        vec![
            Stmt::assign(Expr::name("x"), Expr::call("sqrt", vec![Expr::name("y")])),
            Stmt::assign(Expr::name("y"), Expr::call("sqrt", vec![Expr::name("x")])),
        ],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let names = names_in(&a.asr, &["p"]);
    assert_eq!(names.iter().filter(|n| n.as_str() == "sqrt").count(), 1);
    let sqrt = find(&a.asr, &["p", "sqrt"]);
    let SymbolKind::ExternalSymbol(ext) = &a.asr.symbol(sqrt).kind else {
        panic!("sqrt should be imported");
    };
    assert_eq!(ext.module_name, "lfortran_intrinsic_math");
    let SymbolKind::Program(prog) = &a.asr.symbol(find(&a.asr, &["p"])).kind else {
        panic!("p is a program");
    };
    assert_eq!(prog.dependencies, vec!["lfortran_intrinsic_math".to_string()]);
}

#[test]
fn test_intrinsic_folds_constant_arguments() {
    let u = unit(vec![program(
        "p",
        vec![Decl::var(TypeSpec::integer(), &["i"])],
        vec![Stmt::assign(
            Expr::name("i"),
            Expr::call("max", vec![Expr::int("3"), Expr::int("9"), Expr::int("4")]),
        )],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let value = assigned_value(&a.asr, &["p"], 0);
    assert_eq!(a.asr.const_int(value), Some(9));
}

#[test]
fn test_array_element_and_section_types() {
    let u = unit(vec![program(
        "p",
        vec![
            Decl::Var(VarDecl::new(TypeSpec::real(), vec![Entity::new("a").with_dims(&[3, 4])])),
            Decl::var(TypeSpec::real(), &["x"]),
        ],
        vec![Stmt::assign(
            Expr::name("x"),
            Expr::call("a", vec![Expr::int("1"), Expr::int("2")]),
        )],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let ty = var_type(&a.asr, &["p", "a"]);
    assert_eq!(ty.rank(), 2);
    assert_eq!(f90asr::asr::type_name(&a.asr, &ty), "real(4)(3,4)");
    let value = assigned_value(&a.asr, &["p"], 0);
    assert!(matches!(a.asr.expr(value).kind, ExprKind::ArrayItem { .. }));
    assert_eq!(a.asr.expr_type(value), &TType::Real(4));
}

#[test]
fn test_size_of_fixed_array_folds() {
    let u = unit(vec![program(
        "p",
        vec![
            Decl::Var(VarDecl::new(TypeSpec::integer(), vec![Entity::new("a").with_dims(&[3, 4])])),
            Decl::var(TypeSpec::integer(), &["n"]),
        ],
        vec![Stmt::assign(Expr::name("n"), Expr::call("size", vec![Expr::name("a")]))],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let value = assigned_value(&a.asr, &["p"], 0);
    assert_eq!(a.asr.const_int(value), Some(12));
}

#[test]
fn test_abs_folds_within_the_kind() {
    let lowest = Expr::sub(Expr::neg(Expr::call("huge", vec![Expr::name("i")])), Expr::int("1"));
    let u = unit(vec![program(
        "p",
        vec![Decl::var(TypeSpec::integer(), &["i"])],
        vec![Stmt::assign(Expr::name("i"), Expr::call("abs", vec![lowest]))],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let value = assigned_value(&a.asr, &["p"], 0);
    assert_eq!(a.asr.const_int(value), Some(-2147483648));
}

fn bounded(start: Option<&str>, end: &str) -> DimSpec {
    DimSpec {
        start: start.map(Expr::int),
        end: Some(Expr::int(end)),
    }
}

#[test]
fn test_sizes_and_bounds_outside_the_result_kind_do_not_fold() {
    let mut huge = Entity::new("a");
    huge.dims = vec![bounded(None, "4000000000_8"); 3];
    let mut shifted = Entity::new("b");
    shifted.dims = vec![bounded(Some("9223372036854775000_8"), "9223372036854775807_8")];
    let u = unit(vec![program(
        "p",
        vec![
            Decl::Var(VarDecl::new(TypeSpec::integer(), vec![huge, shifted])),
            Decl::var(TypeSpec::integer(), &["n"]),
        ],
        vec![
            Stmt::assign(Expr::name("n"), Expr::call("size", vec![Expr::name("a")])),
            Stmt::assign(Expr::name("n"), Expr::call("size", vec![Expr::name("b")])),
            Stmt::assign(Expr::name("n"), Expr::call("ubound", vec![Expr::name("b")])),
        ],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let asr = &a.asr;
    let total = assigned_value(asr, &["p"], 0);
    assert!(matches!(asr.expr(total).kind, ExprKind::ArraySize { .. }));
    assert_eq!(asr.const_int(total), None);
    assert_eq!(asr.const_int(assigned_value(asr, &["p"], 1)), Some(808));
    let upper = assigned_value(asr, &["p"], 2);
    assert!(matches!(asr.expr(upper).kind, ExprKind::ArrayBound { .. }));
    assert_eq!(asr.const_int(upper), None);
}

#[test]
fn test_type_name_of_bounds_at_the_integer_limit() {
    let mut asr = Asr::new();
    let start = asr.constant(Constant::Integer(i64::MAX), TType::Integer(8), 0..0);
    let length = asr.constant(Constant::Integer(2), TType::Integer(8), 0..0);
    let ty = TType::array(
        TType::Integer(4),
        vec![Dimension {
            start: Some(start),
            length: Some(length),
        }],
    );
    assert_eq!(type_name(&asr, &ty), "integer(4)(9223372036854775807:9223372036854775808)");
}

#[test]
fn test_too_many_indices_is_an_error() {
    let u = unit(vec![program(
        "p",
        vec![
            Decl::Var(VarDecl::new(TypeSpec::integer(), vec![Entity::new("a").with_dims(&[3])])),
            Decl::var(TypeSpec::integer(), &["n"]),
        ],
        vec![Stmt::assign(
            Expr::name("n"),
            Expr::call("a", vec![Expr::int("1"), Expr::int("1")]),
        )],
    )]);
    assert!(analyze(&u).is_err());
}
