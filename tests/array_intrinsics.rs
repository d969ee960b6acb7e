mod common;

use common::*;
use f90asr::asr::{Access, Constant, ExprKind, Stmt as AsrStmt, SymbolKind, TType};
use f90asr::ast::{Arg, Decl, Entity, Expr, Stmt, TypeSpec, VarDecl};
use f90asr::SemanticErrorKind;
use pretty_assertions::assert_eq;

fn array(ts: TypeSpec, name: &str, dims: &[i64]) -> Decl {
    Decl::Var(VarDecl::new(ts, vec![Entity::new(name).with_dims(dims)]))
}

fn helpers(names: &[String], prefix: &str) -> Vec<String> {
    names.iter().filter(|n| n.starts_with(prefix)).cloned().collect()
}

#[test]
fn test_scalar_reduction_calls_a_helper() {
    let u = unit(vec![program(
        "p",
        vec![array(TypeSpec::integer(), "a", &[5]), Decl::var(TypeSpec::integer(), &["n"])],
        vec![Stmt::assign(Expr::name("n"), Expr::call("sum", vec![Expr::name("a")]))],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let asr = &a.asr;
    let helper = find(asr, &["p", "sum_4_1_0"]);
    assert_eq!(asr.access(helper), Access::Private);
    assert_eq!(asr.return_type(helper), Some(TType::Integer(4)));

    let value = assigned_value(asr, &["p"], 0);
    let ExprKind::FunctionCall { name, args, .. } = &asr.expr(value).kind else {
        panic!("the reduction should become a call, got {:?}", asr.expr(value).kind);
    };
    assert_eq!(*name, helper);
    assert_eq!(args.len(), 1);
}

#[test]
fn test_array_intrinsic_is_imported_from_its_module() {
    let u = unit(vec![program(
        "p",
        vec![array(TypeSpec::integer(), "a", &[5]), Decl::var(TypeSpec::integer(), &["n", "m"])],
        vec![
            Stmt::assign(Expr::name("n"), Expr::call("sum", vec![Expr::name("a")])),
            Stmt::assign(Expr::name("m"), Expr::call("sum", vec![Expr::name("a")])),
        ],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let asr = &a.asr;
    let names = names_in(asr, &["p"]);
    assert_eq!(names.iter().filter(|n| n.as_str() == "sum").count(), 1);
    let SymbolKind::ExternalSymbol(ext) = &asr.symbol(find(asr, &["p", "sum"])).kind else {
        panic!("sum should be imported");
    };
    assert_eq!(ext.module_name, "lfortran_intrinsic_array");
    assert_eq!(ext.original_name, "sum");
    let SymbolKind::Program(prog) = &asr.symbol(find(asr, &["p"])).kind else {
        panic!("p is a program");
    };
    assert_eq!(prog.dependencies, vec!["lfortran_intrinsic_array".to_string()]);
    assert_eq!(helpers(&names, "sum_"), vec!["sum_4_1_0".to_string()]);
}

#[test]
fn test_helpers_are_shared_between_calls_of_one_shape() {
    let u = unit(vec![program(
        "p",
        vec![
            array(TypeSpec::integer(), "a", &[5]),
            array(TypeSpec::integer(), "b", &[5]),
            Decl::var(TypeSpec::integer(), &["n"]),
        ],
        vec![
            Stmt::assign(Expr::name("n"), Expr::call("sum", vec![Expr::name("a")])),
            Stmt::assign(
                Expr::name("n"),
                Expr::add(Expr::name("n"), Expr::call("sum", vec![Expr::name("b")])),
            ),
        ],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let names = names_in(&a.asr, &["p"]);
    assert_eq!(helpers(&names, "sum_"), vec!["sum_4_1_0".to_string()]);
}

#[test]
fn test_different_shapes_get_different_helpers() {
    let u = unit(vec![program(
        "p",
        vec![
            array(TypeSpec::integer(), "a", &[5]),
            array(TypeSpec::real_kind(8), "x", &[5]),
            Decl::var(TypeSpec::real_kind(8), &["r"]),
            Decl::var(TypeSpec::logical(), &["m"]),
        ],
        vec![
            Stmt::assign(Expr::name("r"), Expr::call("maxval", vec![Expr::name("x")])),
            Stmt::assign(
                Expr::name("r"),
                Expr::call_with(
                    "maxval",
                    vec![
                        Arg::positional(Expr::name("x")),
                        Arg::keyword("mask", Expr::gt(Expr::name("x"), Expr::real("0.0d0"))),
                    ],
                ),
            ),
            Stmt::assign(Expr::name("m"), Expr::call("any", vec![Expr::gt(Expr::name("a"), Expr::int("0"))])),
        ],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let names = names_in(&a.asr, &["p"]);
    assert_eq!(
        helpers(&names, "maxval_"),
        vec!["maxval_8_1_0".to_string(), "maxval_8_1_2".to_string()]
    );
    assert_eq!(helpers(&names, "any_"), vec!["any_4_1_0".to_string()]);
}

#[test]
fn test_helpers_are_shared_per_argument_signature() {
    let u = unit(vec![program(
        "p",
        vec![
            array(TypeSpec::integer(), "a", &[5]),
            array(TypeSpec::integer(), "b", &[5]),
            array(TypeSpec::integer(), "r", &[5]),
            array(TypeSpec::logical(), "l", &[5]),
            Decl::var(TypeSpec::logical(), &["f"]),
        ],
        vec![
            Stmt::assign(Expr::name("r"), Expr::call("merge", vec![Expr::name("a"), Expr::name("b"), Expr::name("l")])),
            Stmt::assign(Expr::name("r"), Expr::call("merge", vec![Expr::name("a"), Expr::name("b"), Expr::name("f")])),
            Stmt::assign(Expr::name("r"), Expr::call("merge", vec![Expr::name("b"), Expr::name("a"), Expr::name("f")])),
            Stmt::assign(Expr::name("r"), Expr::call("merge", vec![Expr::name("b"), Expr::name("a"), Expr::name("l")])),
        ],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let asr = &a.asr;
    let names = names_in(asr, &["p"]);
    assert_eq!(
        helpers(&names, "merge_"),
        vec!["merge_4_1_0".to_string(), "merge_4_1_0_1".to_string()]
    );
    let called: Vec<_> = body(asr, &["p"])
        .iter()
        .map(|s| match s {
            AsrStmt::SubroutineCall { name, .. } => asr.name(*name).to_string(),
            other => panic!("expected a helper call, got {:?}", other),
        })
        .collect();
    assert_eq!(called, vec!["merge_4_1_0", "merge_4_1_0_1", "merge_4_1_0_1", "merge_4_1_0"]);
}

#[test]
fn test_array_result_is_written_into_the_target() {
    let u = unit(vec![program(
        "p",
        vec![array(TypeSpec::integer(), "b", &[3, 4]), array(TypeSpec::integer(), "r", &[4])],
        vec![Stmt::assign(
            Expr::name("r"),
            Expr::call_with(
                "sum",
                vec![Arg::positional(Expr::name("b")), Arg::keyword("dim", Expr::int("1"))],
            ),
        )],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let asr = &a.asr;
    let helper = find(asr, &["p", "sum_4_2_1"]);
    let AsrStmt::SubroutineCall { name, args, .. } = &body(asr, &["p"])[0] else {
        panic!("expected the assignment to become a subroutine call");
    };
    assert_eq!(*name, helper);
    assert_eq!(args.len(), 3);
    let target = args[2].expect("the target is passed last");
    assert!(matches!(asr.expr(target).kind, ExprKind::Var(v) if v == find(asr, &["p", "r"])));
    let result = asr
        .function(helper)
        .and_then(|f| f.args.last().copied())
        .expect("helper has a result argument");
    assert_eq!(asr.name(result), "result");
}

#[test]
fn test_array_result_inside_an_expression_is_hoisted() {
    let u = unit(vec![program(
        "p",
        vec![array(TypeSpec::integer(), "b", &[3, 4])],
        vec![Stmt::print(vec![Expr::call_with(
            "sum",
            vec![Arg::positional(Expr::name("b")), Arg::keyword("dim", Expr::int("2"))],
        )])],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let asr = &a.asr;
    let temp = find(asr, &["p", "__sum_result"]);
    assert_eq!(var_type(asr, &["p", "__sum_result"]).rank(), 1);
    let stmts = body(asr, &["p"]);
    assert_eq!(stmts.len(), 2);
    assert!(matches!(stmts[0], AsrStmt::SubroutineCall { .. }));
    let AsrStmt::Print(items) = &stmts[1] else {
        panic!("the print follows the hoisted call");
    };
    assert!(matches!(asr.expr(items[0]).kind, ExprKind::Var(v) if v == temp));
}

#[test]
fn test_helpers_for_module_procedures_live_in_the_module() {
    use f90asr::ast::{ImplicitStmt, Module, ProgramUnit, Subprogram};

    let total = Subprogram {
        prefix_type: Some(TypeSpec::integer()),
        decls: vec![Decl::Var(
            VarDecl::new(TypeSpec::integer(), vec![Entity::new("v").assumed(1)])
                .attr(f90asr::ast::Attribute::Intent(f90asr::ast::Intent::In)),
        )],
        body: vec![Stmt::assign(Expr::name("total"), Expr::call("sum", vec![Expr::name("v")]))],
        ..Subprogram::function("total", &["v"])
    };
    let u = unit(vec![ProgramUnit::Module(Module {
        implicit: vec![ImplicitStmt::None],
        contains: vec![total],
        ..Module::new("m")
    })]);
    let a = analyze(&u).expect("analysis should succeed");
    let helper = find(&a.asr, &["m", "sum_4_1_0"]);
    assert!(matches!(a.asr.symbol(helper).kind, SymbolKind::Function(_)));
    assert!(!names_in(&a.asr, &["m", "total"]).iter().any(|n| n.starts_with("sum_")));
}

#[test]
fn test_lowering_can_be_disabled() {
    let u = unit(vec![program(
        "p",
        vec![array(TypeSpec::integer(), "a", &[5]), Decl::var(TypeSpec::integer(), &["n"])],
        vec![Stmt::assign(Expr::name("n"), Expr::call("product", vec![Expr::name("a")]))],
    )]);
    let a = analyze_unlowered(&u).expect("analysis should succeed");
    let value = assigned_value(&a.asr, &["p"], 0);
    assert!(matches!(a.asr.expr(value).kind, ExprKind::IntrinsicArrayFunction { .. }));
    assert!(helpers(&names_in(&a.asr, &["p"]), "product_").is_empty());
}

#[test]
fn test_location_of_constant_vector_folds() {
    let u = unit(vec![program(
        "p",
        vec![],
        vec![Stmt::print(vec![Expr::call(
            "maxloc",
            vec![Expr::array(vec![Expr::int("3"), Expr::int("9"), Expr::int("4")])],
        )])],
    )]);
    let a = analyze_unlowered(&u).expect("analysis should succeed");
    let AsrStmt::Print(items) = &body(&a.asr, &["p"])[0] else {
        panic!("expected a print");
    };
    assert_eq!(
        a.asr.const_value(items[0]),
        Some(&Constant::Array(vec![Constant::Integer(2)]))
    );
}

#[test]
fn test_missing_array_argument() {
    let u = unit(vec![program(
        "p",
        vec![Decl::var(TypeSpec::integer(), &["n"])],
        vec![Stmt::assign(Expr::name("n"), Expr::call("sum", vec![]))],
    )]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::IntrinsicContract);
    assert_eq!(err.message, "sum: missing required argument 'array'");
}

#[test]
fn test_reduction_of_a_logical_array_is_rejected() {
    let u = unit(vec![program(
        "p",
        vec![array(TypeSpec::logical(), "l", &[3]), Decl::var(TypeSpec::integer(), &["n"])],
        vec![Stmt::assign(Expr::name("n"), Expr::call("sum", vec![Expr::name("l")]))],
    )]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::IntrinsicContract);
    assert!(err.message.starts_with("sum: argument 'array' must be an integer, real or complex array"));
}

#[test]
fn test_dim_out_of_range() {
    let u = unit(vec![program(
        "p",
        vec![array(TypeSpec::integer(), "b", &[3, 4])],
        vec![Stmt::print(vec![Expr::call_with(
            "sum",
            vec![Arg::positional(Expr::name("b")), Arg::keyword("dim", Expr::int("3"))],
        )])],
    )]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.message, "sum: dim=3 is out of range for an array of rank 2");
}

#[test]
fn test_maxloc_with_dim_is_unsupported() {
    let u = unit(vec![program(
        "p",
        vec![array(TypeSpec::integer(), "a", &[5])],
        vec![Stmt::print(vec![Expr::call_with(
            "maxloc",
            vec![Arg::positional(Expr::name("a")), Arg::keyword("dim", Expr::int("1"))],
        )])],
    )]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::Unsupported);
}

#[test]
fn test_merge_requires_matching_types() {
    let u = unit(vec![program(
        "p",
        vec![Decl::var(TypeSpec::integer(), &["i"])],
        vec![Stmt::assign(
            Expr::name("i"),
            Expr::call(
                "merge",
                vec![Expr::int("1"), Expr::real("2.0"), Expr::logical(true)],
            ),
        )],
    )]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::IntrinsicContract);
    assert_eq!(
        err.message,
        "merge: 'tsource' and 'fsource' must have the same type, got integer(4) and real(4)"
    );
}
