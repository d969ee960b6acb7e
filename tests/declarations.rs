mod common;

use common::*;
use f90asr::asr::{Abi, Access, ExprKind, Stmt as AsrStmt, Storage, SymbolKind, TType};
use f90asr::ast::{
    Association, Attribute, Decl, DerivedTypeDecl, Entity, Expr, ImplicitStmt, Intent, Module, ProgramUnit, Stmt,
    Subprogram, TypeSpec, Use, UseSymbol, VarDecl,
};
use f90asr::diagnostics::classify;
use f90asr::errors::CompileErrorKind;
use f90asr::modfile::NoModules;
use f90asr::{extend_asr, SemaSettings, SemanticErrorKind};
use pretty_assertions::assert_eq;

fn declare(ts: TypeSpec, name: &str, attrs: Vec<Attribute>, init: Option<Expr>) -> Decl {
    let mut entity = Entity::new(name);
    if let Some(init) = init {
        entity = entity.init(init);
    }
    let mut vd = VarDecl::new(ts, vec![entity]);
    for a in attrs {
        vd = vd.attr(a);
    }
    Decl::Var(vd)
}

fn with_use(unit: ProgramUnit, u: Use) -> ProgramUnit {
    match unit {
        ProgramUnit::Program(mut p) => {
            p.uses.push(u);
            ProgramUnit::Program(p)
        }
        other => other,
    }
}

fn module(name: &str, decls: Vec<Decl>) -> ProgramUnit {
    ProgramUnit::Module(Module {
        implicit: vec![ImplicitStmt::None],
        decls,
        ..Module::new(name)
    })
}

fn subroutine(sp: Subprogram) -> ProgramUnit {
    ProgramUnit::Subprogram(Subprogram {
        implicit: vec![ImplicitStmt::None],
        ..sp
    })
}

#[test]
fn test_parameter_requires_an_initializer() {
    let u = unit(vec![program(
        "p",
        vec![declare(TypeSpec::integer(), "n", vec![Attribute::Parameter], None)],
        vec![],
    )]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::InvalidDeclaration);
    assert_eq!(err.message, "Parameter 'n' requires an initializer");
}

#[test]
fn test_parameter_initializer_must_be_constant() {
    let u = unit(vec![program(
        "p",
        vec![
            Decl::var(TypeSpec::integer(), &["k"]),
            declare(TypeSpec::integer(), "n", vec![Attribute::Parameter], Some(Expr::name("k"))),
        ],
        vec![],
    )]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.message, "Initializer of parameter 'n' must be a constant expression");
}

#[test]
fn test_initialized_variable_is_saved() {
    let u = unit(vec![program(
        "p",
        vec![
            declare(TypeSpec::integer(), "counter", vec![], Some(Expr::int("0"))),
            declare(TypeSpec::real(), "pi", vec![Attribute::Parameter], Some(Expr::real("3.14"))),
        ],
        vec![],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let counter = a.asr.variable(find(&a.asr, &["p", "counter"])).expect("variable");
    assert_eq!(counter.storage, Storage::Save);
    let pi = a.asr.variable(find(&a.asr, &["p", "pi"])).expect("variable");
    assert_eq!(pi.storage, Storage::Parameter);
    assert!(pi.value.is_some());
}

#[test]
fn test_duplicate_local_declaration() {
    let u = unit(vec![program(
        "p",
        vec![Decl::var(TypeSpec::integer(), &["x"]), Decl::var(TypeSpec::real(), &["x"])],
        vec![],
    )]);
    assert_eq!(analyze(&u).unwrap_err().kind, SemanticErrorKind::DuplicateSymbol);
}

#[test]
fn test_undeclared_dummy_argument() {
    let u = unit(vec![subroutine(Subprogram::subroutine("s", &["x"]))]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::UndeclaredVariable);
    assert_eq!(err.message, "Dummy argument 'x' of 's' is not declared");
}

#[test]
fn test_function_without_return_type() {
    let u = unit(vec![subroutine(Subprogram::function("f", &[]))]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::MissingReturnType);
    assert_eq!(err.message, "Return type not specified for function 'f'");
}

fn counter() -> Subprogram {
    Subprogram {
        prefix_type: Some(TypeSpec::integer()),
        body: vec![Stmt::assign(Expr::name("counter"), Expr::int("1"))],
        ..Subprogram::function("counter", &[])
    }
}

#[test]
fn test_interactive_procedure_can_be_redefined() {
    let mut first = analyze(&unit(vec![subroutine(counter())])).expect("first input");
    let stub = find(&first.asr, &["counter"]);
    if let SymbolKind::Function(f) = &mut first.asr.symbol_mut(stub).kind {
        f.abi = Abi::Interactive;
    }
    let mut loader = NoModules;
    let second = extend_asr(first.asr, &unit(vec![subroutine(counter())]), &mut loader, &SemaSettings::default())
        .expect("redefinition of an interactive procedure");
    let redefined = find(&second.asr, &["counter"]);
    assert_ne!(redefined, stub);
    assert!(!second.asr.is_interactive_stub(redefined));
}

#[test]
fn test_redefinition_in_a_later_input_is_a_duplicate() {
    let first = analyze(&unit(vec![subroutine(counter())])).expect("first input");
    let mut loader = NoModules;
    let err = extend_asr(first.asr, &unit(vec![subroutine(counter())]), &mut loader, &SemaSettings::default())
        .unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::DuplicateSymbol);
}

#[test]
fn test_result_clause_names_the_return_variable() {
    let f = Subprogram {
        result: Some("r".into()),
        decls: vec![Decl::var(TypeSpec::real_kind(8), &["r"])],
        body: vec![Stmt::assign(Expr::name("r"), Expr::real("1.0d0"))],
        ..Subprogram::function("f", &[])
    };
    let a = analyze(&unit(vec![subroutine(f)])).expect("analysis should succeed");
    assert_eq!(a.asr.return_type(find(&a.asr, &["f"])), Some(TType::Real(8)));
}

#[test]
fn test_use_only_of_a_missing_symbol() {
    let u = unit(vec![
        module("m", vec![Decl::var(TypeSpec::integer(), &["x"])]),
        with_use(program("p", vec![], vec![]), Use::only("m", &["y"])),
    ]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::UndeclaredSymbol);
    assert_eq!(err.message, "Symbol 'y' not found in module 'm'");
}

#[test]
fn test_use_only_of_a_private_symbol() {
    let u = unit(vec![
        module("m", vec![declare(TypeSpec::integer(), "x", vec![Attribute::Private], None)]),
        with_use(program("p", vec![], vec![]), Use::only("m", &["x"])),
    ]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.message, "Symbol 'x' is private in module 'm'");
}

#[test]
fn test_use_all_skips_private_symbols() {
    let u = unit(vec![
        module(
            "m",
            vec![
                Decl::var(TypeSpec::integer(), &["shown"]),
                declare(TypeSpec::integer(), "hidden", vec![Attribute::Private], None),
            ],
        ),
        with_use(program("p", vec![], vec![]), Use::all("m")),
    ]);
    let a = analyze(&u).expect("analysis should succeed");
    let names = names_in(&a.asr, &["p"]);
    assert!(names.contains(&"shown".to_string()));
    assert!(!names.contains(&"hidden".to_string()));
    assert_eq!(a.asr.access(find(&a.asr, &["m", "hidden"])), Access::Private);
}

#[test]
fn test_renamed_import() {
    let rename = Use {
        module: "m".into(),
        only: Some(vec![UseSymbol {
            remote: "x".into(),
            local: Some("y".into()),
        }]),
        span: 0..0,
    };
    let u = unit(vec![
        module("m", vec![Decl::var(TypeSpec::integer(), &["x"])]),
        with_use(
            program("p", vec![], vec![Stmt::assign(Expr::name("y"), Expr::int("1"))]),
            rename,
        ),
    ]);
    let a = analyze(&u).expect("analysis should succeed");
    let y = find(&a.asr, &["p", "y"]);
    let SymbolKind::ExternalSymbol(ext) = &a.asr.symbol(y).kind else {
        panic!("y should be imported");
    };
    assert_eq!(ext.original_name, "x");
    assert_eq!(ext.module_name, "m");
    assert_eq!(a.asr.past_external(y), find(&a.asr, &["m", "x"]));
}

#[test]
fn test_reimporting_a_name_is_an_error() {
    let u = unit(vec![
        module("m", vec![Decl::var(TypeSpec::integer(), &["x"])]),
        with_use(
            with_use(program("p", vec![], vec![]), Use::only("m", &["x"])),
            Use::only("m", &["x"]),
        ),
    ]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::DuplicateSymbol);
    assert_eq!(err.message, "Symbol 'x' is already declared in this scope");
}

#[test]
fn test_same_name_from_two_modules_is_an_error() {
    let u = unit(vec![
        module("m", vec![Decl::var(TypeSpec::integer(), &["x"])]),
        module("n", vec![Decl::var(TypeSpec::real(), &["x"])]),
        with_use(
            with_use(program("p", vec![], vec![]), Use::only("m", &["x"])),
            Use::only("n", &["x"]),
        ),
    ]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::DuplicateSymbol);
    assert_eq!(err.message, "Symbol 'x' is already declared in this scope");
}

#[test]
fn test_whole_module_import_keeps_a_listed_name() {
    let u = unit(vec![
        module("m", vec![Decl::var(TypeSpec::integer(), &["x", "y"])]),
        with_use(
            with_use(program("p", vec![], vec![]), Use::only("m", &["x"])),
            Use::all("m"),
        ),
    ]);
    let a = analyze(&u).expect("analysis should succeed");
    assert_eq!(a.asr.past_external(find(&a.asr, &["p", "x"])), find(&a.asr, &["m", "x"]));
    assert_eq!(a.asr.past_external(find(&a.asr, &["p", "y"])), find(&a.asr, &["m", "y"]));
}

#[test]
fn test_unknown_module() {
    let u = unit(vec![with_use(program("p", vec![], vec![]), Use::all("nowhere"))]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::ModuleLoad);
    assert!(err.message.starts_with("Could not load module 'nowhere'"));
}

#[test]
fn test_exit_outside_of_a_loop() {
    let u = unit(vec![program("p", vec![], vec![Stmt::Exit { span: 0..0 }])]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::MisplacedStatement);
    assert_eq!(err.message, "EXIT used outside of a loop");
}

#[test]
fn test_cycle_inside_a_loop() {
    let u = unit(vec![program(
        "p",
        vec![Decl::var(TypeSpec::integer(), &["i"])],
        vec![Stmt::Do {
            var: "i".into(),
            start: Expr::int("1"),
            end: Expr::int("10"),
            step: None,
            body: vec![Stmt::Cycle { span: 0..0 }],
            span: 0..0,
        }],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let AsrStmt::DoLoop { body: inner, .. } = &body(&a.asr, &["p"])[0] else {
        panic!("expected a loop");
    };
    assert!(matches!(inner[0], AsrStmt::Cycle));
}

#[test]
fn test_assignment_to_a_parameter() {
    let u = unit(vec![program(
        "p",
        vec![declare(TypeSpec::integer(), "n", vec![Attribute::Parameter], Some(Expr::int("3")))],
        vec![Stmt::assign(Expr::name("n"), Expr::int("4"))],
    )]);
    assert_eq!(analyze(&u).unwrap_err().message, "Cannot assign to parameter 'n'");
}

#[test]
fn test_assignment_to_an_intent_in_argument() {
    let s = Subprogram {
        decls: vec![declare(TypeSpec::integer(), "x", vec![Attribute::Intent(Intent::In)], None)],
        body: vec![Stmt::assign(Expr::name("x"), Expr::int("0"))],
        ..Subprogram::subroutine("s", &["x"])
    };
    let err = analyze(&unit(vec![subroutine(s)])).unwrap_err();
    assert_eq!(err.message, "Cannot assign to intent(in) argument 'x'");
}

#[test]
fn test_condition_must_be_logical() {
    let u = unit(vec![program(
        "p",
        vec![],
        vec![Stmt::If {
            cond: Expr::int("1"),
            then_body: vec![],
            else_body: None,
            span: 0..0,
        }],
    )]);
    assert_eq!(
        analyze(&u).unwrap_err().message,
        "Condition must be a logical scalar, not integer(4)"
    );
}

#[test]
fn test_block_gets_its_own_scope() {
    let u = unit(vec![program(
        "p",
        vec![],
        vec![
            Stmt::Block {
                decls: vec![Decl::var(TypeSpec::integer(), &["t"])],
                body: vec![Stmt::assign(Expr::name("t"), Expr::int("1"))],
                span: 0..0,
            },
            Stmt::Block {
                decls: vec![],
                body: vec![],
                span: 0..0,
            },
        ],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let stmts = body(&a.asr, &["p"]);
    let AsrStmt::BlockCall(first) = stmts[0] else {
        panic!("expected a block call");
    };
    assert_eq!(first, find(&a.asr, &["p", "block_1"]));
    assert!(matches!(stmts[1], AsrStmt::BlockCall(b) if b == find(&a.asr, &["p", "block_2"])));
    assert_eq!(var_type(&a.asr, &["p", "block_1", "t"]), TType::Integer(4));
    assert!(!names_in(&a.asr, &["p"]).contains(&"t".to_string()));
    assert_eq!(body(&a.asr, &["p", "block_1"]).len(), 1);
}

#[test]
fn test_associate_aliases_designators_and_copies_values() {
    let u = unit(vec![program(
        "p",
        vec![Decl::var(TypeSpec::integer(), &["x"])],
        vec![Stmt::Associate {
            associations: vec![
                Association {
                    name: "q".into(),
                    expr: Expr::name("x"),
                },
                Association {
                    name: "s".into(),
                    expr: Expr::add(Expr::name("x"), Expr::int("1")),
                },
            ],
            body: vec![Stmt::assign(Expr::name("q"), Expr::name("s"))],
            span: 0..0,
        }],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let asr = &a.asr;
    assert!(matches!(body(asr, &["p"])[0], AsrStmt::BlockCall(_)));

    let q = asr.variable(find(asr, &["p", "associate_block_1", "q"])).expect("alias");
    assert!(q.ty.is_none());
    let selector = q.symbolic_value.expect("alias keeps its selector");
    assert!(matches!(asr.expr(selector).kind, ExprKind::Var(v) if v == find(asr, &["p", "x"])));

    assert_eq!(var_type(asr, &["p", "associate_block_1", "s"]), TType::Integer(4));
    let inner = body(asr, &["p", "associate_block_1"]);
    assert_eq!(inner.len(), 2);
    let AsrStmt::Assignment { target, .. } = &inner[0] else {
        panic!("the copied selector is assigned first");
    };
    assert!(matches!(asr.expr(*target).kind, ExprKind::Var(v) if v == find(asr, &["p", "associate_block_1", "s"])));
}

#[test]
fn test_associated_element_keeps_its_subscript() {
    let u = unit(vec![program(
        "p",
        vec![
            Decl::Var(VarDecl::new(TypeSpec::integer(), vec![Entity::new("a").with_dims(&[3])])),
            Decl::var(TypeSpec::integer(), &["i"]),
        ],
        vec![Stmt::Associate {
            associations: vec![Association {
                name: "e".into(),
                expr: Expr::call("a", vec![Expr::name("i")]),
            }],
            body: vec![
                Stmt::assign(Expr::name("i"), Expr::int("2")),
                Stmt::assign(Expr::name("e"), Expr::int("7")),
            ],
            span: 0..0,
        }],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let asr = &a.asr;
    let index = find(asr, &["p", "associate_block_1", "__e_index"]);
    let inner = body(asr, &["p", "associate_block_1"]);
    assert_eq!(inner.len(), 3);
    let AsrStmt::Assignment { target, value } = &inner[0] else {
        panic!("the subscript is evaluated on entry");
    };
    assert!(matches!(asr.expr(*target).kind, ExprKind::Var(v) if v == index));
    assert!(matches!(asr.expr(*value).kind, ExprKind::Var(v) if v == find(asr, &["p", "i"])));
    let AsrStmt::Assignment { target, .. } = &inner[2] else {
        panic!("expected the assignment through the alias");
    };
    let ExprKind::ArrayItem { indices, .. } = &asr.expr(*target).kind else {
        panic!("the alias stands for an array element");
    };
    assert!(matches!(asr.expr(indices[0]).kind, ExprKind::Var(v) if v == index));
}

#[test]
fn test_extended_type_inherits_components() {
    let base = DerivedTypeDecl {
        name: "base".into(),
        extends: None,
        access: None,
        components: vec![VarDecl::new(TypeSpec::integer(), vec![Entity::new("x")])],
        procedures: vec![],
        generics: vec![],
        span: 0..0,
    };
    let child = DerivedTypeDecl {
        name: "child".into(),
        extends: Some("base".into()),
        components: vec![VarDecl::new(TypeSpec::real(), vec![Entity::new("y")])],
        ..base.clone()
    };
    let u = unit(vec![program(
        "p",
        vec![
            Decl::DerivedType(base),
            Decl::DerivedType(child),
            Decl::var(TypeSpec::derived("child"), &["c"]),
        ],
        vec![
            Stmt::assign(Expr::member("c", &["x"]), Expr::int("1")),
            Stmt::assign(Expr::member("c", &["y"]), Expr::real("2.0")),
        ],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let asr = &a.asr;
    let SymbolKind::DerivedType(dt) = &asr.symbol(find(asr, &["p", "child"])).kind else {
        panic!("child is a derived type");
    };
    assert_eq!(dt.parent, Some(find(asr, &["p", "base"])));
    assert_eq!(dt.members, vec!["y".to_string()]);
    let AsrStmt::Assignment { target, .. } = &body(asr, &["p"])[0] else {
        panic!("expected an assignment");
    };
    assert_eq!(asr.expr_type(*target), &TType::Integer(4));
}

#[test]
fn test_missing_member_is_reported() {
    let point = DerivedTypeDecl {
        name: "point".into(),
        extends: None,
        access: None,
        components: vec![VarDecl::new(TypeSpec::real(), vec![Entity::new("x")])],
        procedures: vec![],
        generics: vec![],
        span: 0..0,
    };
    let u = unit(vec![program(
        "p",
        vec![Decl::DerivedType(point), Decl::var(TypeSpec::derived("point"), &["pt"])],
        vec![Stmt::assign(Expr::member("pt", &["z"]), Expr::real("1.0"))],
    )]);
    let err = analyze(&u).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::NoSuchMember);
    assert_eq!(err.message, "Member 'z' not found in derived type 'point'");
}

#[test]
fn test_unused_dummy_argument_needs_wall() {
    let s = Subprogram {
        decls: vec![
            declare(TypeSpec::integer(), "x", vec![Attribute::Intent(Intent::In)], None),
            declare(TypeSpec::integer(), "y", vec![Attribute::Intent(Intent::In)], None),
        ],
        body: vec![Stmt::print(vec![Expr::name("x")])],
        ..Subprogram::subroutine("s", &["x", "y"])
    };
    let a = analyze(&unit(vec![subroutine(s)])).expect("analysis should succeed");
    assert_eq!(a.lints.len(), 1);
    assert_eq!(a.lints[0].message, "Dummy argument 'y' of 's' is never used");

    assert!(classify(&a.lints, &SemaSettings::default()).is_empty());

    let wall = SemaSettings {
        wall: true,
        ..SemaSettings::default()
    };
    let reported = classify(&a.lints, &wall);
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].kind, CompileErrorKind::Warning);
    assert_eq!(
        reported[0].message,
        "Dummy argument 'y' of 's' is never used [unused_dummy_argument]"
    );

    let mut strict = wall.clone();
    strict.werror = true;
    assert_eq!(classify(&a.lints, &strict)[0].kind, CompileErrorKind::Semantic);
}

#[test]
fn test_narrowing_lint_can_be_allowed() {
    let u = unit(vec![program(
        "p",
        vec![Decl::var(TypeSpec::integer(), &["i"])],
        vec![Stmt::assign(Expr::name("i"), Expr::real("1.5"))],
    )]);
    let a = analyze(&u).expect("analysis should succeed");
    let settings = f90asr::config::parse_directives("!#allow(implicit_narrowing)\nprogram p\n");
    assert!(classify(&a.lints, &settings).is_empty());
    assert_eq!(classify(&a.lints, &SemaSettings::default()).len(), 1);
}
