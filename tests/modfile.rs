mod common;

use std::fs;
use std::path::PathBuf;

use common::*;
use f90asr::asr::{ExprKind, SymbolKind, TType};
use f90asr::ast::{
    Attribute, Decl, Entity, Expr, ImplicitStmt, InterfaceDecl, InterfaceHeader, InterfaceItem, Intent, Module,
    ProgramUnit, Stmt, Subprogram, TypeSpec, Use, VarDecl,
};
use f90asr::modfile::{extract_module, save_module, FsModuleLoader, MemoryModuleLoader, ModfileError, ModuleLoader};
use f90asr::SemanticErrorKind;
use pretty_assertions::assert_eq;

fn scale(kind: TypeSpec, name: &str) -> Subprogram {
    Subprogram {
        prefix_type: Some(kind.clone()),
        decls: vec![Decl::Var(
            VarDecl::new(kind, vec![Entity::new("v")]).attr(Attribute::Intent(Intent::In)),
        )],
        body: vec![Stmt::assign(Expr::name(name), Expr::mul(Expr::name("v"), Expr::name("limit")))],
        ..Subprogram::function(name, &["v"])
    }
}

/// A module with a parameter and a generic over two specifics.
fn library() -> ProgramUnit {
    ProgramUnit::Module(Module {
        implicit: vec![ImplicitStmt::None],
        decls: vec![
            Decl::Var(
                VarDecl::new(TypeSpec::integer(), vec![Entity::new("limit").init(Expr::int("5"))])
                    .attr(Attribute::Parameter),
            ),
            Decl::Interface(InterfaceDecl {
                header: InterfaceHeader::Generic("scale".into()),
                items: vec![InterfaceItem::ModuleProcedure(vec!["scale_int".into(), "scale_real".into()])],
                span: 0..0,
            }),
        ],
        contains: vec![scale(TypeSpec::integer(), "scale_int"), scale(TypeSpec::real(), "scale_real")],
        ..Module::new("lib")
    })
}

/// A program that only knows `lib` through a module loader.
fn client() -> ProgramUnit {
    let ProgramUnit::Program(mut p) = program(
        "client",
        vec![Decl::var(TypeSpec::integer(), &["n"]), Decl::var(TypeSpec::real(), &["x"])],
        vec![
            Stmt::assign(Expr::name("n"), Expr::mul(Expr::name("limit"), Expr::int("2"))),
            Stmt::assign(Expr::name("x"), Expr::call("scale", vec![Expr::real("1.5")])),
        ],
    ) else {
        unreachable!()
    };
    p.uses.push(Use::all("lib"));
    ProgramUnit::Program(p)
}

fn check_client(a: &f90asr::Analysis) {
    let asr = &a.asr;
    let lib = find(asr, &["lib"]);
    let SymbolKind::Module(m) = &asr.symbol(lib).kind else {
        panic!("lib is a module");
    };
    assert!(m.loaded_from_mod);

    assert_eq!(asr.const_int(assigned_value(asr, &["client"], 0)), Some(10));

    let call = assigned_value(asr, &["client"], 1);
    let ExprKind::FunctionCall { name, .. } = &asr.expr(call).kind else {
        panic!("expected a generic call");
    };
    assert_eq!(asr.past_external(*name), find(asr, &["lib", "scale_real"]));
    assert_eq!(asr.expr_type(call), &TType::Real(4));
}

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("f90asr-{}-{}", tag, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch directory");
    dir
}

#[test]
fn test_extracted_image_is_self_contained() {
    let a = analyze(&unit(vec![library()])).expect("analysis should succeed");
    let image = extract_module(&a.asr, find(&a.asr, &["lib"]));
    assert_eq!(image.name, "lib");
    assert!(image.imports.is_empty());
    let names: Vec<&str> = {
        let scope = image.asr.symbol_scope(image.module).expect("module scope");
        image.asr.scope(scope).iter().map(|(n, _)| n).collect()
    };
    assert!(names.contains(&"limit"));
    assert!(names.contains(&"scale"));
    assert!(names.contains(&"scale_int"));
}

#[test]
fn test_memory_loader_serves_compiled_modules() {
    let first = analyze(&unit(vec![library()])).expect("library analysis");
    let mut loader = MemoryModuleLoader::from_asr(&first.asr);
    assert!(loader.contains("lib"));
    assert!(!loader.contains("client"));

    let second = analyze_using(&unit(vec![client()]), &mut loader).expect("client analysis");
    check_client(&second);
}

#[test]
fn test_module_files_round_trip_through_disk() {
    let dir = scratch_dir("roundtrip");
    let first = analyze(&unit(vec![library()])).expect("library analysis");
    let path = save_module(&first.asr, find(&first.asr, &["lib"]), &dir).expect("module written");
    assert_eq!(path, dir.join("lib.mod"));

    let mut loader = FsModuleLoader::new(vec![dir.join("missing"), dir.clone()]);
    let second = analyze_using(&unit(vec![client()]), &mut loader).expect("client analysis");
    check_client(&second);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_missing_module_file() {
    let mut loader = FsModuleLoader::new(vec![]);
    assert!(matches!(loader.load("lib"), Err(ModfileError::NotFound(name)) if name == "lib"));

    let err = analyze_using(&unit(vec![client()]), &mut loader).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::ModuleLoad);
    assert_eq!(err.message, "Could not load module 'lib': no module file found for 'lib'");
}

#[test]
fn test_corrupt_module_file() {
    let dir = scratch_dir("corrupt");
    fs::write(dir.join("lib.mod"), "{ not json").expect("write module file");
    let mut loader = FsModuleLoader::new(vec![dir.clone()]);
    assert!(matches!(loader.load("lib"), Err(ModfileError::Corrupt { .. })));
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_module_in_the_same_unit_is_not_loaded() {
    let a = analyze(&unit(vec![library(), client()])).expect("analysis should succeed");
    let SymbolKind::Module(m) = &a.asr.symbol(find(&a.asr, &["lib"])).kind else {
        panic!("lib is a module");
    };
    assert!(!m.loaded_from_mod);
}

#[test]
fn test_images_of_dependent_modules_resolve_their_imports() {
    let base = ProgramUnit::Module(Module {
        implicit: vec![ImplicitStmt::None],
        decls: vec![Decl::Var(
            VarDecl::new(TypeSpec::integer(), vec![Entity::new("width").init(Expr::int("8"))])
                .attr(Attribute::Parameter),
        )],
        ..Module::new("base")
    });
    let derived = ProgramUnit::Module(Module {
        uses: vec![Use::all("base")],
        implicit: vec![ImplicitStmt::None],
        decls: vec![Decl::Var(
            VarDecl::new(
                TypeSpec::integer(),
                vec![Entity::new("area").init(Expr::mul(Expr::name("width"), Expr::name("width")))],
            )
            .attr(Attribute::Parameter),
        )],
        ..Module::new("shapes")
    });
    let first = analyze(&unit(vec![base, derived])).expect("module analysis");
    let image = extract_module(&first.asr, find(&first.asr, &["shapes"]));
    assert!(!image.imports.is_empty());

    let mut loader = MemoryModuleLoader::from_asr(&first.asr);
    let ProgramUnit::Program(mut p) = program(
        "q",
        vec![Decl::var(TypeSpec::integer(), &["n"])],
        vec![Stmt::assign(Expr::name("n"), Expr::name("area"))],
    ) else {
        unreachable!()
    };
    p.uses.push(Use::only("shapes", &["area"]));
    let second = analyze_using(&unit(vec![ProgramUnit::Program(p)]), &mut loader).expect("program analysis");
    assert_eq!(second.asr.const_int(assigned_value(&second.asr, &["q"], 0)), Some(64));
    assert!(matches!(second.asr.symbol(find(&second.asr, &["base"])).kind, SymbolKind::Module(_)));
}
