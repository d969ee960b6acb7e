#![allow(dead_code)]

use f90asr::asr::{Asr, ExprId, Stmt, SymbolId, SymbolKind, TType};
use f90asr::ast::{self, Decl, ImplicitStmt, Program, ProgramUnit, TranslationUnit};
use f90asr::errors::SemanticResult;
use f90asr::modfile::{ModuleLoader, NoModules};
use f90asr::{ast_to_asr, Analysis, SemaSettings};

pub fn unit(items: Vec<ProgramUnit>) -> TranslationUnit {
    TranslationUnit { items }
}

/// `program <name>` with `implicit none`, the given declarations and body.
pub fn program(name: &str, decls: Vec<Decl>, body: Vec<ast::Stmt>) -> ProgramUnit {
    ProgramUnit::Program(Program {
        implicit: vec![ImplicitStmt::None],
        decls,
        body,
        ..Program::new(name)
    })
}

pub fn analyze(unit: &TranslationUnit) -> SemanticResult<Analysis> {
    analyze_with(unit, &SemaSettings::default())
}

pub fn analyze_with(unit: &TranslationUnit, settings: &SemaSettings) -> SemanticResult<Analysis> {
    let mut loader = NoModules;
    ast_to_asr(unit, &mut loader, settings)
}

pub fn analyze_using(unit: &TranslationUnit, loader: &mut dyn ModuleLoader) -> SemanticResult<Analysis> {
    ast_to_asr(unit, loader, &SemaSettings::default())
}

/// Analysis without array intrinsic lowering.
pub fn analyze_unlowered(unit: &TranslationUnit) -> SemanticResult<Analysis> {
    let settings = SemaSettings {
        lower_array_intrinsics: false,
        ..SemaSettings::default()
    };
    analyze_with(unit, &settings)
}

pub fn find(asr: &Asr, path: &[&str]) -> SymbolId {
    let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
    asr.find_path(&path)
        .unwrap_or_else(|| panic!("no symbol at {}", path.join("::")))
}

pub fn var_type(asr: &Asr, path: &[&str]) -> TType {
    let id = find(asr, path);
    asr.variable(id)
        .and_then(|v| v.ty.clone())
        .unwrap_or_else(|| panic!("{} is not a typed variable", path.join("::")))
}

pub fn body<'a>(asr: &'a Asr, path: &[&str]) -> &'a [Stmt] {
    let id = find(asr, path);
    match &asr.symbol(id).kind {
        SymbolKind::Program(p) => &p.body,
        SymbolKind::Function(f) => &f.body,
        SymbolKind::Block(b) => &b.body,
        _ => panic!("{} has no body", path.join("::")),
    }
}

/// Value side of the `index`-th statement, which must be an assignment.
pub fn assigned_value(asr: &Asr, path: &[&str], index: usize) -> ExprId {
    match &body(asr, path)[index] {
        Stmt::Assignment { value, .. } => *value,
        other => panic!("statement {} is not an assignment: {:?}", index, other),
    }
}

pub fn names_in(asr: &Asr, path: &[&str]) -> Vec<String> {
    let id = find(asr, path);
    let scope = asr.symbol_scope(id).expect("scoped symbol");
    asr.scope(scope).iter().map(|(n, _)| n.to_string()).collect()
}
