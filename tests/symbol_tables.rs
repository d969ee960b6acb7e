use f90asr::asr::{Asr, SymbolKind, TType, Variable};
use f90asr::SemanticErrorKind;
use pretty_assertions::assert_eq;

fn variable(asr: &mut Asr, scope: f90asr::asr::ScopeId, name: &str) -> f90asr::asr::SymbolId {
    let id = asr.add_symbol(name, scope, SymbolKind::Variable(Variable::local(TType::Integer(4))));
    asr.declare(scope, name, id, 0..0).expect("fresh name");
    id
}

#[test]
fn test_lookup_walks_parent_scopes() {
    let mut asr = Asr::new();
    let outer = asr.new_scope(Some(asr.root));
    let inner = asr.new_scope(Some(outer));
    let x = variable(&mut asr, outer, "x");

    assert_eq!(asr.lookup(inner, "x"), Some(x));
    assert_eq!(asr.lookup(outer, "x"), Some(x));
    assert_eq!(asr.lookup(asr.root, "x"), None);
}

#[test]
fn test_inner_declaration_shadows_outer() {
    let mut asr = Asr::new();
    let outer = asr.new_scope(Some(asr.root));
    let inner = asr.new_scope(Some(outer));
    variable(&mut asr, outer, "x");
    let shadow = variable(&mut asr, inner, "x");

    assert_eq!(asr.lookup(inner, "x"), Some(shadow));
}

#[test]
fn test_duplicate_declaration_is_an_error() {
    let mut asr = Asr::new();
    let scope = asr.new_scope(Some(asr.root));
    variable(&mut asr, scope, "x");
    let again = asr.add_symbol("x", scope, SymbolKind::Variable(Variable::local(TType::Real(4))));
    let err = asr.declare(scope, "x", again, 3..4).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::DuplicateSymbol);
    assert_eq!(err.span, 3..4);
}

#[test]
fn test_resolve_reports_undeclared_symbol() {
    let asr = Asr::new();
    let err = asr.resolve(asr.root, "nowhere", 0..7).unwrap_err();
    assert_eq!(err.kind, SemanticErrorKind::UndeclaredSymbol);
    assert_eq!(err.message, "Symbol 'nowhere' is not declared");
}

#[test]
fn test_symbols_enumerate_in_insertion_order() {
    let mut asr = Asr::new();
    let scope = asr.new_scope(Some(asr.root));
    for name in ["zeta", "alpha", "mid"] {
        variable(&mut asr, scope, name);
    }
    let names: Vec<&str> = asr.scope(scope).iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_unique_name_appends_a_counter() {
    let mut asr = Asr::new();
    let scope = asr.new_scope(Some(asr.root));
    assert_eq!(asr.unique_name(scope, "tmp"), "tmp");
    variable(&mut asr, scope, "tmp");
    assert_eq!(asr.unique_name(scope, "tmp"), "tmp_1");
    variable(&mut asr, scope, "tmp_1");
    assert_eq!(asr.unique_name(scope, "tmp"), "tmp_2");
}

#[test]
fn test_overwrite_replaces_binding() {
    let mut asr = Asr::new();
    let scope = asr.new_scope(Some(asr.root));
    variable(&mut asr, scope, "x");
    let replacement = asr.add_symbol("x", scope, SymbolKind::Variable(Variable::local(TType::Real(8))));
    asr.overwrite(scope, "x", replacement);
    assert_eq!(asr.scope(scope).get("x"), Some(replacement));
    assert_eq!(asr.scope(scope).len(), 1);
}
