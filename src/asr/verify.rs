//! Structural invariant checks over a finished ASR.

use super::types::elements_equal;
use super::{Asr, ExprId, ExprKind, ScopeId, Stmt, SymbolKind};

struct Verifier<'a> {
    asr: &'a Asr,
    problems: Vec<String>,
}

/// Returns every violated invariant; an empty list means the tree is sound.
pub fn verify(asr: &Asr) -> Result<(), Vec<String>> {
    let mut v = Verifier {
        asr,
        problems: Vec::new(),
    };
    v.scope(asr.root);
    if v.problems.is_empty() {
        Ok(())
    } else {
        Err(v.problems)
    }
}

impl Verifier<'_> {
    fn fail(&mut self, msg: String) {
        self.problems.push(msg);
    }

    fn scope(&mut self, scope: ScopeId) {
        let asr = self.asr;
        for (name, id) in asr.scope(scope).iter() {
            let sym = asr.symbol(id);
            if sym.owner != scope {
                self.fail(format!("symbol '{}' is registered in a scope it does not own", name));
            }
            if sym.name != name {
                self.fail(format!("symbol '{}' is registered as '{}'", sym.name, name));
            }
            match &sym.kind {
                SymbolKind::Variable(var) => {
                    if var.ty.is_none() && var.symbolic_value.is_none() {
                        self.fail(format!("variable '{}' has no type", name));
                    }
                    for e in [var.init, var.value, var.symbolic_value].into_iter().flatten() {
                        self.expr(e);
                    }
                }
                SymbolKind::Function(f) => {
                    self.owned_scope(f.scope, id, name);
                    for a in &f.args {
                        if asr.symbol(*a).owner != f.scope {
                            self.fail(format!("argument of '{}' lives outside its scope", name));
                        }
                    }
                    self.scope(f.scope);
                    self.body(&f.body);
                }
                SymbolKind::Module(m) => {
                    self.owned_scope(m.scope, id, name);
                    self.scope(m.scope);
                }
                SymbolKind::Program(p) => {
                    self.owned_scope(p.scope, id, name);
                    self.scope(p.scope);
                    self.body(&p.body);
                }
                SymbolKind::Block(b) => {
                    self.owned_scope(b.scope, id, name);
                    self.scope(b.scope);
                    self.body(&b.body);
                }
                SymbolKind::DerivedType(d) => {
                    self.owned_scope(d.scope, id, name);
                    self.scope(d.scope);
                }
                SymbolKind::GenericProcedure(g) => {
                    if g.procs.is_empty() {
                        self.fail(format!("generic procedure '{}' has no candidates", name));
                    }
                    for p in &g.procs {
                        let target = asr.past_external(*p);
                        let ok = match &asr.symbol(target).kind {
                            SymbolKind::Function(_) => true,
                            SymbolKind::ClassProcedure(c) => asr.function(c.proc).is_some(),
                            _ => false,
                        };
                        if !ok {
                            self.fail(format!("candidate of '{}' is not a procedure", name));
                        }
                    }
                }
                SymbolKind::ClassProcedure(c) => {
                    if asr.function(c.proc).is_none() {
                        self.fail(format!("type-bound procedure '{}' has no implementation", name));
                    }
                }
                SymbolKind::ExternalSymbol(e) => {
                    if e.target.0 >= asr.symbols.len() {
                        self.fail(format!("external '{}' points outside the arena", name));
                    } else if matches!(asr.symbol(e.target).kind, SymbolKind::ExternalSymbol(_)) {
                        self.fail(format!("external '{}' points at another external", name));
                    }
                }
            }
        }
    }

    fn owned_scope(&mut self, scope: ScopeId, owner: super::SymbolId, name: &str) {
        if self.asr.scope(scope).owner != Some(owner) {
            self.fail(format!("scope of '{}' has the wrong owner", name));
        }
    }

    fn body(&mut self, body: &[Stmt]) {
        for stmt in body {
            match stmt {
                Stmt::Assignment { target, value } => {
                    self.expr(*target);
                    self.expr(*value);
                }
                Stmt::If { cond, body, orelse } => {
                    self.expr(*cond);
                    self.body(body);
                    self.body(orelse);
                }
                Stmt::DoLoop {
                    var,
                    start,
                    end,
                    step,
                    body,
                } => {
                    for e in [Some(*var), Some(*start), Some(*end), *step].into_iter().flatten() {
                        self.expr(e);
                    }
                    self.body(body);
                }
                Stmt::WhileLoop { cond, body } => {
                    self.expr(*cond);
                    self.body(body);
                }
                Stmt::SubroutineCall { args, dt, .. } => {
                    for e in args.iter().flatten().chain(dt.iter()) {
                        self.expr(*e);
                    }
                }
                Stmt::Print(items) => items.iter().for_each(|e| self.expr(*e)),
                Stmt::Stop(code) => code.iter().for_each(|e| self.expr(*e)),
                Stmt::Return | Stmt::Exit | Stmt::Cycle | Stmt::BlockCall(_) => {}
            }
        }
    }

    fn expr(&mut self, id: ExprId) {
        let asr = self.asr;
        let e = asr.expr(id);
        if let Some(v) = e.value {
            if !matches!(asr.expr(v).kind, ExprKind::Constant(_)) {
                self.fail(format!("value of expression #{} is not a literal", id.0));
            }
        }
        match &e.kind {
            ExprKind::BinOp {
                left,
                right,
                overloaded: None,
                ..
            }
            | ExprKind::Compare {
                left,
                right,
                overloaded: None,
                ..
            }
            | ExprKind::BoolOp {
                left,
                right,
                overloaded: None,
                ..
            } => {
                let (l, r) = (asr.expr_type(*left), asr.expr_type(*right));
                let both_strings = l.is_character() && r.is_character() && l.kind() == r.kind();
                if !both_strings && !elements_equal(asr, l.element(), r.element()) {
                    self.fail(format!(
                        "operands of expression #{} have different types: {} and {}",
                        id.0,
                        super::type_name(asr, l),
                        super::type_name(asr, r)
                    ));
                }
            }
            _ => {}
        }
        for child in e.kind.children() {
            self.expr(child);
        }
    }
}
