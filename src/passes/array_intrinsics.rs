//! Replaces array intrinsic calls in executable bodies by calls to helpers
//! synthesized with [`crate::intrinsics::array::instantiate`].
//!
//! A call with a scalar result becomes a plain function call in place. A call
//! with an array result becomes a subroutine call writing into the
//! assignment target, or into a fresh temporary hoisted in front of the
//! statement that uses it.

use std::mem;

use log::trace;

use crate::asr::{Asr, ExprId, ExprKind, ScopeId, Stmt, SymbolId, SymbolKind, Variable};
use crate::intrinsics::array;

/// Lowers every program, procedure and block reachable from the root scope.
/// Helpers are placed in the scope of the top-level unit that uses them.
pub fn lower_array_intrinsics(asr: &mut Asr) {
    let root = asr.root;
    let units: Vec<SymbolId> = asr.scope(root).iter().map(|(_, id)| id).collect();
    for unit in units {
        if let SymbolKind::Module(m) = &asr.symbol(unit).kind {
            if m.intrinsic || m.loaded_from_mod {
                continue;
            }
        }
        if let Some(scope) = asr.symbol_scope(unit) {
            lower_symbol(asr, unit, scope);
        }
    }
}

fn take_body(asr: &mut Asr, sym: SymbolId) -> Option<Vec<Stmt>> {
    match &mut asr.symbol_mut(sym).kind {
        SymbolKind::Program(p) => Some(mem::take(&mut p.body)),
        SymbolKind::Function(f) => Some(mem::take(&mut f.body)),
        SymbolKind::Block(b) => Some(mem::take(&mut b.body)),
        _ => None,
    }
}

fn put_body(asr: &mut Asr, sym: SymbolId, body: Vec<Stmt>) {
    match &mut asr.symbol_mut(sym).kind {
        SymbolKind::Program(p) => p.body = body,
        SymbolKind::Function(f) => f.body = body,
        SymbolKind::Block(b) => b.body = body,
        _ => {}
    }
}

fn lower_symbol(asr: &mut Asr, sym: SymbolId, unit_scope: ScopeId) {
    let Some(scope) = asr.symbol_scope(sym) else {
        return;
    };
    if let Some(body) = take_body(asr, sym) {
        let mut lowerer = Lowerer {
            asr: &mut *asr,
            unit_scope,
            body_scope: scope,
        };
        let body = lowerer.stmts(body);
        put_body(asr, sym, body);
    }
    let children: Vec<SymbolId> = asr.scope(scope).iter().map(|(_, id)| id).collect();
    for child in children {
        lower_symbol(asr, child, unit_scope);
    }
}

struct Lowerer<'a> {
    asr: &'a mut Asr,
    /// Where helpers are registered.
    unit_scope: ScopeId,
    /// Where temporaries are declared.
    body_scope: ScopeId,
}

impl Lowerer<'_> {
    fn stmts(&mut self, body: Vec<Stmt>) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(body.len());
        for stmt in body {
            self.stmt(stmt, &mut out);
        }
        out
    }

    fn stmt(&mut self, stmt: Stmt, out: &mut Vec<Stmt>) {
        match stmt {
            Stmt::Assignment { target, value } if self.returns_array(value) => {
                self.expr(target, out);
                let (helper, mut args) = self.helper_call(value, out);
                args.push(Some(target));
                out.push(Stmt::SubroutineCall {
                    name: helper,
                    original: None,
                    args,
                    dt: None,
                });
            }
            Stmt::Assignment { target, value } => {
                self.expr(target, out);
                self.expr(value, out);
                out.push(Stmt::Assignment { target, value });
            }
            Stmt::If { cond, body, orelse } => {
                self.expr(cond, out);
                let body = self.stmts(body);
                let orelse = self.stmts(orelse);
                out.push(Stmt::If { cond, body, orelse });
            }
            Stmt::DoLoop {
                var,
                start,
                end,
                step,
                body,
            } => {
                for e in [Some(var), Some(start), Some(end), step].into_iter().flatten() {
                    self.expr(e, out);
                }
                let body = self.stmts(body);
                out.push(Stmt::DoLoop {
                    var,
                    start,
                    end,
                    step,
                    body,
                });
            }
            Stmt::WhileLoop { cond, body } => {
                let mut pre = Vec::new();
                self.expr(cond, &mut pre);
                let mut body = self.stmts(body);
                // the condition is re-evaluated after every iteration
                for s in &pre {
                    body.push(self.repeat(s));
                }
                out.extend(pre);
                out.push(Stmt::WhileLoop { cond, body });
            }
            Stmt::SubroutineCall {
                name,
                original,
                args,
                dt,
            } => {
                for e in args.iter().flatten().chain(dt.iter()) {
                    self.expr(*e, out);
                }
                out.push(Stmt::SubroutineCall {
                    name,
                    original,
                    args,
                    dt,
                });
            }
            Stmt::Print(items) => {
                for e in &items {
                    self.expr(*e, out);
                }
                out.push(Stmt::Print(items));
            }
            Stmt::Stop(code) => {
                if let Some(c) = code {
                    self.expr(c, out);
                }
                out.push(Stmt::Stop(code));
            }
            other => out.push(other),
        }
    }

    fn returns_array(&self, id: ExprId) -> bool {
        matches!(self.asr.expr(id).kind, ExprKind::IntrinsicArrayFunction { .. }) && self.asr.expr_type(id).is_array()
    }

    /// Lowers the arguments of array intrinsic node `call` and returns the
    /// helper implementing it with the argument list to pass.
    fn helper_call(&mut self, call: ExprId, out: &mut Vec<Stmt>) -> (SymbolId, Vec<Option<ExprId>>) {
        let args = match &self.asr.expr(call).kind {
            ExprKind::IntrinsicArrayFunction { args, .. } => args.clone(),
            _ => crate::internal_error!("expression #{} is not an array intrinsic call", call.0),
        };
        for a in &args {
            self.expr(*a, out);
        }
        let helper = array::instantiate(self.asr, call, self.unit_scope);
        (helper, args.into_iter().map(Some).collect())
    }

    fn expr(&mut self, id: ExprId, out: &mut Vec<Stmt>) {
        let intrinsic = match &self.asr.expr(id).kind {
            ExprKind::IntrinsicArrayFunction { intrinsic, .. } => Some(*intrinsic),
            _ => None,
        };
        let Some(intrinsic) = intrinsic else {
            let children = self.asr.expr(id).kind.children();
            for child in children {
                self.expr(child, out);
            }
            return;
        };
        let (helper, mut args) = self.helper_call(id, out);
        if !self.asr.expr_type(id).is_array() {
            self.asr.expr_mut(id).kind = ExprKind::FunctionCall {
                name: helper,
                original: None,
                args,
                dt: None,
            };
            return;
        }
        let ty = self.asr.expr_type(id).clone();
        let span = self.asr.expr(id).span.clone();
        let name = self
            .asr
            .unique_name(self.body_scope, &format!("__{}_result", intrinsic.name()));
        let temp = self
            .asr
            .add_symbol(name.clone(), self.body_scope, SymbolKind::Variable(Variable::local(ty.clone())));
        self.asr.overwrite(self.body_scope, &name, temp);
        trace!("hoisting {} into temporary '{}'", intrinsic.name(), name);
        let target = self.asr.add_expr(ExprKind::Var(temp), ty, None, span);
        args.push(Some(target));
        out.push(Stmt::SubroutineCall {
            name: helper,
            original: None,
            args,
            dt: None,
        });
        self.asr.expr_mut(id).kind = ExprKind::Var(temp);
    }

    /// A copy of a hoisted call with fresh argument nodes.
    fn repeat(&mut self, stmt: &Stmt) -> Stmt {
        match stmt {
            Stmt::SubroutineCall {
                name,
                original,
                args,
                dt,
            } => Stmt::SubroutineCall {
                name: *name,
                original: *original,
                args: args.iter().map(|a| a.map(|e| self.asr.deep_copy_expr(e))).collect(),
                dt: dt.map(|d| self.asr.deep_copy_expr(d)),
            },
            other => other.clone(),
        }
    }
}
