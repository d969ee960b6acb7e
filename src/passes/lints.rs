//! Lints computed over a resolved translation unit.

use std::collections::HashSet;

use crate::asr::{Abi, Asr, DefType, ExprId, ExprKind, ScopeId, Stmt, SymbolId, SymbolKind, TType};
use crate::semantics::Context;

/// Reports dummy arguments that no statement, declaration or contained
/// procedure of their procedure refers to.
pub fn unused_dummy_arguments(ctx: &mut Context<'_>) {
    let mut unused = Vec::new();
    let root = ctx.asr.root;
    for (_, id) in ctx.asr.scope(root).iter() {
        if let SymbolKind::Module(m) = &ctx.asr.symbol(id).kind {
            if m.intrinsic || m.loaded_from_mod {
                continue;
            }
        }
        find_unused(&ctx.asr, id, &mut unused);
    }
    for (func, arg) in unused {
        // synthesized procedures have no source declarations
        let Some(span) = ctx.decl_spans.get(&arg).cloned() else {
            continue;
        };
        let message = format!(
            "Dummy argument '{}' of '{}' is never used",
            ctx.asr.name(arg),
            ctx.asr.name(func)
        );
        ctx.lint("unused_dummy_argument", message, span);
    }
}

fn find_unused(asr: &Asr, sym: SymbolId, unused: &mut Vec<(SymbolId, SymbolId)>) {
    if let SymbolKind::Function(f) = &asr.symbol(sym).kind {
        if f.abi == Abi::Source && f.deftype == DefType::Implementation {
            let mut used = HashSet::new();
            body_uses(asr, &f.body, &mut used);
            scope_uses(asr, f.scope, &mut used);
            for a in &f.args {
                if !used.contains(a) {
                    unused.push((sym, *a));
                }
            }
        }
    }
    if let Some(scope) = asr.symbol_scope(sym) {
        for (_, child) in asr.scope(scope).iter() {
            find_unused(asr, child, unused);
        }
    }
}

/// References made by declarations and nested bodies within `scope`.
fn scope_uses(asr: &Asr, scope: ScopeId, used: &mut HashSet<SymbolId>) {
    for (_, id) in asr.scope(scope).iter() {
        match &asr.symbol(id).kind {
            SymbolKind::Variable(v) => {
                for e in [v.init, v.value, v.symbolic_value].into_iter().flatten() {
                    expr_uses(asr, e, used);
                }
                if let Some(ty) = &v.ty {
                    type_uses(asr, ty, used);
                }
            }
            SymbolKind::Function(f) => {
                body_uses(asr, &f.body, used);
                scope_uses(asr, f.scope, used);
            }
            SymbolKind::Block(b) => {
                body_uses(asr, &b.body, used);
                scope_uses(asr, b.scope, used);
            }
            _ => {}
        }
    }
}

fn type_uses(asr: &Asr, ty: &TType, used: &mut HashSet<SymbolId>) {
    for d in ty.dims() {
        for e in [d.start, d.length].into_iter().flatten() {
            expr_uses(asr, e, used);
        }
    }
    if let TType::Character { len_expr: Some(e), .. } = ty.element() {
        expr_uses(asr, *e, used);
    }
}

fn expr_uses(asr: &Asr, id: ExprId, used: &mut HashSet<SymbolId>) {
    let e = asr.expr(id);
    if let ExprKind::Var(s) = e.kind {
        used.insert(s);
    }
    for child in e.kind.children() {
        expr_uses(asr, child, used);
    }
}

fn body_uses(asr: &Asr, body: &[Stmt], used: &mut HashSet<SymbolId>) {
    for stmt in body {
        match stmt {
            Stmt::Assignment { target, value } => {
                expr_uses(asr, *target, used);
                expr_uses(asr, *value, used);
            }
            Stmt::If { cond, body, orelse } => {
                expr_uses(asr, *cond, used);
                body_uses(asr, body, used);
                body_uses(asr, orelse, used);
            }
            Stmt::DoLoop {
                var,
                start,
                end,
                step,
                body,
            } => {
                for e in [Some(*var), Some(*start), Some(*end), *step].into_iter().flatten() {
                    expr_uses(asr, e, used);
                }
                body_uses(asr, body, used);
            }
            Stmt::WhileLoop { cond, body } => {
                expr_uses(asr, *cond, used);
                body_uses(asr, body, used);
            }
            Stmt::SubroutineCall { args, dt, .. } => {
                for e in args.iter().flatten().chain(dt.iter()) {
                    expr_uses(asr, *e, used);
                }
            }
            Stmt::Print(items) => items.iter().for_each(|e| expr_uses(asr, *e, used)),
            Stmt::Stop(code) => code.iter().for_each(|e| expr_uses(asr, *e, used)),
            Stmt::Return | Stmt::Exit | Stmt::Cycle | Stmt::BlockCall(_) => {}
        }
    }
}
