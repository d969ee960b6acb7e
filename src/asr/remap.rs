//! Rewrites every arena index held by a node. Used to move module images
//! between arenas.

use super::{
    Dimension, Expr, ExprId, ExprKind, ScopeId, Stmt, Symbol, SymbolId, SymbolKind, SymbolTable,
    TType,
};

pub trait IdMapper {
    fn symbol(&mut self, id: SymbolId) -> SymbolId;
    fn scope(&mut self, id: ScopeId) -> ScopeId;
    fn expr(&mut self, id: ExprId) -> ExprId;
}

fn opt_expr(m: &mut dyn IdMapper, e: &mut Option<ExprId>) {
    if let Some(x) = e {
        *x = m.expr(*x);
    }
}

fn exprs(m: &mut dyn IdMapper, v: &mut [ExprId]) {
    for x in v {
        *x = m.expr(*x);
    }
}

impl Dimension {
    pub fn remap(&mut self, m: &mut dyn IdMapper) {
        opt_expr(m, &mut self.start);
        opt_expr(m, &mut self.length);
    }
}

impl TType {
    pub fn remap(&mut self, m: &mut dyn IdMapper) {
        match self {
            TType::Integer(_) | TType::Real(_) | TType::Complex(_) | TType::Logical(_) => {}
            TType::Character { len_expr, .. } => opt_expr(m, len_expr),
            TType::Array { elem, dims } => {
                elem.remap(m);
                dims.iter_mut().for_each(|d| d.remap(m));
            }
            TType::Derived(s) | TType::Class(s) => *s = m.symbol(*s),
            TType::Pointer(inner) | TType::Allocatable(inner) => inner.remap(m),
        }
    }
}

impl Expr {
    pub fn remap(&mut self, m: &mut dyn IdMapper) {
        self.ty.remap(m);
        opt_expr(m, &mut self.value);
        match &mut self.kind {
            ExprKind::Constant(_) => {}
            ExprKind::Var(s) => *s = m.symbol(*s),
            ExprKind::ArrayConstructor(items) => exprs(m, items),
            ExprKind::ComplexConstructor { re, im } => {
                *re = m.expr(*re);
                *im = m.expr(*im);
            }
            ExprKind::BinOp {
                left,
                right,
                overloaded,
                ..
            }
            | ExprKind::Compare {
                left,
                right,
                overloaded,
                ..
            }
            | ExprKind::BoolOp {
                left,
                right,
                overloaded,
                ..
            }
            | ExprKind::StrConcat {
                left,
                right,
                overloaded,
            } => {
                *left = m.expr(*left);
                *right = m.expr(*right);
                opt_expr(m, overloaded);
            }
            ExprKind::UnaryOp {
                operand,
                overloaded,
                ..
            } => {
                *operand = m.expr(*operand);
                opt_expr(m, overloaded);
            }
            ExprKind::Cast { arg, .. } => *arg = m.expr(*arg),
            ExprKind::FunctionCall {
                name,
                original,
                args,
                dt,
            } => {
                *name = m.symbol(*name);
                if let Some(o) = original {
                    *o = m.symbol(*o);
                }
                args.iter_mut().for_each(|a| opt_expr(m, a));
                opt_expr(m, dt);
            }
            ExprKind::IntrinsicArrayFunction { args, .. } => exprs(m, args),
            ExprKind::ArrayItem { array, indices } => {
                *array = m.expr(*array);
                exprs(m, indices);
            }
            ExprKind::DerivedRef { base, member } => {
                *base = m.expr(*base);
                *member = m.symbol(*member);
            }
            ExprKind::StructConstructor { dt, args } => {
                *dt = m.symbol(*dt);
                exprs(m, args);
            }
            ExprKind::ArraySize { array, dim } => {
                *array = m.expr(*array);
                opt_expr(m, dim);
            }
            ExprKind::ArrayBound { array, dim, .. } => {
                *array = m.expr(*array);
                *dim = m.expr(*dim);
            }
        }
    }
}

impl Stmt {
    pub fn remap(&mut self, m: &mut dyn IdMapper) {
        match self {
            Stmt::Assignment { target, value } => {
                *target = m.expr(*target);
                *value = m.expr(*value);
            }
            Stmt::If { cond, body, orelse } => {
                *cond = m.expr(*cond);
                body.iter_mut().for_each(|s| s.remap(m));
                orelse.iter_mut().for_each(|s| s.remap(m));
            }
            Stmt::DoLoop {
                var,
                start,
                end,
                step,
                body,
            } => {
                *var = m.expr(*var);
                *start = m.expr(*start);
                *end = m.expr(*end);
                opt_expr(m, step);
                body.iter_mut().for_each(|s| s.remap(m));
            }
            Stmt::WhileLoop { cond, body } => {
                *cond = m.expr(*cond);
                body.iter_mut().for_each(|s| s.remap(m));
            }
            Stmt::SubroutineCall {
                name,
                original,
                args,
                dt,
            } => {
                *name = m.symbol(*name);
                if let Some(o) = original {
                    *o = m.symbol(*o);
                }
                args.iter_mut().for_each(|a| opt_expr(m, a));
                opt_expr(m, dt);
            }
            Stmt::Print(items) => exprs(m, items),
            Stmt::Stop(code) => opt_expr(m, code),
            Stmt::Return | Stmt::Exit | Stmt::Cycle => {}
            Stmt::BlockCall(b) => *b = m.symbol(*b),
        }
    }
}

impl SymbolTable {
    pub fn remap(&mut self, m: &mut dyn IdMapper) {
        if let Some(p) = &mut self.parent {
            *p = m.scope(*p);
        }
        if let Some(o) = &mut self.owner {
            *o = m.symbol(*o);
        }
        for id in self.symbols.values_mut() {
            *id = m.symbol(*id);
        }
        self.helpers.clear();
    }
}

impl Symbol {
    pub fn remap(&mut self, m: &mut dyn IdMapper) {
        self.owner = m.scope(self.owner);
        match &mut self.kind {
            SymbolKind::Variable(v) => {
                if let Some(ty) = &mut v.ty {
                    ty.remap(m);
                }
                opt_expr(m, &mut v.init);
                opt_expr(m, &mut v.value);
                opt_expr(m, &mut v.symbolic_value);
            }
            SymbolKind::Function(f) => {
                f.scope = m.scope(f.scope);
                f.args.iter_mut().for_each(|a| *a = m.symbol(*a));
                if let Some(r) = &mut f.return_var {
                    *r = m.symbol(*r);
                }
                f.body.iter_mut().for_each(|s| s.remap(m));
            }
            SymbolKind::Module(md) => md.scope = m.scope(md.scope),
            SymbolKind::Program(p) => {
                p.scope = m.scope(p.scope);
                p.body.iter_mut().for_each(|s| s.remap(m));
            }
            SymbolKind::GenericProcedure(g) => g.procs.iter_mut().for_each(|p| *p = m.symbol(*p)),
            SymbolKind::ClassProcedure(c) => c.proc = m.symbol(c.proc),
            SymbolKind::DerivedType(d) => {
                d.scope = m.scope(d.scope);
                if let Some(p) = &mut d.parent {
                    *p = m.symbol(*p);
                }
            }
            SymbolKind::ExternalSymbol(e) => e.target = m.symbol(e.target),
            SymbolKind::Block(b) => {
                b.scope = m.scope(b.scope);
                b.body.iter_mut().for_each(|s| s.remap(m));
            }
        }
    }
}
