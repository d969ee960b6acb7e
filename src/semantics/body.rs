//! Body pass: resolves the executable statements of every program,
//! function and subroutine declared by the symbol-table pass.

use log::trace;

use super::cast;
use super::{lower, Context, SymbolTableBuilder};
use crate::asr::{Block, ExprId, ExprKind, Intent, ScopeId, Stmt, Storage, SymbolId, SymbolKind, TType, Variable};
use crate::ast;
use crate::errors::{SemanticError, SemanticErrorKind, SemanticResult, Span};

pub struct BodyResolver<'c, 'a> {
    ctx: &'c mut Context<'a>,
    loop_depth: usize,
    blocks: usize,
    associates: usize,
}

impl<'c, 'a> BodyResolver<'c, 'a> {
    pub fn new(ctx: &'c mut Context<'a>) -> Self {
        BodyResolver {
            ctx,
            loop_depth: 0,
            blocks: 0,
            associates: 0,
        }
    }

    pub fn resolve_unit(&mut self, unit: &ast::ProgramUnit) -> SemanticResult<()> {
        let root = self.ctx.asr.root;
        match unit {
            ast::ProgramUnit::Module(m) => {
                let scope = self.unit_scope(root, &m.name);
                for sp in &m.contains {
                    self.subprogram(sp, scope)?;
                }
            }
            ast::ProgramUnit::Program(p) => {
                let name = lower(&p.name);
                let Some(id) = self.ctx.asr.scope(root).get(&name) else {
                    crate::internal_error!("program '{}' was not declared", name);
                };
                let scope = self.unit_scope(root, &name);
                let body = self.stmts(&p.body, scope)?;
                if let SymbolKind::Program(prog) = &mut self.ctx.asr.symbol_mut(id).kind {
                    prog.body = body;
                }
                for sp in &p.contains {
                    self.subprogram(sp, scope)?;
                }
            }
            ast::ProgramUnit::Subprogram(sp) => self.subprogram(sp, root)?,
        }
        Ok(())
    }

    fn unit_scope(&self, parent: ScopeId, name: &str) -> ScopeId {
        let name = lower(name);
        match self.ctx.asr.scope(parent).get(&name).and_then(|id| self.ctx.asr.symbol_scope(id)) {
            Some(scope) => scope,
            None => crate::internal_error!("'{}' was not declared by the symbol-table pass", name),
        }
    }

    fn subprogram(&mut self, sp: &ast::Subprogram, parent: ScopeId) -> SemanticResult<()> {
        let name = lower(&sp.name);
        let Some(id) = self.ctx.asr.scope(parent).get(&name) else {
            crate::internal_error!("procedure '{}' was not declared", name);
        };
        let scope = self.unit_scope(parent, &name);
        trace!("resolving body of '{}'", name);
        let body = self.stmts(&sp.body, scope)?;
        if let SymbolKind::Function(f) = &mut self.ctx.asr.symbol_mut(id).kind {
            f.body = body;
        }
        for inner in &sp.contains {
            self.subprogram(inner, scope)?;
        }
        Ok(())
    }

    fn stmts(&mut self, stmts: &[ast::Stmt], scope: ScopeId) -> SemanticResult<Vec<Stmt>> {
        let mut out = Vec::with_capacity(stmts.len());
        for s in stmts {
            self.stmt(s, scope, &mut out)?;
        }
        Ok(out)
    }

    fn stmt(&mut self, s: &ast::Stmt, scope: ScopeId, out: &mut Vec<Stmt>) -> SemanticResult<()> {
        match s {
            ast::Stmt::Assign { target, value, span } => out.push(self.assignment(target, value, span, scope)?),
            ast::Stmt::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                let cond = self.condition(cond, scope)?;
                let body = self.stmts(then_body, scope)?;
                let orelse = match else_body {
                    Some(b) => self.stmts(b, scope)?,
                    None => Vec::new(),
                };
                out.push(Stmt::If { cond, body, orelse });
            }
            ast::Stmt::Do {
                var,
                start,
                end,
                step,
                body,
                span,
            } => {
                let var = self.ctx.resolver().resolve_name(var, span.clone(), scope)?;
                let vty = self.ctx.asr.expr_type(var).clone();
                let is_var = matches!(self.ctx.asr.expr(var).kind, ExprKind::Var(_));
                if !is_var || !vty.is_integer() || !vty.is_scalar() {
                    return Err(SemanticError::type_mismatch(
                        "The DO loop variable must be an integer scalar variable",
                        span.clone(),
                    ));
                }
                let start = self.loop_bound(start, &vty, scope)?;
                let end = self.loop_bound(end, &vty, scope)?;
                let step = match step {
                    Some(e) => Some(self.loop_bound(e, &vty, scope)?),
                    None => None,
                };
                let body = self.loop_body(body, scope)?;
                out.push(Stmt::DoLoop {
                    var,
                    start,
                    end,
                    step,
                    body,
                });
            }
            ast::Stmt::DoWhile { cond, body, .. } => {
                let cond = self.condition(cond, scope)?;
                let body = self.loop_body(body, scope)?;
                out.push(Stmt::WhileLoop { cond, body });
            }
            ast::Stmt::Call {
                receiver,
                name,
                args,
                span,
            } => out.push(self.call(receiver, name, args, span, scope)?),
            ast::Stmt::Print { items, .. } => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.ctx.resolver().resolve_expr(item, scope)?);
                }
                out.push(Stmt::Print(values));
            }
            ast::Stmt::Return { .. } => out.push(Stmt::Return),
            ast::Stmt::Exit { span } => {
                self.in_loop("EXIT", span)?;
                out.push(Stmt::Exit);
            }
            ast::Stmt::Cycle { span } => {
                self.in_loop("CYCLE", span)?;
                out.push(Stmt::Cycle);
            }
            ast::Stmt::Stop { code, span } => {
                let code = match code {
                    Some(c) => {
                        let id = self.ctx.resolver().resolve_expr(c, scope)?;
                        let ty = self.ctx.asr.expr_type(id);
                        if !ty.is_scalar() || !(ty.is_integer() || ty.is_character()) {
                            return Err(SemanticError::type_mismatch(
                                "A STOP code must be an integer or character scalar",
                                span.clone(),
                            ));
                        }
                        Some(id)
                    }
                    None => None,
                };
                out.push(Stmt::Stop(code));
            }
            ast::Stmt::Block { decls, body, span } => out.push(self.block(decls, body, span, scope)?),
            ast::Stmt::Associate {
                associations,
                body,
                span,
            } => out.push(self.associate(associations, body, span, scope)?),
        }
        Ok(())
    }

    fn assignment(&mut self, target: &ast::Expr, value: &ast::Expr, span: &Span, scope: ScopeId) -> SemanticResult<Stmt> {
        let target = self.ctx.resolver().resolve_expr(target, scope)?;
        self.check_assignable(target, span)?;
        let value = self.ctx.resolver().resolve_expr(value, scope)?;
        let tty = self.ctx.asr.expr_type(target).clone();
        let from = self.ctx.asr.expr_type(value).clone();
        let (value, narrowing) = cast::cast_for_assignment(&mut self.ctx.asr, value, &tty, span.clone())?;
        if narrowing {
            let message = format!(
                "Assignment converts {} to {} and may lose information",
                crate::asr::type_name(&self.ctx.asr, from.element()),
                crate::asr::type_name(&self.ctx.asr, tty.element())
            );
            self.ctx.lint("implicit_narrowing", message, span.clone());
        }
        Ok(Stmt::Assignment { target, value })
    }

    /// Targets are variables, their elements and their components; never
    /// parameters or `intent(in)` arguments.
    fn check_assignable(&self, target: ExprId, span: &Span) -> SemanticResult<()> {
        let asr = &self.ctx.asr;
        let mut cur = target;
        loop {
            match &asr.expr(cur).kind {
                ExprKind::Var(sym) => {
                    let name = asr.name(*sym);
                    let Some(v) = asr.variable(*sym) else {
                        return Err(SemanticError::type_mismatch(
                            format!("Cannot assign to '{}', which is not a variable", name),
                            span.clone(),
                        ));
                    };
                    if v.storage == Storage::Parameter {
                        return Err(SemanticError::type_mismatch(
                            format!("Cannot assign to parameter '{}'", name),
                            span.clone(),
                        ));
                    }
                    if v.intent == Intent::In {
                        return Err(SemanticError::type_mismatch(
                            format!("Cannot assign to intent(in) argument '{}'", name),
                            span.clone(),
                        ));
                    }
                    return Ok(());
                }
                ExprKind::ArrayItem { array, .. } => cur = *array,
                ExprKind::DerivedRef { base, .. } => cur = *base,
                _ => {
                    return Err(SemanticError::type_mismatch(
                        "The target of an assignment must be a variable",
                        span.clone(),
                    ))
                }
            }
        }
    }

    fn condition(&mut self, cond: &ast::Expr, scope: ScopeId) -> SemanticResult<ExprId> {
        let id = self.ctx.resolver().resolve_expr(cond, scope)?;
        let ty = self.ctx.asr.expr_type(id);
        if !ty.is_logical() || !ty.is_scalar() {
            let name = crate::asr::type_name(&self.ctx.asr, ty);
            return Err(SemanticError::type_mismatch(
                format!("Condition must be a logical scalar, not {}", name),
                cond.span.clone(),
            ));
        }
        Ok(id)
    }

    fn loop_bound(&mut self, e: &ast::Expr, var_ty: &TType, scope: ScopeId) -> SemanticResult<ExprId> {
        let id = self.ctx.resolver().resolve_expr(e, scope)?;
        let ty = self.ctx.asr.expr_type(id);
        if !ty.is_integer() || !ty.is_scalar() {
            return Err(SemanticError::type_mismatch(
                "DO loop bounds must be integer scalars",
                e.span.clone(),
            ));
        }
        cast::insert_cast(&mut self.ctx.asr, id, var_ty, e.span.clone())
    }

    fn loop_body(&mut self, body: &[ast::Stmt], scope: ScopeId) -> SemanticResult<Vec<Stmt>> {
        self.loop_depth += 1;
        let body = self.stmts(body, scope);
        self.loop_depth -= 1;
        body
    }

    fn in_loop(&self, what: &str, span: &Span) -> SemanticResult<()> {
        if self.loop_depth == 0 {
            return Err(SemanticError::new(
                SemanticErrorKind::MisplacedStatement,
                format!("{} used outside of a loop", what),
                span.clone(),
            ));
        }
        Ok(())
    }

    fn call(
        &mut self,
        receiver: &[String],
        name: &str,
        args: &[ast::Arg],
        span: &Span,
        scope: ScopeId,
    ) -> SemanticResult<Stmt> {
        let name = lower(name);
        let mut r = self.ctx.resolver();
        let call = if receiver.is_empty() {
            let Some(sym) = r.ctx.asr.lookup(scope, &name) else {
                return Err(SemanticError::undeclared_symbol(&name, span.clone()));
            };
            let args = r.resolve_args(args, scope)?;
            r.bind_procedure_call(sym, args, span.clone(), scope)?
        } else {
            let base = r.resolve_designator(receiver, span.clone(), scope)?;
            let args = r.resolve_args(args, scope)?;
            r.bind_type_bound_call(base, &name, args, span.clone(), scope)?
        };
        if self.ctx.asr.return_type(call.func).is_some() {
            return Err(SemanticError::new(
                SemanticErrorKind::NotCallable,
                format!("Function '{}' cannot be called as a subroutine", self.ctx.asr.name(call.func)),
                span.clone(),
            ));
        }
        Ok(Stmt::SubroutineCall {
            name: call.name,
            original: call.original,
            args: call.args,
            dt: call.dt,
        })
    }

    fn new_block(&mut self, base: String, scope: ScopeId, span: &Span) -> SemanticResult<(SymbolId, ScopeId)> {
        let asr = &mut self.ctx.asr;
        let name = asr.unique_name(scope, &base);
        let inner = asr.new_scope(Some(scope));
        let id = asr.add_symbol(
            name.as_str(),
            scope,
            SymbolKind::Block(Block {
                scope: inner,
                body: Vec::new(),
            }),
        );
        asr.scope_mut(inner).owner = Some(id);
        asr.declare(scope, &name, id, span.clone())?;
        trace!("opening block '{}'", name);
        Ok((id, inner))
    }

    fn set_block_body(&mut self, id: SymbolId, body: Vec<Stmt>) {
        if let SymbolKind::Block(b) = &mut self.ctx.asr.symbol_mut(id).kind {
            b.body = body;
        }
    }

    fn block(&mut self, decls: &[ast::Decl], body: &[ast::Stmt], span: &Span, scope: ScopeId) -> SemanticResult<Stmt> {
        self.blocks += 1;
        let (id, inner) = self.new_block(format!("block_{}", self.blocks), scope, span)?;
        SymbolTableBuilder::new(self.ctx).declarations(decls, inner)?;
        let body = self.stmts(body, inner)?;
        self.set_block_body(id, body);
        Ok(Stmt::BlockCall(id))
    }

    /// Each associate name becomes an alias of its selector when the
    /// selector is a variable designator, and a local initialised from it
    /// otherwise.
    fn associate(
        &mut self,
        associations: &[ast::Association],
        body: &[ast::Stmt],
        span: &Span,
        scope: ScopeId,
    ) -> SemanticResult<Stmt> {
        let mut selectors = Vec::with_capacity(associations.len());
        for a in associations {
            selectors.push(self.ctx.resolver().resolve_expr(&a.expr, scope)?);
        }
        self.associates += 1;
        let (id, inner) = self.new_block(format!("associate_block_{}", self.associates), scope, span)?;
        let mut stmts = Vec::new();
        for (a, selector) in associations.iter().zip(selectors) {
            let name = lower(&a.name);
            let asr = &mut self.ctx.asr;
            let ty = asr.expr_type(selector).clone();
            let designator = matches!(
                asr.expr(selector).kind,
                ExprKind::Var(_) | ExprKind::ArrayItem { .. } | ExprKind::DerivedRef { .. }
            );
            let mut var = Variable::local(ty.clone());
            if designator {
                var.ty = None;
                var.symbolic_value = Some(selector);
            }
            let sym = asr.add_symbol(name.as_str(), inner, SymbolKind::Variable(var));
            asr.declare(inner, &name, sym, a.expr.span.clone())?;
            self.ctx.decl_spans.insert(sym, a.expr.span.clone());
            if designator {
                self.freeze_subscripts(selector, &name, inner, &mut stmts);
            } else {
                let target = self
                    .ctx
                    .asr
                    .add_expr(ExprKind::Var(sym), ty, None, a.expr.span.clone());
                stmts.push(Stmt::Assignment {
                    target,
                    value: selector,
                });
            }
        }
        stmts.extend(self.stmts(body, inner)?);
        self.set_block_body(id, stmts);
        Ok(Stmt::BlockCall(id))
    }

    /// Evaluates the non-constant subscripts of an associated designator
    /// once, into locals of `inner` assigned on entry.
    fn freeze_subscripts(&mut self, designator: ExprId, alias: &str, inner: ScopeId, stmts: &mut Vec<Stmt>) {
        match self.ctx.asr.expr(designator).kind.clone() {
            ExprKind::ArrayItem { array, indices } => {
                self.freeze_subscripts(array, alias, inner, stmts);
                let mut frozen = Vec::with_capacity(indices.len());
                for index in indices {
                    let asr = &mut self.ctx.asr;
                    if asr.const_value(index).is_some() {
                        frozen.push(index);
                        continue;
                    }
                    let ty = asr.expr_type(index).clone();
                    let span = asr.expr(index).span.clone();
                    let name = asr.unique_name(inner, &format!("__{}_index", alias));
                    let temp = asr.add_symbol(name.as_str(), inner, SymbolKind::Variable(Variable::local(ty.clone())));
                    asr.overwrite(inner, &name, temp);
                    let target = asr.add_expr(ExprKind::Var(temp), ty.clone(), None, span.clone());
                    stmts.push(Stmt::Assignment { target, value: index });
                    frozen.push(asr.add_expr(ExprKind::Var(temp), ty, None, span));
                }
                if let ExprKind::ArrayItem { indices, .. } = &mut self.ctx.asr.expr_mut(designator).kind {
                    *indices = frozen;
                }
            }
            ExprKind::DerivedRef { base, .. } => self.freeze_subscripts(base, alias, inner, stmts),
            _ => {}
        }
    }
}
