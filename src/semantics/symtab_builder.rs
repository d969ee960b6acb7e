//! Symbol-table pass.
//!
//! Declares every program unit, procedure, dummy argument, variable, derived
//! type and interface of a translation unit. Executable statements are left
//! to the body pass. Type-bound procedures, generic interfaces and access
//! statements refer to procedures that may be declared later in the same
//! unit, so they are collected while walking and attached when the unit is
//! finished.

use log::{debug, trace};

use super::overload::operator_generic_name;
use super::{lower, Context, ImplicitTyping};
use crate::asr::{
    Access, BinOpKind, ClassProcedure, Constant, DefType, DerivedType, Dimension, Dispatch, ExprId, ExternalSymbol,
    Function, GenericProcedure, Intent, Module, Presence, Program, ScopeId, Storage, SymbolId, SymbolKind, TType,
    Variable,
};
use crate::ast;
use crate::errors::{SemanticError, SemanticErrorKind, SemanticResult, Span};
use crate::semantics::cast;

pub struct SymbolTableBuilder<'c, 'a> {
    ctx: &'c mut Context<'a>,
    bindings: Vec<PendingBinding>,
    generics: Vec<PendingGeneric>,
}

/// `procedure :: name => implementation` inside a derived type declared in
/// `scope`.
struct PendingBinding {
    scope: ScopeId,
    dt: SymbolId,
    name: String,
    implementation: String,
    nopass: bool,
    span: Span,
}

/// A generic interface or a type-bound generic declared in `scope`.
struct PendingGeneric {
    scope: ScopeId,
    name: String,
    procs: Vec<String>,
    type_bound: Option<SymbolId>,
    span: Span,
}

/// Access statements of one scope, applied once everything is declared.
#[derive(Default)]
struct DeclState {
    default_access: Option<Access>,
    explicit_access: Vec<(String, Access, Span)>,
}

fn invalid(message: impl Into<String>, span: Span) -> SemanticError {
    SemanticError::new(SemanticErrorKind::InvalidDeclaration, message, span)
}

/// `operator(+)` in access statements, `only` lists and type-bound generics
/// names the operator's generic procedure.
fn generic_spelling(name: &str) -> String {
    let name = lower(name);
    match name.strip_prefix("operator(").and_then(|r| r.strip_suffix(')')) {
        Some(op) => operator_generic_name(op),
        None => name,
    }
}

impl<'c, 'a> SymbolTableBuilder<'c, 'a> {
    pub fn new(ctx: &'c mut Context<'a>) -> Self {
        SymbolTableBuilder {
            ctx,
            bindings: Vec::new(),
            generics: Vec::new(),
        }
    }

    pub fn build(&mut self, unit: &ast::TranslationUnit) -> SemanticResult<()> {
        let root = self.ctx.asr.root;
        for item in &unit.items {
            match item {
                ast::ProgramUnit::Module(m) => {
                    self.module(m)?;
                }
                ast::ProgramUnit::Program(p) => {
                    self.program(p)?;
                }
                ast::ProgramUnit::Subprogram(sp) => {
                    self.subprogram(sp, root, DefType::Implementation)?;
                }
            }
        }
        Ok(())
    }

    pub fn module(&mut self, m: &ast::Module) -> SemanticResult<SymbolId> {
        let name = lower(&m.name);
        let root = self.ctx.asr.root;
        let scope = self.ctx.asr.new_scope(Some(root));
        let id = self.ctx.asr.add_symbol(
            name.as_str(),
            root,
            SymbolKind::Module(Module {
                scope,
                dependencies: Vec::new(),
                intrinsic: false,
                loaded_from_mod: false,
            }),
        );
        self.ctx.asr.scope_mut(scope).owner = Some(id);
        self.ctx.asr.declare(root, &name, id, m.span.clone())?;
        debug!("declaring module '{}'", name);

        for u in &m.uses {
            self.use_stmt(u, scope)?;
        }
        self.implicit(scope, &m.implicit, true)?;
        let state = self.declare_all(&m.decls, scope)?;
        for sp in &m.contains {
            self.subprogram(sp, scope, DefType::Implementation)?;
        }
        self.finish_scope(scope, state)?;
        Ok(id)
    }

    pub fn program(&mut self, p: &ast::Program) -> SemanticResult<SymbolId> {
        let name = lower(&p.name);
        let root = self.ctx.asr.root;
        let scope = self.ctx.asr.new_scope(Some(root));
        let id = self.ctx.asr.add_symbol(
            name.as_str(),
            root,
            SymbolKind::Program(Program {
                scope,
                dependencies: Vec::new(),
                body: Vec::new(),
            }),
        );
        self.ctx.asr.scope_mut(scope).owner = Some(id);
        self.ctx.asr.declare(root, &name, id, p.span.clone())?;
        debug!("declaring program '{}'", name);

        for u in &p.uses {
            self.use_stmt(u, scope)?;
        }
        self.implicit(scope, &p.implicit, true)?;
        let state = self.declare_all(&p.decls, scope)?;
        for sp in &p.contains {
            self.subprogram(sp, scope, DefType::Implementation)?;
        }
        self.finish_scope(scope, state)?;
        Ok(id)
    }

    /// A function or subroutine, its dummy arguments, its result and
    /// everything it contains.
    pub fn subprogram(&mut self, sp: &ast::Subprogram, parent: ScopeId, deftype: DefType) -> SemanticResult<SymbolId> {
        let name = lower(&sp.name);
        let scope = self.ctx.asr.new_scope(Some(parent));
        let id = self.ctx.asr.add_symbol(
            name.as_str(),
            parent,
            SymbolKind::Function(Function {
                scope,
                args: Vec::new(),
                return_var: None,
                body: Vec::new(),
                abi: crate::asr::Abi::Source,
                deftype,
                access: Access::Public,
                dependencies: Vec::new(),
            }),
        );
        self.ctx.asr.scope_mut(scope).owner = Some(id);
        let existing = self.ctx.asr.scope(parent).get(&name);
        match existing {
            Some(stub) if self.ctx.asr.is_interactive_stub(stub) => {
                debug!("'{}' replaces an interactive declaration", name);
                self.ctx.asr.overwrite(parent, &name, id);
            }
            _ => self.ctx.asr.declare(parent, &name, id, sp.span.clone())?,
        }
        debug!(
            "declaring {} '{}'",
            match sp.kind {
                ast::SubprogramKind::Function => "function",
                ast::SubprogramKind::Subroutine => "subroutine",
            },
            name
        );

        for u in &sp.uses {
            self.use_stmt(u, scope)?;
        }
        let root = self.ctx.asr.root;
        self.implicit(scope, &sp.implicit, parent == root)?;
        let state = self.declare_all(&sp.decls, scope)?;
        let args = self.dummy_arguments(sp, scope)?;
        let return_var = self.return_variable(sp, &name, scope)?;
        if let SymbolKind::Function(f) = &mut self.ctx.asr.symbol_mut(id).kind {
            f.args = args;
            f.return_var = return_var;
        }
        for inner in &sp.contains {
            self.subprogram(inner, scope, DefType::Implementation)?;
        }
        self.finish_scope(scope, state)?;
        Ok(id)
    }

    fn dummy_arguments(&mut self, sp: &ast::Subprogram, scope: ScopeId) -> SemanticResult<Vec<SymbolId>> {
        let mut args = Vec::with_capacity(sp.args.len());
        for arg in &sp.args {
            let arg = lower(arg);
            let id = match self.ctx.asr.scope(scope).get(&arg) {
                Some(id) => id,
                None => {
                    let Some(ty) = self.ctx.implicit_type(scope, &arg) else {
                        return Err(SemanticError::new(
                            SemanticErrorKind::UndeclaredVariable,
                            format!("Dummy argument '{}' of '{}' is not declared", arg, lower(&sp.name)),
                            sp.span.clone(),
                        ));
                    };
                    self.declare_variable(scope, &arg, Variable::local(ty), sp.span.clone())?
                }
            };
            let SymbolKind::Variable(v) = &mut self.ctx.asr.symbol_mut(id).kind else {
                return Err(invalid(format!("Dummy argument '{}' is not a variable", arg), sp.span.clone()));
            };
            if v.intent == Intent::Local {
                v.intent = Intent::Unspecified;
            }
            args.push(id);
        }
        Ok(args)
    }

    fn return_variable(&mut self, sp: &ast::Subprogram, name: &str, scope: ScopeId) -> SemanticResult<Option<SymbolId>> {
        if sp.kind == ast::SubprogramKind::Subroutine {
            return Ok(None);
        }
        let rname = sp.result.as_deref().map(lower).unwrap_or_else(|| name.to_string());
        let existing = self.ctx.asr.scope(scope).get(&rname);
        let id = match (&sp.prefix_type, existing) {
            (Some(_), Some(_)) => {
                return Err(invalid(
                    format!("Cannot specify the return type twice in function '{}'", name),
                    sp.span.clone(),
                ))
            }
            (Some(ts), None) => {
                let ty = self.ctx.resolver().resolve_type_spec(ts, sp.span.clone(), scope)?;
                self.declare_variable(scope, &rname, Variable::local(ty), sp.span.clone())?
            }
            (None, Some(id)) => id,
            (None, None) => match self.ctx.implicit_type(scope, &rname) {
                Some(ty) => self.declare_variable(scope, &rname, Variable::local(ty), sp.span.clone())?,
                None => {
                    return Err(SemanticError::new(
                        SemanticErrorKind::MissingReturnType,
                        format!("Return type not specified for function '{}'", name),
                        sp.span.clone(),
                    ))
                }
            },
        };
        match &mut self.ctx.asr.symbol_mut(id).kind {
            SymbolKind::Variable(v) if v.intent == Intent::Local => v.intent = Intent::ReturnVar,
            _ => {
                return Err(invalid(
                    format!("Result '{}' of function '{}' is not a local variable", rname, name),
                    sp.span.clone(),
                ))
            }
        }
        Ok(Some(id))
    }

    /// Installs the implicit typing rules of a scope. Top-level units without
    /// rules get the default rules only when the settings ask for them;
    /// nested scopes without rules inherit from their host.
    fn implicit(&mut self, scope: ScopeId, stmts: &[ast::ImplicitStmt], top_level: bool) -> SemanticResult<()> {
        if stmts.is_empty() {
            if top_level {
                let mut rules = ImplicitTyping::new();
                if !self.ctx.settings.default_implicit_typing {
                    rules.apply_implicit_none();
                }
                self.ctx.implicit.insert(scope, rules);
            }
            return Ok(());
        }
        let mut rules = ImplicitTyping::new();
        for stmt in stmts {
            match stmt {
                ast::ImplicitStmt::None => rules.apply_implicit_none(),
                ast::ImplicitStmt::Rule {
                    type_spec,
                    ranges,
                    span,
                } => {
                    let ty = self.ctx.resolver().resolve_type_spec(type_spec, span.clone(), scope)?;
                    rules.add_rule(ty, ranges.clone(), span.clone());
                }
            }
        }
        self.ctx.implicit.insert(scope, rules);
        Ok(())
    }

    /// `use m` and `use m, only: a, b => c`.
    pub fn use_stmt(&mut self, u: &ast::Use, scope: ScopeId) -> SemanticResult<()> {
        let mname = lower(&u.module);
        let module = self.ctx.load_module(&mname, u.span.clone())?;
        self.ctx.asr.add_dependency(scope, &mname);
        let Some(mscope) = self.ctx.asr.symbol_scope(module) else {
            crate::internal_error!("module '{}' has no scope", mname);
        };
        let mut entries: Vec<(String, String, SymbolId)> = Vec::new();
        match &u.only {
            None => {
                for (name, id) in self.ctx.asr.scope(mscope).iter() {
                    if self.ctx.asr.access(id) == Access::Public {
                        entries.push((name.to_string(), name.to_string(), id));
                    }
                }
            }
            Some(list) => {
                for item in list {
                    let remote = generic_spelling(&item.remote);
                    let Some(id) = self.ctx.asr.scope(mscope).get(&remote) else {
                        return Err(SemanticError::new(
                            SemanticErrorKind::UndeclaredSymbol,
                            format!("Symbol '{}' not found in module '{}'", remote, mname),
                            u.span.clone(),
                        ));
                    };
                    if self.ctx.asr.access(id) == Access::Private {
                        return Err(SemanticError::new(
                            SemanticErrorKind::UndeclaredSymbol,
                            format!("Symbol '{}' is private in module '{}'", remote, mname),
                            u.span.clone(),
                        ));
                    }
                    let local = item.local.as_deref().map(generic_spelling).unwrap_or_else(|| remote.clone());
                    entries.push((local, remote, id));
                }
            }
        }
        let listed = u.only.is_some();
        for (local, remote, id) in entries {
            self.import(scope, &local, &mname, &remote, id, listed, u.span.clone())?;
        }
        Ok(())
    }

    /// Declares `local` in `scope` as an external symbol for `id`. Re-exported
    /// external symbols are followed to the symbol they name. A name named in
    /// an `only` list must not be visible in `scope` yet; a whole-module
    /// import skips entities it already sees under the same name.
    fn import(
        &mut self,
        scope: ScopeId,
        local: &str,
        module: &str,
        remote: &str,
        id: SymbolId,
        listed: bool,
        span: Span,
    ) -> SemanticResult<()> {
        let asr = &self.ctx.asr;
        let (target, module_name, original_name) = match &asr.symbol(id).kind {
            SymbolKind::ExternalSymbol(e) => (e.target, e.module_name.clone(), e.original_name.clone()),
            _ => (id, module.to_string(), remote.to_string()),
        };
        if let Some(existing) = asr.scope(scope).get(local) {
            if asr.past_external(existing) == target {
                return if listed {
                    Err(SemanticError::duplicate(local, span))
                } else {
                    Ok(())
                };
            }
            if let SymbolKind::GenericProcedure(g) = &asr.symbol(target).kind {
                let procs = g.procs.clone();
                return self.extend_generic(scope, local, existing, procs, span);
            }
            return Err(SemanticError::duplicate(local, span));
        }
        trace!("importing '{}' from '{}' as '{}'", original_name, module_name, local);
        let ext = self.ctx.asr.add_symbol(
            local,
            scope,
            SymbolKind::ExternalSymbol(ExternalSymbol {
                target,
                module_name,
                original_name,
                access: Access::Public,
            }),
        );
        self.ctx.asr.declare(scope, local, ext, span)
    }

    /// Adds candidates to the generic `name` already visible in `scope` as
    /// `existing`. An imported generic is replaced by a local one carrying
    /// the imported candidates first.
    fn extend_generic(
        &mut self,
        scope: ScopeId,
        name: &str,
        existing: SymbolId,
        procs: Vec<SymbolId>,
        span: Span,
    ) -> SemanticResult<()> {
        let asr = &mut self.ctx.asr;
        if asr.symbol(existing).owner == scope {
            if let SymbolKind::GenericProcedure(g) = &mut asr.symbol_mut(existing).kind {
                for p in procs {
                    if !g.procs.contains(&p) {
                        g.procs.push(p);
                    }
                }
                return Ok(());
            }
        }
        let SymbolKind::ExternalSymbol(e) = &asr.symbol(existing).kind else {
            return Err(SemanticError::duplicate(name, span));
        };
        let access = e.access;
        let SymbolKind::GenericProcedure(imported) = &asr.symbol(e.target).kind else {
            return Err(SemanticError::duplicate(name, span));
        };
        let mut all = imported.procs.clone();
        for p in procs {
            if !all.contains(&p) {
                all.push(p);
            }
        }
        debug!("extending imported generic '{}' in a local scope", name);
        let id = asr.add_symbol(
            name,
            scope,
            SymbolKind::GenericProcedure(GenericProcedure { procs: all, access }),
        );
        asr.overwrite(scope, name, id);
        Ok(())
    }

    /// Declares everything in a specification part and applies attribute
    /// statements. Access statements are returned for [`Self::finish_scope`].
    fn declare_all(&mut self, decls: &[ast::Decl], scope: ScopeId) -> SemanticResult<DeclState> {
        let mut state = DeclState::default();
        let mut attribute_stmts = Vec::new();
        for decl in decls {
            match decl {
                ast::Decl::Var(vd) => {
                    self.var_decl(vd, scope, &mut state, false)?;
                }
                ast::Decl::Attribute { attr, names, span } => match attr {
                    ast::Attribute::Public | ast::Attribute::Private => {
                        let access = if matches!(attr, ast::Attribute::Public) {
                            Access::Public
                        } else {
                            Access::Private
                        };
                        if names.is_empty() {
                            state.default_access = Some(access);
                        } else {
                            for n in names {
                                state.explicit_access.push((generic_spelling(n), access, span.clone()));
                            }
                        }
                    }
                    _ => attribute_stmts.push((attr, names, span)),
                },
                ast::Decl::DerivedType(dt) => self.derived_type(dt, scope, &mut state)?,
                ast::Decl::Interface(i) => self.interface(i, scope)?,
            }
        }
        for (attr, names, span) in attribute_stmts {
            for n in names {
                self.attribute_stmt(scope, attr, &lower(n), span.clone())?;
            }
        }
        Ok(state)
    }

    /// Declarations of a `block` construct, which has no contained
    /// procedures and so can be finished right away.
    pub fn declarations(&mut self, decls: &[ast::Decl], scope: ScopeId) -> SemanticResult<()> {
        let state = self.declare_all(decls, scope)?;
        self.finish_scope(scope, state)
    }

    fn declare_variable(&mut self, scope: ScopeId, name: &str, var: Variable, span: Span) -> SemanticResult<SymbolId> {
        let id = self.ctx.asr.add_symbol(name, scope, SymbolKind::Variable(var));
        self.ctx.asr.declare(scope, name, id, span.clone())?;
        self.ctx.decl_spans.insert(id, span);
        Ok(id)
    }

    /// `type, attr, ... :: a, b(3) = ...`. Returns the declared names.
    fn var_decl(
        &mut self,
        vd: &ast::VarDecl,
        scope: ScopeId,
        state: &mut DeclState,
        component: bool,
    ) -> SemanticResult<Vec<String>> {
        let base = self.ctx.resolver().resolve_type_spec(&vd.type_spec, vd.span.clone(), scope)?;
        let mut parameter = false;
        let mut allocatable = false;
        let mut pointer = false;
        let mut target = false;
        let mut optional = false;
        let mut save = false;
        let mut access = None;
        let mut intent = None;
        let mut shared_dims: Option<&[ast::DimSpec]> = None;
        for attr in &vd.attributes {
            match attr {
                ast::Attribute::Parameter => parameter = true,
                ast::Attribute::Allocatable => allocatable = true,
                ast::Attribute::Pointer => pointer = true,
                ast::Attribute::Target => target = true,
                ast::Attribute::Optional => optional = true,
                ast::Attribute::Save => save = true,
                ast::Attribute::Public => access = Some(Access::Public),
                ast::Attribute::Private => access = Some(Access::Private),
                ast::Attribute::Intent(i) => intent = Some(*i),
                ast::Attribute::Dimension(d) => shared_dims = Some(d.as_slice()),
            }
        }
        if allocatable && pointer {
            return Err(invalid("A variable cannot be both allocatable and a pointer", vd.span.clone()));
        }

        let mut names = Vec::with_capacity(vd.entities.len());
        for e in &vd.entities {
            let name = lower(&e.name);
            let specs = match (shared_dims, e.dims.is_empty()) {
                (Some(_), false) => {
                    return Err(invalid(format!("Dimensions of '{}' are given twice", name), e.span.clone()))
                }
                (Some(d), true) => d,
                (None, _) => e.dims.as_slice(),
            };
            let dims = self.dimensions(specs, scope)?;
            let mut ty = TType::array(base.clone(), dims);
            if allocatable {
                ty = TType::Allocatable(Box::new(ty));
            } else if pointer {
                ty = TType::Pointer(Box::new(ty));
            }

            let mut var = Variable::local(ty.clone());
            var.target = target;
            if optional {
                var.presence = Presence::Optional;
            }
            if save && !parameter {
                var.storage = Storage::Save;
            }
            if let Some(i) = intent {
                var.intent = match i {
                    ast::Intent::In => Intent::In,
                    ast::Intent::Out => Intent::Out,
                    ast::Intent::InOut => Intent::InOut,
                };
            }
            if let Some(a) = access {
                var.access = a;
                state.explicit_access.push((name.clone(), a, e.span.clone()));
            }

            match &e.init {
                Some(init) => {
                    let value = self.ctx.resolver().resolve_expr(init, scope)?;
                    if parameter {
                        // `character(len=*), parameter` takes its length from the value.
                        let fixed = match (&ty, self.ctx.asr.expr_type(value)) {
                            (
                                TType::Character {
                                    kind,
                                    len: None,
                                    len_expr: None,
                                },
                                TType::Character { len: Some(n), .. },
                            ) => Some(TType::Character {
                                kind: *kind,
                                len: Some(*n),
                                len_expr: None,
                            }),
                            _ => None,
                        };
                        if let Some(fixed) = fixed {
                            ty = fixed;
                            var.ty = Some(ty.clone());
                        }
                    }
                    let (value, _) = cast::cast_for_assignment(&mut self.ctx.asr, value, &ty, init.span.clone())?;
                    if parameter {
                        let Some(c) = self.ctx.asr.const_value(value).cloned() else {
                            return Err(invalid(
                                format!("Initializer of parameter '{}' must be a constant expression", name),
                                init.span.clone(),
                            ));
                        };
                        let folded = self.ctx.asr.constant(c, ty.clone(), init.span.clone());
                        var.storage = Storage::Parameter;
                        var.value = Some(folded);
                    } else {
                        if !self.ctx.asr.is_constant(value) {
                            return Err(invalid(
                                format!("Initializer of '{}' must be a constant expression", name),
                                init.span.clone(),
                            ));
                        }
                        if !component {
                            var.storage = Storage::Save;
                        }
                    }
                    var.init = Some(value);
                }
                None if parameter => {
                    return Err(invalid(
                        format!("Parameter '{}' requires an initializer", name),
                        e.span.clone(),
                    ))
                }
                None => {}
            }
            self.declare_variable(scope, &name, var, e.span.clone())?;
            names.push(name);
        }
        Ok(names)
    }

    fn bound(&mut self, e: &ast::Expr, scope: ScopeId) -> SemanticResult<ExprId> {
        let id = self.ctx.resolver().resolve_expr(e, scope)?;
        let ty = self.ctx.asr.expr_type(id);
        if !ty.is_integer() || !ty.is_scalar() {
            return Err(SemanticError::type_mismatch("Array bounds must be integer scalars", e.span.clone()));
        }
        Ok(id)
    }

    /// `(lo:hi, n, :)` to start/length pairs. A missing lower bound is 1
    /// when an upper bound is given; `:` leaves both unknown.
    fn dimensions(&mut self, specs: &[ast::DimSpec], scope: ScopeId) -> SemanticResult<Vec<Dimension>> {
        let mut dims = Vec::with_capacity(specs.len());
        for spec in specs {
            let span = spec
                .end
                .as_ref()
                .or(spec.start.as_ref())
                .map(|e| e.span.clone())
                .unwrap_or_default();
            let start = match (&spec.start, &spec.end) {
                (Some(s), _) => Some(self.bound(s, scope)?),
                (None, Some(_)) => Some(self.ctx.asr.constant(Constant::Integer(1), TType::Integer(4), span.clone())),
                (None, None) => None,
            };
            let length = match (&spec.end, start) {
                (Some(end), Some(start)) => {
                    let end = self.bound(end, scope)?;
                    if self.ctx.asr.const_int(start) == Some(1) {
                        Some(end)
                    } else {
                        let start = self.ctx.asr.deep_copy_expr(start);
                        let mut r = self.ctx.resolver();
                        let extent = r.resolve_binop(BinOpKind::Sub, end, start, span.clone(), scope)?;
                        let one = r.ctx.asr.constant(Constant::Integer(1), TType::Integer(4), span.clone());
                        Some(r.resolve_binop(BinOpKind::Add, extent, one, span.clone(), scope)?)
                    }
                }
                _ => None,
            };
            dims.push(Dimension { start, length });
        }
        Ok(dims)
    }

    /// `optional :: x`, `intent(in) :: x`, `dimension(n) :: x` and friends.
    /// Names not declared yet are declared through implicit typing.
    fn attribute_stmt(&mut self, scope: ScopeId, attr: &ast::Attribute, name: &str, span: Span) -> SemanticResult<()> {
        let id = match self.ctx.asr.scope(scope).get(name) {
            Some(id) => id,
            None => {
                let Some(ty) = self.ctx.implicit_type(scope, name) else {
                    return Err(SemanticError::undeclared_variable(name, span));
                };
                self.declare_variable(scope, name, Variable::local(ty), span.clone())?
            }
        };
        let dims = match attr {
            ast::Attribute::Dimension(specs) => Some(self.dimensions(specs, scope)?),
            _ => None,
        };
        let SymbolKind::Variable(v) = &mut self.ctx.asr.symbol_mut(id).kind else {
            return Err(invalid(format!("'{}' is not a variable", name), span));
        };
        match attr {
            ast::Attribute::Optional => v.presence = Presence::Optional,
            ast::Attribute::Target => v.target = true,
            ast::Attribute::Save => v.storage = Storage::Save,
            ast::Attribute::Intent(i) => {
                v.intent = match i {
                    ast::Intent::In => Intent::In,
                    ast::Intent::Out => Intent::Out,
                    ast::Intent::InOut => Intent::InOut,
                }
            }
            ast::Attribute::Allocatable | ast::Attribute::Pointer => {
                let Some(ty) = v.ty.take() else {
                    crate::internal_error!("declared variable '{}' has no type", name);
                };
                v.ty = Some(if matches!(attr, ast::Attribute::Allocatable) {
                    TType::Allocatable(Box::new(ty))
                } else {
                    TType::Pointer(Box::new(ty))
                });
            }
            ast::Attribute::Dimension(_) => {
                let Some(ty) = v.ty.take() else {
                    crate::internal_error!("declared variable '{}' has no type", name);
                };
                if ty.is_array() {
                    v.ty = Some(ty);
                    return Err(invalid(format!("Dimensions of '{}' are given twice", name), span));
                }
                v.ty = Some(TType::array(ty, dims.unwrap_or_default()));
            }
            ast::Attribute::Parameter => {
                return Err(SemanticError::unsupported(
                    "PARAMETER statements are not supported; use the parameter attribute",
                    span,
                ))
            }
            ast::Attribute::Public | ast::Attribute::Private => {}
        }
        Ok(())
    }

    fn derived_type(&mut self, dt: &ast::DerivedTypeDecl, scope: ScopeId, state: &mut DeclState) -> SemanticResult<()> {
        let name = lower(&dt.name);
        let parent = match &dt.extends {
            Some(p) => {
                let p = lower(p);
                let found = self
                    .ctx
                    .asr
                    .lookup(scope, &p)
                    .map(|id| self.ctx.asr.past_external(id))
                    .filter(|id| matches!(self.ctx.asr.symbol(*id).kind, SymbolKind::DerivedType(_)));
                match found {
                    Some(id) => Some(id),
                    None => {
                        return Err(SemanticError::new(
                            SemanticErrorKind::UndeclaredSymbol,
                            format!("Derived type '{}' extended by '{}' is not declared", p, name),
                            dt.span.clone(),
                        ))
                    }
                }
            }
            None => None,
        };
        let tscope = self.ctx.asr.new_scope(Some(scope));
        let id = self.ctx.asr.add_symbol(
            name.as_str(),
            scope,
            SymbolKind::DerivedType(DerivedType {
                scope: tscope,
                members: Vec::new(),
                parent,
                access: Access::Public,
            }),
        );
        self.ctx.asr.scope_mut(tscope).owner = Some(id);
        self.ctx.asr.declare(scope, &name, id, dt.span.clone())?;
        debug!("declaring derived type '{}'", name);
        match dt.access {
            Some(ast::Attribute::Private) => state.explicit_access.push((name.clone(), Access::Private, dt.span.clone())),
            Some(ast::Attribute::Public) => state.explicit_access.push((name.clone(), Access::Public, dt.span.clone())),
            _ => {}
        }

        let mut members = Vec::new();
        let mut component_state = DeclState::default();
        for vd in &dt.components {
            members.extend(self.var_decl(vd, tscope, &mut component_state, true)?);
        }
        if let SymbolKind::DerivedType(d) = &mut self.ctx.asr.symbol_mut(id).kind {
            d.members = members;
        }

        for p in &dt.procedures {
            let binding = lower(&p.name);
            self.bindings.push(PendingBinding {
                scope,
                dt: id,
                implementation: p.implementation.as_deref().map(lower).unwrap_or_else(|| binding.clone()),
                name: binding,
                nopass: p.nopass,
                span: p.span.clone(),
            });
        }
        for g in &dt.generics {
            self.generics.push(PendingGeneric {
                scope,
                name: generic_spelling(&g.name),
                procs: g.procedures.iter().map(|p| lower(p)).collect(),
                type_bound: Some(id),
                span: g.span.clone(),
            });
        }
        Ok(())
    }

    pub fn interface(&mut self, i: &ast::InterfaceDecl, scope: ScopeId) -> SemanticResult<()> {
        let generic = match &i.header {
            ast::InterfaceHeader::Plain => None,
            ast::InterfaceHeader::Generic(name) => Some(lower(name)),
            ast::InterfaceHeader::Operator(op) => Some(operator_generic_name(op)),
        };
        let mut procs = Vec::new();
        for item in &i.items {
            match item {
                ast::InterfaceItem::Body(sp) => {
                    self.subprogram(sp, scope, DefType::Interface)?;
                    procs.push(lower(&sp.name));
                }
                ast::InterfaceItem::ModuleProcedure(names) => {
                    if generic.is_none() {
                        return Err(invalid(
                            "MODULE PROCEDURE is only allowed in a generic interface",
                            i.span.clone(),
                        ));
                    }
                    procs.extend(names.iter().map(|n| lower(n)));
                }
            }
        }
        if let Some(name) = generic {
            self.generics.push(PendingGeneric {
                scope,
                name,
                procs,
                type_bound: None,
                span: i.span.clone(),
            });
        }
        Ok(())
    }

    /// Attaches what was deferred while declaring `scope`: type-bound
    /// procedures, then generics, then access statements.
    fn finish_scope(&mut self, scope: ScopeId, state: DeclState) -> SemanticResult<()> {
        let (bindings, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.bindings)
            .into_iter()
            .partition(|b| b.scope == scope);
        self.bindings = rest;
        self.add_class_procedures(bindings)?;

        let (generics, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.generics)
            .into_iter()
            .partition(|g| g.scope == scope);
        self.generics = rest;
        self.add_generic_procedures(generics)?;

        self.apply_access(scope, state)
    }

    fn add_class_procedures(&mut self, bindings: Vec<PendingBinding>) -> SemanticResult<()> {
        for b in bindings {
            let asr = &self.ctx.asr;
            let tname = asr.name(b.dt).to_string();
            let Some(proc) = asr.lookup(b.scope, &b.implementation) else {
                return Err(SemanticError::new(
                    SemanticErrorKind::UndeclaredSymbol,
                    format!(
                        "Procedure '{}' bound to type '{}' is not declared",
                        b.implementation, tname
                    ),
                    b.span,
                ));
            };
            if asr.function(proc).is_none() {
                return Err(SemanticError::new(
                    SemanticErrorKind::NotCallable,
                    format!("'{}' bound to type '{}' is not a procedure", b.implementation, tname),
                    b.span,
                ));
            }
            let Some(tscope) = asr.symbol_scope(b.dt) else {
                crate::internal_error!("derived type '{}' has no scope", tname);
            };
            trace!("binding '{}%{}' to '{}'", tname, b.name, b.implementation);
            let id = self.ctx.asr.add_symbol(
                b.name.as_str(),
                tscope,
                SymbolKind::ClassProcedure(ClassProcedure {
                    proc,
                    proc_name: b.implementation,
                    dispatch: if b.nopass { Dispatch::NoPass } else { Dispatch::Pass },
                }),
            );
            self.ctx.asr.declare(tscope, &b.name, id, b.span)?;
        }
        Ok(())
    }

    fn add_generic_procedures(&mut self, generics: Vec<PendingGeneric>) -> SemanticResult<()> {
        for g in generics {
            let mut procs = Vec::with_capacity(g.procs.len());
            for p in &g.procs {
                let asr = &self.ctx.asr;
                let found = match g.type_bound {
                    Some(dt) => asr
                        .find_member(dt, p)
                        .filter(|id| matches!(asr.symbol(*id).kind, SymbolKind::ClassProcedure(_))),
                    None => asr.lookup(g.scope, p).filter(|id| asr.function(*id).is_some()),
                };
                let Some(id) = found else {
                    return Err(SemanticError::new(
                        SemanticErrorKind::UndeclaredSymbol,
                        format!("Procedure '{}' of generic '{}' is not declared", p, g.name),
                        g.span.clone(),
                    ));
                };
                procs.push(id);
            }
            let target = match g.type_bound {
                Some(dt) => match self.ctx.asr.symbol_scope(dt) {
                    Some(s) => s,
                    None => crate::internal_error!("derived type '{}' has no scope", self.ctx.asr.name(dt)),
                },
                None => g.scope,
            };
            debug!("generic '{}' with {} specific procedures", g.name, procs.len());
            match self.ctx.asr.scope(target).get(&g.name) {
                Some(existing) => self.extend_generic(target, &g.name, existing, procs, g.span)?,
                None => {
                    let id = self.ctx.asr.add_symbol(
                        g.name.as_str(),
                        target,
                        SymbolKind::GenericProcedure(GenericProcedure {
                            procs,
                            access: Access::Public,
                        }),
                    );
                    self.ctx.asr.declare(target, &g.name, id, g.span)?;
                }
            }
        }
        Ok(())
    }

    /// `private` as a default, then `public :: a` / `private :: b` on top.
    fn apply_access(&mut self, scope: ScopeId, state: DeclState) -> SemanticResult<()> {
        if state.default_access == Some(Access::Private) {
            let ids: Vec<SymbolId> = self.ctx.asr.scope(scope).iter().map(|(_, id)| id).collect();
            for id in ids {
                self.ctx.asr.set_access(id, Access::Private);
            }
        }
        for (name, access, span) in state.explicit_access {
            let Some(id) = self.ctx.asr.scope(scope).get(&name) else {
                return Err(SemanticError::new(
                    SemanticErrorKind::UndeclaredSymbol,
                    format!("Symbol '{}' in access statement is not declared", name),
                    span,
                ));
            };
            self.ctx.asr.set_access(id, access);
        }
        Ok(())
    }
}
