//! Expression resolution: names, literals, operators and calls.
//!
//! Operands are resolved bottom-up. Every operator first tries the intrinsic
//! meaning of its operand types (inserting implicit casts), then any user
//! `interface operator(...)` generic visible in scope, and otherwise fails.
//! Constant operands are folded into a literal attached as the node's value.

use log::trace;

use crate::asr::types::argument_compatible;
use crate::asr::{
    type_name, Asr, BinOpKind, BoolOpKind, CmpOp, Constant, Dimension, ExprId, ExprKind, ExternalSymbol,
    Presence, ScopeId, Storage, SymbolId, SymbolKind, TType, TypeCategory, UnaryOpKind, Variable, Access,
};
use crate::ast;
use crate::errors::{SemanticError, SemanticErrorKind, SemanticResult, Span};
use crate::intrinsics;

use super::cast::{self, insert_cast, result_type_of_binop, CastSide, OpFamily};
use super::overload::{binop_generic_name, boolop_generic_name, cmpop_generic_name, operator_generic_name,
    unaryop_generic_name, Selection};
use super::{fold, lower, Context};

/// One resolved actual argument.
#[derive(Debug, Clone)]
pub struct CallArg {
    pub keyword: Option<String>,
    pub value: ExprId,
    pub span: Span,
}

impl CallArg {
    pub fn positional(value: ExprId, span: Span) -> CallArg {
        CallArg {
            keyword: None,
            value,
            span,
        }
    }
}

/// A procedure reference with its actual arguments bound to dummy slots.
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    /// Symbol named by the call node, possibly an import.
    pub name: SymbolId,
    /// Generic the call was resolved through.
    pub original: Option<SymbolId>,
    /// The implementing function.
    pub func: SymbolId,
    pub args: Vec<Option<ExprId>>,
    pub dt: Option<ExprId>,
}

pub struct ExpressionResolver<'c, 'a> {
    pub ctx: &'c mut Context<'a>,
}

/// Valid kinds per type category.
pub fn check_kind(category: TypeCategory, kind: i64, span: &Span) -> SemanticResult<u8> {
    let ok = match category {
        TypeCategory::Integer | TypeCategory::Logical => matches!(kind, 1 | 2 | 4 | 8),
        TypeCategory::Real | TypeCategory::Complex => matches!(kind, 4 | 8),
        TypeCategory::Character => kind == 1,
        TypeCategory::Derived | TypeCategory::Class => false,
    };
    if !ok {
        let what = match category {
            TypeCategory::Integer => "integer",
            TypeCategory::Logical => "logical",
            TypeCategory::Real => "real",
            TypeCategory::Complex => "complex",
            TypeCategory::Character => "character",
            TypeCategory::Derived | TypeCategory::Class => "derived types",
        };
        return Err(SemanticError::new(
            SemanticErrorKind::InvalidDeclaration,
            format!("Kind {} is not supported for {}", kind, what),
            span.clone(),
        ));
    }
    Ok(kind as u8)
}

fn binop_symbol(op: BinOpKind) -> &'static str {
    match op {
        BinOpKind::Add => "+",
        BinOpKind::Sub => "-",
        BinOpKind::Mul => "*",
        BinOpKind::Div => "/",
        BinOpKind::Pow => "**",
    }
}

fn cmpop_symbol(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "==",
        CmpOp::NotEq => "/=",
        CmpOp::Lt => "<",
        CmpOp::LtE => "<=",
        CmpOp::Gt => ">",
        CmpOp::GtE => ">=",
    }
}

fn boolop_symbol(op: BoolOpKind) -> &'static str {
    match op {
        BoolOpKind::And => ".and.",
        BoolOpKind::Or => ".or.",
        BoolOpKind::Eqv => ".eqv.",
        BoolOpKind::NEqv => ".neqv.",
    }
}

/// The function implementing a procedure symbol: itself, or the target of a
/// type-bound binding, after peeling one import.
pub fn implementation(asr: &Asr, sym: SymbolId) -> SymbolId {
    let target = asr.past_external(sym);
    match &asr.symbol(target).kind {
        SymbolKind::ClassProcedure(c) => asr.past_external(c.proc),
        _ => target,
    }
}

impl<'c, 'a> ExpressionResolver<'c, 'a> {
    pub fn new(ctx: &'c mut Context<'a>) -> Self {
        ExpressionResolver { ctx }
    }

    fn asr(&mut self) -> &mut Asr {
        &mut self.ctx.asr
    }

    fn type_name(&self, ty: &TType) -> String {
        type_name(&self.ctx.asr, ty)
    }

    pub fn resolve_expr(&mut self, e: &ast::Expr, scope: ScopeId) -> SemanticResult<ExprId> {
        let span = e.span.clone();
        match &e.kind {
            ast::ExprKind::Int(text) => self.int_literal(text, span, scope),
            ast::ExprKind::Real(text) => self.real_literal(text, span, scope),
            ast::ExprKind::Complex(re, im) => {
                let re = self.resolve_expr(re, scope)?;
                let im = self.resolve_expr(im, scope)?;
                self.complex_constructor(re, im, span)
            }
            ast::ExprKind::Str(s) => {
                let ty = TType::character(Some(s.chars().count() as i64));
                Ok(self.asr().constant(Constant::Str(s.clone()), ty, span))
            }
            ast::ExprKind::Logical(b) => Ok(self.asr().constant(Constant::Logical(*b), TType::Logical(4), span)),
            ast::ExprKind::Name(name) => self.resolve_name(name, span, scope),
            ast::ExprKind::Member { base, members } => self.resolve_member_access(base, members, span, scope),
            ast::ExprKind::Call { receiver, name, args } => {
                if receiver.is_empty() {
                    self.resolve_call_name(name, args, span, scope)
                } else {
                    let base = self.resolve_designator(receiver, span.clone(), scope)?;
                    let args = self.resolve_args(args, scope)?;
                    let call = self.bind_type_bound_call(base, name, args, span.clone(), scope)?;
                    self.function_call(call, span)
                }
            }
            ast::ExprKind::Bin(op, l, r) => {
                let left = self.resolve_expr(l, scope)?;
                let right = self.resolve_expr(r, scope)?;
                match op {
                    ast::BinOp::Add => self.resolve_binop(BinOpKind::Add, left, right, span, scope),
                    ast::BinOp::Sub => self.resolve_binop(BinOpKind::Sub, left, right, span, scope),
                    ast::BinOp::Mul => self.resolve_binop(BinOpKind::Mul, left, right, span, scope),
                    ast::BinOp::Div => self.resolve_binop(BinOpKind::Div, left, right, span, scope),
                    ast::BinOp::Pow => self.resolve_binop(BinOpKind::Pow, left, right, span, scope),
                    ast::BinOp::Eq => self.resolve_compare(CmpOp::Eq, left, right, span, scope),
                    ast::BinOp::Ne => self.resolve_compare(CmpOp::NotEq, left, right, span, scope),
                    ast::BinOp::Lt => self.resolve_compare(CmpOp::Lt, left, right, span, scope),
                    ast::BinOp::Le => self.resolve_compare(CmpOp::LtE, left, right, span, scope),
                    ast::BinOp::Gt => self.resolve_compare(CmpOp::Gt, left, right, span, scope),
                    ast::BinOp::Ge => self.resolve_compare(CmpOp::GtE, left, right, span, scope),
                    ast::BinOp::And => self.resolve_boolop(BoolOpKind::And, left, right, span, scope),
                    ast::BinOp::Or => self.resolve_boolop(BoolOpKind::Or, left, right, span, scope),
                    ast::BinOp::Eqv => self.resolve_boolop(BoolOpKind::Eqv, left, right, span, scope),
                    ast::BinOp::Neqv => self.resolve_boolop(BoolOpKind::NEqv, left, right, span, scope),
                    ast::BinOp::Concat => self.resolve_strop(left, right, span, scope),
                }
            }
            ast::ExprKind::Un(op, operand) => {
                let operand = self.resolve_expr(operand, scope)?;
                match op {
                    ast::UnOp::Plus => Ok(operand),
                    ast::UnOp::Neg => self.resolve_unaryop(UnaryOpKind::Minus, operand, span, scope),
                    ast::UnOp::Not => self.resolve_unaryop(UnaryOpKind::Not, operand, span, scope),
                }
            }
            ast::ExprKind::DefinedBin(op, l, r) => {
                let left = self.resolve_expr(l, scope)?;
                let right = self.resolve_expr(r, scope)?;
                self.resolve_defined_op(op, &[left, right], span, scope)
            }
            ast::ExprKind::DefinedUn(op, operand) => {
                let operand = self.resolve_expr(operand, scope)?;
                self.resolve_defined_op(op, &[operand], span, scope)
            }
            ast::ExprKind::Paren(inner) => self.resolve_expr(inner, scope),
            ast::ExprKind::Array(items) => self.resolve_array_constructor(items, span, scope),
        }
    }

    fn int_literal(&mut self, text: &str, span: Span, scope: ScopeId) -> SemanticResult<ExprId> {
        let (digits, kind) = self.split_kind(text, scope, &span)?;
        let kind = check_kind(TypeCategory::Integer, kind.unwrap_or(4), &span)?;
        let v: i64 = digits.parse().map_err(|_| {
            SemanticError::type_mismatch(format!("Invalid integer constant '{}'", text), span.clone())
        })?;
        let (lo, hi) = fold::int_range(kind);
        if v < lo || v > hi {
            return Err(SemanticError::type_mismatch(
                format!("Integer constant {} does not fit in integer({})", v, kind),
                span,
            ));
        }
        Ok(self.asr().constant(Constant::Integer(v), TType::Integer(kind), span))
    }

    fn real_literal(&mut self, text: &str, span: Span, scope: ScopeId) -> SemanticResult<ExprId> {
        let (mantissa, kind) = self.split_kind(text, scope, &span)?;
        let mantissa = mantissa.to_ascii_lowercase();
        let (normalized, exponent_kind) = if mantissa.contains('d') {
            (mantissa.replace('d', "e"), Some(8))
        } else {
            (mantissa, None)
        };
        let kind = check_kind(TypeCategory::Real, kind.or(exponent_kind).unwrap_or(4), &span)?;
        let v: f64 = normalized.parse().map_err(|_| {
            SemanticError::type_mismatch(format!("Invalid real constant '{}'", text), span.clone())
        })?;
        Ok(self
            .asr()
            .constant(Constant::Real(fold::round_real(v, kind)), TType::Real(kind), span))
    }

    /// Splits a `_kind` suffix off a literal; the suffix is a number or the
    /// name of an integer parameter.
    fn split_kind(&mut self, text: &str, scope: ScopeId, span: &Span) -> SemanticResult<(String, Option<i64>)> {
        let Some((body, suffix)) = text.rsplit_once('_') else {
            return Ok((text.to_string(), None));
        };
        if let Ok(k) = suffix.parse::<i64>() {
            return Ok((body.to_string(), Some(k)));
        }
        let name = lower(suffix);
        let asr = &self.ctx.asr;
        let id = asr
            .lookup(scope, &name)
            .ok_or_else(|| SemanticError::undeclared_variable(&name, span.clone()))?;
        let kind = asr
            .variable(id)
            .and_then(|v| v.value)
            .and_then(|v| asr.const_int(v))
            .ok_or_else(|| {
                SemanticError::type_mismatch(
                    format!("Kind parameter '{}' is not an integer constant", name),
                    span.clone(),
                )
            })?;
        Ok((body.to_string(), Some(kind)))
    }

    fn complex_constructor(&mut self, re: ExprId, im: ExprId, span: Span) -> SemanticResult<ExprId> {
        let mut kind = 4;
        for part in [re, im] {
            let ty = self.ctx.asr.expr_type(part);
            match ty.element() {
                TType::Integer(_) if ty.is_scalar() => {}
                TType::Real(k) if ty.is_scalar() => kind = kind.max(*k),
                _ => {
                    let name = self.type_name(&ty.clone());
                    return Err(SemanticError::type_mismatch(
                        format!("Complex constant parts must be integer or real scalars, not {}", name),
                        span,
                    ));
                }
            }
        }
        let re = insert_cast(self.asr(), re, &TType::Real(kind), span.clone())?;
        let im = insert_cast(self.asr(), im, &TType::Real(kind), span.clone())?;
        let value = match (self.ctx.asr.const_value(re), self.ctx.asr.const_value(im)) {
            (Some(a), Some(b)) => Some(Constant::Complex(a.as_real().unwrap_or(0.0), b.as_real().unwrap_or(0.0))),
            _ => None,
        };
        if let Some(v) = value {
            return Ok(self.asr().constant(v, TType::Complex(kind), span));
        }
        Ok(self
            .asr()
            .add_expr(ExprKind::ComplexConstructor { re, im }, TType::Complex(kind), None, span))
    }

    /// A name in expression context. Associate aliases expand to a fresh copy
    /// of the associated expression; parameters carry their value.
    pub fn resolve_name(&mut self, name: &str, span: Span, scope: ScopeId) -> SemanticResult<ExprId> {
        let name = lower(name);
        let Some(id) = self.ctx.asr.lookup(scope, &name) else {
            return self.implicit_variable(&name, span, scope);
        };
        let target = self.ctx.asr.past_external(id);
        match &self.ctx.asr.symbol(target).kind {
            SymbolKind::Variable(v) => {
                if v.is_alias() {
                    if let Some(alias) = v.symbolic_value {
                        return Ok(self.asr().deep_copy_expr(alias));
                    }
                }
                let Some(ty) = v.ty.clone() else {
                    crate::internal_error!("variable '{}' has neither a type nor an alias", name);
                };
                let value = if v.storage == Storage::Parameter { v.value } else { None };
                Ok(self.asr().add_expr(ExprKind::Var(id), ty, value, span))
            }
            SymbolKind::Function(_) | SymbolKind::GenericProcedure(_) => Err(SemanticError::type_mismatch(
                format!("Procedure '{}' used as a value", name),
                span,
            )),
            _ => Err(SemanticError::undeclared_variable(&name, span)),
        }
    }

    fn implicit_variable(&mut self, name: &str, span: Span, scope: ScopeId) -> SemanticResult<ExprId> {
        let Some(ty) = self.ctx.implicit_type(scope, name) else {
            return Err(SemanticError::undeclared_variable(name, span));
        };
        trace!("implicitly typing '{}' as {}", name, self.type_name(&ty));
        let id = self.asr().add_symbol(name, scope, SymbolKind::Variable(Variable::local(ty.clone())));
        self.asr().declare(scope, name, id, span.clone())?;
        Ok(self.asr().add_expr(ExprKind::Var(id), ty, None, span))
    }

    /// `a` or `a%b%c` as a value.
    pub fn resolve_designator(&mut self, parts: &[String], span: Span, scope: ScopeId) -> SemanticResult<ExprId> {
        match parts.split_first() {
            Some((base, [])) => self.resolve_name(base, span, scope),
            Some((base, members)) => self.resolve_member_access(base, members, span, scope),
            None => crate::internal_error!("empty designator"),
        }
    }

    /// `base%m1%m2...`, including `%re` and `%im` of complex values.
    pub fn resolve_member_access(
        &mut self,
        base: &str,
        members: &[String],
        span: Span,
        scope: ScopeId,
    ) -> SemanticResult<ExprId> {
        let mut cur = self.resolve_name(base, span.clone(), scope)?;
        for member in members {
            let member = lower(member);
            let ty = self.ctx.asr.expr_type(cur).clone();
            if ty.is_complex() && (member == "re" || member == "im") {
                let kind = ty.kind().unwrap_or(4);
                cur = if member == "re" {
                    insert_cast(self.asr(), cur, &TType::Real(kind), span.clone())?
                } else {
                    let arg = CallArg::positional(cur, span.clone());
                    self.resolve_intrinsic("aimag", vec![arg], span.clone(), scope)?
                };
                continue;
            }
            let Some(dt) = ty.derived_symbol() else {
                return Err(SemanticError::new(
                    SemanticErrorKind::NoSuchMember,
                    format!("Member '{}' requested from a value of type {}", member, self.type_name(&ty)),
                    span,
                ));
            };
            let m = self.ctx.asr.resolve_member(dt, &member, span.clone())?;
            let Some(mty) = self.ctx.asr.variable(m).and_then(|v| v.ty.clone()) else {
                return Err(SemanticError::new(
                    SemanticErrorKind::NoSuchMember,
                    format!("'{}' is a type-bound procedure, not a component", member),
                    span,
                ));
            };
            let rty = if ty.is_array() && mty.is_scalar() {
                ty.with_element(mty)
            } else {
                mty
            };
            cur = self
                .asr()
                .add_expr(ExprKind::DerivedRef { base: cur, member: m }, rty, None, span.clone());
        }
        Ok(cur)
    }

    fn result_shape(&self, lt: &TType, rt: &TType, elem: TType, span: &Span) -> SemanticResult<TType> {
        match (lt.rank(), rt.rank()) {
            (0, 0) => Ok(elem),
            (_, 0) => Ok(lt.with_element(elem)),
            (0, _) => Ok(rt.with_element(elem)),
            (a, b) if a == b => Ok(lt.with_element(elem)),
            (a, b) => Err(SemanticError::type_mismatch(
                format!("Operands have incompatible ranks {} and {}", a, b),
                span.clone(),
            )),
        }
    }

    fn apply_casts(&mut self, left: ExprId, right: ExprId, elem: &TType, side: CastSide, span: &Span)
        -> SemanticResult<(ExprId, ExprId)> {
        Ok(match side {
            CastSide::None => (left, right),
            CastSide::Left => (insert_cast(self.asr(), left, elem, span.clone())?, right),
            CastSide::Right => (left, insert_cast(self.asr(), right, elem, span.clone())?),
        })
    }

    fn constants(&self, left: ExprId, right: ExprId) -> Option<(Constant, Constant)> {
        let asr = &self.ctx.asr;
        Some((asr.const_value(left)?.clone(), asr.const_value(right)?.clone()))
    }

    /// `left op right` for `+ - * / **`.
    pub fn resolve_binop(
        &mut self,
        op: BinOpKind,
        left: ExprId,
        right: ExprId,
        span: Span,
        scope: ScopeId,
    ) -> SemanticResult<ExprId> {
        let lt = self.ctx.asr.expr_type(left).clone();
        let rt = self.ctx.asr.expr_type(right).clone();
        let Some((elem, side)) = result_type_of_binop(OpFamily::Arithmetic, &lt, &rt) else {
            if let Some(call) = self.try_operator(binop_generic_name(op), &[left, right], &span, scope)? {
                let ty = self.ctx.asr.expr_type(call).clone();
                let kind = ExprKind::BinOp {
                    left,
                    op,
                    right,
                    overloaded: Some(call),
                };
                return Ok(self.asr().add_expr(kind, ty, None, span));
            }
            return Err(SemanticError::type_mismatch(
                format!(
                    "Operator '{}' cannot be applied to {} and {}",
                    binop_symbol(op),
                    self.type_name(&lt),
                    self.type_name(&rt)
                ),
                span,
            ));
        };
        let ty = self.result_shape(&lt, &rt, elem.clone(), &span)?;
        let (left, right) = self.apply_casts(left, right, &elem, side, &span)?;
        let value = self
            .constants(left, right)
            .and_then(|(l, r)| fold::binop(op, &elem, &l, &r))
            .map(|c| self.asr().constant(c, ty.clone(), span.clone()));
        let kind = ExprKind::BinOp {
            left,
            op,
            right,
            overloaded: None,
        };
        Ok(self.asr().add_expr(kind, ty, value, span))
    }

    /// Relational operators. Complex values compare only for equality and
    /// logical values need `.eqv.`/`.neqv.`.
    pub fn resolve_compare(
        &mut self,
        op: CmpOp,
        left: ExprId,
        right: ExprId,
        span: Span,
        scope: ScopeId,
    ) -> SemanticResult<ExprId> {
        let lt = self.ctx.asr.expr_type(left).clone();
        let rt = self.ctx.asr.expr_type(right).clone();
        let Some((elem, side)) = result_type_of_binop(OpFamily::Comparison, &lt, &rt) else {
            if let Some(call) = self.try_operator(cmpop_generic_name(op), &[left, right], &span, scope)? {
                let ty = self.ctx.asr.expr_type(call).clone();
                let kind = ExprKind::Compare {
                    left,
                    op,
                    right,
                    overloaded: Some(call),
                };
                return Ok(self.asr().add_expr(kind, ty, None, span));
            }
            if lt.is_logical() && rt.is_logical() {
                return Err(SemanticError::type_mismatch(
                    format!(
                        "Logical values cannot be compared with '{}'; use .eqv. or .neqv.",
                        cmpop_symbol(op)
                    ),
                    span,
                ));
            }
            return Err(SemanticError::type_mismatch(
                format!(
                    "Cannot compare {} and {} with '{}'",
                    self.type_name(&lt),
                    self.type_name(&rt),
                    cmpop_symbol(op)
                ),
                span,
            ));
        };
        if elem.is_complex() && !matches!(op, CmpOp::Eq | CmpOp::NotEq) {
            return Err(SemanticError::new(
                SemanticErrorKind::UnsupportedComparison,
                format!("Complex values cannot be ordered with '{}'", cmpop_symbol(op)),
                span,
            ));
        }
        let ty = self.result_shape(&lt, &rt, TType::Logical(4), &span)?;
        let (left, right) = self.apply_casts(left, right, &elem, side, &span)?;
        let value = self
            .constants(left, right)
            .and_then(|(l, r)| fold::compare(op, &l, &r))
            .map(|c| self.asr().constant(c, ty.clone(), span.clone()));
        let kind = ExprKind::Compare {
            left,
            op,
            right,
            overloaded: None,
        };
        Ok(self.asr().add_expr(kind, ty, value, span))
    }

    pub fn resolve_boolop(
        &mut self,
        op: BoolOpKind,
        left: ExprId,
        right: ExprId,
        span: Span,
        scope: ScopeId,
    ) -> SemanticResult<ExprId> {
        let lt = self.ctx.asr.expr_type(left).clone();
        let rt = self.ctx.asr.expr_type(right).clone();
        let Some((elem, side)) = result_type_of_binop(OpFamily::Logical, &lt, &rt) else {
            if let Some(call) = self.try_operator(boolop_generic_name(op), &[left, right], &span, scope)? {
                let ty = self.ctx.asr.expr_type(call).clone();
                let kind = ExprKind::BoolOp {
                    left,
                    op,
                    right,
                    overloaded: Some(call),
                };
                return Ok(self.asr().add_expr(kind, ty, None, span));
            }
            return Err(SemanticError::type_mismatch(
                format!(
                    "Operator '{}' needs logical operands, got {} and {}",
                    boolop_symbol(op),
                    self.type_name(&lt),
                    self.type_name(&rt)
                ),
                span,
            ));
        };
        let ty = self.result_shape(&lt, &rt, elem.clone(), &span)?;
        let (left, right) = self.apply_casts(left, right, &elem, side, &span)?;
        let value = self
            .constants(left, right)
            .and_then(|(l, r)| fold::boolop(op, &l, &r))
            .map(|c| self.asr().constant(c, ty.clone(), span.clone()));
        let kind = ExprKind::BoolOp {
            left,
            op,
            right,
            overloaded: None,
        };
        Ok(self.asr().add_expr(kind, ty, value, span))
    }

    /// `left // right`
    pub fn resolve_strop(&mut self, left: ExprId, right: ExprId, span: Span, scope: ScopeId) -> SemanticResult<ExprId> {
        let lt = self.ctx.asr.expr_type(left).clone();
        let rt = self.ctx.asr.expr_type(right).clone();
        if result_type_of_binop(OpFamily::Concatenation, &lt, &rt).is_none() || lt.is_array() || rt.is_array() {
            if let Some(call) = self.try_operator("~concat", &[left, right], &span, scope)? {
                let ty = self.ctx.asr.expr_type(call).clone();
                let kind = ExprKind::StrConcat {
                    left,
                    right,
                    overloaded: Some(call),
                };
                return Ok(self.asr().add_expr(kind, ty, None, span));
            }
            return Err(SemanticError::type_mismatch(
                format!(
                    "Operator '//' needs character scalars, got {} and {}",
                    self.type_name(&lt),
                    self.type_name(&rt)
                ),
                span,
            ));
        }
        let len = match (lt.element(), rt.element()) {
            (TType::Character { len: Some(a), .. }, TType::Character { len: Some(b), .. }) => Some(a + b),
            _ => None,
        };
        let ty = TType::Character {
            kind: lt.kind().unwrap_or(1),
            len,
            len_expr: None,
        };
        let value = self
            .constants(left, right)
            .and_then(|(l, r)| fold::concat(&l, &r))
            .map(|c| self.asr().constant(c, ty.clone(), span.clone()));
        let kind = ExprKind::StrConcat {
            left,
            right,
            overloaded: None,
        };
        Ok(self.asr().add_expr(kind, ty, value, span))
    }

    pub fn resolve_unaryop(
        &mut self,
        op: UnaryOpKind,
        operand: ExprId,
        span: Span,
        scope: ScopeId,
    ) -> SemanticResult<ExprId> {
        let ty = self.ctx.asr.expr_type(operand).clone();
        let intrinsic = match op {
            UnaryOpKind::Minus => ty.is_numeric(),
            UnaryOpKind::Not => ty.is_logical(),
        };
        if !intrinsic {
            if let Some(call) = self.try_operator(unaryop_generic_name(op), &[operand], &span, scope)? {
                let ty = self.ctx.asr.expr_type(call).clone();
                let kind = ExprKind::UnaryOp {
                    op,
                    operand,
                    overloaded: Some(call),
                };
                return Ok(self.asr().add_expr(kind, ty, None, span));
            }
            let what = if op == UnaryOpKind::Minus { "numeric" } else { "logical" };
            return Err(SemanticError::type_mismatch(
                format!("Unary operator needs a {} operand, got {}", what, self.type_name(&ty)),
                span,
            ));
        }
        let value = self
            .ctx
            .asr
            .const_value(operand)
            .cloned()
            .and_then(|c| fold::unary(op, &ty, &c))
            .map(|c| self.asr().constant(c, ty.clone(), span.clone()));
        Ok(self.asr().add_expr(
            ExprKind::UnaryOp {
                op,
                operand,
                overloaded: None,
            },
            ty,
            value,
            span,
        ))
    }

    /// `a .op. b` and `.op. a` with a user-defined operator.
    pub fn resolve_defined_op(
        &mut self,
        op: &str,
        operands: &[ExprId],
        span: Span,
        scope: ScopeId,
    ) -> SemanticResult<ExprId> {
        let generic = operator_generic_name(&format!(".{}.", op.trim_matches('.')));
        match self.try_operator(&generic, operands, &span, scope)? {
            Some(call) => Ok(call),
            None => {
                let types: Vec<String> = operands
                    .iter()
                    .map(|o| self.type_name(&self.ctx.asr.expr_type(*o).clone()))
                    .collect();
                Err(SemanticError::new(
                    SemanticErrorKind::NoMatchingOverload,
                    format!(
                        "No implementation of operator '.{}.' accepts ({})",
                        op.trim_matches('.'),
                        types.join(", ")
                    ),
                    span,
                ))
            }
        }
    }

    /// Looks for a user operator generic, in scope or bound to the type of an
    /// operand, whose candidates accept the operand types.
    fn try_operator(
        &mut self,
        generic: &str,
        operands: &[ExprId],
        span: &Span,
        scope: ScopeId,
    ) -> SemanticResult<Option<ExprId>> {
        let asr = &self.ctx.asr;
        let mut generics: Vec<(SymbolId, Vec<SymbolId>)> = Vec::new();
        let mut push = |id: SymbolId| {
            if let SymbolKind::GenericProcedure(g) = &asr.symbol(asr.past_external(id)).kind {
                if !generics.iter().any(|(x, _)| *x == id) {
                    generics.push((id, g.procs.clone()));
                }
            }
        };
        if let Some(g) = asr.lookup(scope, generic) {
            push(g);
        }
        for o in operands {
            if let Some(dt) = asr.expr_type(*o).derived_symbol() {
                if let Some(g) = asr.find_member(dt, generic) {
                    push(g);
                }
            }
        }
        let types: Vec<TType> = operands.iter().map(|o| asr.expr_type(*o).clone()).collect();
        for (g, procs) in generics {
            let candidate = match self.ctx.strategy.select(&self.ctx.asr, &procs, &types, None) {
                Selection::Match(c) => c,
                Selection::NoMatch => continue,
                Selection::Ambiguous(all) => return Err(self.ambiguous(g, &all, span.clone())),
            };
            let func = implementation(&self.ctx.asr, candidate);
            let Some(ty) = self.ctx.asr.return_type(func) else {
                return Err(SemanticError::new(
                    SemanticErrorKind::NotCallable,
                    format!("Operator implementation '{}' is a subroutine", self.ctx.asr.name(func)),
                    span.clone(),
                ));
            };
            let name = self.callable_symbol(scope, g, candidate, span)?;
            let args = operands
                .iter()
                .map(|o| Some(self.asr().deep_copy_expr(*o)))
                .collect();
            let kind = ExprKind::FunctionCall {
                name,
                original: Some(g),
                args,
                dt: None,
            };
            return Ok(Some(self.asr().add_expr(kind, ty, None, span.clone())));
        }
        Ok(None)
    }

    fn ambiguous(&self, generic: SymbolId, candidates: &[SymbolId], span: Span) -> SemanticError {
        let asr = &self.ctx.asr;
        let names: Vec<&str> = candidates.iter().map(|c| asr.name(asr.past_external(*c))).collect();
        SemanticError::new(
            SemanticErrorKind::AmbiguousOverload,
            format!(
                "Call to generic '{}' is ambiguous: {} all match",
                asr.name(generic),
                names.join(", ")
            ),
            span,
        )
    }

    /// The symbol a call to `candidate` of `generic` should name from `scope`.
    /// A specific procedure that is not visible there is imported under
    /// `generic@specific`.
    fn callable_symbol(
        &mut self,
        scope: ScopeId,
        generic: SymbolId,
        candidate: SymbolId,
        span: &Span,
    ) -> SemanticResult<SymbolId> {
        let asr = &self.ctx.asr;
        let target = asr.past_external(candidate);
        if !matches!(asr.symbol(target).kind, SymbolKind::Function(_)) || self.visible(scope, candidate) {
            return Ok(candidate);
        }
        let local = format!("{}@{}", asr.name(asr.past_external(generic)), asr.name(target));
        if let Some(existing) = asr.scope(scope).get(&local) {
            if asr.past_external(existing) == target {
                return Ok(existing);
            }
        }
        let local = asr.unique_name(scope, &local);
        let module_name = asr
            .enclosing_unit(asr.symbol(target).owner)
            .map(|u| asr.name(u).to_string())
            .unwrap_or_default();
        let original_name = asr.name(target).to_string();
        let ext = self.asr().add_symbol(
            local.clone(),
            scope,
            SymbolKind::ExternalSymbol(ExternalSymbol {
                target,
                module_name: module_name.clone(),
                original_name,
                access: Access::Private,
            }),
        );
        self.asr().declare(scope, &local, ext, span.clone())?;
        self.asr().add_dependency(scope, &module_name);
        Ok(ext)
    }

    /// Whether `sym` is registered in `scope` or one of its ancestors.
    fn visible(&self, scope: ScopeId, sym: SymbolId) -> bool {
        let owner = self.ctx.asr.symbol(sym).owner;
        let mut cur = Some(scope);
        while let Some(s) = cur {
            if s == owner {
                return self.ctx.asr.scope(s).get(self.ctx.asr.name(sym)) == Some(sym);
            }
            cur = self.ctx.asr.scope(s).parent;
        }
        false
    }

    pub fn resolve_args(&mut self, args: &[ast::Arg], scope: ScopeId) -> SemanticResult<Vec<CallArg>> {
        args.iter()
            .map(|a| -> SemanticResult<CallArg> {
                Ok(CallArg {
                    keyword: a.keyword.as_deref().map(lower),
                    value: self.resolve_expr(&a.value, scope)?,
                    span: a.value.span.clone(),
                })
            })
            .collect()
    }

    /// `name(args)` in expression context: a function or generic call, an
    /// array element, a structure constructor or an intrinsic.
    pub fn resolve_call_name(&mut self, name: &str, args: &[ast::Arg], span: Span, scope: ScopeId) -> SemanticResult<ExprId> {
        let name = lower(name);
        let args = self.resolve_args(args, scope)?;
        let Some(sym) = self.ctx.asr.lookup(scope, &name) else {
            if intrinsics::module_for(&name).is_some() {
                return self.resolve_intrinsic(&name, args, span, scope);
            }
            return Err(SemanticError::undeclared_symbol(&name, span));
        };
        self.resolve_call(sym, args, span, scope)
    }

    /// Calls an intrinsic, importing it into `scope` on first use.
    pub fn resolve_intrinsic(&mut self, name: &str, args: Vec<CallArg>, span: Span, scope: ScopeId) -> SemanticResult<ExprId> {
        let sym = match self.ctx.asr.lookup(scope, name) {
            Some(s) if self.is_intrinsic(s) => s,
            _ => intrinsics::import_intrinsic(self.asr(), scope, name).ok_or_else(|| {
                SemanticError::undeclared_symbol(name, span.clone())
            })?,
        };
        self.resolve_call(sym, args, span, scope)
    }

    fn is_intrinsic(&self, sym: SymbolId) -> bool {
        self.ctx
            .asr
            .function(sym)
            .is_some_and(|f| f.abi == crate::asr::Abi::Intrinsic)
    }

    /// Applies a resolved callee symbol to arguments.
    pub fn resolve_call(&mut self, sym: SymbolId, args: Vec<CallArg>, span: Span, scope: ScopeId) -> SemanticResult<ExprId> {
        let target = self.ctx.asr.past_external(sym);
        if self.is_intrinsic(sym) {
            let name = match &self.ctx.asr.symbol(sym).kind {
                SymbolKind::ExternalSymbol(e) => e.original_name.clone(),
                _ => self.ctx.asr.name(target).to_string(),
            };
            if let Some(intrinsic) = intrinsics::array::lookup(&name) {
                return intrinsics::array::create(self.asr(), intrinsic, args, span);
            }
            return intrinsics::scalar::resolve_call(self.asr(), &name, sym, args, span);
        }
        match &self.ctx.asr.symbol(target).kind {
            SymbolKind::Function(_) | SymbolKind::GenericProcedure(_) => {
                let call = self.bind_procedure_call(sym, args, span.clone(), scope)?;
                self.function_call(call, span)
            }
            SymbolKind::Variable(v) => {
                let ty = v.ty.clone();
                match ty {
                    Some(ty) if ty.is_array() => self.array_item(sym, ty, args, span),
                    _ => Err(SemanticError::new(
                        SemanticErrorKind::NotCallable,
                        format!("'{}' is neither an array nor a function", self.ctx.asr.name(sym)),
                        span,
                    )),
                }
            }
            SymbolKind::DerivedType(_) => self.struct_constructor(sym, args, span),
            _ => Err(SemanticError::new(
                SemanticErrorKind::NotCallable,
                format!("'{}' cannot be called", self.ctx.asr.name(sym)),
                span,
            )),
        }
    }

    /// Turns a bound call into a function call expression.
    pub fn function_call(&mut self, call: ResolvedCall, span: Span) -> SemanticResult<ExprId> {
        let Some(ty) = self.ctx.asr.return_type(call.func) else {
            return Err(SemanticError::new(
                SemanticErrorKind::NotCallable,
                format!(
                    "Subroutine '{}' cannot be used in an expression",
                    self.ctx.asr.name(call.func)
                ),
                span,
            ));
        };
        let kind = ExprKind::FunctionCall {
            name: call.name,
            original: call.original,
            args: call.args,
            dt: call.dt,
        };
        Ok(self.asr().add_expr(kind, ty, None, span))
    }

    /// Resolves a call to a specific or generic procedure and binds its
    /// arguments.
    pub fn bind_procedure_call(
        &mut self,
        sym: SymbolId,
        args: Vec<CallArg>,
        span: Span,
        scope: ScopeId,
    ) -> SemanticResult<ResolvedCall> {
        let target = self.ctx.asr.past_external(sym);
        match &self.ctx.asr.symbol(target).kind {
            SymbolKind::Function(_) => {
                let bound = self.bind_arguments(target, false, args, &span)?;
                Ok(ResolvedCall {
                    name: sym,
                    original: None,
                    func: target,
                    args: bound,
                    dt: None,
                })
            }
            SymbolKind::GenericProcedure(g) => {
                let procs = g.procs.clone();
                let candidate = self.select(sym, &procs, &args, None, &span)?;
                let func = implementation(&self.ctx.asr, candidate);
                let name = self.callable_symbol(scope, sym, candidate, &span)?;
                let bound = self.bind_arguments(func, false, args, &span)?;
                Ok(ResolvedCall {
                    name,
                    original: Some(sym),
                    func,
                    args: bound,
                    dt: None,
                })
            }
            _ => Err(SemanticError::new(
                SemanticErrorKind::NotCallable,
                format!("'{}' is not a procedure", self.ctx.asr.name(sym)),
                span,
            )),
        }
    }

    fn select(
        &self,
        generic: SymbolId,
        procs: &[SymbolId],
        args: &[CallArg],
        receiver: Option<&TType>,
        span: &Span,
    ) -> SemanticResult<SymbolId> {
        let asr = &self.ctx.asr;
        let types: Vec<TType> = args.iter().map(|a| asr.expr_type(a.value).clone()).collect();
        match self.ctx.strategy.select(asr, procs, &types, receiver) {
            Selection::Match(c) => Ok(c),
            Selection::Ambiguous(all) => Err(self.ambiguous(generic, &all, span.clone())),
            Selection::NoMatch => {
                let names: Vec<String> = types.iter().map(|t| type_name(asr, t)).collect();
                Err(SemanticError::new(
                    SemanticErrorKind::NoMatchingOverload,
                    format!(
                        "No specific procedure of generic '{}' matches the argument types ({})",
                        asr.name(generic),
                        names.join(", ")
                    ),
                    span.clone(),
                ))
            }
        }
    }

    /// `base%name(args)`: a type-bound procedure or type-bound generic.
    pub fn bind_type_bound_call(
        &mut self,
        base: ExprId,
        name: &str,
        args: Vec<CallArg>,
        span: Span,
        _scope: ScopeId,
    ) -> SemanticResult<ResolvedCall> {
        let name = lower(name);
        let base_ty = self.ctx.asr.expr_type(base).clone();
        let Some(dt) = base_ty.derived_symbol() else {
            return Err(SemanticError::new(
                SemanticErrorKind::NoSuchMember,
                format!(
                    "Type-bound procedure '{}' called on a value of type {}",
                    name,
                    self.type_name(&base_ty)
                ),
                span,
            ));
        };
        let member = self.ctx.asr.resolve_member(dt, &name, span.clone())?;
        let (binding, original) = match &self.ctx.asr.symbol(member).kind {
            SymbolKind::ClassProcedure(_) => (member, None),
            SymbolKind::GenericProcedure(g) => {
                let procs = g.procs.clone();
                (self.select(member, &procs, &args, Some(&base_ty), &span)?, Some(member))
            }
            _ => {
                return Err(SemanticError::new(
                    SemanticErrorKind::NotCallable,
                    format!("Component '{}' is not a procedure", name),
                    span,
                ))
            }
        };
        let SymbolKind::ClassProcedure(c) = &self.ctx.asr.symbol(binding).kind else {
            return Err(SemanticError::new(
                SemanticErrorKind::NotCallable,
                format!("'{}' is not a type-bound procedure", self.ctx.asr.name(binding)),
                span,
            ));
        };
        let pass = c.dispatch == crate::asr::Dispatch::Pass;
        let func = self.ctx.asr.past_external(c.proc);
        let bound = self.bind_arguments(func, pass, args, &span)?;
        Ok(ResolvedCall {
            name: binding,
            original,
            func,
            args: bound,
            dt: Some(base),
        })
    }

    /// Maps positional and keyword actuals onto the dummy arguments of `func`
    /// and checks each against its dummy's type. With `skip_first` the first
    /// dummy is the passed object and receives no actual.
    pub fn bind_arguments(
        &mut self,
        func: SymbolId,
        skip_first: bool,
        args: Vec<CallArg>,
        span: &Span,
    ) -> SemanticResult<Vec<Option<ExprId>>> {
        let asr = &self.ctx.asr;
        let Some(f) = asr.function(func) else {
            crate::internal_error!("binding arguments of non-function '{}'", asr.name(func));
        };
        let fname = asr.name(func).to_string();
        let params: Vec<SymbolId> = f.args.iter().skip(usize::from(skip_first)).copied().collect();
        let mut slots: Vec<Option<ExprId>> = vec![None; params.len()];
        let mut next = 0;
        let mut seen_keyword = false;
        for arg in args {
            let idx = match &arg.keyword {
                Some(k) => {
                    seen_keyword = true;
                    params.iter().position(|p| asr.name(*p) == k).ok_or_else(|| {
                        SemanticError::type_mismatch(
                            format!("'{}' has no dummy argument named '{}'", fname, k),
                            arg.span.clone(),
                        )
                    })?
                }
                None if seen_keyword => {
                    return Err(SemanticError::type_mismatch(
                        format!("Positional argument follows a keyword argument in call to '{}'", fname),
                        arg.span,
                    ))
                }
                None => {
                    next += 1;
                    next - 1
                }
            };
            let Some(param) = params.get(idx) else {
                return Err(SemanticError::type_mismatch(
                    format!("Too many arguments in call to '{}'", fname),
                    arg.span,
                ));
            };
            if slots[idx].is_some() {
                return Err(SemanticError::type_mismatch(
                    format!("Argument '{}' of '{}' is given twice", asr.name(*param), fname),
                    arg.span,
                ));
            }
            if let Some(formal) = asr.variable(*param).and_then(|v| v.ty.as_ref()) {
                let actual = asr.expr_type(arg.value);
                if !argument_compatible(asr, formal, actual) {
                    return Err(SemanticError::type_mismatch(
                        format!(
                            "Argument '{}' of '{}' expects {} but got {}",
                            asr.name(*param),
                            fname,
                            type_name(asr, formal),
                            type_name(asr, actual)
                        ),
                        arg.span,
                    ));
                }
            }
            slots[idx] = Some(arg.value);
        }
        for (param, slot) in params.iter().zip(&slots) {
            let optional = asr
                .variable(*param)
                .is_some_and(|v| v.presence == Presence::Optional);
            if slot.is_none() && !optional {
                return Err(SemanticError::type_mismatch(
                    format!("Missing argument '{}' in call to '{}'", asr.name(*param), fname),
                    span.clone(),
                ));
            }
        }
        Ok(slots)
    }

    fn array_item(&mut self, sym: SymbolId, ty: TType, args: Vec<CallArg>, span: Span) -> SemanticResult<ExprId> {
        let name = self.ctx.asr.name(sym).to_string();
        if args.len() != ty.rank() {
            return Err(SemanticError::type_mismatch(
                format!("Array '{}' has rank {} but {} subscripts were given", name, ty.rank(), args.len()),
                span,
            ));
        }
        let mut indices = Vec::with_capacity(args.len());
        for a in &args {
            let ity = self.ctx.asr.expr_type(a.value);
            if a.keyword.is_some() || !ity.is_integer() {
                return Err(SemanticError::type_mismatch(
                    format!("Subscripts of '{}' must be integers", name),
                    a.span.clone(),
                ));
            }
            if ity.is_array() {
                return Err(SemanticError::unsupported(
                    format!("Vector subscripts of '{}' are not supported", name),
                    a.span.clone(),
                ));
            }
            indices.push(a.value);
        }
        let elem = ty.element().clone();
        let value = self.constant_element(sym, &ty, &indices, &span);
        let array = self.asr().add_expr(ExprKind::Var(sym), ty, None, span.clone());
        Ok(self
            .asr()
            .add_expr(ExprKind::ArrayItem { array, indices }, elem, value, span))
    }

    /// Element of a rank-1 parameter array at a constant subscript.
    fn constant_element(&mut self, sym: SymbolId, ty: &TType, indices: &[ExprId], span: &Span) -> Option<ExprId> {
        let asr = &self.ctx.asr;
        let [index] = indices else {
            return None;
        };
        let var = asr.variable(sym)?;
        if var.storage != Storage::Parameter {
            return None;
        }
        let Constant::Array(items) = asr.const_value(var.value?)? else {
            return None;
        };
        let lower = ty.dims()[0].start.and_then(|s| asr.const_int(s)).unwrap_or(1);
        let pos = usize::try_from(asr.const_int(*index)? - lower).ok()?;
        let item = items.get(pos)?.clone();
        let elem = ty.element().clone();
        Some(self.asr().constant(item, elem, span.clone()))
    }

    /// `t(a, b, c=1)`: inherited components come first.
    fn struct_constructor(&mut self, sym: SymbolId, args: Vec<CallArg>, span: Span) -> SemanticResult<ExprId> {
        let members = self.ctx.asr.all_members(sym);
        let tname = self.ctx.asr.name(self.ctx.asr.past_external(sym)).to_string();
        let mut slots: Vec<Option<ExprId>> = vec![None; members.len()];
        let mut next = 0;
        for arg in args {
            let idx = match &arg.keyword {
                Some(k) => members
                    .iter()
                    .position(|m| self.ctx.asr.name(*m) == k)
                    .ok_or_else(|| {
                        SemanticError::new(
                            SemanticErrorKind::NoSuchMember,
                            format!("Member '{}' not found in derived type '{}'", k, tname),
                            arg.span.clone(),
                        )
                    })?,
                None => {
                    next += 1;
                    next - 1
                }
            };
            let Some(member) = members.get(idx).copied() else {
                return Err(SemanticError::type_mismatch(
                    format!("Too many values in constructor of '{}'", tname),
                    arg.span,
                ));
            };
            let Some(mty) = self.ctx.asr.variable(member).and_then(|v| v.ty.clone()) else {
                crate::internal_error!("component without a type in '{}'", tname);
            };
            let (value, _) = cast::cast_for_assignment(self.asr(), arg.value, &mty, arg.span.clone())?;
            slots[idx] = Some(value);
        }
        let mut values = Vec::with_capacity(slots.len());
        for (member, slot) in members.iter().zip(slots) {
            let value = match slot {
                Some(v) => v,
                None => {
                    let init = self.ctx.asr.variable(*member).and_then(|v| v.init);
                    match init {
                        Some(init) => self.asr().deep_copy_expr(init),
                        None => {
                            return Err(SemanticError::type_mismatch(
                                format!(
                                    "Missing value for component '{}' in constructor of '{}'",
                                    self.ctx.asr.name(*member),
                                    tname
                                ),
                                span,
                            ))
                        }
                    }
                }
            };
            values.push(value);
        }
        Ok(self
            .asr()
            .add_expr(ExprKind::StructConstructor { dt: sym, args: values }, TType::Derived(sym), None, span))
    }

    /// `[a, b, c]` with numeric items promoted to a common type.
    fn resolve_array_constructor(&mut self, items: &[ast::Expr], span: Span, scope: ScopeId) -> SemanticResult<ExprId> {
        if items.is_empty() {
            return Err(SemanticError::unsupported("Empty array constructors are not supported", span));
        }
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            let id = self.resolve_expr(item, scope)?;
            if self.ctx.asr.expr_type(id).is_array() {
                return Err(SemanticError::unsupported(
                    "Nested arrays in array constructors are not supported",
                    item.span.clone(),
                ));
            }
            values.push(id);
        }
        let mut elem = self.ctx.asr.expr_type(values[0]).clone();
        for v in &values[1..] {
            let ty = self.ctx.asr.expr_type(*v).clone();
            elem = match result_type_of_binop(OpFamily::Arithmetic, &elem, &ty) {
                Some((common, _)) => common,
                None if crate::asr::types::elements_equal(&self.ctx.asr, &elem, &ty)
                    || (elem.is_character() && ty.is_character()) =>
                {
                    elem
                }
                None => {
                    return Err(SemanticError::type_mismatch(
                        format!(
                            "Array constructor mixes {} and {}",
                            self.type_name(&elem),
                            self.type_name(&ty)
                        ),
                        span,
                    ))
                }
            };
        }
        for v in values.iter_mut() {
            if !elem.is_character() {
                *v = insert_cast(self.asr(), *v, &elem, span.clone())?;
            }
        }
        let one = self.asr().constant(Constant::Integer(1), TType::Integer(4), span.clone());
        let n = self
            .asr()
            .constant(Constant::Integer(values.len() as i64), TType::Integer(4), span.clone());
        let ty = TType::array(
            elem,
            vec![Dimension {
                start: Some(one),
                length: Some(n),
            }],
        );
        let consts: Option<Vec<Constant>> = values
            .iter()
            .map(|v| self.ctx.asr.const_value(*v).cloned())
            .collect();
        let value = consts.map(|c| self.asr().constant(Constant::Array(c), ty.clone(), span.clone()));
        Ok(self.asr().add_expr(ExprKind::ArrayConstructor(values), ty, value, span))
    }

    /// Evaluates an expression that must be a constant integer, such as a
    /// kind selector or an array bound.
    pub fn resolve_int_constant(&mut self, e: &ast::Expr, what: &str, scope: ScopeId) -> SemanticResult<i64> {
        let id = self.resolve_expr(e, scope)?;
        self.ctx.asr.const_int(id).ok_or_else(|| {
            SemanticError::new(
                SemanticErrorKind::InvalidDeclaration,
                format!("{} must be a constant integer expression", what),
                e.span.clone(),
            )
        })
    }

    fn kind_of(&mut self, kind: &Option<ast::Expr>, category: TypeCategory, default: i64, span: &Span, scope: ScopeId)
        -> SemanticResult<u8> {
        let k = match kind {
            Some(e) => self.resolve_int_constant(e, "Kind selector", scope)?,
            None => default,
        };
        check_kind(category, k, span)
    }

    /// Converts a declared type into a type descriptor (without dimensions).
    pub fn resolve_type_spec(&mut self, ts: &ast::TypeSpec, span: Span, scope: ScopeId) -> SemanticResult<TType> {
        Ok(match ts {
            ast::TypeSpec::Integer(k) => TType::Integer(self.kind_of(k, TypeCategory::Integer, 4, &span, scope)?),
            ast::TypeSpec::Real(k) => TType::Real(self.kind_of(k, TypeCategory::Real, 4, &span, scope)?),
            ast::TypeSpec::DoublePrecision => TType::Real(8),
            ast::TypeSpec::Complex(k) => TType::Complex(self.kind_of(k, TypeCategory::Complex, 4, &span, scope)?),
            ast::TypeSpec::Logical(k) => TType::Logical(self.kind_of(k, TypeCategory::Logical, 4, &span, scope)?),
            ast::TypeSpec::Character { len, kind } => {
                let kind = self.kind_of(kind, TypeCategory::Character, 1, &span, scope)?;
                let (len, len_expr) = match len {
                    None => (Some(1), None),
                    Some(ast::CharLen::Assumed) | Some(ast::CharLen::Deferred) => (None, None),
                    Some(ast::CharLen::Expr(e)) => {
                        let id = self.resolve_expr(e, scope)?;
                        if !self.ctx.asr.expr_type(id).is_integer() {
                            return Err(SemanticError::type_mismatch("Character length must be an integer", span));
                        }
                        match self.ctx.asr.const_int(id) {
                            Some(n) => (Some(n.max(0)), None),
                            None => (None, Some(id)),
                        }
                    }
                };
                TType::Character { kind, len, len_expr }
            }
            ast::TypeSpec::Type(name) => TType::Derived(self.derived_type(name, &span, scope)?),
            ast::TypeSpec::Class(name) => {
                if name == "*" {
                    return Err(SemanticError::unsupported("Unlimited polymorphism is not supported", span));
                }
                TType::Class(self.derived_type(name, &span, scope)?)
            }
        })
    }

    fn derived_type(&self, name: &str, span: &Span, scope: ScopeId) -> SemanticResult<SymbolId> {
        let name = lower(name);
        let asr = &self.ctx.asr;
        let id = asr.lookup(scope, &name).ok_or_else(|| {
            SemanticError::new(
                SemanticErrorKind::UndeclaredSymbol,
                format!("Derived type '{}' is not declared", name),
                span.clone(),
            )
        })?;
        match asr.symbol(asr.past_external(id)).kind {
            SymbolKind::DerivedType(_) => Ok(id),
            _ => Err(SemanticError::type_mismatch(
                format!("'{}' is not a derived type", name),
                span.clone(),
            )),
        }
    }
}
