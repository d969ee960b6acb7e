//! Small construction kit for synthesized helper functions.

use crate::asr::{
    Abi, Access, Asr, BinOpKind, BoolOpKind, CmpOp, Constant, DefType, Dimension, ExprId, ExprKind, Function, Intent,
    ScopeId, Stmt, SymbolId, SymbolKind, TType, Variable,
};
use crate::errors::Span;

pub struct FunctionBuilder<'a> {
    pub asr: &'a mut Asr,
    parent: ScopeId,
    name: String,
    scope: ScopeId,
    args: Vec<SymbolId>,
    return_var: Option<SymbolId>,
    span: Span,
}

/// Assumed-shape array of the given rank.
pub fn assumed_shape(elem: TType, rank: usize) -> TType {
    TType::array(elem, vec![Dimension::default(); rank])
}

impl<'a> FunctionBuilder<'a> {
    /// Starts a function that will be registered in `parent` under a name
    /// derived from `base` that is not yet taken there.
    pub fn new(asr: &'a mut Asr, parent: ScopeId, base: &str, span: Span) -> Self {
        let name = asr.unique_name(parent, base);
        let scope = asr.new_scope(Some(parent));
        FunctionBuilder {
            asr,
            parent,
            name,
            scope,
            args: Vec::new(),
            return_var: None,
            span,
        }
    }

    fn declare(&mut self, name: &str, var: Variable) -> SymbolId {
        let id = self.asr.add_symbol(name, self.scope, SymbolKind::Variable(var));
        self.asr.overwrite(self.scope, name, id);
        id
    }

    pub fn arg(&mut self, name: &str, ty: TType, intent: Intent) -> SymbolId {
        let id = self.declare(name, Variable::local(ty).with_intent(intent));
        self.args.push(id);
        id
    }

    pub fn local(&mut self, name: &str, ty: TType) -> SymbolId {
        self.declare(name, Variable::local(ty))
    }

    pub fn returns(&mut self, name: &str, ty: TType) -> SymbolId {
        let id = self.declare(name, Variable::local(ty).with_intent(Intent::ReturnVar));
        self.return_var = Some(id);
        id
    }

    pub fn var(&mut self, sym: SymbolId) -> ExprId {
        let ty = match self.asr.variable(sym).and_then(|v| v.ty.clone()) {
            Some(ty) => ty,
            None => crate::internal_error!("helper variable '{}' has no type", self.asr.name(sym)),
        };
        self.asr.add_expr(ExprKind::Var(sym), ty, None, self.span.clone())
    }

    pub fn constant(&mut self, c: Constant, ty: TType) -> ExprId {
        self.asr.constant(c, ty, self.span.clone())
    }

    pub fn int(&mut self, v: i64) -> ExprId {
        self.constant(Constant::Integer(v), TType::Integer(4))
    }

    /// `array(i1, i2, ...)` with loop variables as subscripts.
    pub fn item(&mut self, array: SymbolId, indices: &[SymbolId]) -> ExprId {
        let base = self.var(array);
        let elem = self.asr.expr_type(base).element().clone();
        let indices = indices.iter().map(|i| self.var(*i)).collect();
        self.asr.add_expr(
            ExprKind::ArrayItem { array: base, indices },
            elem,
            None,
            self.span.clone(),
        )
    }

    /// `array(k)` with a literal subscript.
    pub fn item_at(&mut self, array: SymbolId, k: i64) -> ExprId {
        let base = self.var(array);
        let elem = self.asr.expr_type(base).element().clone();
        let index = self.int(k);
        self.asr.add_expr(
            ExprKind::ArrayItem {
                array: base,
                indices: vec![index],
            },
            elem,
            None,
            self.span.clone(),
        )
    }

    pub fn size(&mut self, array: SymbolId, dim: usize) -> ExprId {
        let base = self.var(array);
        let dim = self.int(dim as i64);
        self.asr.add_expr(
            ExprKind::ArraySize {
                array: base,
                dim: Some(dim),
            },
            TType::Integer(4),
            None,
            self.span.clone(),
        )
    }

    pub fn binop(&mut self, left: ExprId, op: BinOpKind, right: ExprId) -> ExprId {
        let ty = self.asr.expr_type(left).clone();
        let kind = ExprKind::BinOp {
            left,
            op,
            right,
            overloaded: None,
        };
        self.asr.add_expr(kind, ty, None, self.span.clone())
    }

    pub fn compare(&mut self, left: ExprId, op: CmpOp, right: ExprId) -> ExprId {
        let kind = ExprKind::Compare {
            left,
            op,
            right,
            overloaded: None,
        };
        self.asr.add_expr(kind, TType::Logical(4), None, self.span.clone())
    }

    pub fn boolop(&mut self, left: ExprId, op: BoolOpKind, right: ExprId) -> ExprId {
        let ty = self.asr.expr_type(left).clone();
        let kind = ExprKind::BoolOp {
            left,
            op,
            right,
            overloaded: None,
        };
        self.asr.add_expr(kind, ty, None, self.span.clone())
    }

    pub fn assign(&self, target: ExprId, value: ExprId) -> Stmt {
        Stmt::Assignment { target, value }
    }

    /// Wraps `body` in one counted loop per entry of `vars`, running each
    /// over the extent of the matching dimension of `array`. `vars[0]` is
    /// the innermost loop, so elements are visited in array element order.
    pub fn loop_nest(&mut self, vars: &[SymbolId], array: SymbolId, body: Vec<Stmt>) -> Vec<Stmt> {
        let mut body = body;
        for (d, v) in vars.iter().enumerate() {
            let var = self.var(*v);
            let start = self.int(1);
            let end = self.size(array, d + 1);
            body = vec![Stmt::DoLoop {
                var,
                start,
                end,
                step: None,
                body,
            }];
        }
        body
    }

    /// Registers the finished function in its parent scope.
    pub fn finish(self, body: Vec<Stmt>) -> SymbolId {
        let func = Function {
            scope: self.scope,
            args: self.args,
            return_var: self.return_var,
            body,
            abi: Abi::Source,
            deftype: DefType::Implementation,
            access: Access::Private,
            dependencies: Vec::new(),
        };
        let id = self.asr.add_symbol(self.name.clone(), self.parent, SymbolKind::Function(func));
        self.asr.scope_mut(self.scope).owner = Some(id);
        self.asr.overwrite(self.parent, &self.name, id);
        id
    }
}
