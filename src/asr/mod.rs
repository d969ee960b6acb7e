//! Abstract Semantic Representation.
//!
//! All nodes of one translation unit live in a single [`Asr`] arena and refer
//! to each other through typed indices. Nothing is freed individually.

use serde::{Deserialize, Serialize};

use crate::errors::Span;

mod fmt;
pub mod remap;
pub mod symtab;
pub mod types;
pub mod verify;

pub use fmt::{AsrDump, ExprDisplay};
pub use symtab::{HelperKey, SymbolTable};
pub use types::{type_name, types_equal, Dimension, TType, TypeCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(pub usize);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asr {
    pub symbols: Vec<Symbol>,
    pub scopes: Vec<SymbolTable>,
    pub exprs: Vec<Expr>,
    pub root: ScopeId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub owner: ScopeId,
    pub kind: SymbolKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SymbolKind {
    Variable(Variable),
    Function(Function),
    Module(Module),
    Program(Program),
    GenericProcedure(GenericProcedure),
    ClassProcedure(ClassProcedure),
    DerivedType(DerivedType),
    ExternalSymbol(ExternalSymbol),
    Block(Block),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presence {
    Required,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Local,
    /// Dummy argument declared without `intent(...)`.
    Unspecified,
    In,
    Out,
    InOut,
    ReturnVar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Storage {
    Default,
    Save,
    Parameter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Abi {
    Source,
    /// Placeholder left behind by an interactive session; may be redeclared.
    Interactive,
    Intrinsic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefType {
    Implementation,
    Interface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dispatch {
    /// The receiver is passed as the first dummy argument.
    Pass,
    NoPass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    /// `None` only for associate aliases, whose type is that of `symbolic_value`.
    pub ty: Option<TType>,
    pub intent: Intent,
    pub storage: Storage,
    pub access: Access,
    pub presence: Presence,
    pub target: bool,
    pub init: Option<ExprId>,
    /// Compile-time value of a `parameter`.
    pub value: Option<ExprId>,
    pub symbolic_value: Option<ExprId>,
}

impl Variable {
    pub fn local(ty: TType) -> Variable {
        Variable {
            ty: Some(ty),
            intent: Intent::Local,
            storage: Storage::Default,
            access: Access::Public,
            presence: Presence::Required,
            target: false,
            init: None,
            value: None,
            symbolic_value: None,
        }
    }

    pub fn with_intent(mut self, intent: Intent) -> Variable {
        self.intent = intent;
        self
    }

    pub fn is_alias(&self) -> bool {
        self.ty.is_none() && self.symbolic_value.is_some()
    }

    pub fn is_dummy(&self) -> bool {
        matches!(
            self.intent,
            Intent::In | Intent::Out | Intent::InOut | Intent::Unspecified
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub scope: ScopeId,
    pub args: Vec<SymbolId>,
    pub return_var: Option<SymbolId>,
    pub body: Vec<Stmt>,
    pub abi: Abi,
    pub deftype: DefType,
    pub access: Access,
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub scope: ScopeId,
    pub dependencies: Vec<String>,
    pub intrinsic: bool,
    pub loaded_from_mod: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub scope: ScopeId,
    pub dependencies: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericProcedure {
    /// Candidates in declaration order.
    pub procs: Vec<SymbolId>,
    pub access: Access,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassProcedure {
    pub proc: SymbolId,
    pub proc_name: String,
    pub dispatch: Dispatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedType {
    pub scope: ScopeId,
    /// Component names in declaration order, own components only.
    pub members: Vec<String>,
    pub parent: Option<SymbolId>,
    pub access: Access,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalSymbol {
    pub target: SymbolId,
    pub module_name: String,
    pub original_name: String,
    pub access: Access,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub scope: ScopeId,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Integer(i64),
    Real(f64),
    Complex(f64, f64),
    Logical(bool),
    Str(String),
    Array(Vec<Constant>),
}

impl Constant {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Constant::Integer(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Constant::Integer(v) => Some(*v as f64),
            Constant::Real(v) => Some(*v),
            _ => None,
        }
    }
    pub fn as_complex(&self) -> Option<(f64, f64)> {
        match self {
            Constant::Integer(v) => Some((*v as f64, 0.0)),
            Constant::Real(v) => Some((*v, 0.0)),
            Constant::Complex(re, im) => Some((*re, *im)),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Constant::Logical(b) => Some(*b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolOpKind {
    And,
    Or,
    Eqv,
    NEqv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOpKind {
    Minus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastKind {
    IntegerToReal,
    RealToInteger,
    IntegerToInteger,
    RealToReal,
    IntegerToComplex,
    RealToComplex,
    ComplexToReal,
    ComplexToInteger,
    ComplexToComplex,
    LogicalToInteger,
    IntegerToLogical,
    LogicalToLogical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundKind {
    Lower,
    Upper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrayIntrinsic {
    Sum,
    Product,
    MaxVal,
    MinVal,
    Any,
    All,
    Parity,
    Count,
    MaxLoc,
    MinLoc,
    Merge,
    Shape,
}

impl ArrayIntrinsic {
    pub fn name(self) -> &'static str {
        match self {
            ArrayIntrinsic::Sum => "sum",
            ArrayIntrinsic::Product => "product",
            ArrayIntrinsic::MaxVal => "maxval",
            ArrayIntrinsic::MinVal => "minval",
            ArrayIntrinsic::Any => "any",
            ArrayIntrinsic::All => "all",
            ArrayIntrinsic::Parity => "parity",
            ArrayIntrinsic::Count => "count",
            ArrayIntrinsic::MaxLoc => "maxloc",
            ArrayIntrinsic::MinLoc => "minloc",
            ArrayIntrinsic::Merge => "merge",
            ArrayIntrinsic::Shape => "shape",
        }
    }
}

/// Which optional arguments an array reduction was called with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Overload {
    Array,
    ArrayDim,
    ArrayMask,
    ArrayDimMask,
}

impl Overload {
    pub fn id(self) -> u8 {
        match self {
            Overload::Array => 0,
            Overload::ArrayDim => 1,
            Overload::ArrayMask => 2,
            Overload::ArrayDimMask => 3,
        }
    }
    pub fn has_dim(self) -> bool {
        matches!(self, Overload::ArrayDim | Overload::ArrayDimMask)
    }
    pub fn has_mask(self) -> bool {
        matches!(self, Overload::ArrayMask | Overload::ArrayDimMask)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TType,
    /// Literal node holding the compile-time value, when there is one.
    pub value: Option<ExprId>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Constant(Constant),
    ArrayConstructor(Vec<ExprId>),
    ComplexConstructor {
        re: ExprId,
        im: ExprId,
    },
    Var(SymbolId),
    BinOp {
        left: ExprId,
        op: BinOpKind,
        right: ExprId,
        overloaded: Option<ExprId>,
    },
    Compare {
        left: ExprId,
        op: CmpOp,
        right: ExprId,
        overloaded: Option<ExprId>,
    },
    BoolOp {
        left: ExprId,
        op: BoolOpKind,
        right: ExprId,
        overloaded: Option<ExprId>,
    },
    StrConcat {
        left: ExprId,
        right: ExprId,
        overloaded: Option<ExprId>,
    },
    UnaryOp {
        op: UnaryOpKind,
        operand: ExprId,
        overloaded: Option<ExprId>,
    },
    Cast {
        arg: ExprId,
        kind: CastKind,
    },
    FunctionCall {
        name: SymbolId,
        /// The generic procedure the call was resolved through.
        original: Option<SymbolId>,
        args: Vec<Option<ExprId>>,
        /// Receiver of a type-bound call.
        dt: Option<ExprId>,
    },
    IntrinsicArrayFunction {
        intrinsic: ArrayIntrinsic,
        overload: Overload,
        args: Vec<ExprId>,
    },
    ArrayItem {
        array: ExprId,
        indices: Vec<ExprId>,
    },
    DerivedRef {
        base: ExprId,
        member: SymbolId,
    },
    StructConstructor {
        dt: SymbolId,
        args: Vec<ExprId>,
    },
    ArraySize {
        array: ExprId,
        dim: Option<ExprId>,
    },
    ArrayBound {
        array: ExprId,
        dim: ExprId,
        bound: BoundKind,
    },
}

impl ExprKind {
    /// Operand sub-expressions, excluding constant values and type dimensions.
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            ExprKind::Constant(_) | ExprKind::Var(_) => Vec::new(),
            ExprKind::ArrayConstructor(items) => items.clone(),
            ExprKind::ComplexConstructor { re, im } => vec![*re, *im],
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
                let mut v = vec![*left, *right];
                v.extend(overloaded.iter().copied());
                v
            }
            ExprKind::UnaryOp {
                operand,
                overloaded,
                ..
            } => {
                let mut v = vec![*operand];
                v.extend(overloaded.iter().copied());
                v
            }
            ExprKind::Cast { arg, .. } => vec![*arg],
            ExprKind::FunctionCall { args, dt, .. } => {
                let mut v: Vec<ExprId> = args.iter().flatten().copied().collect();
                v.extend(dt.iter().copied());
                v
            }
            ExprKind::IntrinsicArrayFunction { args, .. } => args.clone(),
            ExprKind::ArrayItem { array, indices } => {
                let mut v = vec![*array];
                v.extend(indices.iter().copied());
                v
            }
            ExprKind::DerivedRef { base, .. } => vec![*base],
            ExprKind::StructConstructor { args, .. } => args.clone(),
            ExprKind::ArraySize { array, dim } => {
                let mut v = vec![*array];
                v.extend(dim.iter().copied());
                v
            }
            ExprKind::ArrayBound { array, dim, .. } => vec![*array, *dim],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Assignment {
        target: ExprId,
        value: ExprId,
    },
    If {
        cond: ExprId,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    DoLoop {
        var: ExprId,
        start: ExprId,
        end: ExprId,
        step: Option<ExprId>,
        body: Vec<Stmt>,
    },
    WhileLoop {
        cond: ExprId,
        body: Vec<Stmt>,
    },
    SubroutineCall {
        name: SymbolId,
        original: Option<SymbolId>,
        args: Vec<Option<ExprId>>,
        dt: Option<ExprId>,
    },
    Print(Vec<ExprId>),
    Return,
    Exit,
    Cycle,
    Stop(Option<ExprId>),
    BlockCall(SymbolId),
}

impl Default for Asr {
    fn default() -> Self {
        Self::new()
    }
}

impl Asr {
    pub fn new() -> Self {
        Asr {
            symbols: Vec::new(),
            scopes: vec![SymbolTable::default()],
            exprs: Vec::new(),
            root: ScopeId(0),
        }
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }
    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }
    pub fn scope(&self, id: ScopeId) -> &SymbolTable {
        &self.scopes[id.0]
    }
    pub fn scope_mut(&mut self, id: ScopeId) -> &mut SymbolTable {
        &mut self.scopes[id.0]
    }
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0]
    }
    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.0]
    }
    pub fn expr_type(&self, id: ExprId) -> &TType {
        &self.exprs[id.0].ty
    }
    pub fn name(&self, id: SymbolId) -> &str {
        &self.symbols[id.0].name
    }

    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(SymbolTable {
            parent,
            ..SymbolTable::default()
        });
        ScopeId(self.scopes.len() - 1)
    }

    /// Adds a symbol to the arena without registering it in any scope.
    pub fn add_symbol(&mut self, name: impl Into<String>, owner: ScopeId, kind: SymbolKind) -> SymbolId {
        self.symbols.push(Symbol {
            name: name.into(),
            owner,
            kind,
        });
        SymbolId(self.symbols.len() - 1)
    }

    pub fn add_expr(&mut self, kind: ExprKind, ty: TType, value: Option<ExprId>, span: Span) -> ExprId {
        self.exprs.push(Expr {
            kind,
            ty,
            value,
            span,
        });
        ExprId(self.exprs.len() - 1)
    }

    pub fn constant(&mut self, value: Constant, ty: TType, span: Span) -> ExprId {
        self.add_expr(ExprKind::Constant(value), ty, None, span)
    }

    /// The compile-time value of an expression: the literal itself, or the
    /// attached value node.
    pub fn const_value(&self, id: ExprId) -> Option<&Constant> {
        let e = self.expr(id);
        match &e.kind {
            ExprKind::Constant(c) => Some(c),
            _ => e.value.and_then(|v| self.const_value(v)),
        }
    }

    pub fn const_int(&self, id: ExprId) -> Option<i64> {
        self.const_value(id).and_then(Constant::as_int)
    }

    pub fn is_constant(&self, id: ExprId) -> bool {
        self.const_value(id).is_some()
    }

    /// Peels one `ExternalSymbol` layer.
    pub fn past_external(&self, id: SymbolId) -> SymbolId {
        match &self.symbol(id).kind {
            SymbolKind::ExternalSymbol(ext) => ext.target,
            _ => id,
        }
    }

    pub fn variable(&self, id: SymbolId) -> Option<&Variable> {
        match &self.symbol(self.past_external(id)).kind {
            SymbolKind::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn function(&self, id: SymbolId) -> Option<&Function> {
        match &self.symbol(self.past_external(id)).kind {
            SymbolKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Whether `id` is a procedure left by an interactive session, which a
    /// later definition of the same name replaces.
    pub fn is_interactive_stub(&self, id: SymbolId) -> bool {
        self.function(id).is_some_and(|f| f.abi == Abi::Interactive)
    }

    /// Scope owned by a scoped symbol (module, program, procedure, type, block).
    pub fn symbol_scope(&self, id: SymbolId) -> Option<ScopeId> {
        match &self.symbol(id).kind {
            SymbolKind::Function(f) => Some(f.scope),
            SymbolKind::Module(m) => Some(m.scope),
            SymbolKind::Program(p) => Some(p.scope),
            SymbolKind::DerivedType(d) => Some(d.scope),
            SymbolKind::Block(b) => Some(b.scope),
            _ => None,
        }
    }

    /// Type of a function's result, `None` for subroutines.
    pub fn return_type(&self, func: SymbolId) -> Option<TType> {
        let f = self.function(func)?;
        let rv = f.return_var?;
        self.variable(rv).and_then(|v| v.ty.clone())
    }

    pub fn access(&self, id: SymbolId) -> Access {
        match &self.symbol(id).kind {
            SymbolKind::Variable(v) => v.access,
            SymbolKind::Function(f) => f.access,
            SymbolKind::GenericProcedure(g) => g.access,
            SymbolKind::DerivedType(d) => d.access,
            SymbolKind::ExternalSymbol(e) => e.access,
            _ => Access::Public,
        }
    }

    pub fn set_access(&mut self, id: SymbolId, access: Access) {
        match &mut self.symbol_mut(id).kind {
            SymbolKind::Variable(v) => v.access = access,
            SymbolKind::Function(f) => f.access = access,
            SymbolKind::GenericProcedure(g) => g.access = access,
            SymbolKind::DerivedType(d) => d.access = access,
            SymbolKind::ExternalSymbol(e) => e.access = access,
            _ => {}
        }
    }

    /// The module, program or top-level procedure whose scope encloses `scope`.
    pub fn enclosing_unit(&self, scope: ScopeId) -> Option<SymbolId> {
        let mut cur = scope;
        loop {
            let table = self.scope(cur);
            let parent = table.parent?;
            if parent == self.root {
                return table.owner;
            }
            cur = parent;
        }
    }

    /// Records that the unit enclosing `scope` depends on `module`.
    pub fn add_dependency(&mut self, scope: ScopeId, module: &str) {
        let Some(unit) = self.enclosing_unit(scope) else {
            return;
        };
        let deps = match &mut self.symbol_mut(unit).kind {
            SymbolKind::Module(m) => &mut m.dependencies,
            SymbolKind::Program(p) => &mut p.dependencies,
            SymbolKind::Function(f) => &mut f.dependencies,
            _ => return,
        };
        if !deps.iter().any(|d| d == module) {
            deps.push(module.to_string());
        }
    }

    /// Copies an expression tree into fresh nodes.
    pub fn deep_copy_expr(&mut self, id: ExprId) -> ExprId {
        let mut e = self.expr(id).clone();
        let copy = |asr: &mut Asr, x: &mut ExprId| *x = asr.deep_copy_expr(*x);
        match &mut e.kind {
            ExprKind::Constant(_) | ExprKind::Var(_) => {}
            ExprKind::ArrayConstructor(items) => items.iter_mut().for_each(|x| copy(self, x)),
            ExprKind::ComplexConstructor { re, im } => {
                copy(self, re);
                copy(self, im);
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
                copy(self, left);
                copy(self, right);
                if let Some(o) = overloaded {
                    copy(self, o);
                }
            }
            ExprKind::UnaryOp {
                operand,
                overloaded,
                ..
            } => {
                copy(self, operand);
                if let Some(o) = overloaded {
                    copy(self, o);
                }
            }
            ExprKind::Cast { arg, .. } => copy(self, arg),
            ExprKind::FunctionCall { args, dt, .. } => {
                args.iter_mut().flatten().for_each(|x| copy(self, x));
                if let Some(d) = dt {
                    copy(self, d);
                }
            }
            ExprKind::IntrinsicArrayFunction { args, .. } => {
                args.iter_mut().for_each(|x| copy(self, x))
            }
            ExprKind::ArrayItem { array, indices } => {
                copy(self, array);
                indices.iter_mut().for_each(|x| copy(self, x));
            }
            ExprKind::DerivedRef { base, .. } => copy(self, base),
            ExprKind::StructConstructor { args, .. } => args.iter_mut().for_each(|x| copy(self, x)),
            ExprKind::ArraySize { array, dim } => {
                copy(self, array);
                if let Some(d) = dim {
                    copy(self, d);
                }
            }
            ExprKind::ArrayBound { array, dim, .. } => {
                copy(self, array);
                copy(self, dim);
            }
        }
        self.exprs.push(e);
        ExprId(self.exprs.len() - 1)
    }
}
