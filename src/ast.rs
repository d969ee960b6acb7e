//! The syntax tree consumed by semantic analysis.
//!
//! Trees arrive already validated by the parser, usually as JSON. Every
//! optional field defaults so hand written trees stay short.

use serde::{Deserialize, Serialize};

use crate::errors::Span;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub items: Vec<ProgramUnit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProgramUnit {
    Module(Module),
    Program(Program),
    Subprogram(Subprogram),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub uses: Vec<Use>,
    #[serde(default)]
    pub implicit: Vec<ImplicitStmt>,
    #[serde(default)]
    pub decls: Vec<Decl>,
    #[serde(default)]
    pub contains: Vec<Subprogram>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    #[serde(default)]
    pub uses: Vec<Use>,
    #[serde(default)]
    pub implicit: Vec<ImplicitStmt>,
    #[serde(default)]
    pub decls: Vec<Decl>,
    #[serde(default)]
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub contains: Vec<Subprogram>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubprogramKind {
    Function,
    Subroutine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subprogram {
    pub kind: SubprogramKind,
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// `integer function f()` style type prefix.
    #[serde(default)]
    pub prefix_type: Option<TypeSpec>,
    /// `result(r)` clause.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub uses: Vec<Use>,
    #[serde(default)]
    pub implicit: Vec<ImplicitStmt>,
    #[serde(default)]
    pub decls: Vec<Decl>,
    #[serde(default)]
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub contains: Vec<Subprogram>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Use {
    pub module: String,
    /// `None` imports every public symbol; `Some` is an `only:` list.
    #[serde(default)]
    pub only: Option<Vec<UseSymbol>>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UseSymbol {
    /// Name in the used module.
    pub remote: String,
    /// `local => remote` rename.
    #[serde(default)]
    pub local: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ImplicitStmt {
    None,
    Rule {
        type_spec: TypeSpec,
        ranges: Vec<LetterRange>,
        #[serde(default)]
        span: Span,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetterRange {
    pub start: char,
    #[serde(default)]
    pub end: Option<char>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeSpec {
    Integer(Option<Expr>),
    Real(Option<Expr>),
    DoublePrecision,
    Complex(Option<Expr>),
    Logical(Option<Expr>),
    Character {
        #[serde(default)]
        len: Option<CharLen>,
        #[serde(default)]
        kind: Option<Expr>,
    },
    Type(String),
    Class(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CharLen {
    Expr(Expr),
    /// `len=*`
    Assumed,
    /// `len=:`
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Attribute {
    Parameter,
    Allocatable,
    Pointer,
    Target,
    Optional,
    Save,
    Public,
    Private,
    Intent(Intent),
    Dimension(Vec<DimSpec>),
}

/// One `lower:upper` pair. `:` alone leaves both unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DimSpec {
    #[serde(default)]
    pub start: Option<Expr>,
    #[serde(default)]
    pub end: Option<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Decl {
    Var(VarDecl),
    /// Attribute statement without a type: `private`, `public :: f`, `optional :: x`.
    Attribute {
        attr: Attribute,
        #[serde(default)]
        names: Vec<String>,
        #[serde(default)]
        span: Span,
    },
    DerivedType(DerivedTypeDecl),
    Interface(InterfaceDecl),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub type_spec: TypeSpec,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub dims: Vec<DimSpec>,
    #[serde(default)]
    pub init: Option<Expr>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedTypeDecl {
    pub name: String,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub access: Option<Attribute>,
    #[serde(default)]
    pub components: Vec<VarDecl>,
    #[serde(default)]
    pub procedures: Vec<TypeBoundProcedure>,
    #[serde(default)]
    pub generics: Vec<TypeBoundGeneric>,
    #[serde(default)]
    pub span: Span,
}

/// `procedure [, nopass] :: name [=> implementation]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeBoundProcedure {
    pub name: String,
    #[serde(default)]
    pub implementation: Option<String>,
    #[serde(default)]
    pub nopass: bool,
    #[serde(default)]
    pub span: Span,
}

/// `generic :: name => a, b`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeBoundGeneric {
    pub name: String,
    pub procedures: Vec<String>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDecl {
    #[serde(default)]
    pub header: InterfaceHeader,
    pub items: Vec<InterfaceItem>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum InterfaceHeader {
    #[default]
    Plain,
    Generic(String),
    /// Operator token as written: `+`, `==`, `.and.`, `.cross.`.
    Operator(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InterfaceItem {
    ModuleProcedure(Vec<String>),
    Body(Subprogram),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Assign {
        target: Expr,
        value: Expr,
        #[serde(default)]
        span: Span,
    },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        #[serde(default)]
        else_body: Option<Vec<Stmt>>,
        #[serde(default)]
        span: Span,
    },
    Do {
        var: String,
        start: Expr,
        end: Expr,
        #[serde(default)]
        step: Option<Expr>,
        body: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    DoWhile {
        cond: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    Call {
        /// `call a%b%name(...)` receiver chain.
        #[serde(default)]
        receiver: Vec<String>,
        name: String,
        #[serde(default)]
        args: Vec<Arg>,
        #[serde(default)]
        span: Span,
    },
    Print {
        items: Vec<Expr>,
        #[serde(default)]
        span: Span,
    },
    Return {
        #[serde(default)]
        span: Span,
    },
    Exit {
        #[serde(default)]
        span: Span,
    },
    Cycle {
        #[serde(default)]
        span: Span,
    },
    Stop {
        #[serde(default)]
        code: Option<Expr>,
        #[serde(default)]
        span: Span,
    },
    Block {
        #[serde(default)]
        decls: Vec<Decl>,
        body: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
    Associate {
        associations: Vec<Association>,
        body: Vec<Stmt>,
        #[serde(default)]
        span: Span,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    pub name: String,
    pub expr: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    Eqv,
    Neqv,
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arg {
    #[serde(default)]
    pub keyword: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    /// Digits with an optional `_kind` suffix: `7`, `7_8`, `7_ik`.
    Int(String),
    /// `1.5`, `1.5d0`, `2.0_8`, `1e3_dp`.
    Real(String),
    Complex(Box<Expr>, Box<Expr>),
    Str(String),
    Logical(bool),
    Name(String),
    /// `base%m1%m2`
    Member {
        base: String,
        members: Vec<String>,
    },
    /// `name(args)`, or `r1%r2%name(args)` when `receiver` is non-empty.
    Call {
        #[serde(default)]
        receiver: Vec<String>,
        name: String,
        #[serde(default)]
        args: Vec<Arg>,
    },
    Bin(BinOp, Box<Expr>, Box<Expr>),
    Un(UnOp, Box<Expr>),
    /// `a .op. b` with a user-defined operator name (without dots).
    DefinedBin(String, Box<Expr>, Box<Expr>),
    DefinedUn(String, Box<Expr>),
    Paren(Box<Expr>),
    Array(Vec<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind) -> Expr {
        Expr { kind, span: 0..0 }
    }
    pub fn at(mut self, span: Span) -> Expr {
        self.span = span;
        self
    }

    pub fn int(value: impl Into<String>) -> Expr {
        Expr::new(ExprKind::Int(value.into()))
    }
    pub fn real(value: impl Into<String>) -> Expr {
        Expr::new(ExprKind::Real(value.into()))
    }
    pub fn complex(re: Expr, im: Expr) -> Expr {
        Expr::new(ExprKind::Complex(Box::new(re), Box::new(im)))
    }
    pub fn string(value: impl Into<String>) -> Expr {
        Expr::new(ExprKind::Str(value.into()))
    }
    pub fn logical(value: bool) -> Expr {
        Expr::new(ExprKind::Logical(value))
    }
    pub fn name(name: impl Into<String>) -> Expr {
        Expr::new(ExprKind::Name(name.into()))
    }
    pub fn member(base: impl Into<String>, members: &[&str]) -> Expr {
        Expr::new(ExprKind::Member {
            base: base.into(),
            members: members.iter().map(|m| m.to_string()).collect(),
        })
    }
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::new(ExprKind::Call {
            receiver: Vec::new(),
            name: name.into(),
            args: args.into_iter().map(Arg::positional).collect(),
        })
    }
    pub fn call_with(name: impl Into<String>, args: Vec<Arg>) -> Expr {
        Expr::new(ExprKind::Call {
            receiver: Vec::new(),
            name: name.into(),
            args,
        })
    }
    pub fn method(receiver: &[&str], name: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::new(ExprKind::Call {
            receiver: receiver.iter().map(|r| r.to_string()).collect(),
            name: name.into(),
            args: args.into_iter().map(Arg::positional).collect(),
        })
    }
    pub fn array(items: Vec<Expr>) -> Expr {
        Expr::new(ExprKind::Array(items))
    }
    pub fn paren(e: Expr) -> Expr {
        Expr::new(ExprKind::Paren(Box::new(e)))
    }
    pub fn defined(op: impl Into<String>, l: Expr, r: Expr) -> Expr {
        Expr::new(ExprKind::DefinedBin(op.into(), Box::new(l), Box::new(r)))
    }

    fn bin(op: BinOp, l: Expr, r: Expr) -> Expr {
        Expr::new(ExprKind::Bin(op, Box::new(l), Box::new(r)))
    }
    pub fn add(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Add, l, r)
    }
    pub fn sub(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Sub, l, r)
    }
    pub fn mul(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Mul, l, r)
    }
    pub fn div(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Div, l, r)
    }
    pub fn pow(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Pow, l, r)
    }

    pub fn eq(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Eq, l, r)
    }
    pub fn ne(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Ne, l, r)
    }
    pub fn lt(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Lt, l, r)
    }
    pub fn gt(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Gt, l, r)
    }
    pub fn le(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Le, l, r)
    }
    pub fn ge(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Ge, l, r)
    }

    pub fn and(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::And, l, r)
    }
    pub fn or(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Or, l, r)
    }
    pub fn eqv(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Eqv, l, r)
    }
    pub fn neqv(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Neqv, l, r)
    }

    pub fn concat(l: Expr, r: Expr) -> Expr {
        Expr::bin(BinOp::Concat, l, r)
    }

    pub fn neg(e: Expr) -> Expr {
        Expr::new(ExprKind::Un(UnOp::Neg, Box::new(e)))
    }
    pub fn not(e: Expr) -> Expr {
        Expr::new(ExprKind::Un(UnOp::Not, Box::new(e)))
    }
}

impl Arg {
    pub fn positional(value: Expr) -> Arg {
        Arg {
            keyword: None,
            value,
        }
    }
    pub fn keyword(keyword: impl Into<String>, value: Expr) -> Arg {
        Arg {
            keyword: Some(keyword.into()),
            value,
        }
    }
}

impl TypeSpec {
    pub fn integer() -> TypeSpec {
        TypeSpec::Integer(None)
    }
    pub fn integer_kind(kind: i64) -> TypeSpec {
        TypeSpec::Integer(Some(Expr::int(kind.to_string())))
    }
    pub fn real() -> TypeSpec {
        TypeSpec::Real(None)
    }
    pub fn real_kind(kind: i64) -> TypeSpec {
        TypeSpec::Real(Some(Expr::int(kind.to_string())))
    }
    pub fn complex() -> TypeSpec {
        TypeSpec::Complex(None)
    }
    pub fn logical() -> TypeSpec {
        TypeSpec::Logical(None)
    }
    pub fn character(len: i64) -> TypeSpec {
        TypeSpec::Character {
            len: Some(CharLen::Expr(Expr::int(len.to_string()))),
            kind: None,
        }
    }
    pub fn derived(name: impl Into<String>) -> TypeSpec {
        TypeSpec::Type(name.into())
    }
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Entity {
        Entity {
            name: name.into(),
            dims: Vec::new(),
            init: None,
            span: 0..0,
        }
    }
    pub fn with_dims(mut self, extents: &[i64]) -> Entity {
        self.dims = extents
            .iter()
            .map(|n| DimSpec {
                start: None,
                end: Some(Expr::int(n.to_string())),
            })
            .collect();
        self
    }
    /// Assumed shape of the given rank: `x(:,:)`.
    pub fn assumed(mut self, rank: usize) -> Entity {
        self.dims = vec![DimSpec::default(); rank];
        self
    }
    pub fn init(mut self, value: Expr) -> Entity {
        self.init = Some(value);
        self
    }
}

impl VarDecl {
    pub fn new(type_spec: TypeSpec, entities: Vec<Entity>) -> VarDecl {
        VarDecl {
            type_spec,
            attributes: Vec::new(),
            entities,
            span: 0..0,
        }
    }
    pub fn attr(mut self, attr: Attribute) -> VarDecl {
        self.attributes.push(attr);
        self
    }
}

impl Decl {
    pub fn var(type_spec: TypeSpec, names: &[&str]) -> Decl {
        Decl::Var(VarDecl::new(
            type_spec,
            names.iter().map(|n| Entity::new(*n)).collect(),
        ))
    }
    pub fn attribute(attr: Attribute, names: &[&str]) -> Decl {
        Decl::Attribute {
            attr,
            names: names.iter().map(|n| n.to_string()).collect(),
            span: 0..0,
        }
    }
}

impl Use {
    pub fn all(module: impl Into<String>) -> Use {
        Use {
            module: module.into(),
            only: None,
            span: 0..0,
        }
    }
    pub fn only(module: impl Into<String>, names: &[&str]) -> Use {
        Use {
            module: module.into(),
            only: Some(
                names
                    .iter()
                    .map(|n| UseSymbol {
                        remote: n.to_string(),
                        local: None,
                    })
                    .collect(),
            ),
            span: 0..0,
        }
    }
}

impl Module {
    pub fn new(name: impl Into<String>) -> Module {
        Module {
            name: name.into(),
            ..Module::default()
        }
    }
}

impl Program {
    pub fn new(name: impl Into<String>) -> Program {
        Program {
            name: name.into(),
            ..Program::default()
        }
    }
}

impl Subprogram {
    pub fn function(name: impl Into<String>, args: &[&str]) -> Subprogram {
        Subprogram::new(SubprogramKind::Function, name, args)
    }
    pub fn subroutine(name: impl Into<String>, args: &[&str]) -> Subprogram {
        Subprogram::new(SubprogramKind::Subroutine, name, args)
    }
    fn new(kind: SubprogramKind, name: impl Into<String>, args: &[&str]) -> Subprogram {
        Subprogram {
            kind,
            name: name.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            prefix_type: None,
            result: None,
            uses: Vec::new(),
            implicit: Vec::new(),
            decls: Vec::new(),
            body: Vec::new(),
            contains: Vec::new(),
            span: 0..0,
        }
    }
}

impl Stmt {
    pub fn assign(target: Expr, value: Expr) -> Stmt {
        Stmt::Assign {
            target,
            value,
            span: 0..0,
        }
    }
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Stmt {
        Stmt::Call {
            receiver: Vec::new(),
            name: name.into(),
            args: args.into_iter().map(Arg::positional).collect(),
            span: 0..0,
        }
    }
    pub fn print(items: Vec<Expr>) -> Stmt {
        Stmt::Print { items, span: 0..0 }
    }
}
