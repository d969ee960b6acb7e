use thiserror::Error;

pub type Span = std::ops::Range<usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind {
    Semantic,
    Warning,
}

#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    pub span: Span,
}

impl CompileError {
    pub fn new(kind: CompileErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }
}

/// Every way user input can be rejected by semantic analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticErrorKind {
    UndeclaredSymbol,
    UndeclaredVariable,
    DuplicateSymbol,
    TypeMismatch,
    UnsupportedCast,
    UnsupportedComparison,
    NoMatchingOverload,
    AmbiguousOverload,
    NoSuchMember,
    NotCallable,
    IntrinsicContract,
    MissingReturnType,
    InvalidDeclaration,
    MisplacedStatement,
    ModuleLoad,
    Unsupported,
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind:?}: {message}")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub message: String,
    pub span: Span,
}

impl SemanticError {
    pub fn new(kind: SemanticErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn undeclared_symbol(name: &str, span: Span) -> Self {
        Self::new(
            SemanticErrorKind::UndeclaredSymbol,
            format!("Symbol '{}' is not declared", name),
            span,
        )
    }

    pub fn undeclared_variable(name: &str, span: Span) -> Self {
        Self::new(
            SemanticErrorKind::UndeclaredVariable,
            format!("Variable '{}' is not declared", name),
            span,
        )
    }

    pub fn duplicate(name: &str, span: Span) -> Self {
        Self::new(
            SemanticErrorKind::DuplicateSymbol,
            format!("Symbol '{}' is already declared in this scope", name),
            span,
        )
    }

    pub fn type_mismatch(message: impl Into<String>, span: Span) -> Self {
        Self::new(SemanticErrorKind::TypeMismatch, message, span)
    }

    pub fn contract(intrinsic: &str, message: impl AsRef<str>, span: Span) -> Self {
        Self::new(
            SemanticErrorKind::IntrinsicContract,
            format!("{}: {}", intrinsic, message.as_ref()),
            span,
        )
    }

    pub fn unsupported(message: impl Into<String>, span: Span) -> Self {
        Self::new(SemanticErrorKind::Unsupported, message, span)
    }
}

impl From<SemanticError> for CompileError {
    fn from(e: SemanticError) -> Self {
        CompileError::new(CompileErrorKind::Semantic, e.message, e.span)
    }
}

pub type SemanticResult<T> = Result<T, SemanticError>;

/// Aborts on a broken invariant of the analyser itself. These are bugs in this
/// crate, never problems in the program being compiled.
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        panic!("internal consistency error: {}", format!($($arg)*))
    };
}
