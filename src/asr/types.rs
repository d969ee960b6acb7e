use serde::{Deserialize, Serialize};

use super::{Asr, ExprId, SymbolId, SymbolKind};

/// One array dimension. Both halves unset means assumed or deferred shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub start: Option<ExprId>,
    pub length: Option<ExprId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TType {
    Integer(u8),
    Real(u8),
    Complex(u8),
    Logical(u8),
    Character {
        kind: u8,
        /// Known length; `None` when assumed, deferred or only known at runtime.
        len: Option<i64>,
        len_expr: Option<ExprId>,
    },
    Array {
        elem: Box<TType>,
        dims: Vec<Dimension>,
    },
    Derived(SymbolId),
    Class(SymbolId),
    Pointer(Box<TType>),
    Allocatable(Box<TType>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeCategory {
    Integer,
    Real,
    Complex,
    Logical,
    Character,
    Derived,
    Class,
}

impl TType {
    pub fn character(len: Option<i64>) -> TType {
        TType::Character {
            kind: 1,
            len,
            len_expr: None,
        }
    }

    pub fn array(elem: TType, dims: Vec<Dimension>) -> TType {
        if dims.is_empty() {
            return elem;
        }
        TType::Array {
            elem: Box::new(elem),
            dims,
        }
    }

    /// Strips `Pointer` and `Allocatable` wrappers.
    pub fn past_pointer(&self) -> &TType {
        match self {
            TType::Pointer(inner) | TType::Allocatable(inner) => inner.past_pointer(),
            other => other,
        }
    }

    /// Scalar element type of an array, or the type itself for scalars.
    pub fn element(&self) -> &TType {
        match self.past_pointer() {
            TType::Array { elem, .. } => elem.past_pointer(),
            other => other,
        }
    }

    pub fn dims(&self) -> &[Dimension] {
        match self.past_pointer() {
            TType::Array { dims, .. } => dims,
            _ => &[],
        }
    }

    pub fn rank(&self) -> usize {
        self.dims().len()
    }

    pub fn category(&self) -> TypeCategory {
        match self.element() {
            TType::Integer(_) => TypeCategory::Integer,
            TType::Real(_) => TypeCategory::Real,
            TType::Complex(_) => TypeCategory::Complex,
            TType::Logical(_) => TypeCategory::Logical,
            TType::Character { .. } => TypeCategory::Character,
            TType::Derived(_) => TypeCategory::Derived,
            TType::Class(_) => TypeCategory::Class,
            TType::Array { .. } | TType::Pointer(_) | TType::Allocatable(_) => {
                crate::internal_error!("element type is never an aggregate wrapper")
            }
        }
    }

    pub fn kind(&self) -> Option<u8> {
        match self.element() {
            TType::Integer(k) | TType::Real(k) | TType::Complex(k) | TType::Logical(k) => Some(*k),
            TType::Character { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.element(), TType::Integer(_))
    }
    pub fn is_real(&self) -> bool {
        matches!(self.element(), TType::Real(_))
    }
    pub fn is_complex(&self) -> bool {
        matches!(self.element(), TType::Complex(_))
    }
    pub fn is_logical(&self) -> bool {
        matches!(self.element(), TType::Logical(_))
    }
    pub fn is_character(&self) -> bool {
        matches!(self.element(), TType::Character { .. })
    }
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_real() || self.is_complex()
    }
    pub fn is_derived(&self) -> bool {
        matches!(self.element(), TType::Derived(_) | TType::Class(_))
    }
    pub fn is_array(&self) -> bool {
        self.rank() > 0
    }
    pub fn is_scalar(&self) -> bool {
        self.rank() == 0
    }

    /// Same shape as `self` with the element type replaced. Pointer and
    /// allocatable wrappers are not carried over: the result is a value type.
    pub fn with_element(&self, elem: TType) -> TType {
        TType::array(elem, self.dims().to_vec())
    }

    /// The derived-type symbol of a `type(t)` or `class(t)` value.
    pub fn derived_symbol(&self) -> Option<SymbolId> {
        match self.element() {
            TType::Derived(s) | TType::Class(s) => Some(*s),
            _ => None,
        }
    }
}

/// Structural type equality: category, kind and rank must agree. Character
/// lengths are compared only when both are known; derived types compare by
/// their defining symbol after peeling one external import.
pub fn types_equal(asr: &Asr, a: &TType, b: &TType) -> bool {
    if a.rank() != b.rank() {
        return false;
    }
    elements_equal(asr, a.element(), b.element())
}

pub fn elements_equal(asr: &Asr, a: &TType, b: &TType) -> bool {
    match (a, b) {
        (TType::Integer(x), TType::Integer(y))
        | (TType::Real(x), TType::Real(y))
        | (TType::Complex(x), TType::Complex(y))
        | (TType::Logical(x), TType::Logical(y)) => x == y,
        (
            TType::Character {
                kind: k1, len: l1, ..
            },
            TType::Character {
                kind: k2, len: l2, ..
            },
        ) => {
            k1 == k2
                && match (l1, l2) {
                    (Some(x), Some(y)) => x == y,
                    _ => true,
                }
        }
        (TType::Derived(x) | TType::Class(x), TType::Derived(y) | TType::Class(y)) => {
            asr.past_external(*x) == asr.past_external(*y)
        }
        _ => false,
    }
}

/// Whether a value of type `actual` may be passed where `formal` is expected.
/// `class(t)` accepts `t` and every extension of `t`.
pub fn argument_compatible(asr: &Asr, formal: &TType, actual: &TType) -> bool {
    if formal.rank() != actual.rank() {
        return false;
    }
    match (formal.element(), actual.element()) {
        (TType::Class(f), TType::Derived(a) | TType::Class(a)) => asr.extends(*a, *f),
        (f, a) => elements_equal(asr, f, a),
    }
}

pub fn type_name(asr: &Asr, ty: &TType) -> String {
    match ty {
        TType::Integer(k) => format!("integer({})", k),
        TType::Real(k) => format!("real({})", k),
        TType::Complex(k) => format!("complex({})", k),
        TType::Logical(k) => format!("logical({})", k),
        TType::Character { len, .. } => match len {
            Some(n) => format!("character(len={})", n),
            None => "character(len=*)".to_string(),
        },
        TType::Array { elem, dims } => {
            let dims: Vec<String> = dims
                .iter()
                .map(|d| {
                    let start = d.start.and_then(|e| asr.const_int(e));
                    let length = d.length.and_then(|e| asr.const_int(e));
                    match (start, length) {
                        (Some(s), Some(n)) if s == 1 => n.to_string(),
                        (Some(s), Some(n)) => format!("{}:{}", s, s as i128 + n as i128 - 1),
                        (_, None) if d.length.is_none() => ":".to_string(),
                        _ => "*".to_string(),
                    }
                })
                .collect();
            format!("{}({})", type_name(asr, elem), dims.join(","))
        }
        TType::Derived(s) => format!("type({})", asr.symbol(*s).name),
        TType::Class(s) => format!("class({})", asr.symbol(*s).name),
        TType::Pointer(inner) => format!("pointer {}", type_name(asr, inner)),
        TType::Allocatable(inner) => format!("allocatable {}", type_name(asr, inner)),
    }
}

impl Asr {
    /// True when derived type `child` is `ancestor` or extends it.
    pub fn extends(&self, child: SymbolId, ancestor: SymbolId) -> bool {
        let ancestor = self.past_external(ancestor);
        let mut cur = Some(self.past_external(child));
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = match &self.symbol(c).kind {
                SymbolKind::DerivedType(dt) => dt.parent.map(|p| self.past_external(p)),
                _ => None,
            };
        }
        false
    }
}
