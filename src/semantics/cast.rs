//! Implicit conversion rules.
//!
//! Numeric operands are promoted by category priority (integer below real
//! below complex) and then by kind. The operand with the lower priority is
//! wrapped in a cast node; the other one is left untouched.

use crate::asr::types::{argument_compatible, elements_equal};
use crate::asr::{type_name, Asr, CastKind, ExprId, ExprKind, TType};
use crate::errors::{SemanticError, SemanticErrorKind, SemanticResult, Span};

use super::fold;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpFamily {
    Arithmetic,
    Comparison,
    Logical,
    Concatenation,
}

/// Which operand of a binary operation needs a cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastSide {
    None,
    Left,
    Right,
}

fn priority(ty: &TType) -> Option<(u8, u8)> {
    match ty.element() {
        TType::Integer(k) => Some((4, *k)),
        TType::Real(k) => Some((5, *k)),
        TType::Complex(k) => Some((6, *k)),
        _ => None,
    }
}

/// Common element type of two operands and the side that must be cast to it.
/// `None` when the operand categories cannot meet in this operator family.
pub fn result_type_of_binop(family: OpFamily, left: &TType, right: &TType) -> Option<(TType, CastSide)> {
    let (l, r) = (left.element(), right.element());
    match family {
        OpFamily::Arithmetic | OpFamily::Comparison => {
            if let (Some(pl), Some(pr)) = (priority(l), priority(r)) {
                return Some(if pl == pr {
                    (l.clone(), CastSide::None)
                } else if pl > pr {
                    (l.clone(), CastSide::Right)
                } else {
                    (r.clone(), CastSide::Left)
                });
            }
            match (l, r) {
                (TType::Character { kind: k1, .. }, TType::Character { kind: k2, .. })
                    if family == OpFamily::Comparison && k1 == k2 =>
                {
                    Some((l.clone(), CastSide::None))
                }
                _ => None,
            }
        }
        OpFamily::Logical => match (l, r) {
            (TType::Logical(a), TType::Logical(b)) => Some(if a == b {
                (l.clone(), CastSide::None)
            } else if a > b {
                (l.clone(), CastSide::Right)
            } else {
                (r.clone(), CastSide::Left)
            }),
            _ => None,
        },
        OpFamily::Concatenation => match (l, r) {
            (TType::Character { kind: k1, .. }, TType::Character { kind: k2, .. }) if k1 == k2 => {
                Some((l.clone(), CastSide::None))
            }
            _ => None,
        },
    }
}

/// The cast node kind converting element type `from` into `to`.
pub fn cast_kind(from: &TType, to: &TType) -> Option<CastKind> {
    use TType::*;
    Some(match (from.element(), to.element()) {
        (Integer(_), Real(_)) => CastKind::IntegerToReal,
        (Real(_), Integer(_)) => CastKind::RealToInteger,
        (Integer(_), Integer(_)) => CastKind::IntegerToInteger,
        (Real(_), Real(_)) => CastKind::RealToReal,
        (Integer(_), Complex(_)) => CastKind::IntegerToComplex,
        (Real(_), Complex(_)) => CastKind::RealToComplex,
        (Complex(_), Real(_)) => CastKind::ComplexToReal,
        (Complex(_), Integer(_)) => CastKind::ComplexToInteger,
        (Complex(_), Complex(_)) => CastKind::ComplexToComplex,
        (Logical(_), Integer(_)) => CastKind::LogicalToInteger,
        (Integer(_), Logical(_)) => CastKind::IntegerToLogical,
        (Logical(_), Logical(_)) => CastKind::LogicalToLogical,
        _ => return None,
    })
}

/// Wraps `expr` in a cast to element type `to`, keeping its shape. Returns
/// `expr` unchanged when the element types already agree.
pub fn insert_cast(asr: &mut Asr, expr: ExprId, to: &TType, span: Span) -> SemanticResult<ExprId> {
    let from = asr.expr_type(expr).clone();
    if elements_equal(asr, from.element(), to.element()) {
        return Ok(expr);
    }
    let Some(kind) = cast_kind(&from, to) else {
        return Err(SemanticError::new(
            SemanticErrorKind::UnsupportedCast,
            format!(
                "Cannot convert {} to {}",
                type_name(asr, from.element()),
                type_name(asr, to.element())
            ),
            span,
        ));
    };
    let ty = from.with_element(to.element().clone());
    let folded = asr.const_value(expr).and_then(|c| fold::cast(kind, c, to.element()));
    let value = folded.map(|c| asr.constant(c, ty.clone(), span.clone()));
    Ok(asr.add_expr(ExprKind::Cast { arg: expr, kind }, ty, value, span))
}

/// Converts `value` for assignment to a target of type `target`. The flag
/// is set when the conversion may lose information.
pub fn cast_for_assignment(
    asr: &mut Asr,
    value: ExprId,
    target: &TType,
    span: Span,
) -> SemanticResult<(ExprId, bool)> {
    let vty = asr.expr_type(value).clone();
    if vty.rank() != 0 && vty.rank() != target.rank() {
        return Err(SemanticError::type_mismatch(
            format!(
                "Cannot assign an array of rank {} to a target of rank {}",
                vty.rank(),
                target.rank()
            ),
            span,
        ));
    }
    let (v, t) = (vty.element(), target.element());
    if let (Some(pv), Some(pt)) = (priority(v), priority(t)) {
        let cast = insert_cast(asr, value, t, span)?;
        return Ok((cast, pv > pt));
    }
    let compatible = match (v, t) {
        (TType::Logical(_), TType::Logical(_)) => {
            return Ok((insert_cast(asr, value, t, span)?, false));
        }
        (TType::Character { kind: k1, .. }, TType::Character { kind: k2, .. }) => k1 == k2,
        _ => argument_compatible(asr, &target.with_element(t.clone()), &target.with_element(v.clone())),
    };
    if !compatible {
        return Err(SemanticError::type_mismatch(
            format!(
                "Type mismatch in assignment: cannot assign {} to {}",
                type_name(asr, v),
                type_name(asr, t)
            ),
            span,
        ));
    }
    Ok((value, false))
}

