//! Compile-time evaluation of operations on literals.
//!
//! Every function returns `None` when the operation has no well-defined
//! constant result (division by zero, overflow to infinity, operands of the
//! wrong shape); the caller then simply leaves the node without a value.

use crate::asr::{BinOpKind, BoolOpKind, CastKind, CmpOp, Constant, TType, UnaryOpKind};

/// Wraps an integer into the range of the given kind.
pub fn wrap_int(v: i64, kind: u8) -> i64 {
    match kind {
        1 => v as i8 as i64,
        2 => v as i16 as i64,
        4 => v as i32 as i64,
        _ => v,
    }
}

/// Rounds a real to the precision of the given kind.
pub fn round_real(v: f64, kind: u8) -> f64 {
    if kind == 4 {
        v as f32 as f64
    } else {
        v
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn elementwise(l: &Constant, r: &Constant, f: &dyn Fn(&Constant, &Constant) -> Option<Constant>) -> Option<Constant> {
    match (l, r) {
        (Constant::Array(a), Constant::Array(b)) => {
            if a.len() != b.len() {
                return None;
            }
            a.iter()
                .zip(b)
                .map(|(x, y)| f(x, y))
                .collect::<Option<Vec<_>>>()
                .map(Constant::Array)
        }
        (Constant::Array(a), s) => a.iter().map(|x| f(x, s)).collect::<Option<Vec<_>>>().map(Constant::Array),
        (s, Constant::Array(b)) => b.iter().map(|y| f(s, y)).collect::<Option<Vec<_>>>().map(Constant::Array),
        _ => f(l, r),
    }
}

/// Folds an arithmetic operation whose result has element type `ty`. Both
/// operands are already converted to that type.
pub fn binop(op: BinOpKind, ty: &TType, l: &Constant, r: &Constant) -> Option<Constant> {
    let elem = ty.element().clone();
    elementwise(l, r, &|a, b| scalar_binop(op, &elem, a, b))
}

fn scalar_binop(op: BinOpKind, ty: &TType, l: &Constant, r: &Constant) -> Option<Constant> {
    match ty {
        TType::Integer(k) => {
            let (a, b) = (l.as_int()?, r.as_int()?);
            let v = match op {
                BinOpKind::Add => a.wrapping_add(b),
                BinOpKind::Sub => a.wrapping_sub(b),
                BinOpKind::Mul => a.wrapping_mul(b),
                BinOpKind::Div => {
                    if b == 0 {
                        return None;
                    }
                    a.wrapping_div(b)
                }
                BinOpKind::Pow => int_pow(a, b)?,
            };
            Some(Constant::Integer(wrap_int(v, *k)))
        }
        TType::Real(k) => {
            let (a, b) = (l.as_real()?, r.as_real()?);
            let v = if *k == 4 {
                let (a, b) = (a as f32, b as f32);
                (match op {
                    BinOpKind::Add => a + b,
                    BinOpKind::Sub => a - b,
                    BinOpKind::Mul => a * b,
                    BinOpKind::Div => a / b,
                    BinOpKind::Pow => a.powf(b),
                }) as f64
            } else {
                match op {
                    BinOpKind::Add => a + b,
                    BinOpKind::Sub => a - b,
                    BinOpKind::Mul => a * b,
                    BinOpKind::Div => a / b,
                    BinOpKind::Pow => a.powf(b),
                }
            };
            finite(v).map(Constant::Real)
        }
        TType::Complex(k) => {
            let (a, b) = (l.as_complex()?, r.as_complex()?);
            let (re, im) = match op {
                BinOpKind::Add => (a.0 + b.0, a.1 + b.1),
                BinOpKind::Sub => (a.0 - b.0, a.1 - b.1),
                BinOpKind::Mul => (a.0 * b.0 - a.1 * b.1, a.0 * b.1 + a.1 * b.0),
                BinOpKind::Div => complex_div(a, b)?,
                BinOpKind::Pow => complex_pow(a, b)?,
            };
            Some(Constant::Complex(round_real(finite(re)?, *k), round_real(finite(im)?, *k)))
        }
        _ => None,
    }
}

fn int_pow(base: i64, exp: i64) -> Option<i64> {
    if exp < 0 {
        return match base {
            1 => Some(1),
            -1 => Some(if exp % 2 == 0 { 1 } else { -1 }),
            0 => None,
            _ => Some(0),
        };
    }
    let exp = u32::try_from(exp).ok()?;
    Some(base.wrapping_pow(exp))
}

fn complex_div(a: (f64, f64), b: (f64, f64)) -> Option<(f64, f64)> {
    let d = b.0 * b.0 + b.1 * b.1;
    if d == 0.0 {
        return None;
    }
    Some(((a.0 * b.0 + a.1 * b.1) / d, (a.1 * b.0 - a.0 * b.1) / d))
}

fn complex_pow(z: (f64, f64), w: (f64, f64)) -> Option<(f64, f64)> {
    if z == (0.0, 0.0) {
        return if w == (0.0, 0.0) {
            Some((1.0, 0.0))
        } else if w.0 > 0.0 {
            Some((0.0, 0.0))
        } else {
            None
        };
    }
    let (ln_r, theta) = (z.0.hypot(z.1).ln(), z.1.atan2(z.0));
    // w * ln z, then exp
    let (x, y) = (w.0 * ln_r - w.1 * theta, w.0 * theta + w.1 * ln_r);
    let m = x.exp();
    Some((m * y.cos(), m * y.sin()))
}

/// Folds a relational operation. Operands are already converted to a common
/// type; character operands compare as if blank-padded to equal length.
pub fn compare(op: CmpOp, l: &Constant, r: &Constant) -> Option<Constant> {
    elementwise(l, r, &|a, b| scalar_compare(op, a, b).map(Constant::Logical))
}

fn scalar_compare(op: CmpOp, l: &Constant, r: &Constant) -> Option<bool> {
    use std::cmp::Ordering;
    let ord = match (l, r) {
        (Constant::Integer(a), Constant::Integer(b)) => a.cmp(b),
        (Constant::Str(a), Constant::Str(b)) => {
            let n = a.len().max(b.len());
            let pad = |s: &str| format!("{:<width$}", s, width = n);
            pad(a).cmp(&pad(b))
        }
        (Constant::Complex(..), _) | (_, Constant::Complex(..)) => {
            let eq = l.as_complex()? == r.as_complex()?;
            return match op {
                CmpOp::Eq => Some(eq),
                CmpOp::NotEq => Some(!eq),
                _ => None,
            };
        }
        _ => l.as_real()?.partial_cmp(&r.as_real()?)?,
    };
    Some(match op {
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::NotEq => ord != Ordering::Equal,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::LtE => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::GtE => ord != Ordering::Less,
    })
}

pub fn boolop(op: BoolOpKind, l: &Constant, r: &Constant) -> Option<Constant> {
    elementwise(l, r, &|a, b| {
        let (a, b) = (a.as_bool()?, b.as_bool()?);
        Some(Constant::Logical(match op {
            BoolOpKind::And => a && b,
            BoolOpKind::Or => a || b,
            BoolOpKind::Eqv => a == b,
            BoolOpKind::NEqv => a != b,
        }))
    })
}

pub fn concat(l: &Constant, r: &Constant) -> Option<Constant> {
    match (l, r) {
        (Constant::Str(a), Constant::Str(b)) => Some(Constant::Str(format!("{}{}", a, b))),
        _ => None,
    }
}

pub fn unary(op: UnaryOpKind, ty: &TType, c: &Constant) -> Option<Constant> {
    if let Constant::Array(items) = c {
        return items
            .iter()
            .map(|x| unary(op, ty, x))
            .collect::<Option<Vec<_>>>()
            .map(Constant::Array);
    }
    match (op, c) {
        (UnaryOpKind::Minus, Constant::Integer(v)) => {
            Some(Constant::Integer(wrap_int(v.wrapping_neg(), ty.kind().unwrap_or(4))))
        }
        (UnaryOpKind::Minus, Constant::Real(v)) => Some(Constant::Real(-v)),
        (UnaryOpKind::Minus, Constant::Complex(re, im)) => Some(Constant::Complex(-re, -im)),
        (UnaryOpKind::Not, Constant::Logical(b)) => Some(Constant::Logical(!b)),
        _ => None,
    }
}

/// Converts a literal to element type `to`.
pub fn cast(kind: CastKind, c: &Constant, to: &TType) -> Option<Constant> {
    if let Constant::Array(items) = c {
        return items
            .iter()
            .map(|x| cast(kind, x, to))
            .collect::<Option<Vec<_>>>()
            .map(Constant::Array);
    }
    let k = to.kind().unwrap_or(4);
    Some(match kind {
        CastKind::IntegerToReal => Constant::Real(round_real(c.as_int()? as f64, k)),
        CastKind::RealToInteger => Constant::Integer(real_to_int(c.as_real()?, k)?),
        CastKind::IntegerToInteger => Constant::Integer(wrap_int(c.as_int()?, k)),
        CastKind::RealToReal => Constant::Real(round_real(c.as_real()?, k)),
        CastKind::IntegerToComplex | CastKind::RealToComplex | CastKind::ComplexToComplex => {
            let (re, im) = c.as_complex()?;
            Constant::Complex(round_real(re, k), round_real(im, k))
        }
        CastKind::ComplexToReal => Constant::Real(round_real(c.as_complex()?.0, k)),
        CastKind::ComplexToInteger => Constant::Integer(real_to_int(c.as_complex()?.0, k)?),
        CastKind::LogicalToInteger => Constant::Integer(c.as_bool()? as i64),
        CastKind::IntegerToLogical => Constant::Logical(c.as_int()? != 0),
        CastKind::LogicalToLogical => Constant::Logical(c.as_bool()?),
    })
}

/// Truncates toward zero; values outside the kind's range do not fold.
fn real_to_int(v: f64, kind: u8) -> Option<i64> {
    let t = v.trunc();
    let (lo, hi) = int_range(kind);
    (t >= lo as f64 && t <= hi as f64).then_some(t as i64)
}

/// Smallest and largest value of an integer kind.
pub fn int_range(kind: u8) -> (i64, i64) {
    match kind {
        1 => (i8::MIN as i64, i8::MAX as i64),
        2 => (i16::MIN as i64, i16::MAX as i64),
        4 => (i32::MIN as i64, i32::MAX as i64),
        _ => (i64::MIN, i64::MAX),
    }
}

/// Largest finite value of a real kind.
pub fn real_max(kind: u8) -> f64 {
    if kind == 4 {
        f32::MAX as f64
    } else {
        f64::MAX
    }
}

/// Smallest positive normal value of a real kind.
pub fn real_tiny(kind: u8) -> f64 {
    if kind == 4 {
        f32::MIN_POSITIVE as f64
    } else {
        f64::MIN_POSITIVE
    }
}
