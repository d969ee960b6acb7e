//! Registry of scalar (and elemental) intrinsic functions.
//!
//! Each entry either transforms the call into another node at resolution
//! time (`real(x)` becomes a cast, `size(a)` an array-size query) or keeps it
//! as a call whose result type is computed by `create` and whose value is
//! folded by `eval` when every argument is constant.

use crate::asr::{type_name, Asr, BoundKind, Constant, ExprId, ExprKind, SymbolId, TType, TypeCategory};
use crate::errors::{SemanticError, SemanticResult, Span};
use crate::semantics::cast::{insert_cast, result_type_of_binop, OpFamily};
use crate::semantics::fold::{int_range, real_max, real_tiny, round_real, wrap_int};
use crate::semantics::resolver::check_kind;
use crate::semantics::CallArg;

pub type TransformFn = fn(&mut Asr, SymbolId, Vec<Option<ExprId>>, &Span) -> SemanticResult<ExprId>;
pub type CreateFn = fn(&mut Asr, &str, &mut [Option<ExprId>], &Span) -> SemanticResult<TType>;
pub type EvalFn = fn(&[Option<Constant>], &TType) -> Option<Constant>;

#[derive(Clone, Copy)]
pub enum Lowering {
    Transform(TransformFn),
    Call { create: CreateFn, eval: Option<EvalFn> },
}

pub struct ScalarIntrinsic {
    pub name: &'static str,
    pub module: &'static str,
    /// Dummy names in positional order.
    pub arg_names: &'static [&'static str],
    /// Leading arguments that must be present.
    pub required: usize,
    /// Accepts any number (at least `required`) of positional arguments.
    pub variadic: bool,
    pub lowering: Lowering,
}

const KIND: &str = "lfortran_intrinsic_kind";
const MATH: &str = "lfortran_intrinsic_math";
const ARRAY: &str = "lfortran_intrinsic_array";
const STRING: &str = "lfortran_intrinsic_string";

macro_rules! intrinsic {
    ($name:literal, $module:expr, [$($arg:literal),*], $required:expr, $lowering:expr) => {
        ScalarIntrinsic {
            name: $name,
            module: $module,
            arg_names: &[$($arg),*],
            required: $required,
            variadic: false,
            lowering: $lowering,
        }
    };
}

const fn call(create: CreateFn, eval: EvalFn) -> Lowering {
    Lowering::Call {
        create,
        eval: Some(eval),
    }
}

static SCALAR_INTRINSICS: &[ScalarIntrinsic] = &[
    intrinsic!("kind", KIND, ["x"], 1, Lowering::Transform(transform_kind)),
    intrinsic!("tiny", KIND, ["x"], 1, Lowering::Transform(transform_tiny)),
    intrinsic!("huge", KIND, ["x"], 1, Lowering::Transform(transform_huge)),
    intrinsic!("selected_int_kind", KIND, ["r"], 1, call(create_selected_int_kind, eval_selected_int_kind)),
    intrinsic!("selected_real_kind", KIND, ["p", "r"], 0, call(create_selected_real_kind, eval_selected_real_kind)),
    intrinsic!("real", MATH, ["a", "kind"], 1, Lowering::Transform(transform_real)),
    intrinsic!("int", MATH, ["a", "kind"], 1, Lowering::Transform(transform_int)),
    intrinsic!("dble", MATH, ["a"], 1, Lowering::Transform(transform_dble)),
    intrinsic!("abs", MATH, ["a"], 1, call(create_abs, eval_abs)),
    intrinsic!("sqrt", MATH, ["x"], 1, call(create_floating, eval_sqrt)),
    intrinsic!("exp", MATH, ["x"], 1, call(create_floating, eval_exp)),
    intrinsic!("log", MATH, ["x"], 1, call(create_floating, eval_log)),
    intrinsic!("sin", MATH, ["x"], 1, call(create_floating, eval_sin)),
    intrinsic!("cos", MATH, ["x"], 1, call(create_floating, eval_cos)),
    intrinsic!("tan", MATH, ["x"], 1, call(create_floating, eval_tan)),
    intrinsic!("aimag", MATH, ["z"], 1, call(create_aimag, eval_aimag)),
    intrinsic!("mod", MATH, ["a", "p"], 2, call(create_mod, eval_mod)),
    intrinsic!("floor", MATH, ["a", "kind"], 1, call(create_floor, eval_floor)),
    ScalarIntrinsic {
        name: "min",
        module: MATH,
        arg_names: &[],
        required: 2,
        variadic: true,
        lowering: call(create_minmax, eval_min),
    },
    ScalarIntrinsic {
        name: "max",
        module: MATH,
        arg_names: &[],
        required: 2,
        variadic: true,
        lowering: call(create_minmax, eval_max),
    },
    intrinsic!("len", STRING, ["string"], 1, Lowering::Transform(transform_len)),
    intrinsic!("size", ARRAY, ["array", "dim", "kind"], 1, Lowering::Transform(transform_size)),
    intrinsic!("lbound", ARRAY, ["array", "dim"], 1, Lowering::Transform(transform_lbound)),
    intrinsic!("ubound", ARRAY, ["array", "dim"], 1, Lowering::Transform(transform_ubound)),
];

pub fn lookup(name: &str) -> Option<&'static ScalarIntrinsic> {
    SCALAR_INTRINSICS.iter().find(|i| i.name == name)
}

/// Maps actual arguments onto the intrinsic's dummy slots.
pub fn normalize_args(
    intrinsic: &ScalarIntrinsic,
    args: Vec<CallArg>,
    span: &Span,
) -> SemanticResult<Vec<Option<ExprId>>> {
    let name = intrinsic.name;
    if intrinsic.variadic {
        if let Some(a) = args.iter().find(|a| a.keyword.is_some()) {
            return Err(SemanticError::contract(name, "keyword arguments are not accepted", a.span.clone()));
        }
        if args.len() < intrinsic.required {
            return Err(SemanticError::contract(
                name,
                format!("needs at least {} arguments", intrinsic.required),
                span.clone(),
            ));
        }
        return Ok(args.into_iter().map(|a| Some(a.value)).collect());
    }
    let names = intrinsic.arg_names;
    let mut slots: Vec<Option<ExprId>> = vec![None; names.len()];
    let mut next = 0;
    let mut seen_keyword = false;
    for a in args {
        let idx = match &a.keyword {
            Some(k) => {
                seen_keyword = true;
                names.iter().position(|n| n == k).ok_or_else(|| {
                    SemanticError::contract(name, format!("unknown keyword argument '{}'", k), a.span.clone())
                })?
            }
            None if seen_keyword => {
                return Err(SemanticError::contract(
                    name,
                    "positional argument follows a keyword argument",
                    a.span,
                ))
            }
            None => {
                next += 1;
                next - 1
            }
        };
        if idx >= names.len() {
            return Err(SemanticError::contract(
                name,
                format!("takes at most {} arguments", names.len()),
                a.span,
            ));
        }
        if slots[idx].is_some() {
            return Err(SemanticError::contract(
                name,
                format!("argument '{}' is given twice", names[idx]),
                a.span,
            ));
        }
        slots[idx] = Some(a.value);
    }
    for (i, n) in names.iter().enumerate().take(intrinsic.required) {
        if slots[i].is_none() {
            return Err(SemanticError::contract(
                name,
                format!("missing required argument '{}'", n),
                span.clone(),
            ));
        }
    }
    Ok(slots)
}

/// Resolves a call of scalar intrinsic `name` through the imported symbol
/// `callee`.
pub fn resolve_call(
    asr: &mut Asr,
    name: &str,
    callee: SymbolId,
    args: Vec<CallArg>,
    span: Span,
) -> SemanticResult<ExprId> {
    let Some(intrinsic) = lookup(name) else {
        return Err(SemanticError::unsupported(
            format!("Intrinsic '{}' is not supported", name),
            span,
        ));
    };
    let mut slots = normalize_args(intrinsic, args, &span)?;
    match intrinsic.lowering {
        Lowering::Transform(transform) => transform(asr, callee, slots, &span),
        Lowering::Call { create, eval } => {
            let ty = create(asr, intrinsic.name, &mut slots, &span)?;
            let consts: Option<Vec<Option<Constant>>> = slots
                .iter()
                .map(|s| match s {
                    None => Some(None),
                    Some(e) => asr.const_value(*e).cloned().map(Some),
                })
                .collect();
            let folded = eval.zip(consts).and_then(|(f, c)| f(&c, &ty));
            let value = folded.map(|c| asr.constant(c, ty.clone(), span.clone()));
            let kind = ExprKind::FunctionCall {
                name: callee,
                original: None,
                args: slots,
                dt: None,
            };
            Ok(asr.add_expr(kind, ty, value, span))
        }
    }
}

fn arg(slots: &[Option<ExprId>], i: usize) -> ExprId {
    match slots.get(i).copied().flatten() {
        Some(a) => a,
        None => crate::internal_error!("required intrinsic argument {} is missing", i),
    }
}

fn kind_arg(asr: &Asr, slots: &[Option<ExprId>], i: usize, intrinsic: &str, span: &Span) -> SemanticResult<Option<i64>> {
    let Some(k) = slots.get(i).copied().flatten() else {
        return Ok(None);
    };
    if !asr.expr_type(k).is_integer() {
        return Err(SemanticError::contract(intrinsic, "kind must be an integer", span.clone()));
    }
    asr.const_int(k)
        .map(Some)
        .ok_or_else(|| SemanticError::contract(intrinsic, "kind must be a constant expression", span.clone()))
}

fn bad_argument(asr: &Asr, intrinsic: &str, what: &str, a: ExprId) -> SemanticError {
    let got = type_name(asr, asr.expr_type(a));
    SemanticError::contract(intrinsic, format!("{}, got {}", what, got), asr.expr(a).span.clone())
}

fn expect(asr: &Asr, cond: bool, intrinsic: &str, what: &str, a: ExprId) -> SemanticResult<()> {
    if cond {
        Ok(())
    } else {
        Err(bad_argument(asr, intrinsic, what, a))
    }
}

fn int4(asr: &mut Asr, v: i64, span: &Span) -> ExprId {
    asr.constant(Constant::Integer(v), TType::Integer(4), span.clone())
}

// Transformations

fn transform_kind(asr: &mut Asr, _: SymbolId, slots: Vec<Option<ExprId>>, span: &Span) -> SemanticResult<ExprId> {
    let x = arg(&slots, 0);
    let Some(k) = asr.expr_type(x).kind() else {
        return Err(bad_argument(asr, "kind", "argument must be of intrinsic type", x));
    };
    Ok(int4(asr, k as i64, span))
}

fn transform_tiny(asr: &mut Asr, _: SymbolId, slots: Vec<Option<ExprId>>, span: &Span) -> SemanticResult<ExprId> {
    let x = arg(&slots, 0);
    let ty = asr.expr_type(x).element().clone();
    expect(asr, ty.is_real(), "tiny", "argument must be real", x)?;
    let k = ty.kind().unwrap_or(4);
    Ok(asr.constant(Constant::Real(real_tiny(k)), TType::Real(k), span.clone()))
}

fn transform_huge(asr: &mut Asr, _: SymbolId, slots: Vec<Option<ExprId>>, span: &Span) -> SemanticResult<ExprId> {
    let x = arg(&slots, 0);
    match asr.expr_type(x).element().clone() {
        TType::Integer(k) => Ok(asr.constant(Constant::Integer(int_range(k).1), TType::Integer(k), span.clone())),
        TType::Real(k) => Ok(asr.constant(Constant::Real(real_max(k)), TType::Real(k), span.clone())),
        _ => Err(bad_argument(asr, "huge", "argument must be integer or real", x)),
    }
}

fn transform_real(asr: &mut Asr, _: SymbolId, slots: Vec<Option<ExprId>>, span: &Span) -> SemanticResult<ExprId> {
    let a = arg(&slots, 0);
    let ty = asr.expr_type(a).clone();
    expect(asr, ty.is_numeric(), "real", "argument 'a' must be numeric", a)?;
    let default = if ty.is_complex() { ty.kind().unwrap_or(4) as i64 } else { 4 };
    let kind = kind_arg(asr, &slots, 1, "real", span)?.unwrap_or(default);
    let kind = check_kind(TypeCategory::Real, kind, span)?;
    insert_cast(asr, a, &TType::Real(kind), span.clone())
}

fn transform_int(asr: &mut Asr, _: SymbolId, slots: Vec<Option<ExprId>>, span: &Span) -> SemanticResult<ExprId> {
    let a = arg(&slots, 0);
    let ty = asr.expr_type(a).clone();
    expect(asr, ty.is_numeric(), "int", "argument 'a' must be numeric", a)?;
    let kind = kind_arg(asr, &slots, 1, "int", span)?.unwrap_or(4);
    let kind = check_kind(TypeCategory::Integer, kind, span)?;
    insert_cast(asr, a, &TType::Integer(kind), span.clone())
}

fn transform_dble(asr: &mut Asr, _: SymbolId, slots: Vec<Option<ExprId>>, span: &Span) -> SemanticResult<ExprId> {
    let a = arg(&slots, 0);
    let ty = asr.expr_type(a).clone();
    expect(asr, ty.is_numeric(), "dble", "argument 'a' must be numeric", a)?;
    insert_cast(asr, a, &TType::Real(8), span.clone())
}

fn transform_len(asr: &mut Asr, callee: SymbolId, slots: Vec<Option<ExprId>>, span: &Span) -> SemanticResult<ExprId> {
    let s = arg(&slots, 0);
    let ty = asr.expr_type(s).clone();
    expect(asr, ty.is_character(), "len", "argument must be a character string", s)?;
    if let TType::Character { len: Some(n), .. } = ty.element() {
        return Ok(int4(asr, *n, span));
    }
    let kind = ExprKind::FunctionCall {
        name: callee,
        original: None,
        args: slots,
        dt: None,
    };
    Ok(asr.add_expr(kind, TType::Integer(4), None, span.clone()))
}

/// Checks an optional `dim` argument against the rank of `array`.
fn check_dim(asr: &Asr, intrinsic: &str, dim: Option<ExprId>, rank: usize) -> SemanticResult<()> {
    let Some(d) = dim else {
        return Ok(());
    };
    let ty = asr.expr_type(d);
    expect(asr, ty.is_integer() && ty.is_scalar(), intrinsic, "argument 'dim' must be an integer scalar", d)?;
    if let Some(v) = asr.const_int(d) {
        if v < 1 || v as usize > rank {
            return Err(SemanticError::contract(
                intrinsic,
                format!("dim={} is out of range for an array of rank {}", v, rank),
                asr.expr(d).span.clone(),
            ));
        }
    }
    Ok(())
}

fn transform_size(asr: &mut Asr, _: SymbolId, slots: Vec<Option<ExprId>>, span: &Span) -> SemanticResult<ExprId> {
    let array = arg(&slots, 0);
    let ty = asr.expr_type(array).clone();
    expect(asr, ty.is_array(), "size", "argument 'array' must be an array", array)?;
    let dim = slots[1];
    check_dim(asr, "size", dim, ty.rank())?;
    let kind = kind_arg(asr, &slots, 2, "size", span)?.unwrap_or(4);
    let kind = check_kind(TypeCategory::Integer, kind, span)?;
    let lengths: Vec<Option<i64>> = ty.dims().iter().map(|d| d.length.and_then(|l| asr.const_int(l))).collect();
    let known = match dim {
        Some(d) => asr
            .const_int(d)
            .and_then(|d| lengths.get(d as usize - 1).copied().flatten()),
        None => lengths
            .iter()
            .try_fold(1i64, |acc, l| l.and_then(|l| acc.checked_mul(l))),
    };
    let (lo, hi) = int_range(kind);
    let value = known.filter(|n| (lo..=hi).contains(n)).map(|n| asr.constant(Constant::Integer(n), TType::Integer(kind), span.clone()));
    Ok(asr.add_expr(ExprKind::ArraySize { array, dim }, TType::Integer(kind), value, span.clone()))
}

fn transform_bound(
    asr: &mut Asr,
    slots: Vec<Option<ExprId>>,
    bound: BoundKind,
    intrinsic: &str,
    span: &Span,
) -> SemanticResult<ExprId> {
    let array = arg(&slots, 0);
    let ty = asr.expr_type(array).clone();
    expect(asr, ty.is_array(), intrinsic, "argument 'array' must be an array", array)?;
    check_dim(asr, intrinsic, slots[1], ty.rank())?;
    let dim = match slots[1] {
        Some(d) => d,
        None if ty.rank() == 1 => int4(asr, 1, span),
        None => {
            return Err(SemanticError::contract(
                intrinsic,
                "argument 'dim' is required for arrays of rank greater than 1",
                span.clone(),
            ))
        }
    };
    let known = asr.const_int(dim).and_then(|d| {
        let dims = ty.dims().get(d as usize - 1)?;
        let start = asr.const_int(dims.start?)?;
        match bound {
            BoundKind::Lower => Some(start),
            BoundKind::Upper => start.checked_add(asr.const_int(dims.length?)? - 1),
        }
    });
    let (lo, hi) = int_range(4);
    let known = known.filter(|n| (lo..=hi).contains(n));
    let value = known.map(|n| int4(asr, n, span));
    Ok(asr.add_expr(
        ExprKind::ArrayBound { array, dim, bound },
        TType::Integer(4),
        value,
        span.clone(),
    ))
}

fn transform_lbound(asr: &mut Asr, _: SymbolId, slots: Vec<Option<ExprId>>, span: &Span) -> SemanticResult<ExprId> {
    transform_bound(asr, slots, BoundKind::Lower, "lbound", span)
}

fn transform_ubound(asr: &mut Asr, _: SymbolId, slots: Vec<Option<ExprId>>, span: &Span) -> SemanticResult<ExprId> {
    transform_bound(asr, slots, BoundKind::Upper, "ubound", span)
}

// Calls with compile-time evaluation

fn create_selected_int_kind(asr: &mut Asr, _: &str, slots: &mut [Option<ExprId>], _: &Span) -> SemanticResult<TType> {
    let r = arg(slots, 0);
    let ty = asr.expr_type(r);
    expect(asr, ty.is_integer() && ty.is_scalar(), "selected_int_kind", "argument 'r' must be an integer scalar", r)?;
    Ok(TType::Integer(4))
}

fn eval_selected_int_kind(args: &[Option<Constant>], _: &TType) -> Option<Constant> {
    let r = args.first()?.as_ref()?.as_int()?;
    Some(Constant::Integer(match r {
        i64::MIN..=2 => 1,
        3..=4 => 2,
        5..=9 => 4,
        10..=18 => 8,
        _ => -1,
    }))
}

fn create_selected_real_kind(asr: &mut Asr, _: &str, slots: &mut [Option<ExprId>], span: &Span) -> SemanticResult<TType> {
    if slots.iter().all(Option::is_none) {
        return Err(SemanticError::contract(
            "selected_real_kind",
            "at least one of 'p' and 'r' must be present",
            span.clone(),
        ));
    }
    for a in slots.iter().flatten() {
        let ty = asr.expr_type(*a);
        expect(asr, ty.is_integer() && ty.is_scalar(), "selected_real_kind", "arguments must be integer scalars", *a)?;
    }
    Ok(TType::Integer(4))
}

fn eval_selected_real_kind(args: &[Option<Constant>], _: &TType) -> Option<Constant> {
    let p = match args.first()? {
        Some(c) => c.as_int()?,
        None => 0,
    };
    let r = match args.get(1)? {
        Some(c) => c.as_int()?,
        None => 0,
    };
    let kind = if p <= 6 && r <= 37 {
        4
    } else if p <= 15 && r <= 307 {
        8
    } else if p > 15 && r > 307 {
        -3
    } else if p > 15 {
        -1
    } else {
        -2
    };
    Some(Constant::Integer(kind))
}

fn create_abs(asr: &mut Asr, _: &str, slots: &mut [Option<ExprId>], _: &Span) -> SemanticResult<TType> {
    let a = arg(slots, 0);
    let ty = asr.expr_type(a).clone();
    expect(asr, ty.is_numeric(), "abs", "argument must be numeric", a)?;
    Ok(match ty.element() {
        TType::Complex(k) => ty.with_element(TType::Real(*k)),
        _ => ty,
    })
}

fn eval_abs(args: &[Option<Constant>], ty: &TType) -> Option<Constant> {
    let k = ty.kind().unwrap_or(4);
    match args.first()?.as_ref()? {
        Constant::Integer(v) => Some(Constant::Integer(wrap_int(v.wrapping_abs(), k))),
        Constant::Real(v) => Some(Constant::Real(v.abs())),
        Constant::Complex(re, im) => Some(Constant::Real(round_real(re.hypot(*im), k))),
        _ => None,
    }
}

fn create_floating(asr: &mut Asr, name: &str, slots: &mut [Option<ExprId>], _: &Span) -> SemanticResult<TType> {
    let x = arg(slots, 0);
    let ty = asr.expr_type(x).clone();
    expect(asr, ty.is_real() || ty.is_complex(), name, "argument must be real or complex", x)?;
    Ok(ty)
}

fn eval_real(args: &[Option<Constant>], ty: &TType, f: fn(f64) -> f64, domain: fn(f64) -> bool) -> Option<Constant> {
    let Constant::Real(x) = args.first()?.as_ref()? else {
        return None;
    };
    if !domain(*x) {
        return None;
    }
    let v = f(*x);
    v.is_finite()
        .then(|| Constant::Real(round_real(v, ty.kind().unwrap_or(4))))
}

fn eval_sqrt(args: &[Option<Constant>], ty: &TType) -> Option<Constant> {
    eval_real(args, ty, f64::sqrt, |x| x >= 0.0)
}

fn eval_exp(args: &[Option<Constant>], ty: &TType) -> Option<Constant> {
    eval_real(args, ty, f64::exp, |_| true)
}

fn eval_log(args: &[Option<Constant>], ty: &TType) -> Option<Constant> {
    eval_real(args, ty, f64::ln, |x| x > 0.0)
}

fn eval_sin(args: &[Option<Constant>], ty: &TType) -> Option<Constant> {
    eval_real(args, ty, f64::sin, |_| true)
}

fn eval_cos(args: &[Option<Constant>], ty: &TType) -> Option<Constant> {
    eval_real(args, ty, f64::cos, |_| true)
}

fn eval_tan(args: &[Option<Constant>], ty: &TType) -> Option<Constant> {
    eval_real(args, ty, f64::tan, |_| true)
}

fn create_aimag(asr: &mut Asr, _: &str, slots: &mut [Option<ExprId>], _: &Span) -> SemanticResult<TType> {
    let z = arg(slots, 0);
    let ty = asr.expr_type(z).clone();
    expect(asr, ty.is_complex(), "aimag", "argument must be complex", z)?;
    Ok(ty.with_element(TType::Real(ty.kind().unwrap_or(4))))
}

fn eval_aimag(args: &[Option<Constant>], _: &TType) -> Option<Constant> {
    match args.first()?.as_ref()? {
        Constant::Complex(_, im) => Some(Constant::Real(*im)),
        _ => None,
    }
}

/// Promotes every argument to the highest-priority numeric type among them.
fn promote_all(asr: &mut Asr, slots: &mut [Option<ExprId>], intrinsic: &str, span: &Span) -> SemanticResult<TType> {
    let first = arg(slots, 0);
    let mut common = asr.expr_type(first).element().clone();
    for a in slots.iter().flatten() {
        let ty = asr.expr_type(*a).clone();
        expect(
            asr,
            ty.is_scalar() && (ty.is_integer() || ty.is_real()),
            intrinsic,
            "arguments must be integer or real scalars",
            *a,
        )?;
        if ty.category() != common.category() {
            return Err(SemanticError::contract(
                intrinsic,
                "arguments must all be integer or all be real",
                span.clone(),
            ));
        }
        if let Some((t, _)) = result_type_of_binop(OpFamily::Arithmetic, &common, &ty) {
            common = t;
        }
    }
    for a in slots.iter_mut().flatten() {
        *a = insert_cast(asr, *a, &common, span.clone())?;
    }
    Ok(common)
}

fn create_mod(asr: &mut Asr, _: &str, slots: &mut [Option<ExprId>], span: &Span) -> SemanticResult<TType> {
    promote_all(asr, slots, "mod", span)
}

fn eval_mod(args: &[Option<Constant>], ty: &TType) -> Option<Constant> {
    let (a, p) = (args.first()?.as_ref()?, args.get(1)?.as_ref()?);
    match ty {
        TType::Integer(_) => {
            let (a, p) = (a.as_int()?, p.as_int()?);
            (p != 0).then(|| Constant::Integer(a.wrapping_rem(p)))
        }
        _ => {
            let (a, p) = (a.as_real()?, p.as_real()?);
            (p != 0.0).then(|| Constant::Real(round_real(a % p, ty.kind().unwrap_or(4))))
        }
    }
}

fn create_minmax(asr: &mut Asr, name: &str, slots: &mut [Option<ExprId>], span: &Span) -> SemanticResult<TType> {
    promote_all(asr, slots, name, span)
}

fn fold_extreme(args: &[Option<Constant>], ty: &TType, pick_max: bool) -> Option<Constant> {
    let values: Vec<&Constant> = args.iter().map(Option::as_ref).collect::<Option<_>>()?;
    match ty {
        TType::Integer(_) => {
            let ints = values.iter().map(|c| c.as_int()).collect::<Option<Vec<_>>>()?;
            let v = if pick_max { ints.into_iter().max() } else { ints.into_iter().min() };
            v.map(Constant::Integer)
        }
        _ => {
            let reals = values.iter().map(|c| c.as_real()).collect::<Option<Vec<_>>>()?;
            let v = reals
                .into_iter()
                .reduce(|a, b| if (b > a) == pick_max { b } else { a });
            v.map(Constant::Real)
        }
    }
}

fn eval_min(args: &[Option<Constant>], ty: &TType) -> Option<Constant> {
    fold_extreme(args, ty, false)
}

fn eval_max(args: &[Option<Constant>], ty: &TType) -> Option<Constant> {
    fold_extreme(args, ty, true)
}

fn create_floor(asr: &mut Asr, _: &str, slots: &mut [Option<ExprId>], span: &Span) -> SemanticResult<TType> {
    let a = arg(slots, 0);
    let ty = asr.expr_type(a).clone();
    expect(asr, ty.is_real(), "floor", "argument 'a' must be real", a)?;
    let kind = kind_arg(asr, slots, 1, "floor", span)?.unwrap_or(4);
    let kind = check_kind(TypeCategory::Integer, kind, span)?;
    Ok(ty.with_element(TType::Integer(kind)))
}

fn eval_floor(args: &[Option<Constant>], ty: &TType) -> Option<Constant> {
    let v = args.first()?.as_ref()?.as_real()?.floor();
    let (lo, hi) = int_range(ty.kind().unwrap_or(4));
    (v >= lo as f64 && v <= hi as f64).then(|| Constant::Integer(v as i64))
}
