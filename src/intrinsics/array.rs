//! Array intrinsics.
//!
//! A call such as `sum(a, mask=a > 0)` is resolved in two steps. [`create`]
//! classifies the call into one of the [`Overload`] shapes, checks the
//! argument contract and computes the static result type, producing an
//! `IntrinsicArrayFunction` node. Later, [`instantiate`] synthesizes a
//! helper function implementing that shape with explicit loops; helpers are
//! memoized per scope by intrinsic, element kind, rank and overload.

use log::{debug, trace};

use crate::asr::types::{argument_compatible, elements_equal};
use crate::asr::{
    type_name, ArrayIntrinsic, Asr, BinOpKind, BoolOpKind, CmpOp, Constant, Dimension, ExprId, ExprKind,
    HelperKey, Intent, Overload, ScopeId, Stmt, SymbolId, TType,
};
use crate::errors::{SemanticError, SemanticResult, Span};
use crate::semantics::fold::{int_range, real_max};
use crate::semantics::CallArg;

use super::builder::{assumed_shape, FunctionBuilder};

pub fn lookup(name: &str) -> Option<ArrayIntrinsic> {
    Some(match name {
        "sum" => ArrayIntrinsic::Sum,
        "product" => ArrayIntrinsic::Product,
        "maxval" => ArrayIntrinsic::MaxVal,
        "minval" => ArrayIntrinsic::MinVal,
        "any" => ArrayIntrinsic::Any,
        "all" => ArrayIntrinsic::All,
        "parity" => ArrayIntrinsic::Parity,
        "count" => ArrayIntrinsic::Count,
        "maxloc" => ArrayIntrinsic::MaxLoc,
        "minloc" => ArrayIntrinsic::MinLoc,
        "merge" => ArrayIntrinsic::Merge,
        "shape" => ArrayIntrinsic::Shape,
        _ => return None,
    })
}

/// Dummy argument names in positional order.
fn arg_names(intrinsic: ArrayIntrinsic) -> &'static [&'static str] {
    match intrinsic {
        ArrayIntrinsic::Sum
        | ArrayIntrinsic::Product
        | ArrayIntrinsic::MaxVal
        | ArrayIntrinsic::MinVal
        | ArrayIntrinsic::MaxLoc
        | ArrayIntrinsic::MinLoc => &["array", "dim", "mask"],
        ArrayIntrinsic::Any | ArrayIntrinsic::All | ArrayIntrinsic::Parity | ArrayIntrinsic::Count => &["mask", "dim"],
        ArrayIntrinsic::Merge => &["tsource", "fsource", "mask"],
        ArrayIntrinsic::Shape => &["source"],
    }
}

fn takes_mask(intrinsic: ArrayIntrinsic) -> bool {
    arg_names(intrinsic).len() == 3 && intrinsic != ArrayIntrinsic::Merge
}

/// Maps actual arguments to dummy slots. A second positional argument of
/// nonzero rank is the mask, not the dimension.
fn normalize(asr: &Asr, intrinsic: ArrayIntrinsic, args: Vec<CallArg>, span: &Span) -> SemanticResult<Vec<Option<ExprId>>> {
    let name = intrinsic.name();
    let names = arg_names(intrinsic);
    let mut slots: Vec<Option<ExprId>> = vec![None; names.len()];
    let mut positional = 0;
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
                positional += 1;
                if positional == 2 && takes_mask(intrinsic) && asr.expr_type(a.value).is_array() {
                    2
                } else {
                    positional - 1
                }
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
    let required = if intrinsic == ArrayIntrinsic::Merge { 3 } else { 1 };
    for (slot, n) in slots.iter().zip(names).take(required) {
        if slot.is_none() {
            return Err(SemanticError::contract(
                name,
                format!("missing required argument '{}'", n),
                span.clone(),
            ));
        }
    }
    Ok(slots)
}

fn classify(intrinsic: ArrayIntrinsic, slots: &[Option<ExprId>]) -> Overload {
    if intrinsic == ArrayIntrinsic::Merge || intrinsic == ArrayIntrinsic::Shape {
        return Overload::Array;
    }
    let dim = slots.get(1).is_some_and(Option::is_some);
    let mask = takes_mask(intrinsic) && slots.get(2).is_some_and(Option::is_some);
    match (dim, mask) {
        (false, false) => Overload::Array,
        (true, false) => Overload::ArrayDim,
        (false, true) => Overload::ArrayMask,
        (true, true) => Overload::ArrayDimMask,
    }
}

fn required(slots: &[Option<ExprId>], i: usize) -> ExprId {
    match slots.get(i).copied().flatten() {
        Some(e) => e,
        None => crate::internal_error!("array intrinsic argument {} is missing after normalization", i),
    }
}

fn bad_argument(asr: &Asr, intrinsic: ArrayIntrinsic, what: &str, a: ExprId) -> SemanticError {
    let got = type_name(asr, asr.expr_type(a));
    SemanticError::contract(intrinsic.name(), format!("{}, got {}", what, got), asr.expr(a).span.clone())
}

fn constant_length(asr: &Asr, d: &Dimension) -> Option<i64> {
    d.length.and_then(|l| asr.const_int(l))
}

/// Checks the argument contract of a classified call.
pub fn verify(asr: &Asr, intrinsic: ArrayIntrinsic, slots: &[Option<ExprId>], span: &Span) -> SemanticResult<()> {
    let name = intrinsic.name();
    if intrinsic == ArrayIntrinsic::Merge {
        return verify_merge(asr, slots, span);
    }
    let array = required(slots, 0);
    let ty = asr.expr_type(array);
    let (ok, what) = match intrinsic {
        ArrayIntrinsic::Sum | ArrayIntrinsic::Product => (ty.is_numeric(), "argument 'array' must be an integer, real or complex array"),
        ArrayIntrinsic::MaxVal | ArrayIntrinsic::MinVal | ArrayIntrinsic::MaxLoc | ArrayIntrinsic::MinLoc => {
            (ty.is_integer() || ty.is_real(), "argument 'array' must be an integer or real array")
        }
        _ => (ty.is_logical(), "argument 'mask' must be a logical array"),
    };
    if !ok || ty.is_scalar() {
        return Err(bad_argument(asr, intrinsic, what, array));
    }
    let rank = ty.rank();
    if let Some(dim) = slots.get(1).copied().flatten() {
        if matches!(intrinsic, ArrayIntrinsic::MaxLoc | ArrayIntrinsic::MinLoc) {
            return Err(SemanticError::unsupported(
                format!("{}: the 'dim' argument is not supported", name),
                asr.expr(dim).span.clone(),
            ));
        }
        let dty = asr.expr_type(dim);
        if !dty.is_integer() || dty.is_array() {
            return Err(bad_argument(asr, intrinsic, "argument 'dim' must be an integer scalar", dim));
        }
        match asr.const_int(dim) {
            Some(d) if d < 1 || d as usize > rank => {
                return Err(SemanticError::contract(
                    name,
                    format!("dim={} is out of range for an array of rank {}", d, rank),
                    asr.expr(dim).span.clone(),
                ))
            }
            None if rank > 1 => {
                return Err(SemanticError::contract(
                    name,
                    "argument 'dim' must be a constant expression for arrays of rank greater than 1",
                    asr.expr(dim).span.clone(),
                ))
            }
            _ => {}
        }
    }
    if takes_mask(intrinsic) {
        if let Some(mask) = slots.get(2).copied().flatten() {
            let mty = asr.expr_type(mask);
            if !mty.is_logical() {
                return Err(bad_argument(asr, intrinsic, "argument 'mask' must be logical", mask));
            }
            let same_shape = mty.rank() == rank
                && mty.dims().iter().zip(ty.dims()).all(|(a, b)| {
                    match (constant_length(asr, a), constant_length(asr, b)) {
                        (Some(x), Some(y)) => x == y,
                        _ => true,
                    }
                });
            if !same_shape {
                return Err(SemanticError::contract(
                    name,
                    format!(
                        "argument 'mask' must have the shape of 'array': {} vs {}",
                        type_name(asr, mty),
                        type_name(asr, ty)
                    ),
                    asr.expr(mask).span.clone(),
                ));
            }
        }
    }
    Ok(())
}

fn verify_merge(asr: &Asr, slots: &[Option<ExprId>], span: &Span) -> SemanticResult<()> {
    let (t, f, m) = (required(slots, 0), required(slots, 1), required(slots, 2));
    let (tt, ft, mt) = (asr.expr_type(t), asr.expr_type(f), asr.expr_type(m));
    for a in [t, f] {
        let ty = asr.expr_type(a);
        if ty.is_character() || ty.is_derived() {
            return Err(bad_argument(
                asr,
                ArrayIntrinsic::Merge,
                "character and derived-type arguments are not supported",
                a,
            ));
        }
    }
    if !elements_equal(asr, tt.element(), ft.element()) {
        return Err(SemanticError::contract(
            "merge",
            format!(
                "'tsource' and 'fsource' must have the same type, got {} and {}",
                type_name(asr, tt),
                type_name(asr, ft)
            ),
            span.clone(),
        ));
    }
    if !mt.is_logical() {
        return Err(bad_argument(asr, ArrayIntrinsic::Merge, "argument 'mask' must be logical", m));
    }
    let ranks: Vec<usize> = [tt, ft, mt].iter().map(|t| t.rank()).filter(|r| *r > 0).collect();
    if ranks.windows(2).any(|w| w[0] != w[1]) {
        return Err(SemanticError::contract(
            "merge",
            "array arguments must all have the same rank",
            span.clone(),
        ));
    }
    Ok(())
}

/// Dimensions of `array` except the zero-based `skip`, with unknown extents
/// spelled as `size(array, k)`.
fn result_dims(asr: &mut Asr, array: ExprId, skip: Option<usize>, span: &Span) -> Vec<Dimension> {
    let dims = asr.expr_type(array).dims().to_vec();
    let mut out = Vec::new();
    for (k, d) in dims.iter().enumerate() {
        if Some(k) == skip {
            continue;
        }
        let known = d.start.is_some_and(|s| asr.const_int(s) == Some(1)) && constant_length(asr, d).is_some();
        if known {
            out.push(*d);
            continue;
        }
        let start = asr.constant(Constant::Integer(1), TType::Integer(4), span.clone());
        let base = asr.deep_copy_expr(array);
        let dim = asr.constant(Constant::Integer(k as i64 + 1), TType::Integer(4), span.clone());
        let length = asr.add_expr(
            ExprKind::ArraySize {
                array: base,
                dim: Some(dim),
            },
            TType::Integer(4),
            None,
            span.clone(),
        );
        out.push(Dimension {
            start: Some(start),
            length: Some(length),
        });
    }
    out
}

fn result_type(asr: &mut Asr, intrinsic: ArrayIntrinsic, slots: &[Option<ExprId>], span: &Span) -> TType {
    let data = required(slots, 0);
    let data_ty = asr.expr_type(data).clone();
    let elem = match intrinsic {
        ArrayIntrinsic::Any | ArrayIntrinsic::All | ArrayIntrinsic::Parity => data_ty.element().clone(),
        ArrayIntrinsic::Count | ArrayIntrinsic::MaxLoc | ArrayIntrinsic::MinLoc => TType::Integer(4),
        _ => data_ty.element().clone(),
    };
    match intrinsic {
        ArrayIntrinsic::MaxLoc | ArrayIntrinsic::MinLoc => {
            let start = asr.constant(Constant::Integer(1), TType::Integer(4), span.clone());
            let length = asr.constant(Constant::Integer(data_ty.rank() as i64), TType::Integer(4), span.clone());
            TType::array(
                elem,
                vec![Dimension {
                    start: Some(start),
                    length: Some(length),
                }],
            )
        }
        ArrayIntrinsic::Merge => {
            let shaped = slots.iter().flatten().copied().find(|a| asr.expr_type(*a).is_array());
            match shaped {
                Some(a) => {
                    let dims = result_dims(asr, a, None, span);
                    TType::array(elem, dims)
                }
                None => elem,
            }
        }
        _ => match slots.get(1).copied().flatten() {
            Some(dim) if data_ty.rank() > 1 => {
                let skip = asr.const_int(dim).map(|d| d as usize - 1);
                let dims = result_dims(asr, data, skip, span);
                TType::array(elem, dims)
            }
            _ => elem,
        },
    }
}

/// Compile-time value of `maxloc`/`minloc` over a constant vector.
fn evaluate(asr: &Asr, intrinsic: ArrayIntrinsic, overload: Overload, args: &[ExprId]) -> Option<Constant> {
    let pick_max = match intrinsic {
        ArrayIntrinsic::MaxLoc => true,
        ArrayIntrinsic::MinLoc => false,
        _ => return None,
    };
    if overload != Overload::Array || asr.expr_type(args[0]).rank() != 1 {
        return None;
    }
    let Constant::Array(items) = asr.const_value(args[0])? else {
        return None;
    };
    let values = items.iter().map(Constant::as_real).collect::<Option<Vec<f64>>>()?;
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.into_iter().enumerate() {
        let better = match best {
            None => true,
            Some((_, b)) => {
                if pick_max {
                    v > b
                } else {
                    v < b
                }
            }
        };
        if better {
            best = Some((i, v));
        }
    }
    let index = best.map_or(0, |(i, _)| i as i64 + 1);
    Some(Constant::Array(vec![Constant::Integer(index)]))
}

/// `shape(source)` becomes an array constructor of per-dimension sizes.
fn shape(asr: &mut Asr, source: ExprId, span: Span) -> SemanticResult<ExprId> {
    let ty = asr.expr_type(source).clone();
    if ty.is_scalar() {
        return Err(bad_argument(asr, ArrayIntrinsic::Shape, "argument 'source' must be an array", source));
    }
    let mut items = Vec::new();
    let mut known = Vec::new();
    for (k, d) in ty.dims().iter().enumerate() {
        let array = if k == 0 { source } else { asr.deep_copy_expr(source) };
        let dim = asr.constant(Constant::Integer(k as i64 + 1), TType::Integer(4), span.clone());
        let length = constant_length(asr, d);
        known.push(length.map(Constant::Integer));
        let value = length.map(|n| asr.constant(Constant::Integer(n), TType::Integer(4), span.clone()));
        items.push(asr.add_expr(
            ExprKind::ArraySize { array, dim: Some(dim) },
            TType::Integer(4),
            value,
            span.clone(),
        ));
    }
    let start = asr.constant(Constant::Integer(1), TType::Integer(4), span.clone());
    let length = asr.constant(Constant::Integer(items.len() as i64), TType::Integer(4), span.clone());
    let result_ty = TType::array(
        TType::Integer(4),
        vec![Dimension {
            start: Some(start),
            length: Some(length),
        }],
    );
    let value = known
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .map(|v| asr.constant(Constant::Array(v), result_ty.clone(), span.clone()));
    Ok(asr.add_expr(ExprKind::ArrayConstructor(items), result_ty, value, span))
}

/// Resolves a call of array intrinsic `intrinsic`.
pub fn create(asr: &mut Asr, intrinsic: ArrayIntrinsic, args: Vec<CallArg>, span: Span) -> SemanticResult<ExprId> {
    let slots = normalize(asr, intrinsic, args, &span)?;
    if intrinsic == ArrayIntrinsic::Shape {
        return shape(asr, required(&slots, 0), span);
    }
    verify(asr, intrinsic, &slots, &span)?;
    let overload = classify(intrinsic, &slots);
    let ty = result_type(asr, intrinsic, &slots, &span);
    let args: Vec<ExprId> = slots.into_iter().flatten().collect();
    let value = evaluate(asr, intrinsic, overload, &args).map(|c| asr.constant(c, ty.clone(), span.clone()));
    trace!("{} classified as overload {:?}", intrinsic.name(), overload);
    Ok(asr.add_expr(
        ExprKind::IntrinsicArrayFunction {
            intrinsic,
            overload,
            args,
        },
        ty,
        value,
        span,
    ))
}

/// Returns the helper implementing the array-intrinsic node `call`,
/// synthesizing it in `target` on first use of its shape.
pub fn instantiate(asr: &mut Asr, call: ExprId, target: ScopeId) -> SymbolId {
    let (intrinsic, overload, args) = match &asr.expr(call).kind {
        ExprKind::IntrinsicArrayFunction {
            intrinsic,
            overload,
            args,
        } => (*intrinsic, *overload, args.clone()),
        _ => crate::internal_error!("expression #{} is not an array intrinsic call", call.0),
    };
    let arg_types: Vec<TType> = args.iter().map(|a| asr.expr_type(*a).clone()).collect();
    let result_ty = asr.expr_type(call).clone();
    let data = &arg_types[0];
    let rank = if intrinsic == ArrayIntrinsic::Merge {
        result_ty.rank()
    } else {
        data.rank()
    };
    let key = HelperKey {
        intrinsic,
        category: data.category(),
        kind: data.kind().unwrap_or(0),
        rank,
        overload,
    };
    let span = asr.expr(call).span.clone();
    let known = asr.scope(target).helpers.get(&key).cloned().unwrap_or_default();
    if let Some(helper) = known.iter().copied().find(|h| signature_matches(asr, *h, &arg_types)) {
        trace!("reusing helper '{}'", asr.name(helper));
        return helper;
    }
    if !known.is_empty() {
        debug!("argument shapes differ from every '{}' helper, synthesizing another", intrinsic.name());
    }
    let helper = synthesize(asr, &key, &arg_types, &result_ty, target, span);
    asr.scope_mut(target).helpers.entry(key).or_default().push(helper);
    helper
}

fn signature_matches(asr: &Asr, helper: SymbolId, arg_types: &[TType]) -> bool {
    let Some(f) = asr.function(helper) else {
        return false;
    };
    f.args.len() >= arg_types.len()
        && f.args.iter().zip(arg_types).all(|(d, actual)| {
            asr.variable(*d)
                .and_then(|v| v.ty.as_ref())
                .is_some_and(|formal| argument_compatible(asr, formal, actual))
        })
}

/// Where an accumulating loop reads and writes.
#[derive(Clone)]
enum Slot {
    Var(SymbolId),
    Item(SymbolId, Vec<SymbolId>),
}

impl Slot {
    fn expr(&self, b: &mut FunctionBuilder<'_>) -> ExprId {
        match self {
            Slot::Var(s) => b.var(*s),
            Slot::Item(array, idx) => b.item(*array, idx),
        }
    }
}

fn identity(intrinsic: ArrayIntrinsic, elem: &TType) -> Constant {
    let k = elem.kind().unwrap_or(4);
    let int_or_real = |i: i64, r: f64| match elem {
        TType::Real(_) => Constant::Real(r),
        TType::Complex(_) => Constant::Complex(r, 0.0),
        _ => Constant::Integer(i),
    };
    match intrinsic {
        ArrayIntrinsic::Sum | ArrayIntrinsic::Count => int_or_real(0, 0.0),
        ArrayIntrinsic::Product => int_or_real(1, 1.0),
        ArrayIntrinsic::MaxVal | ArrayIntrinsic::MaxLoc => int_or_real(int_range(k).0, -real_max(k)),
        ArrayIntrinsic::MinVal | ArrayIntrinsic::MinLoc => int_or_real(int_range(k).1, real_max(k)),
        ArrayIntrinsic::All => Constant::Logical(true),
        _ => Constant::Logical(false),
    }
}

/// One combining step `acc = acc (op) item`.
fn accumulate(b: &mut FunctionBuilder<'_>, intrinsic: ArrayIntrinsic, acc: &Slot, item: &Slot) -> Stmt {
    let target = acc.expr(b);
    match intrinsic {
        ArrayIntrinsic::Sum | ArrayIntrinsic::Product => {
            let op = if intrinsic == ArrayIntrinsic::Sum {
                BinOpKind::Add
            } else {
                BinOpKind::Mul
            };
            let (l, r) = (acc.expr(b), item.expr(b));
            let value = b.binop(l, op, r);
            b.assign(target, value)
        }
        ArrayIntrinsic::MaxVal | ArrayIntrinsic::MinVal => {
            let op = if intrinsic == ArrayIntrinsic::MaxVal {
                CmpOp::Gt
            } else {
                CmpOp::Lt
            };
            let (l, r) = (item.expr(b), acc.expr(b));
            let cond = b.compare(l, op, r);
            let value = item.expr(b);
            Stmt::If {
                cond,
                body: vec![b.assign(target, value)],
                orelse: Vec::new(),
            }
        }
        ArrayIntrinsic::Count => {
            let cond = item.expr(b);
            let l = acc.expr(b);
            let one = b.int(1);
            let value = b.binop(l, BinOpKind::Add, one);
            Stmt::If {
                cond,
                body: vec![b.assign(target, value)],
                orelse: Vec::new(),
            }
        }
        _ => {
            let op = match intrinsic {
                ArrayIntrinsic::Any => BoolOpKind::Or,
                ArrayIntrinsic::All => BoolOpKind::And,
                _ => BoolOpKind::NEqv,
            };
            let (l, r) = (acc.expr(b), item.expr(b));
            let value = b.boolop(l, op, r);
            b.assign(target, value)
        }
    }
}

fn masked(b: &mut FunctionBuilder<'_>, mask: Option<SymbolId>, idx: &[SymbolId], step: Stmt) -> Stmt {
    match mask {
        Some(m) => {
            let cond = b.item(m, idx);
            Stmt::If {
                cond,
                body: vec![step],
                orelse: Vec::new(),
            }
        }
        None => step,
    }
}

fn loop_indices(b: &mut FunctionBuilder<'_>, rank: usize) -> Vec<SymbolId> {
    (1..=rank)
        .map(|k| b.local(&format!("i{}", k), TType::Integer(4)))
        .collect()
}

fn synthesize(
    asr: &mut Asr,
    key: &HelperKey,
    arg_types: &[TType],
    result_ty: &TType,
    target: ScopeId,
    span: Span,
) -> SymbolId {
    let intrinsic = key.intrinsic;
    let base = format!("{}_{}_{}_{}", intrinsic.name(), key.kind, key.rank, key.overload.id());
    let mut b = FunctionBuilder::new(asr, target, &base, span);
    let mut names: Vec<&str> = vec![arg_names(intrinsic)[0]];
    match intrinsic {
        ArrayIntrinsic::Merge => names.extend(["fsource", "mask"]),
        _ => {
            if key.overload.has_dim() {
                names.push("dim");
            }
            if key.overload.has_mask() {
                names.push("mask");
            }
        }
    }
    let dummies: Vec<SymbolId> = names
        .iter()
        .zip(arg_types)
        .map(|(n, ty)| b.arg(n, assumed_shape(ty.element().clone(), ty.rank()), Intent::In))
        .collect();
    let result = if result_ty.is_scalar() {
        b.returns("result", result_ty.clone())
    } else {
        let ty = assumed_shape(result_ty.element().clone(), result_ty.rank());
        b.arg("result", ty, Intent::Out)
    };
    debug!("synthesizing helper '{}'", base);
    let body = match intrinsic {
        ArrayIntrinsic::Merge => merge_body(&mut b, &dummies, result, result_ty.rank()),
        ArrayIntrinsic::MaxLoc | ArrayIntrinsic::MinLoc => location_body(&mut b, key, &dummies, result),
        _ => reduction_body(&mut b, key, &dummies, result, result_ty),
    };
    b.finish(body)
}

fn reduction_body(
    b: &mut FunctionBuilder<'_>,
    key: &HelperKey,
    dummies: &[SymbolId],
    result: SymbolId,
    result_ty: &TType,
) -> Vec<Stmt> {
    let intrinsic = key.intrinsic;
    let array = dummies[0];
    let dim = key.overload.has_dim().then(|| dummies[1]);
    let mask = key.overload.has_mask().then(|| dummies[dummies.len() - 1]);
    let elem = result_ty.element().clone();
    let idx = loop_indices(b, key.rank);
    let item = Slot::Item(array, idx.clone());

    if result_ty.is_scalar() {
        let acc = Slot::Var(result);
        let target = acc.expr(b);
        let init = b.constant(identity(intrinsic, &elem), elem.clone());
        let step = accumulate(b, intrinsic, &acc, &item);
        let step = masked(b, mask, &idx, step);
        let mut body = vec![b.assign(target, init)];
        body.extend(b.loop_nest(&idx, array, vec![step]));
        return body;
    }

    let Some(dim) = dim else {
        crate::internal_error!("array-valued reduction without a dim argument");
    };
    let dim_ty = match b.asr.variable(dim).and_then(|v| v.ty.clone()) {
        Some(ty) => ty,
        None => crate::internal_error!("dim argument has no type"),
    };
    let mut chain: Vec<Stmt> = Vec::new();
    for d in (1..=key.rank).rev() {
        let kept: Vec<SymbolId> = idx
            .iter()
            .enumerate()
            .filter(|(k, _)| *k != d - 1)
            .map(|(_, i)| *i)
            .collect();
        let acc = Slot::Item(result, kept.clone());
        let target = acc.expr(b);
        let init = b.constant(identity(intrinsic, &elem), elem.clone());
        let init = b.assign(target, init);
        let mut branch = b.loop_nest(&kept, result, vec![init]);
        let step = accumulate(b, intrinsic, &acc, &item);
        let step = masked(b, mask, &idx, step);
        branch.extend(b.loop_nest(&idx, array, vec![step]));
        let lhs = b.var(dim);
        let rhs = b.constant(Constant::Integer(d as i64), dim_ty.clone());
        let cond = b.compare(lhs, CmpOp::Eq, rhs);
        chain = vec![Stmt::If {
            cond,
            body: branch,
            orelse: chain,
        }];
    }
    chain
}

fn location_body(b: &mut FunctionBuilder<'_>, key: &HelperKey, dummies: &[SymbolId], result: SymbolId) -> Vec<Stmt> {
    let array = dummies[0];
    let mask = key.overload.has_mask().then(|| dummies[1]);
    let elem = match b.asr.variable(array).and_then(|v| v.ty.as_ref()) {
        Some(ty) => ty.element().clone(),
        None => crate::internal_error!("array argument has no type"),
    };
    let best = b.local("best", elem.clone());
    let idx = loop_indices(b, key.rank);

    let mut body = Vec::new();
    let target = b.var(best);
    let init = b.constant(identity(key.intrinsic, &elem), elem);
    body.push(b.assign(target, init));
    for k in 1..=key.rank {
        let target = b.item_at(result, k as i64);
        let zero = b.int(0);
        body.push(b.assign(target, zero));
    }

    let op = if key.intrinsic == ArrayIntrinsic::MaxLoc {
        CmpOp::Gt
    } else {
        CmpOp::Lt
    };
    let value = b.item(array, &idx);
    let current = b.var(best);
    let better = b.compare(value, op, current);
    let first = b.item_at(result, 1);
    let zero = b.int(0);
    let unset = b.compare(first, CmpOp::Eq, zero);
    let cond = b.boolop(better, BoolOpKind::Or, unset);

    let target = b.var(best);
    let value = b.item(array, &idx);
    let mut update = vec![b.assign(target, value)];
    for (k, i) in idx.iter().enumerate() {
        let target = b.item_at(result, k as i64 + 1);
        let value = b.var(*i);
        update.push(b.assign(target, value));
    }
    let step = Stmt::If {
        cond,
        body: update,
        orelse: Vec::new(),
    };
    let step = masked(b, mask, &idx, step);
    body.extend(b.loop_nest(&idx, array, vec![step]));
    body
}

fn merge_body(b: &mut FunctionBuilder<'_>, dummies: &[SymbolId], result: SymbolId, rank: usize) -> Vec<Stmt> {
    let idx = loop_indices(b, rank);
    let operand = |b: &mut FunctionBuilder<'_>, d: SymbolId| {
        let is_array = b.asr.variable(d).and_then(|v| v.ty.as_ref()).is_some_and(TType::is_array);
        if is_array {
            Slot::Item(d, idx.clone()).expr(b)
        } else {
            Slot::Var(d).expr(b)
        }
    };
    let result_slot = if rank == 0 {
        Slot::Var(result)
    } else {
        Slot::Item(result, idx.clone())
    };
    let cond = operand(b, dummies[2]);
    let (t_target, t_value) = (result_slot.expr(b), operand(b, dummies[0]));
    let (f_target, f_value) = (result_slot.expr(b), operand(b, dummies[1]));
    let step = Stmt::If {
        cond,
        body: vec![b.assign(t_target, t_value)],
        orelse: vec![b.assign(f_target, f_value)],
    };
    if rank == 0 {
        vec![step]
    } else {
        b.loop_nest(&idx, result, vec![step])
    }
}
