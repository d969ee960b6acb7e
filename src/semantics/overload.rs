//! Generic procedure resolution.

use crate::asr::types::argument_compatible;
use crate::asr::{types_equal, Asr, BinOpKind, BoolOpKind, CmpOp, Dispatch, SymbolId, SymbolKind, TType, UnaryOpKind};
use crate::config::OverloadPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Match(SymbolId),
    NoMatch,
    /// Every candidate that matched, in declaration order.
    Ambiguous(Vec<SymbolId>),
}

/// Picks one specific procedure of a generic for a list of actual argument
/// types. `receiver` is the type of the passed object of a type-bound call.
pub trait OverloadStrategy {
    fn select(&self, asr: &Asr, candidates: &[SymbolId], args: &[TType], receiver: Option<&TType>) -> Selection;
}

/// The first matching candidate wins.
#[derive(Debug, Default)]
pub struct FirstMatch;

/// Exactly one candidate may match.
#[derive(Debug, Default)]
pub struct UniqueMatch;

impl OverloadStrategy for FirstMatch {
    fn select(&self, asr: &Asr, candidates: &[SymbolId], args: &[TType], receiver: Option<&TType>) -> Selection {
        candidates
            .iter()
            .copied()
            .find(|c| candidate_matches(asr, *c, args, receiver))
            .map_or(Selection::NoMatch, Selection::Match)
    }
}

impl OverloadStrategy for UniqueMatch {
    fn select(&self, asr: &Asr, candidates: &[SymbolId], args: &[TType], receiver: Option<&TType>) -> Selection {
        let matching: Vec<SymbolId> = candidates
            .iter()
            .copied()
            .filter(|c| candidate_matches(asr, *c, args, receiver))
            .collect();
        match matching.len() {
            0 => Selection::NoMatch,
            1 => Selection::Match(matching[0]),
            _ => Selection::Ambiguous(matching),
        }
    }
}

pub fn strategy_for(policy: OverloadPolicy) -> Box<dyn OverloadStrategy> {
    match policy {
        OverloadPolicy::FirstMatch => Box::new(FirstMatch),
        OverloadPolicy::Unique => Box::new(UniqueMatch),
    }
}

/// Arity and structural type agreement of one candidate with the actual
/// arguments. A type-bound candidate with `pass` consumes the receiver as its
/// first dummy argument.
pub fn candidate_matches(asr: &Asr, candidate: SymbolId, args: &[TType], receiver: Option<&TType>) -> bool {
    let target = asr.past_external(candidate);
    let (func, passes_receiver) = match &asr.symbol(target).kind {
        SymbolKind::Function(_) => (target, false),
        SymbolKind::ClassProcedure(c) => (c.proc, c.dispatch == Dispatch::Pass && receiver.is_some()),
        _ => return false,
    };
    let Some(f) = asr.function(func) else {
        return false;
    };
    let mut params = f.args.iter();
    if passes_receiver {
        let (Some(first), Some(recv)) = (params.next(), receiver) else {
            return false;
        };
        match asr.variable(*first).and_then(|v| v.ty.as_ref()) {
            Some(formal) if argument_compatible(asr, formal, recv) => {}
            _ => return false,
        }
    }
    let params: Vec<SymbolId> = params.copied().collect();
    params.len() == args.len()
        && params.iter().zip(args).all(|(p, actual)| {
            asr.variable(*p)
                .and_then(|v| v.ty.as_ref())
                .is_some_and(|formal| types_equal(asr, formal, actual))
        })
}

/// Name of the generic procedure implementing an operator in an
/// `interface operator(...)` block.
pub fn operator_generic_name(op: &str) -> String {
    let op = op.trim().to_ascii_lowercase();
    let name = match op.as_str() {
        "+" => "~add",
        "-" => "~sub",
        "*" => "~mul",
        "/" => "~div",
        "**" => "~pow",
        "==" | ".eq." => "~eq",
        "/=" | ".ne." => "~noteq",
        "<" | ".lt." => "~lt",
        "<=" | ".le." => "~lte",
        ">" | ".gt." => "~gt",
        ">=" | ".ge." => "~gte",
        "//" => "~concat",
        ".and." => "~and",
        ".or." => "~or",
        ".eqv." => "~eqv",
        ".neqv." => "~neqv",
        ".not." => "~not",
        _ => return format!("~~{}", op.trim_matches('.')),
    };
    name.to_string()
}

pub fn binop_generic_name(op: BinOpKind) -> &'static str {
    match op {
        BinOpKind::Add => "~add",
        BinOpKind::Sub => "~sub",
        BinOpKind::Mul => "~mul",
        BinOpKind::Div => "~div",
        BinOpKind::Pow => "~pow",
    }
}

pub fn cmpop_generic_name(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "~eq",
        CmpOp::NotEq => "~noteq",
        CmpOp::Lt => "~lt",
        CmpOp::LtE => "~lte",
        CmpOp::Gt => "~gt",
        CmpOp::GtE => "~gte",
    }
}

pub fn boolop_generic_name(op: BoolOpKind) -> &'static str {
    match op {
        BoolOpKind::And => "~and",
        BoolOpKind::Or => "~or",
        BoolOpKind::Eqv => "~eqv",
        BoolOpKind::NEqv => "~neqv",
    }
}

pub fn unaryop_generic_name(op: UnaryOpKind) -> &'static str {
    match op {
        UnaryOpKind::Minus => "~sub",
        UnaryOpKind::Not => "~not",
    }
}
