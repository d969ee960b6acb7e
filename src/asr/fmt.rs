use std::fmt::{self, Display, Formatter};

use super::{
    type_name, Access, Asr, BinOpKind, BoolOpKind, BoundKind, CmpOp, Constant, ExprId, ExprKind,
    Intent, Presence, ScopeId, Stmt, Storage, SymbolId, SymbolKind, UnaryOpKind,
};

/// Read-only textual dump of a whole translation unit.
pub struct AsrDump<'a>(pub &'a Asr);

pub struct ExprDisplay<'a> {
    pub asr: &'a Asr,
    pub id: ExprId,
}

impl Asr {
    pub fn display_expr(&self, id: ExprId) -> ExprDisplay<'_> {
        ExprDisplay { asr: self, id }
    }
}

fn write_indent(f: &mut Formatter<'_>, indent: usize) -> fmt::Result {
    if indent > 0 {
        write!(f, "{}", " ".repeat(indent))?;
    }
    Ok(())
}

fn fmt_constant(c: &Constant, f: &mut Formatter<'_>) -> fmt::Result {
    match c {
        Constant::Integer(v) => write!(f, "{}", v),
        Constant::Real(v) => write!(f, "{:?}", v),
        Constant::Complex(re, im) => write!(f, "({:?}, {:?})", re, im),
        Constant::Logical(b) => write!(f, "{}", if *b { ".true." } else { ".false." }),
        Constant::Str(s) => write!(f, "\"{}\"", s),
        Constant::Array(items) => {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                fmt_constant(item, f)?;
            }
            write!(f, "]")
        }
    }
}

fn binop_str(op: BinOpKind) -> &'static str {
    match op {
        BinOpKind::Add => "+",
        BinOpKind::Sub => "-",
        BinOpKind::Mul => "*",
        BinOpKind::Div => "/",
        BinOpKind::Pow => "**",
    }
}

fn cmpop_str(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "==",
        CmpOp::NotEq => "/=",
        CmpOp::Lt => "<",
        CmpOp::LtE => "<=",
        CmpOp::Gt => ">",
        CmpOp::GtE => ">=",
    }
}

fn boolop_str(op: BoolOpKind) -> &'static str {
    match op {
        BoolOpKind::And => ".and.",
        BoolOpKind::Or => ".or.",
        BoolOpKind::Eqv => ".eqv.",
        BoolOpKind::NEqv => ".neqv.",
    }
}

impl ExprDisplay<'_> {
    fn sub(&self, id: ExprId) -> ExprDisplay<'_> {
        ExprDisplay { asr: self.asr, id }
    }

    fn list(&self, f: &mut Formatter<'_>, items: &[ExprId]) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", self.sub(*item))?;
        }
        Ok(())
    }
}

impl Display for ExprDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let asr = self.asr;
        let e = asr.expr(self.id);
        match &e.kind {
            ExprKind::Constant(c) => fmt_constant(c, f),
            ExprKind::ArrayConstructor(items) => {
                write!(f, "[")?;
                self.list(f, items)?;
                write!(f, "]")
            }
            ExprKind::ComplexConstructor { re, im } => {
                write!(f, "cmplx({}, {})", self.sub(*re), self.sub(*im))
            }
            ExprKind::Var(s) => write!(f, "{}", asr.name(*s)),
            ExprKind::BinOp {
                overloaded: Some(o),
                ..
            }
            | ExprKind::Compare {
                overloaded: Some(o),
                ..
            }
            | ExprKind::BoolOp {
                overloaded: Some(o),
                ..
            }
            | ExprKind::StrConcat {
                overloaded: Some(o),
                ..
            }
            | ExprKind::UnaryOp {
                overloaded: Some(o),
                ..
            } => write!(f, "{}", self.sub(*o)),
            ExprKind::BinOp {
                left, op, right, ..
            } => write!(f, "({} {} {})", self.sub(*left), binop_str(*op), self.sub(*right)),
            ExprKind::Compare {
                left, op, right, ..
            } => write!(f, "({} {} {})", self.sub(*left), cmpop_str(*op), self.sub(*right)),
            ExprKind::BoolOp {
                left, op, right, ..
            } => write!(f, "({} {} {})", self.sub(*left), boolop_str(*op), self.sub(*right)),
            ExprKind::StrConcat { left, right, .. } => {
                write!(f, "({} // {})", self.sub(*left), self.sub(*right))
            }
            ExprKind::UnaryOp { op, operand, .. } => match op {
                UnaryOpKind::Minus => write!(f, "(-{})", self.sub(*operand)),
                UnaryOpKind::Not => write!(f, "(.not. {})", self.sub(*operand)),
            },
            ExprKind::Cast { arg, kind } => write!(f, "{:?}({})", kind, self.sub(*arg)),
            ExprKind::FunctionCall { name, args, dt, .. } => {
                if let Some(d) = dt {
                    write!(f, "{}%", self.sub(*d))?;
                }
                write!(f, "{}(", asr.name(*name))?;
                let present: Vec<ExprId> = args.iter().flatten().copied().collect();
                self.list(f, &present)?;
                write!(f, ")")
            }
            ExprKind::IntrinsicArrayFunction {
                intrinsic,
                overload,
                args,
            } => {
                write!(f, "{}<{}>(", intrinsic.name(), overload.id())?;
                self.list(f, args)?;
                write!(f, ")")
            }
            ExprKind::ArrayItem { array, indices } => {
                write!(f, "{}(", self.sub(*array))?;
                self.list(f, indices)?;
                write!(f, ")")
            }
            ExprKind::DerivedRef { base, member } => {
                write!(f, "{}%{}", self.sub(*base), asr.name(*member))
            }
            ExprKind::StructConstructor { dt, args } => {
                write!(f, "{}(", asr.name(*dt))?;
                self.list(f, args)?;
                write!(f, ")")
            }
            ExprKind::ArraySize { array, dim } => match dim {
                Some(d) => write!(f, "size({}, {})", self.sub(*array), self.sub(*d)),
                None => write!(f, "size({})", self.sub(*array)),
            },
            ExprKind::ArrayBound { array, dim, bound } => {
                let name = match bound {
                    BoundKind::Lower => "lbound",
                    BoundKind::Upper => "ubound",
                };
                write!(f, "{}({}, {})", name, self.sub(*array), self.sub(*dim))
            }
        }
    }
}

impl AsrDump<'_> {
    fn fmt_scope(&self, f: &mut Formatter<'_>, scope: ScopeId, indent: usize) -> fmt::Result {
        for (_, id) in self.0.scope(scope).iter() {
            self.fmt_symbol(f, id, indent)?;
        }
        Ok(())
    }

    fn fmt_symbol(&self, f: &mut Formatter<'_>, id: SymbolId, indent: usize) -> fmt::Result {
        let asr = self.0;
        let sym = asr.symbol(id);
        write_indent(f, indent)?;
        match &sym.kind {
            SymbolKind::Variable(v) => {
                match &v.ty {
                    Some(ty) => write!(f, "variable {}: {}", sym.name, type_name(asr, ty))?,
                    None => write!(f, "variable {}", sym.name)?,
                }
                match v.intent {
                    Intent::Local => {}
                    Intent::ReturnVar => write!(f, ", result")?,
                    Intent::Unspecified => write!(f, ", dummy")?,
                    Intent::In => write!(f, ", intent(in)")?,
                    Intent::Out => write!(f, ", intent(out)")?,
                    Intent::InOut => write!(f, ", intent(inout)")?,
                }
                match v.storage {
                    Storage::Default => {}
                    Storage::Save => write!(f, ", save")?,
                    Storage::Parameter => write!(f, ", parameter")?,
                }
                if v.presence == Presence::Optional {
                    write!(f, ", optional")?;
                }
                if v.access == Access::Private {
                    write!(f, ", private")?;
                }
                if let Some(alias) = v.symbolic_value {
                    write!(f, " => {}", asr.display_expr(alias))?;
                } else if let Some(value) = v.value {
                    write!(f, " = {}", asr.display_expr(value))?;
                } else if let Some(init) = v.init {
                    write!(f, " = {}", asr.display_expr(init))?;
                }
                writeln!(f)
            }
            SymbolKind::Function(func) => {
                let args: Vec<&str> = func.args.iter().map(|a| asr.name(*a)).collect();
                write!(f, "function {}({})", sym.name, args.join(", "))?;
                if let Some(rv) = func.return_var {
                    write!(f, " result({})", asr.name(rv))?;
                }
                match func.abi {
                    super::Abi::Source => {}
                    super::Abi::Interactive => write!(f, " [interactive]")?,
                    super::Abi::Intrinsic => write!(f, " [intrinsic]")?,
                }
                if func.deftype == super::DefType::Interface {
                    write!(f, " [interface]")?;
                }
                if func.access == Access::Private {
                    write!(f, " [private]")?;
                }
                writeln!(f)?;
                self.fmt_scope(f, func.scope, indent + 2)?;
                self.fmt_body(f, &func.body, indent + 2)?;
                write_indent(f, indent)?;
                writeln!(f, "end function {}", sym.name)
            }
            SymbolKind::Module(m) => {
                write!(f, "module {}", sym.name)?;
                if m.intrinsic {
                    write!(f, " [intrinsic]")?;
                }
                if m.loaded_from_mod {
                    write!(f, " [loaded]")?;
                }
                writeln!(f)?;
                if !m.dependencies.is_empty() {
                    write_indent(f, indent + 2)?;
                    writeln!(f, "dependencies: {}", m.dependencies.join(", "))?;
                }
                self.fmt_scope(f, m.scope, indent + 2)?;
                write_indent(f, indent)?;
                writeln!(f, "end module {}", sym.name)
            }
            SymbolKind::Program(p) => {
                writeln!(f, "program {}", sym.name)?;
                if !p.dependencies.is_empty() {
                    write_indent(f, indent + 2)?;
                    writeln!(f, "dependencies: {}", p.dependencies.join(", "))?;
                }
                self.fmt_scope(f, p.scope, indent + 2)?;
                self.fmt_body(f, &p.body, indent + 2)?;
                write_indent(f, indent)?;
                writeln!(f, "end program {}", sym.name)
            }
            SymbolKind::GenericProcedure(g) => {
                let procs: Vec<&str> = g.procs.iter().map(|p| asr.name(*p)).collect();
                writeln!(f, "generic {} => {}", sym.name, procs.join(", "))
            }
            SymbolKind::ClassProcedure(c) => {
                write!(f, "procedure {} => {}", sym.name, c.proc_name)?;
                if c.dispatch == super::Dispatch::NoPass {
                    write!(f, ", nopass")?;
                }
                writeln!(f)
            }
            SymbolKind::DerivedType(d) => {
                write!(f, "type {}", sym.name)?;
                if let Some(p) = d.parent {
                    write!(f, " extends({})", asr.name(p))?;
                }
                writeln!(f)?;
                self.fmt_scope(f, d.scope, indent + 2)?;
                write_indent(f, indent)?;
                writeln!(f, "end type {}", sym.name)
            }
            SymbolKind::ExternalSymbol(e) => {
                write!(f, "external {} => {}::{}", sym.name, e.module_name, e.original_name)?;
                if e.access == Access::Private {
                    write!(f, ", private")?;
                }
                writeln!(f)
            }
            SymbolKind::Block(b) => {
                writeln!(f, "block {}", sym.name)?;
                self.fmt_scope(f, b.scope, indent + 2)?;
                self.fmt_body(f, &b.body, indent + 2)?;
                write_indent(f, indent)?;
                writeln!(f, "end block {}", sym.name)
            }
        }
    }

    fn fmt_body(&self, f: &mut Formatter<'_>, body: &[Stmt], indent: usize) -> fmt::Result {
        if body.is_empty() {
            return Ok(());
        }
        write_indent(f, indent)?;
        writeln!(f, "body:")?;
        for stmt in body {
            self.fmt_stmt(f, stmt, indent + 2)?;
        }
        Ok(())
    }

    fn fmt_stmt(&self, f: &mut Formatter<'_>, stmt: &Stmt, indent: usize) -> fmt::Result {
        let asr = self.0;
        let e = |id: ExprId| asr.display_expr(id);
        write_indent(f, indent)?;
        match stmt {
            Stmt::Assignment { target, value } => writeln!(f, "{} = {}", e(*target), e(*value)),
            Stmt::If { cond, body, orelse } => {
                writeln!(f, "if {} then", e(*cond))?;
                for s in body {
                    self.fmt_stmt(f, s, indent + 2)?;
                }
                if !orelse.is_empty() {
                    write_indent(f, indent)?;
                    writeln!(f, "else")?;
                    for s in orelse {
                        self.fmt_stmt(f, s, indent + 2)?;
                    }
                }
                write_indent(f, indent)?;
                writeln!(f, "end if")
            }
            Stmt::DoLoop {
                var,
                start,
                end,
                step,
                body,
            } => {
                write!(f, "do {} = {}, {}", e(*var), e(*start), e(*end))?;
                if let Some(s) = step {
                    write!(f, ", {}", e(*s))?;
                }
                writeln!(f)?;
                for s in body {
                    self.fmt_stmt(f, s, indent + 2)?;
                }
                write_indent(f, indent)?;
                writeln!(f, "end do")
            }
            Stmt::WhileLoop { cond, body } => {
                writeln!(f, "do while {}", e(*cond))?;
                for s in body {
                    self.fmt_stmt(f, s, indent + 2)?;
                }
                write_indent(f, indent)?;
                writeln!(f, "end do")
            }
            Stmt::SubroutineCall { name, args, dt, .. } => {
                write!(f, "call ")?;
                if let Some(d) = dt {
                    write!(f, "{}%", e(*d))?;
                }
                let args: Vec<String> = args.iter().flatten().map(|a| e(*a).to_string()).collect();
                writeln!(f, "{}({})", asr.name(*name), args.join(", "))
            }
            Stmt::Print(items) => {
                let items: Vec<String> = items.iter().map(|i| e(*i).to_string()).collect();
                writeln!(f, "print *, {}", items.join(", "))
            }
            Stmt::Return => writeln!(f, "return"),
            Stmt::Exit => writeln!(f, "exit"),
            Stmt::Cycle => writeln!(f, "cycle"),
            Stmt::Stop(code) => match code {
                Some(c) => writeln!(f, "stop {}", e(*c)),
                None => writeln!(f, "stop"),
            },
            Stmt::BlockCall(b) => writeln!(f, "block {}", asr.name(*b)),
        }
    }
}

impl Display for AsrDump<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "translation unit")?;
        self.fmt_scope(f, self.0.root, 2)
    }
}
