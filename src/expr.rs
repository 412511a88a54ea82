//! Host expression nodes.
//!
//! The function core does not own a general expression language. This is the
//! minimal node set it needs to build, compile and run function values:
//! constants, variables, `let`, `if`, integer arithmetic, comparisons,
//! sequences, the context item, type checks, built-in calls and deferred
//! errors, plus the function variants (closures, named literals, partial
//! applications, static and dynamic calls).

use crate::builtins::{self, BuiltinCall};
use crate::context::{CompileContext, QueryContext};
use crate::diagnostics::QueryError;
use crate::func::call::{DynCall, StaticCall};
use crate::func::closure::Closure;
use crate::func::item::{Flow, TailCall};
use crate::func::literal::FuncLit;
use crate::func::partial::PartFunc;
use crate::func::registry::StaticFuncs;
use crate::config::CompileOptions;
use crate::scope::{IdMap, VarId, VarScope};
use crate::span::Span;
use crate::types::SeqType;
use crate::value::Value;
use crate::visit::{NodeCounter, VarFinder, Visitor, walk_expr};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Value(Value),
    VarRef(VarRef),
    Let(Box<Let>),
    If(Box<If>),
    Arith(Box<Arith>),
    Compare(Box<Compare>),
    Seq(Vec<Expr>),
    ContextItem(Span),
    TypeCheck(Box<TypeCheck>),
    Builtin(BuiltinCall),
    /// Deferred error: raised only when evaluated.
    Error(Box<QueryError>),
    Closure(Box<Closure>),
    FuncLit(Box<FuncLit>),
    PartApp(Box<PartFunc>),
    StaticCall(StaticCall),
    DynCall(Box<DynCall>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub var: VarId,
    pub slot: usize,
    pub ty: SeqType,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Let {
    pub var: VarId,
    pub slot: usize,
    pub value: Expr,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub cond: Expr,
    pub then: Expr,
    pub els: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    IDiv,
    Mod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arith {
    pub op: ArithOp,
    pub lhs: Expr,
    pub rhs: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Compare {
    pub op: CmpOp,
    pub lhs: Expr,
    pub rhs: Expr,
    pub span: Span,
}

/// Run-time type check (`treat as`), e.g. of a function result against a
/// declared return type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeCheck {
    pub expr: Expr,
    pub ty: SeqType,
    pub span: Span,
}

/// Static properties of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// Performs updates.
    Upd,
    /// Non-deterministic: two evaluations may differ.
    Ndt,
    /// Depends on the focus (context item).
    Ctx,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub upd: bool,
    pub ndt: bool,
    pub ctx: bool,
}

impl Flags {
    pub fn contains(self, flag: Flag) -> bool {
        match flag {
            Flag::Upd => self.upd,
            Flag::Ndt => self.ndt,
            Flag::Ctx => self.ctx,
        }
    }
}

impl Expr {
    pub fn empty() -> Expr {
        Expr::Value(Value::empty())
    }

    pub fn var_ref(scope: &VarScope, var: VarId, span: Span) -> Expr {
        match scope.var(var) {
            Some(v) => Expr::VarRef(VarRef { var, slot: v.slot, ty: v.ty.clone(), span }),
            None => panic!("variable {var} is not declared in this scope"),
        }
    }

    pub fn deferred(err: QueryError) -> Expr {
        Expr::Error(Box::new(err))
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Expr::Value(_))
    }

    /// Statically inferred type.
    pub fn inferred_type(&self) -> SeqType {
        match self {
            Expr::Value(v) => v.seq_type(),
            Expr::VarRef(r) => r.ty.clone(),
            Expr::Let(l) => l.body.inferred_type(),
            Expr::If(i) => i.then.inferred_type().union(&i.els.inferred_type()),
            Expr::Arith(_) => SeqType::Integer,
            Expr::Compare(_) => SeqType::Boolean,
            Expr::Seq(items) if items.is_empty() => SeqType::Empty,
            Expr::Seq(_) | Expr::ContextItem(_) | Expr::Error(_) => SeqType::Item,
            Expr::TypeCheck(t) => t.ty.clone(),
            Expr::Builtin(b) => b.func.ret_type(),
            Expr::Closure(c) => SeqType::function(c.func_type()),
            Expr::FuncLit(l) => SeqType::function(l.closure.func_type()),
            Expr::PartApp(p) => p.func_type().map_or(SeqType::any_function(), SeqType::function),
            Expr::StaticCall(c) => c.ty.clone(),
            Expr::DynCall(c) => c.func.inferred_type().func_type().map_or(SeqType::Item, |ft| ft.ret.clone()),
        }
    }

    /// Static property check. Closure bodies are not inspected: creating a
    /// closure neither updates nor depends on anything but its captures.
    pub fn has(&self, flag: Flag) -> bool {
        match self {
            Expr::Value(_) | Expr::VarRef(_) | Expr::Error(_) => false,
            Expr::ContextItem(_) => flag == Flag::Ctx,
            Expr::Let(l) => l.value.has(flag) || l.body.has(flag),
            Expr::If(i) => i.cond.has(flag) || i.then.has(flag) || i.els.has(flag),
            Expr::Arith(a) => a.lhs.has(flag) || a.rhs.has(flag),
            Expr::Compare(c) => c.lhs.has(flag) || c.rhs.has(flag),
            Expr::Seq(items) => items.iter().any(|e| e.has(flag)),
            Expr::TypeCheck(t) => t.expr.has(flag),
            Expr::Builtin(b) => b.func.flags().contains(flag) || b.args.iter().any(|e| e.has(flag)),
            Expr::Closure(c) => c.closure_map.iter().any(|(_, e)| e.has(flag)),
            Expr::FuncLit(_) => false,
            Expr::PartApp(p) => p.target.has(flag) || p.args.iter().any(|e| e.has(flag)),
            Expr::StaticCall(c) => c.flags.contains(flag) || c.args.iter().any(|e| e.has(flag)),
            Expr::DynCall(c) => {
                (flag == Flag::Upd && c.updating) || c.func.has(flag) || c.args.iter().any(|e| e.has(flag))
            }
        }
    }

    /// Number of expression nodes, closure bodies included.
    pub fn size(&self) -> usize {
        let mut counter = NodeCounter { count: 0 };
        counter.visit_expr(self);
        counter.count
    }

    pub fn references(&self, var: VarId) -> bool {
        !VarFinder { var }.visit_expr(self)
    }

    /// Traverse with a visitor; `false` if the visitor stopped early.
    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> bool {
        visitor.visit_expr(self)
    }

    /// An expression that can never produce updates nor values worth
    /// checking: the empty sequence or a deferred error.
    pub fn is_vacuous(&self) -> bool {
        match self {
            Expr::Value(v) => v.is_empty(),
            Expr::Error(_) => true,
            _ => false,
        }
    }

    // ---- compilation ----

    /// Compile this expression in `scope`: children first, then [`Expr::optimize`].
    pub fn compile(self, cx: &mut CompileContext<'_>, scope: &mut VarScope) -> Result<Expr, QueryError> {
        match self {
            Expr::Value(_) | Expr::ContextItem(_) | Expr::Error(_) => Ok(self),
            Expr::VarRef(mut r) => {
                if let Some(var) = scope.var(r.var) {
                    r.slot = var.slot;
                    r.ty = var.ty.clone();
                }
                Ok(Expr::VarRef(r))
            }
            Expr::Let(mut l) => {
                l.value = l.value.compile(cx, scope)?;
                scope.refine(l.var, l.value.inferred_type());
                l.body = l.body.compile(cx, scope)?;
                Expr::Let(l).optimize(cx, scope)
            }
            Expr::If(mut i) => {
                i.cond = i.cond.compile(cx, scope)?;
                i.then = i.then.compile(cx, scope)?;
                i.els = i.els.compile(cx, scope)?;
                Expr::If(i).optimize(cx, scope)
            }
            Expr::Arith(mut a) => {
                a.lhs = a.lhs.compile(cx, scope)?;
                a.rhs = a.rhs.compile(cx, scope)?;
                Expr::Arith(a).optimize(cx, scope)
            }
            Expr::Compare(mut c) => {
                c.lhs = c.lhs.compile(cx, scope)?;
                c.rhs = c.rhs.compile(cx, scope)?;
                Expr::Compare(c).optimize(cx, scope)
            }
            Expr::Seq(items) => {
                let items = items.into_iter().map(|e| e.compile(cx, scope)).collect::<Result<_, _>>()?;
                Expr::Seq(items).optimize(cx, scope)
            }
            Expr::TypeCheck(mut t) => {
                t.expr = t.expr.compile(cx, scope)?;
                Expr::TypeCheck(t).optimize(cx, scope)
            }
            Expr::Builtin(mut b) => {
                b.args = std::mem::take(&mut b.args)
                    .into_iter()
                    .map(|e| e.compile(cx, scope))
                    .collect::<Result<_, _>>()?;
                Expr::Builtin(b).optimize(cx, scope)
            }
            Expr::Closure(c) => c.compile(cx, scope),
            Expr::FuncLit(l) => l.compile(cx, scope),
            Expr::PartApp(p) => p.compile(cx, scope),
            Expr::StaticCall(c) => c.compile(cx, scope),
            Expr::DynCall(c) => c.compile(cx, scope),
        }
    }

    /// Local rewrite of an expression whose children are compiled.
    pub fn optimize(self, cx: &mut CompileContext<'_>, scope: &mut VarScope) -> Result<Expr, QueryError> {
        match self {
            Expr::Let(l) => {
                let Let { var, slot, value, body } = *l;
                if matches!(value, Expr::Value(_) | Expr::VarRef(_)) {
                    return body.inline_var(var, &value, cx, scope);
                }
                if !body.references(var) && !value.has(Flag::Upd) && !value.has(Flag::Ndt) {
                    return Ok(body);
                }
                Ok(Expr::Let(Box::new(Let { var, slot, value, body })))
            }
            Expr::If(i) => match &i.cond {
                Expr::Value(v) => match v.ebv(i.span) {
                    Ok(true) => Ok(i.then),
                    Ok(false) => Ok(i.els),
                    Err(_) => Ok(Expr::If(i)),
                },
                _ => Ok(Expr::If(i)),
            },
            Expr::Arith(a) => match (&a.lhs, &a.rhs) {
                (Expr::Value(l), Expr::Value(r)) => Ok(match arith(a.op, l, r, a.span) {
                    Ok(v) => Expr::Value(v),
                    Err(e) => Expr::deferred(e),
                }),
                _ => Ok(Expr::Arith(a)),
            },
            Expr::Compare(c) => match (&c.lhs, &c.rhs) {
                (Expr::Value(l), Expr::Value(r)) => Ok(match compare(c.op, l, r, c.span) {
                    Ok(b) => Expr::Value(Value::Bool(b)),
                    Err(e) => Expr::deferred(e),
                }),
                _ => Ok(Expr::Compare(c)),
            },
            Expr::Seq(items) => {
                if items.iter().all(Expr::is_value) {
                    let values = items
                        .into_iter()
                        .filter_map(|e| match e {
                            Expr::Value(v) => Some(v),
                            _ => None,
                        })
                        .collect();
                    return Ok(Expr::Value(Value::from_items(values)));
                }
                Ok(Expr::Seq(items))
            }
            Expr::TypeCheck(t) => {
                if let Expr::Value(v) = &t.expr {
                    if t.ty.matches(v) {
                        return Ok(t.expr);
                    }
                    return Ok(Expr::deferred(treat_error(v, &t.ty, t.span)));
                }
                if t.expr.inferred_type().instance_of(&t.ty) {
                    return Ok(t.expr);
                }
                Ok(Expr::TypeCheck(t))
            }
            Expr::Builtin(b) => builtins::optimize(b),
            Expr::Closure(c) => c.optimize(cx, scope),
            Expr::FuncLit(l) => l.optimize(cx, scope),
            Expr::PartApp(p) => p.optimize(cx, scope),
            Expr::StaticCall(c) => c.optimize(cx, scope),
            Expr::DynCall(c) => c.optimize(cx, scope),
            other => Ok(other),
        }
    }

    /// Replace every reference to `var` with `value` and re-optimize the
    /// rewritten path.
    pub fn inline_var(
        self,
        var: VarId,
        value: &Expr,
        cx: &mut CompileContext<'_>,
        scope: &mut VarScope,
    ) -> Result<Expr, QueryError> {
        if !self.references(var) {
            return Ok(self);
        }
        let expr = match self {
            Expr::VarRef(r) if r.var == var => return Ok(value.clone()),
            Expr::Let(mut l) => {
                l.value = l.value.inline_var(var, value, cx, scope)?;
                l.body = l.body.inline_var(var, value, cx, scope)?;
                Expr::Let(l)
            }
            Expr::If(mut i) => {
                i.cond = i.cond.inline_var(var, value, cx, scope)?;
                i.then = i.then.inline_var(var, value, cx, scope)?;
                i.els = i.els.inline_var(var, value, cx, scope)?;
                Expr::If(i)
            }
            Expr::Arith(mut a) => {
                a.lhs = a.lhs.inline_var(var, value, cx, scope)?;
                a.rhs = a.rhs.inline_var(var, value, cx, scope)?;
                Expr::Arith(a)
            }
            Expr::Compare(mut c) => {
                c.lhs = c.lhs.inline_var(var, value, cx, scope)?;
                c.rhs = c.rhs.inline_var(var, value, cx, scope)?;
                Expr::Compare(c)
            }
            Expr::Seq(items) => Expr::Seq(
                items
                    .into_iter()
                    .map(|e| e.inline_var(var, value, cx, scope))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::TypeCheck(mut t) => {
                t.expr = t.expr.inline_var(var, value, cx, scope)?;
                Expr::TypeCheck(t)
            }
            Expr::Builtin(mut b) => {
                b.args = std::mem::take(&mut b.args)
                    .into_iter()
                    .map(|e| e.inline_var(var, value, cx, scope))
                    .collect::<Result<_, _>>()?;
                Expr::Builtin(b)
            }
            Expr::Closure(c) => return c.inline_var(var, value, cx, scope),
            Expr::PartApp(mut p) => {
                p.target = p.target.inline_var(var, value, cx, scope)?;
                p.args = std::mem::take(&mut p.args)
                    .into_iter()
                    .map(|e| e.inline_var(var, value, cx, scope))
                    .collect::<Result<_, _>>()?;
                Expr::PartApp(p)
            }
            Expr::StaticCall(mut c) => {
                c.args = std::mem::take(&mut c.args)
                    .into_iter()
                    .map(|e| e.inline_var(var, value, cx, scope))
                    .collect::<Result<_, _>>()?;
                Expr::StaticCall(c)
            }
            Expr::DynCall(mut c) => {
                c.func = c.func.inline_var(var, value, cx, scope)?;
                c.args = std::mem::take(&mut c.args)
                    .into_iter()
                    .map(|e| e.inline_var(var, value, cx, scope))
                    .collect::<Result<_, _>>()?;
                Expr::DynCall(c)
            }
            other => return Ok(other),
        };
        expr.optimize(cx, scope)
    }

    /// Structural copy. Variables found in `map` are replaced by their
    /// copies; all others are free in the copied region and stay as they are.
    pub fn copy(&self, map: &mut IdMap) -> Expr {
        match self {
            Expr::Value(_) | Expr::ContextItem(_) | Expr::Error(_) => self.clone(),
            Expr::VarRef(r) => match map.get(r.var) {
                Some(v) => Expr::VarRef(VarRef { var: v.id, slot: v.slot, ty: v.ty.clone(), span: r.span }),
                None => self.clone(),
            },
            Expr::Let(l) => {
                let (var, slot) = map.get(l.var).map_or((l.var, l.slot), |v| (v.id, v.slot));
                Expr::Let(Box::new(Let { var, slot, value: l.value.copy(map), body: l.body.copy(map) }))
            }
            Expr::If(i) => Expr::If(Box::new(If {
                cond: i.cond.copy(map),
                then: i.then.copy(map),
                els: i.els.copy(map),
                span: i.span,
            })),
            Expr::Arith(a) => Expr::Arith(Box::new(Arith {
                op: a.op,
                lhs: a.lhs.copy(map),
                rhs: a.rhs.copy(map),
                span: a.span,
            })),
            Expr::Compare(c) => Expr::Compare(Box::new(Compare {
                op: c.op,
                lhs: c.lhs.copy(map),
                rhs: c.rhs.copy(map),
                span: c.span,
            })),
            Expr::Seq(items) => Expr::Seq(items.iter().map(|e| e.copy(map)).collect()),
            Expr::TypeCheck(t) => Expr::TypeCheck(Box::new(TypeCheck {
                expr: t.expr.copy(map),
                ty: t.ty.clone(),
                span: t.span,
            })),
            Expr::Builtin(b) => Expr::Builtin(BuiltinCall {
                func: b.func,
                args: b.args.iter().map(|e| e.copy(map)).collect(),
                span: b.span,
            }),
            Expr::Closure(c) => Expr::Closure(Box::new(c.copy(map))),
            Expr::FuncLit(l) => Expr::FuncLit(Box::new(l.copy(map))),
            Expr::PartApp(p) => Expr::PartApp(Box::new(p.copy(map))),
            Expr::StaticCall(c) => Expr::StaticCall(c.copy(map)),
            Expr::DynCall(c) => Expr::DynCall(Box::new(c.copy(map))),
        }
    }

    /// Mark calls on syntactic tail positions.
    pub fn mark_tail_calls(&mut self) {
        match self {
            Expr::If(i) => {
                i.then.mark_tail_calls();
                i.els.mark_tail_calls();
            }
            Expr::Let(l) => l.body.mark_tail_calls(),
            Expr::StaticCall(c) => c.tail = true,
            Expr::DynCall(c) => c.tail = true,
            _ => {}
        }
    }

    // ---- static checks ----

    /// Whether evaluating this expression performs updates, resolving static
    /// calls through the registry. Closure bodies are not inspected.
    pub fn updates(&self, funcs: &StaticFuncs) -> bool {
        struct UpdateFinder<'a> {
            funcs: &'a StaticFuncs,
        }
        impl Visitor for UpdateFinder<'_> {
            fn visit_expr(&mut self, expr: &Expr) -> bool {
                match expr {
                    Expr::Builtin(b) if b.func.flags().upd => false,
                    Expr::DynCall(c) if c.updating => false,
                    Expr::StaticCall(c) if self.funcs.get(c.func).annotations.updating => false,
                    Expr::Closure(c) => c.closure_map.iter().all(|(_, e)| self.visit_expr(e)),
                    Expr::FuncLit(_) => true,
                    _ => walk_expr(self, expr),
                }
            }
        }
        !UpdateFinder { funcs }.visit_expr(self)
    }

    /// Updating consistency of every closure in this expression.
    pub fn check_up(&self, funcs: &StaticFuncs, options: &CompileOptions) -> Result<(), QueryError> {
        struct ClosureChecker<'a> {
            funcs: &'a StaticFuncs,
            options: &'a CompileOptions,
            error: Option<QueryError>,
        }
        impl Visitor for ClosureChecker<'_> {
            fn visit_expr(&mut self, expr: &Expr) -> bool {
                if let Expr::Closure(c) = expr
                    && let Err(e) = c.check_up(self.funcs, self.options)
                {
                    self.error = Some(e);
                    return false;
                }
                walk_expr(self, expr)
            }
        }
        let mut checker = ClosureChecker { funcs, options, error: None };
        checker.visit_expr(self);
        checker.error.map_or(Ok(()), Err)
    }

    // ---- evaluation ----

    pub fn evaluate(&self, qc: &mut QueryContext<'_>) -> Result<Value, QueryError> {
        match self {
            Expr::Value(v) => Ok(v.clone()),
            Expr::VarRef(r) => Ok(qc.get(r.slot)),
            Expr::Let(l) => {
                let v = l.value.evaluate(qc)?;
                qc.set(l.slot, v);
                l.body.evaluate(qc)
            }
            Expr::If(i) => {
                if i.cond.evaluate(qc)?.ebv(i.span)? {
                    i.then.evaluate(qc)
                } else {
                    i.els.evaluate(qc)
                }
            }
            Expr::Arith(a) => {
                let l = a.lhs.evaluate(qc)?;
                let r = a.rhs.evaluate(qc)?;
                arith(a.op, &l, &r, a.span)
            }
            Expr::Compare(c) => {
                let l = c.lhs.evaluate(qc)?;
                let r = c.rhs.evaluate(qc)?;
                Ok(Value::Bool(compare(c.op, &l, &r, c.span)?))
            }
            Expr::Seq(items) => {
                let values = items.iter().map(|e| e.evaluate(qc)).collect::<Result<_, _>>()?;
                Ok(Value::from_items(values))
            }
            Expr::ContextItem(span) => qc.focus(*span),
            Expr::TypeCheck(t) => {
                let v = t.expr.evaluate(qc)?;
                if t.ty.matches(&v) { Ok(v) } else { Err(treat_error(&v, &t.ty, t.span)) }
            }
            Expr::Builtin(b) => builtins::evaluate(b, qc),
            Expr::Error(e) => Err((**e).clone()),
            Expr::Closure(c) => c.evaluate(qc),
            Expr::FuncLit(l) => l.closure.evaluate(qc),
            Expr::PartApp(p) => p.evaluate(qc),
            Expr::StaticCall(c) => c.evaluate(qc),
            Expr::DynCall(c) => c.evaluate(qc),
        }
    }

    /// Evaluate a function body. Calls marked as tail calls are not invoked
    /// but handed back to the caller's trampoline.
    pub(crate) fn eval_tail(&self, qc: &mut QueryContext<'_>) -> Result<Flow, QueryError> {
        match self {
            Expr::If(i) => {
                if i.cond.evaluate(qc)?.ebv(i.span)? {
                    i.then.eval_tail(qc)
                } else {
                    i.els.eval_tail(qc)
                }
            }
            Expr::Let(l) => {
                let v = l.value.evaluate(qc)?;
                qc.set(l.slot, v);
                l.body.eval_tail(qc)
            }
            Expr::StaticCall(c) if c.tail => {
                let args = c.args.iter().map(|e| e.evaluate(qc)).collect::<Result<_, _>>()?;
                Ok(Flow::Call(TailCall::Static { func: c.func, args, span: c.span }))
            }
            Expr::DynCall(c) if c.tail => c.tail_call(qc),
            other => Ok(Flow::Done(other.evaluate(qc)?)),
        }
    }
}

fn treat_error(value: &Value, ty: &SeqType, span: Span) -> QueryError {
    QueryError::type_err(format!("Cannot treat {} as {ty}", value.type_name()), span)
}

/// Integer arithmetic. An empty operand yields the empty sequence.
pub fn arith(op: ArithOp, lhs: &Value, rhs: &Value, span: Span) -> Result<Value, QueryError> {
    if lhs.is_empty() || rhs.is_empty() {
        return Ok(Value::empty());
    }
    let (l, r) = (lhs.as_int(span)?, rhs.as_int(span)?);
    let overflow = || QueryError::dynamic("FOAR0002", "Integer overflow", span);
    let div_zero = || QueryError::dynamic("FOAR0001", "Division by zero", span);
    let result = match op {
        ArithOp::Add => l.checked_add(r).ok_or_else(overflow)?,
        ArithOp::Sub => l.checked_sub(r).ok_or_else(overflow)?,
        ArithOp::Mul => l.checked_mul(r).ok_or_else(overflow)?,
        ArithOp::IDiv => {
            if r == 0 {
                return Err(div_zero());
            }
            l.checked_div(r).ok_or_else(overflow)?
        }
        ArithOp::Mod => {
            if r == 0 {
                return Err(div_zero());
            }
            l.checked_rem(r).ok_or_else(overflow)?
        }
    };
    Ok(Value::Int(result))
}

/// Comparison of two single atomic values. An empty operand compares false.
pub fn compare(op: CmpOp, lhs: &Value, rhs: &Value, span: Span) -> Result<bool, QueryError> {
    use std::cmp::Ordering;

    if lhs.is_empty() || rhs.is_empty() {
        return Ok(false);
    }
    let ordering = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Func(_), _) | (_, Value::Func(_)) => {
            return Err(QueryError::dynamic("FOTY0013", "Functions cannot be compared", span));
        }
        (a, b) => {
            return Err(QueryError::type_err(
                format!("Cannot compare {} with {}", a.type_name(), b.type_name()),
                span,
            ));
        }
    };
    Ok(match op {
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
    })
}
