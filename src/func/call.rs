//! Call sites: static calls of registry functions and dynamic calls of
//! function items.

use tracing::debug;

use crate::builtins::BuiltinCall;
use crate::context::{CompileContext, QueryContext};
use crate::diagnostics::QueryError;
use crate::expr::{Expr, Flags};
use crate::func::expand;
use crate::func::item::{Code, Flow, FuncItem, TailCall, run};
use crate::func::registry::{CompileState, FuncId, compile_func};
use crate::scope::{IdMap, VarId, VarScope};
use crate::span::Span;
use crate::types::SeqType;
use crate::value::Value;

/// Call of a statically declared function.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticCall {
    pub name: String,
    pub func: FuncId,
    pub args: Vec<Expr>,
    /// Call on a tail position of a function body.
    pub tail: bool,
    /// Result type, known once the callee is compiled.
    pub ty: SeqType,
    /// Static properties of the callee.
    pub flags: Flags,
    pub span: Span,
}

impl StaticCall {
    pub fn new(name: &str, func: FuncId, args: Vec<Expr>, span: Span) -> Self {
        Self { name: name.to_string(), func, args, tail: false, ty: SeqType::Item, flags: Flags::default(), span }
    }

    pub fn compile(mut self, cx: &mut CompileContext<'_>, scope: &mut VarScope) -> Result<Expr, QueryError> {
        self.args = std::mem::take(&mut self.args)
            .into_iter()
            .map(|e| e.compile(cx, scope))
            .collect::<Result<_, _>>()?;
        compile_func(cx, self.func)?;
        let func = cx.funcs.get(self.func);
        if func.arity != self.args.len() {
            return Err(QueryError::arity(self.name, func.arity, self.args.len(), self.span));
        }
        self.ty = func.ret_type();
        self.flags = Flags { upd: func.flags.upd || func.annotations.updating, ..func.flags };
        Expr::StaticCall(self).optimize(cx, scope)
    }

    pub fn optimize(self, cx: &mut CompileContext<'_>, scope: &mut VarScope) -> Result<Expr, QueryError> {
        let func = cx.funcs.get(self.func);
        if func.state != CompileState::Compiled || !func.inlinable(cx.options) {
            return Ok(Expr::StaticCall(self));
        }
        let Some(body) = func.body.clone() else {
            return Ok(Expr::StaticCall(self));
        };
        let callee = func.scope.clone();
        let bindings: Vec<(VarId, Expr)> = func.params.iter().copied().zip(self.args).collect();
        debug!(name = %self.name, arity = bindings.len(), "inlined static call");
        let mut expr = expand(&callee, &body, bindings, &[], self.span, cx, scope)?;
        if self.tail {
            expr.mark_tail_calls();
        }
        Ok(expr)
    }

    pub fn copy(&self, map: &mut IdMap) -> StaticCall {
        StaticCall { args: self.args.iter().map(|e| e.copy(map)).collect(), ..self.clone() }
    }

    pub fn evaluate(&self, qc: &mut QueryContext<'_>) -> Result<Value, QueryError> {
        let args = self.args.iter().map(|e| e.evaluate(qc)).collect::<Result<_, _>>()?;
        run(qc, TailCall::Static { func: self.func, args, span: self.span })
    }
}

/// Call of a function item computed at run time.
#[derive(Debug, Clone, PartialEq)]
pub struct DynCall {
    pub func: Expr,
    pub args: Vec<Expr>,
    /// Call is declared updating (`invoke updating`).
    pub updating: bool,
    pub tail: bool,
    /// Origins of the closures this call site was inlined from.
    pub inlined: Vec<u32>,
    pub span: Span,
}

impl DynCall {
    pub fn new(func: Expr, args: Vec<Expr>, updating: bool, span: Span) -> Self {
        Self { func, args, updating, tail: false, inlined: Vec::new(), span }
    }

    pub fn compile(mut self: Box<Self>, cx: &mut CompileContext<'_>, scope: &mut VarScope) -> Result<Expr, QueryError> {
        self.func = std::mem::replace(&mut self.func, Expr::empty()).compile(cx, scope)?;
        self.args = std::mem::take(&mut self.args)
            .into_iter()
            .map(|e| e.compile(cx, scope))
            .collect::<Result<_, _>>()?;
        self.optimize(cx, scope)
    }

    pub fn optimize(self: Box<Self>, cx: &mut CompileContext<'_>, scope: &mut VarScope) -> Result<Expr, QueryError> {
        if let Some(ft) = self.func.inferred_type().func_type() {
            if ft.arity() != self.args.len() {
                return Err(QueryError::arity(self.callee_name(), ft.arity(), self.args.len(), self.span));
            }
            if !cx.options.mixed_updates {
                if ft.updating && !self.updating {
                    return Err(QueryError::not_updating(
                        format!("Updating function {} called by a non-updating expression", self.callee_name()),
                        self.span,
                    ));
                }
                if !ft.updating && self.updating {
                    return Err(QueryError::updating_expected(
                        format!("Function {} is not updating", self.callee_name()),
                        self.span,
                    ));
                }
            }
        }

        let this = *self;
        match &this.func {
            Expr::Value(Value::Func(item)) => match &item.data().code {
                Code::Builtin(func) => {
                    let call = BuiltinCall { func: *func, args: this.args, span: this.span };
                    Expr::Builtin(call).optimize(cx, scope)
                }
                Code::Closure { .. } if this.inlines(item, cx) => {
                    let item = item.clone();
                    this.inline_item(&item, cx, scope)
                }
                Code::Closure { .. } => Ok(Expr::DynCall(Box::new(this))),
            },
            Expr::Closure(closure) if closure.inlinable(cx.options) && !this.inlined.contains(&closure.origin) => {
                let closure = closure.clone();
                let tokens = this.tokens(closure.origin);
                let mut expr = closure.inline_expand(this.args, &tokens, cx, scope)?;
                if this.tail {
                    expr.mark_tail_calls();
                }
                Ok(expr)
            }
            Expr::FuncLit(lit)
                if lit.closure.inlinable(cx.options) && !this.inlined.contains(&lit.closure.origin) =>
            {
                let closure = lit.closure.clone();
                let tokens = this.tokens(closure.origin);
                let mut expr = closure.inline_expand(this.args, &tokens, cx, scope)?;
                if this.tail {
                    expr.mark_tail_calls();
                }
                Ok(expr)
            }
            _ => Ok(Expr::DynCall(Box::new(this))),
        }
    }

    fn callee_name(&self) -> String {
        match &self.func {
            Expr::Value(Value::Func(item)) => item.to_string(),
            Expr::FuncLit(lit) => format!("{}#{}", lit.name, lit.arity()),
            _ => format!("(dynamic function)#{}", self.args.len()),
        }
    }

    fn tokens(&self, origin: u32) -> Vec<u32> {
        let mut tokens = self.inlined.clone();
        tokens.push(origin);
        tokens
    }

    fn inlines(&self, item: &FuncItem, cx: &CompileContext<'_>) -> bool {
        let Code::Closure { body, .. } = &item.data().code else {
            return false;
        };
        let limit = item.annotations().inline.unwrap_or(cx.options.inline_limit);
        !item.is_updating()
            && !self.inlined.contains(&item.origin())
            && !body.has(crate::expr::Flag::Ctx)
            && body.size() <= limit
    }

    /// Expand a call of a closure item: captured values become constants.
    fn inline_item(self, item: &FuncItem, cx: &mut CompileContext<'_>, scope: &mut VarScope) -> Result<Expr, QueryError> {
        let Code::Closure { params, captured, body, scope: callee } = &item.data().code else {
            return Ok(Expr::DynCall(Box::new(self)));
        };
        let mut bindings: Vec<(VarId, Expr)> = params.iter().map(|p| p.id).zip(self.args).collect();
        bindings.extend(captured.iter().map(|(var, value)| (var.id, Expr::Value(value.clone()))));
        let tokens = {
            let mut tokens = self.inlined;
            tokens.push(item.origin());
            tokens
        };
        debug!(item = %item, "inlined function item call");
        let mut expr = expand(callee, body, bindings, &tokens, self.span, cx, scope)?;
        if self.tail {
            expr.mark_tail_calls();
        }
        Ok(expr)
    }

    pub fn copy(&self, map: &mut IdMap) -> DynCall {
        DynCall {
            func: self.func.copy(map),
            args: self.args.iter().map(|e| e.copy(map)).collect(),
            updating: self.updating,
            tail: self.tail,
            inlined: self.inlined.clone(),
            span: self.span,
        }
    }

    /// Evaluate callee and arguments and check the item against this call.
    fn prepare(&self, qc: &mut QueryContext<'_>) -> Result<(FuncItem, Vec<Value>), QueryError> {
        let callee = self.func.evaluate(qc)?;
        let item = callee.as_func(self.span)?.clone();
        if item.arity() != self.args.len() {
            return Err(QueryError::arity(item.to_string(), item.arity(), self.args.len(), self.span));
        }
        item.check_updating(self.updating, qc, self.span)?;
        let args = self.args.iter().map(|e| e.evaluate(qc)).collect::<Result<_, _>>()?;
        Ok((item, args))
    }

    pub fn evaluate(&self, qc: &mut QueryContext<'_>) -> Result<Value, QueryError> {
        let (item, args) = self.prepare(qc)?;
        item.invoke(qc, args, self.span)
    }

    pub(crate) fn tail_call(&self, qc: &mut QueryContext<'_>) -> Result<Flow, QueryError> {
        let (item, args) = self.prepare(qc)?;
        Ok(Flow::Call(TailCall::Item { item, args, span: self.span }))
    }
}
