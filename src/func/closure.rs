//! Closures: anonymous functions with captured variables.
//!
//! A closure owns the scope of its body. Every variable of an enclosing
//! scope the body refers to is represented by a pinned local of that scope
//! plus an entry in the closure map, which supplies its value from the
//! enclosing scope whenever the closure is evaluated to a function item.

use std::rc::Rc;

use tracing::debug;

use crate::config::CompileOptions;
use crate::context::{CompileContext, QueryContext};
use crate::diagnostics::QueryError;
use crate::expr::{Expr, Flag};
use crate::func::item::{Code, FuncItem, ItemData};
use crate::func::registry::StaticFuncs;
use crate::func::{Annotations, coerce_body, expand};
use crate::scope::{IdMap, VarId, VarScope};
use crate::span::Span;
use crate::types::{FuncType, SeqType};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub name: Option<String>,
    pub params: Vec<VarId>,
    pub body: Rc<Expr>,
    /// Declared return type.
    pub declared: Option<SeqType>,
    pub annotations: Annotations,
    pub scope: Rc<VarScope>,
    /// Captured variable of `scope` and the expression of the enclosing
    /// scope that supplies it.
    pub closure_map: Vec<(VarId, Expr)>,
    /// Identity shared by all copies of this closure.
    pub origin: u32,
    pub compiled: bool,
    pub span: Span,
}

impl Closure {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: Option<String>,
        params: Vec<VarId>,
        body: Expr,
        declared: Option<SeqType>,
        annotations: Annotations,
        scope: VarScope,
        closure_map: Vec<(VarId, Expr)>,
        span: Span,
    ) -> Self {
        let origin = scope.ids().next_origin();
        Self {
            name,
            params,
            body: Rc::new(body),
            declared,
            annotations,
            scope: Rc::new(scope),
            closure_map,
            origin,
            compiled: false,
            span,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn param_name(&self, index: usize) -> Option<&str> {
        let id = self.params.get(index)?;
        self.scope.var(*id).map(|v| v.name.as_str())
    }

    pub fn func_type(&self) -> FuncType {
        let params = self
            .params
            .iter()
            .map(|p| self.scope.var(*p).and_then(|v| v.declared.clone()).unwrap_or(SeqType::Item))
            .collect();
        let ret = match &self.declared {
            Some(ty) => ty.clone(),
            None if self.compiled => self.body.inferred_type(),
            None => SeqType::Item,
        };
        FuncType { params, ret, updating: self.annotations.updating }
    }

    /// Only the closure map is evaluated when a closure expression is evaluated.
    pub fn has(&self, flag: Flag) -> bool {
        self.closure_map.iter().any(|(_, e)| e.has(flag))
    }

    pub fn compile(mut self: Box<Self>, cx: &mut CompileContext<'_>, outer: &mut VarScope) -> Result<Expr, QueryError> {
        if self.compiled {
            return Ok(Expr::Closure(self));
        }
        let map = std::mem::take(&mut self.closure_map);
        let scope = Rc::make_mut(&mut self.scope);
        for (var, value) in map {
            let value = value.compile(cx, outer)?;
            scope.refine(var, value.inferred_type());
            self.closure_map.push((var, value));
        }

        let body = Rc::unwrap_or_clone(std::mem::replace(&mut self.body, Rc::new(Expr::empty())));
        let mut body = match body.compile(cx, scope) {
            Ok(body) => coerce_body(body, self.declared.as_ref(), self.span),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!(error = %e, "closure body deferred to evaluation");
                Expr::deferred(e)
            }
        };
        if cx.options.tail_calls {
            body.mark_tail_calls();
        }
        self.body = Rc::new(body);
        self.compiled = true;
        Expr::Closure(self).optimize(cx, outer)
    }

    pub fn optimize(mut self: Box<Self>, cx: &mut CompileContext<'_>, _outer: &mut VarScope) -> Result<Expr, QueryError> {
        if !self.compiled {
            return Ok(Expr::Closure(self));
        }
        self.propagate(cx)?;
        if self.closure_map.is_empty() && !self.annotations.updating && !self.body.has(Flag::Ndt) {
            debug!(origin = self.origin, "pre-evaluated closure");
            return Ok(Expr::Value(Value::Func(self.to_item(Vec::new()))));
        }
        Ok(Expr::Closure(self))
    }

    /// Move closure-map values into the body. A value entry is dropped from
    /// the map for good.
    fn propagate(&mut self, cx: &mut CompileContext<'_>) -> Result<(), QueryError> {
        if !self.closure_map.iter().any(|(_, e)| e.is_value()) {
            return Ok(());
        }
        let map = std::mem::take(&mut self.closure_map);
        let scope = Rc::make_mut(&mut self.scope);
        let mut body = Rc::unwrap_or_clone(std::mem::replace(&mut self.body, Rc::new(Expr::empty())));
        for (var, value) in map {
            if !value.is_value() {
                self.closure_map.push((var, value));
                continue;
            }
            body = match body.inline_var(var, &value, cx, scope) {
                Ok(body) => body,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => Expr::deferred(e),
            };
        }
        if cx.options.tail_calls {
            body.mark_tail_calls();
        }
        self.body = Rc::new(body);
        Ok(())
    }

    pub fn inline_var(
        mut self: Box<Self>,
        var: VarId,
        value: &Expr,
        cx: &mut CompileContext<'_>,
        outer: &mut VarScope,
    ) -> Result<Expr, QueryError> {
        let map = std::mem::take(&mut self.closure_map);
        for (key, expr) in map {
            let expr = expr.inline_var(var, value, cx, outer)?;
            self.closure_map.push((key, expr));
        }
        Expr::Closure(self).optimize(cx, outer)
    }

    /// Copy with a fresh scope. Closure-map expressions belong to the
    /// enclosing scope and are copied against `map`.
    pub fn copy(&self, map: &mut IdMap) -> Closure {
        let mut inner = IdMap::new();
        let scope = self.scope.copy(&mut inner);
        Closure {
            name: self.name.clone(),
            params: self.params.iter().map(|p| inner.require(*p).id).collect(),
            body: Rc::new(self.body.copy(&mut inner)),
            declared: self.declared.clone(),
            annotations: self.annotations.clone(),
            scope: Rc::new(scope),
            closure_map: self.closure_map.iter().map(|(k, e)| (inner.require(*k).id, e.copy(map))).collect(),
            origin: self.origin,
            compiled: self.compiled,
            span: self.span,
        }
    }

    pub fn to_item(&self, captured: Vec<(crate::scope::Var, Value)>) -> FuncItem {
        FuncItem::new(ItemData {
            origin: self.origin,
            name: self.name.clone(),
            ty: self.func_type(),
            annotations: self.annotations.clone(),
            span: self.span,
            code: Code::Closure {
                params: self.params.iter().filter_map(|p| self.scope.var(*p).cloned()).collect(),
                captured,
                body: Rc::clone(&self.body),
                scope: Rc::clone(&self.scope),
            },
        })
    }

    pub fn evaluate(&self, qc: &mut QueryContext<'_>) -> Result<Value, QueryError> {
        let mut captured = Vec::with_capacity(self.closure_map.len());
        for (var, expr) in &self.closure_map {
            let value = expr.evaluate(qc)?;
            if let Some(var) = self.scope.var(*var) {
                captured.push((var.clone(), value));
            }
        }
        Ok(Value::Func(self.to_item(captured)))
    }

    /// Whether a call of this closure may be replaced by its body.
    pub fn inlinable(&self, options: &CompileOptions) -> bool {
        let limit = self.annotations.inline.unwrap_or(options.inline_limit);
        self.compiled && !self.annotations.updating && !self.body.has(Flag::Ctx) && self.body.size() <= limit
    }

    /// Expand a call with `args` into `target`: parameters and remaining
    /// captures become `let` bindings around a copy of the body.
    pub fn inline_expand(
        &self,
        args: Vec<Expr>,
        tokens: &[u32],
        cx: &mut CompileContext<'_>,
        target: &mut VarScope,
    ) -> Result<Expr, QueryError> {
        let mut bindings: Vec<(VarId, Expr)> = self.params.iter().copied().zip(args).collect();
        bindings.extend(self.closure_map.iter().cloned());
        debug!(origin = self.origin, name = ?self.name, "inlined closure call");
        expand(&self.scope, &self.body, bindings, tokens, self.span, cx, target)
    }

    /// Updating consistency of the body against the annotation.
    pub fn check_up(&self, funcs: &StaticFuncs, options: &CompileOptions) -> Result<(), QueryError> {
        let updates = self.body.updates(funcs);
        if self.annotations.updating && !updates && !self.body.is_vacuous() {
            return Err(QueryError::updating_expected("Updating function expression does not perform updates", self.span));
        }
        if !self.annotations.updating && updates && !options.mixed_updates {
            return Err(QueryError::not_updating("Function expression performs updates but is not declared updating", self.span));
        }
        Ok(())
    }
}
