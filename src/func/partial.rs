//! Partial function application (`f(1, ?)`).

use std::rc::Rc;

use crate::context::{CompileContext, QueryContext};
use crate::diagnostics::QueryError;
use crate::expr::Expr;
use crate::func::call::DynCall;
use crate::func::item::{Code, FuncItem, ItemData};
use crate::scope::{IdMap, Ids, VarScope};
use crate::span::Span;
use crate::types::FuncType;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct PartFunc {
    pub target: Expr,
    /// Supplied arguments, in positional order.
    pub args: Vec<Expr>,
    /// Positions of the placeholders among all arguments.
    pub holes: Vec<usize>,
    pub span: Span,
    /// Type of the resulting function, once the target type is known.
    pub ty: Option<FuncType>,
}

impl PartFunc {
    pub fn new(target: Expr, args: Vec<Expr>, holes: Vec<usize>, span: Span) -> Self {
        Self { target, args, holes, span, ty: None }
    }

    pub fn arity(&self) -> usize {
        self.args.len() + self.holes.len()
    }

    pub fn func_type(&self) -> Option<FuncType> {
        self.ty.clone()
    }

    pub fn compile(mut self: Box<Self>, cx: &mut CompileContext<'_>, scope: &mut VarScope) -> Result<Expr, QueryError> {
        self.target = std::mem::replace(&mut self.target, Expr::empty()).compile(cx, scope)?;
        self.args = std::mem::take(&mut self.args)
            .into_iter()
            .map(|e| e.compile(cx, scope))
            .collect::<Result<_, _>>()?;
        self.optimize(cx, scope)
    }

    pub fn optimize(mut self: Box<Self>, cx: &mut CompileContext<'_>, _scope: &mut VarScope) -> Result<Expr, QueryError> {
        if let Some(ft) = self.target.inferred_type().func_type() {
            if ft.arity() != self.arity() {
                return Err(QueryError::arity(self.target_name(), ft.arity(), self.arity(), self.span));
            }
            self.ty = Some(FuncType {
                params: self.holes.iter().map(|h| ft.params[*h].clone()).collect(),
                ret: ft.ret.clone(),
                updating: ft.updating,
            });
        }
        if let Expr::Value(Value::Func(item)) = &self.target
            && self.args.iter().all(Expr::is_value)
        {
            let supplied = self
                .args
                .iter()
                .filter_map(|e| match e {
                    Expr::Value(v) => Some(v.clone()),
                    _ => None,
                })
                .collect();
            return Ok(Expr::Value(Value::Func(materialize(&cx.ids, item, supplied, &self.holes, self.span))));
        }
        Ok(Expr::PartApp(self))
    }

    fn target_name(&self) -> String {
        match &self.target {
            Expr::Value(Value::Func(item)) => item.to_string(),
            Expr::FuncLit(lit) => format!("{}#{}", lit.name, lit.arity()),
            _ => format!("(dynamic function)#{}", self.arity()),
        }
    }

    pub fn copy(&self, map: &mut IdMap) -> PartFunc {
        PartFunc {
            target: self.target.copy(map),
            args: self.args.iter().map(|e| e.copy(map)).collect(),
            holes: self.holes.clone(),
            span: self.span,
            ty: self.ty.clone(),
        }
    }

    pub fn evaluate(&self, qc: &mut QueryContext<'_>) -> Result<Value, QueryError> {
        let target = self.target.evaluate(qc)?;
        let item = target.as_func(self.span)?;
        if item.arity() != self.arity() {
            return Err(QueryError::arity(item.to_string(), item.arity(), self.arity(), self.span));
        }
        let supplied = self.args.iter().map(|e| e.evaluate(qc)).collect::<Result<_, _>>()?;
        Ok(Value::Func(materialize(&qc.ids, item, supplied, &self.holes, self.span)))
    }
}

/// Build the function item of a partial application: one parameter per
/// hole, and a body that calls `item` with supplied values and parameters
/// in their original positions.
pub fn materialize(ids: &Ids, item: &FuncItem, supplied: Vec<Value>, holes: &[usize], span: Span) -> FuncItem {
    let mut scope = VarScope::new(ids);
    let params: Vec<_> = holes
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let name = item.param_name(*h).map_or_else(|| format!("arg{}", i + 1), str::to_string);
            scope.new_pinned(&name, None)
        })
        .collect();

    let arity = supplied.len() + holes.len();
    let mut supplied = supplied.into_iter();
    let mut args = Vec::with_capacity(arity);
    for pos in 0..arity {
        match holes.iter().position(|h| *h == pos) {
            Some(i) => args.push(Expr::var_ref(&scope, params[i], span)),
            None => args.push(Expr::Value(supplied.next().unwrap_or_else(Value::empty))),
        }
    }
    let mut call = DynCall::new(Expr::Value(Value::Func(item.clone())), args, item.is_updating(), span);
    call.tail = true;

    let ty = item.func_type();
    FuncItem::new(ItemData {
        origin: ids.next_origin(),
        name: None,
        ty: FuncType {
            params: holes.iter().map(|h| ty.params[*h].clone()).collect(),
            ret: ty.ret.clone(),
            updating: ty.updating,
        },
        annotations: item.annotations().clone(),
        span,
        code: Code::Closure {
            params: params.iter().filter_map(|p| scope.var(*p).cloned()).collect(),
            captured: Vec::new(),
            body: Rc::new(Expr::DynCall(Box::new(call))),
            scope: Rc::new(scope),
        },
    })
}
