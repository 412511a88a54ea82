//! Named function literals (`local:f#2`).
//!
//! A literal is a closure whose body statically calls the named function
//! with its own parameters. The function may be declared after the
//! literal; parameter names, types and annotations are copied from the
//! registry entry when the literal is compiled.

use crate::context::CompileContext;
use crate::diagnostics::QueryError;
use crate::expr::Expr;
use crate::func::Annotations;
use crate::func::call::StaticCall;
use crate::func::closure::Closure;
use crate::func::registry::{FuncId, StaticFuncs, compile_func};
use crate::scope::{IdMap, Ids, VarScope};
use crate::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct FuncLit {
    pub name: String,
    pub func: FuncId,
    pub closure: Closure,
    pub span: Span,
}

impl FuncLit {
    pub fn new(funcs: &mut StaticFuncs, ids: &Ids, name: &str, arity: usize, span: Span) -> Self {
        let func = funcs.reference(name, arity, span);
        let mut scope = VarScope::new(ids);
        let params: Vec<_> = (1..=arity).map(|i| scope.new_pinned(&format!("arg{i}"), None)).collect();
        let args = params.iter().map(|p| Expr::var_ref(&scope, *p, span)).collect();
        let body = Expr::StaticCall(StaticCall::new(name, func, args, span));
        let closure = Closure::new(
            Some(name.to_string()),
            params,
            body,
            None,
            Annotations::default(),
            scope,
            Vec::new(),
            span,
        );
        Self { name: name.to_string(), func, closure, span }
    }

    pub fn arity(&self) -> usize {
        self.closure.arity()
    }

    pub fn compile(self: Box<Self>, cx: &mut CompileContext<'_>, outer: &mut VarScope) -> Result<Expr, QueryError> {
        let FuncLit { name, func, mut closure, span } = *self;
        if !closure.compiled {
            compile_func(cx, func)?;
            let target = cx.funcs.get(func);
            let scope = std::rc::Rc::make_mut(&mut closure.scope);
            for (param, var) in closure.params.iter().zip(target.param_vars()) {
                scope.set_declared(*param, var.declared.clone());
                scope.rename(*param, &var.name);
            }
            closure.declared = target.declared.clone();
            closure.annotations = target.annotations.clone();
        }
        let expr = Box::new(closure).compile(cx, outer)?;
        Ok(Self::wrap(name, func, span, expr))
    }

    pub fn optimize(self: Box<Self>, cx: &mut CompileContext<'_>, outer: &mut VarScope) -> Result<Expr, QueryError> {
        let FuncLit { name, func, closure, span } = *self;
        let expr = Box::new(closure).optimize(cx, outer)?;
        Ok(Self::wrap(name, func, span, expr))
    }

    /// Keep the literal around a closure that was not pre-evaluated.
    fn wrap(name: String, func: FuncId, span: Span, expr: Expr) -> Expr {
        match expr {
            Expr::Closure(closure) => Expr::FuncLit(Box::new(FuncLit { name, func, closure: *closure, span })),
            other => other,
        }
    }

    pub fn copy(&self, map: &mut IdMap) -> FuncLit {
        FuncLit { name: self.name.clone(), func: self.func, closure: self.closure.copy(map), span: self.span }
    }
}
