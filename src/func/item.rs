//! Runtime function items and the invocation trampoline.
//!
//! A [`FuncItem`] is what closures, literals and partial applications
//! evaluate to. Invoking one pushes a frame sized for the function's scope,
//! binds the captured values and the (type-checked) arguments to their slots
//! and evaluates the body without a focus. Calls on tail positions do not
//! recurse: the body returns them as a [`TailCall`] and the loop in
//! [`run`] continues with the next callee after the frame is released.

use std::rc::Rc;

use serde::Serialize;
use tracing::trace;

use crate::builtins::{self, Builtin};
use crate::context::QueryContext;
use crate::diagnostics::QueryError;
use crate::expr::Expr;
use crate::func::Annotations;
use crate::func::registry::{CompileState, FuncId};
use crate::scope::{Ids, Var, VarScope};
use crate::span::Span;
use crate::types::FuncType;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct FuncItem(Rc<ItemData>);

#[derive(Debug)]
pub struct ItemData {
    /// Identity of the closure this item was created from.
    pub origin: u32,
    pub name: Option<String>,
    pub ty: FuncType,
    pub annotations: Annotations,
    pub span: Span,
    pub code: Code,
}

#[derive(Debug)]
pub enum Code {
    Closure {
        params: Vec<Var>,
        captured: Vec<(Var, Value)>,
        body: Rc<Expr>,
        scope: Rc<VarScope>,
    },
    Builtin(Builtin),
}

/// Items compare by identity.
impl PartialEq for FuncItem {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Serializable description of a function item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionInfo {
    pub name: Option<String>,
    pub arity: usize,
    pub params: Vec<ParamInfo>,
    pub returns: String,
    pub annotations: Annotations,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl FuncItem {
    pub fn new(data: ItemData) -> Self {
        Self(Rc::new(data))
    }

    /// First-class value of a built-in function.
    pub fn builtin(func: Builtin, ids: &Ids) -> Self {
        Self::new(ItemData {
            origin: ids.next_origin(),
            name: Some(func.qualified_name()),
            ty: func.func_type(),
            annotations: Annotations { updating: func.flags().upd, inline: None },
            span: Span::dummy(),
            code: Code::Builtin(func),
        })
    }

    pub fn data(&self) -> &ItemData {
        &self.0
    }

    pub fn origin(&self) -> u32 {
        self.0.origin
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn arity(&self) -> usize {
        self.0.ty.arity()
    }

    pub fn func_type(&self) -> &FuncType {
        &self.0.ty
    }

    pub fn annotations(&self) -> &Annotations {
        &self.0.annotations
    }

    pub fn is_updating(&self) -> bool {
        self.0.annotations.updating
    }

    /// Name of the parameter at `index`, if the item knows one.
    pub fn param_name(&self, index: usize) -> Option<&str> {
        match &self.0.code {
            Code::Closure { params, .. } => params.get(index).map(|p| p.name.as_str()),
            Code::Builtin(_) => None,
        }
    }

    /// Check that an item may be called from a call that is (or is not)
    /// declared updating.
    pub fn check_updating(&self, updating_call: bool, qc: &QueryContext<'_>, span: Span) -> Result<(), QueryError> {
        if qc.options.mixed_updates {
            return Ok(());
        }
        match (updating_call, self.is_updating()) {
            (false, true) => Err(QueryError::not_updating(
                format!("Updating function {self} called by a non-updating expression"),
                span,
            )),
            (true, false) => Err(QueryError::updating_expected(
                format!("Function {self} is not updating"),
                span,
            )),
            _ => Ok(()),
        }
    }

    pub fn invoke(&self, qc: &mut QueryContext<'_>, args: Vec<Value>, span: Span) -> Result<Value, QueryError> {
        run(qc, TailCall::Item { item: self.clone(), args, span })
    }

    /// Invoke and require at most one item as result.
    pub fn invoke_single(&self, qc: &mut QueryContext<'_>, args: Vec<Value>, span: Span) -> Result<Value, QueryError> {
        let value = self.invoke(qc, args, span)?;
        if value.items().len() > 1 {
            return Err(QueryError::type_err(
                format!("{self} returned {} items, at most one expected", value.items().len()),
                span,
            ));
        }
        Ok(value)
    }

    pub fn info(&self) -> FunctionInfo {
        let params = (0..self.arity())
            .map(|i| ParamInfo {
                name: self.param_name(i).map_or_else(|| format!("arg{}", i + 1), str::to_string),
                ty: self.0.ty.params[i].to_string(),
            })
            .collect();
        FunctionInfo {
            name: self.0.name.clone(),
            arity: self.arity(),
            params,
            returns: self.0.ty.ret.to_string(),
            annotations: self.0.annotations.clone(),
            span: self.0.span,
        }
    }
}

impl std::fmt::Display for FuncItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0.name {
            Some(name) => write!(f, "{name}#{}", self.arity()),
            None => write!(f, "(anonymous-function)#{}", self.arity()),
        }
    }
}

/// Pending call handed back by a function body on a tail position.
#[derive(Debug)]
pub(crate) enum TailCall {
    Static { func: FuncId, args: Vec<Value>, span: Span },
    Item { item: FuncItem, args: Vec<Value>, span: Span },
}

pub(crate) enum Flow {
    Done(Value),
    Call(TailCall),
}

/// Invoke `call` and every tail call it produces, one nesting level deep.
pub(crate) fn run(qc: &mut QueryContext<'_>, call: TailCall) -> Result<Value, QueryError> {
    qc.nested(|qc| {
        let mut call = call;
        loop {
            qc.check_interrupt()?;
            match step(qc, call)? {
                Flow::Done(value) => return Ok(value),
                Flow::Call(next) => call = next,
            }
        }
    })
}

fn step(qc: &mut QueryContext<'_>, call: TailCall) -> Result<Flow, QueryError> {
    match call {
        TailCall::Static { func, args, span } => {
            let funcs = qc.funcs;
            let func = funcs.get(func);
            let Some(body) = &func.body else {
                if let CompileState::Failed(e) = &func.state {
                    return Err(e.clone());
                }
                return Err(QueryError::resolution(func.name.clone(), func.arity, None, span));
            };
            trace!(name = %func.name, depth = qc.depth(), "invoke");
            let params = func.param_vars();
            let name = format!("{}#{}", func.name, func.arity);
            qc.with_frame(func.scope.frame_size(), |qc| {
                bind(qc, &params, args, &name, span)?;
                qc.without_focus(|qc| body.eval_tail(qc))
            })
        }
        TailCall::Item { item, args, span } => {
            if args.len() != item.arity() {
                return Err(QueryError::arity(item.to_string(), item.arity(), args.len(), span));
            }
            match &item.0.code {
                Code::Builtin(func) => builtins::apply(*func, qc, args, span).map(Flow::Done),
                Code::Closure { params, captured, body, scope } => {
                    trace!(item = %item, depth = qc.depth(), "invoke");
                    let name = item.to_string();
                    qc.with_frame(scope.frame_size(), |qc| {
                        for (var, value) in captured {
                            qc.set(var.slot, value.clone());
                        }
                        let params: Vec<&Var> = params.iter().collect();
                        bind(qc, &params, args, &name, span)?;
                        qc.without_focus(|qc| body.eval_tail(qc))
                    })
                }
            }
        }
    }
}

/// Bind arguments to parameter slots, checking declared parameter types.
fn bind(qc: &mut QueryContext<'_>, params: &[&Var], args: Vec<Value>, name: &str, span: Span) -> Result<(), QueryError> {
    for (var, arg) in params.iter().zip(args) {
        if let Some(ty) = &var.declared
            && !ty.matches(&arg)
        {
            return Err(QueryError::type_err(
                format!("{name}: cannot promote {} to {ty} for ${}", arg.type_name(), var.name),
                span,
            ));
        }
        qc.set(var.slot, arg);
    }
    Ok(())
}
