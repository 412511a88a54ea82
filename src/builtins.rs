//! Built-in functions.
//!
//! The set is small: the higher-order functions that drive function items
//! (`for-each`, `filter`, `fold-left`), reflection (`function-arity`,
//! `function-name`), and a few functions whose static properties matter to
//! the optimizer (`random` is non-deterministic, `output` is updating).

use serde::Serialize;

use crate::context::QueryContext;
use crate::diagnostics::QueryError;
use crate::expr::{Expr, Flags};
use crate::span::Span;
use crate::types::{FuncType, SeqType};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Builtin {
    ForEach,
    Filter,
    FoldLeft,
    FunctionArity,
    FunctionName,
    Count,
    Random,
    Error,
    Output,
}

/// A call of a built-in function.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinCall {
    pub func: Builtin,
    pub args: Vec<Expr>,
    pub span: Span,
}

const FN_PREFIX: &str = "fn:";

impl Builtin {
    pub const ALL: [Builtin; 9] = [
        Builtin::ForEach,
        Builtin::Filter,
        Builtin::FoldLeft,
        Builtin::FunctionArity,
        Builtin::FunctionName,
        Builtin::Count,
        Builtin::Random,
        Builtin::Error,
        Builtin::Output,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::ForEach => "for-each",
            Builtin::Filter => "filter",
            Builtin::FoldLeft => "fold-left",
            Builtin::FunctionArity => "function-arity",
            Builtin::FunctionName => "function-name",
            Builtin::Count => "count",
            Builtin::Random => "random",
            Builtin::Error => "error",
            Builtin::Output => "output",
        }
    }

    /// Look up a built-in by local name, with or without the `fn:` prefix.
    pub fn by_name(name: &str) -> Option<Builtin> {
        let local = name.strip_prefix(FN_PREFIX).unwrap_or(name);
        Self::ALL.into_iter().find(|b| b.name() == local)
    }

    pub fn arity(self) -> usize {
        self.param_types().len()
    }

    pub fn flags(self) -> Flags {
        match self {
            Builtin::Random => Flags { ndt: true, ..Flags::default() },
            Builtin::Output => Flags { upd: true, ..Flags::default() },
            _ => Flags::default(),
        }
    }

    pub fn param_types(self) -> Vec<SeqType> {
        let func = |arity| SeqType::function(FuncType::any(arity));
        match self {
            Builtin::ForEach | Builtin::Filter => vec![SeqType::Item, func(1)],
            Builtin::FoldLeft => vec![SeqType::Item, SeqType::Item, func(2)],
            Builtin::FunctionArity | Builtin::FunctionName => vec![SeqType::any_function()],
            Builtin::Count | Builtin::Error | Builtin::Output => vec![SeqType::Item],
            Builtin::Random => vec![SeqType::Integer],
        }
    }

    pub fn ret_type(self) -> SeqType {
        match self {
            Builtin::FunctionArity | Builtin::Count | Builtin::Random => SeqType::Integer,
            Builtin::Output => SeqType::Empty,
            _ => SeqType::Item,
        }
    }

    pub fn func_type(self) -> FuncType {
        FuncType { params: self.param_types(), ret: self.ret_type(), updating: self.flags().upd }
    }

    pub fn qualified_name(self) -> String {
        format!("{FN_PREFIX}{}", self.name())
    }
}

/// Fold calls whose result is fixed once the arguments are values.
pub fn optimize(call: BuiltinCall) -> Result<Expr, QueryError> {
    let folds = matches!(call.func, Builtin::Count | Builtin::FunctionArity | Builtin::FunctionName);
    if !folds || !call.args.iter().all(Expr::is_value) {
        return Ok(Expr::Builtin(call));
    }
    let args: Vec<&Value> = call
        .args
        .iter()
        .filter_map(|e| match e {
            Expr::Value(v) => Some(v),
            _ => None,
        })
        .collect();
    let folded = match (call.func, args.as_slice()) {
        (Builtin::Count, [v]) => Ok(Value::Int(v.items().len() as i64)),
        (Builtin::FunctionArity, [v]) => v.as_func(call.span).map(|f| Value::Int(f.arity() as i64)),
        (Builtin::FunctionName, [v]) => v.as_func(call.span).map(function_name),
        _ => return Ok(Expr::Builtin(call)),
    };
    Ok(match folded {
        Ok(v) => Expr::Value(v),
        Err(e) => Expr::deferred(e),
    })
}

pub fn evaluate(call: &BuiltinCall, qc: &mut QueryContext<'_>) -> Result<Value, QueryError> {
    let args = call.args.iter().map(|e| e.evaluate(qc)).collect::<Result<Vec<_>, _>>()?;
    apply(call.func, qc, args, call.span)
}

/// Apply a built-in to evaluated arguments.
pub fn apply(func: Builtin, qc: &mut QueryContext<'_>, args: Vec<Value>, span: Span) -> Result<Value, QueryError> {
    if args.len() != func.arity() {
        return Err(QueryError::arity(func.qualified_name(), func.arity(), args.len(), span));
    }
    let mut args = args.into_iter();
    let mut next = || args.next().unwrap_or_else(Value::empty);
    match func {
        Builtin::ForEach => {
            let (seq, f) = (next(), next());
            let f = f.as_func(span)?;
            let mut out = Vec::new();
            for item in seq.items() {
                out.push(f.invoke(qc, vec![item.clone()], span)?);
            }
            Ok(Value::from_items(out))
        }
        Builtin::Filter => {
            let (seq, f) = (next(), next());
            let f = f.as_func(span)?;
            let mut out = Vec::new();
            for item in seq.items() {
                match f.invoke(qc, vec![item.clone()], span)? {
                    Value::Bool(true) => out.push(item.clone()),
                    Value::Bool(false) => {}
                    other => {
                        return Err(QueryError::type_err(
                            format!("xs:boolean expected, {} found", other.type_name()),
                            span,
                        ));
                    }
                }
            }
            Ok(Value::from_items(out))
        }
        Builtin::FoldLeft => {
            let (seq, zero, f) = (next(), next(), next());
            let f = f.as_func(span)?;
            let mut acc = zero;
            for item in seq.items() {
                acc = f.invoke(qc, vec![acc, item.clone()], span)?;
            }
            Ok(acc)
        }
        Builtin::FunctionArity => Ok(Value::Int(next().as_func(span)?.arity() as i64)),
        Builtin::FunctionName => Ok(function_name(next().as_func(span)?)),
        Builtin::Count => Ok(Value::Int(next().items().len() as i64)),
        Builtin::Random => {
            let bound = next().as_int(span)?;
            Ok(Value::Int(qc.random(bound)))
        }
        Builtin::Error => Err(QueryError::User { msg: next().to_string(), span }),
        Builtin::Output => {
            qc.add_update(next());
            Ok(Value::empty())
        }
    }
}

fn function_name(item: &crate::func::item::FuncItem) -> Value {
    match item.name() {
        Some(name) => Value::str(name),
        None => Value::empty(),
    }
}
