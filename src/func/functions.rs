//! Resolution of function names to built-ins or registry functions.

use crate::builtins::{Builtin, BuiltinCall};
use crate::diagnostics::QueryError;
use crate::expr::Expr;
use crate::func::call::StaticCall;
use crate::func::item::FuncItem;
use crate::func::literal::FuncLit;
use crate::func::registry::StaticFuncs;
use crate::scope::Ids;
use crate::span::Span;
use crate::value::Value;

/// Call of `name` with `args`. Unknown names become static calls against
/// a registry reference and are checked once all declarations are known.
pub fn call(funcs: &mut StaticFuncs, name: &str, args: Vec<Expr>, span: Span) -> Result<Expr, QueryError> {
    if let Some(func) = Builtin::by_name(name) {
        if args.len() != func.arity() {
            return Err(QueryError::arity(func.qualified_name(), func.arity(), args.len(), span));
        }
        return Ok(Expr::Builtin(BuiltinCall { func, args, span }));
    }
    let id = funcs.reference(name, args.len(), span);
    Ok(Expr::StaticCall(StaticCall::new(name, id, args, span)))
}

/// Function literal `name#arity`.
pub fn literal(funcs: &mut StaticFuncs, ids: &Ids, name: &str, arity: usize, span: Span) -> Result<Expr, QueryError> {
    if let Some(func) = Builtin::by_name(name) {
        if arity != func.arity() {
            return Err(QueryError::resolution(func.qualified_name(), arity, None, span));
        }
        return Ok(Expr::Value(Value::Func(FuncItem::builtin(func, ids))));
    }
    Ok(Expr::FuncLit(Box::new(FuncLit::new(funcs, ids, name, arity, span))))
}
