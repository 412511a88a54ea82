//! Function values: closures, named literals, partial applications, the
//! static function registry, call sites and runtime function items.

pub mod call;
pub mod closure;
pub mod functions;
pub mod item;
pub mod literal;
pub mod partial;
pub mod registry;

use serde::Serialize;

use crate::context::CompileContext;
use crate::diagnostics::QueryError;
use crate::expr::{Expr, Let, TypeCheck};
use crate::scope::{IdMap, VarId, VarScope};
use crate::span::Span;
use crate::types::SeqType;
use crate::visit::{DynCallTagger, VisitMut};

/// Function annotations that influence compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Annotations {
    /// `%updating`
    pub updating: bool,
    /// `%inline(n)`: per-function override of the inlining limit.
    pub inline: Option<usize>,
}

/// Wrap a compiled body in a type check if its static type does not
/// already satisfy the declared return type.
pub(crate) fn coerce_body(body: Expr, declared: Option<&SeqType>, span: Span) -> Expr {
    match declared {
        Some(ty) if !body.inferred_type().instance_of(ty) => {
            Expr::TypeCheck(Box::new(TypeCheck { expr: body, ty: ty.clone(), span }))
        }
        _ => body,
    }
}

/// Inline expansion of a compiled function body into `target`.
///
/// The variables of `scope` are re-declared in the target frame, the body is
/// copied against them, and every `(variable, value)` binding is wrapped
/// around it as a `let`, innermost last. Dynamic calls of the copied body
/// are tagged with `tokens`.
pub(crate) fn expand(
    scope: &VarScope,
    body: &Expr,
    bindings: Vec<(VarId, Expr)>,
    tokens: &[u32],
    span: Span,
    cx: &mut CompileContext<'_>,
    target: &mut VarScope,
) -> Result<Expr, QueryError> {
    let mut map = IdMap::new();
    scope.adopt_into(target, &mut map);
    let mut expr = body.copy(&mut map);
    if !tokens.is_empty() {
        DynCallTagger { tokens }.visit_expr_mut(&mut expr);
    }
    for (old, value) in bindings.into_iter().rev() {
        let var = map.require(old).clone();
        let value = match &var.declared {
            Some(ty) if !value.inferred_type().instance_of(ty) => {
                Expr::TypeCheck(Box::new(TypeCheck { expr: value, ty: ty.clone(), span })).optimize(cx, target)?
            }
            _ => value,
        };
        expr = Expr::Let(Box::new(Let { var: var.id, slot: var.slot, value, body: expr })).optimize(cx, target)?;
    }
    Ok(expr)
}
