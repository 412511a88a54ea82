//! Expression visitor infrastructure
//!
//! Two visitor traits and corresponding walk functions:
//!
//! - `Visitor`: immutable traversal for analysis passes (node counts,
//!   recursion detection, variable usage). Returning `false` from
//!   `visit_expr` stops the whole traversal early.
//! - `VisitMut`: in-place traversal for rewriting passes that do not change
//!   node kinds (e.g. tagging inlined call sites).
//!
//! Implement the trait for your pass, overriding `visit_expr`, and call the
//! matching `walk_*` function inside the override to continue the default
//! recursion. Omit the walk call to prune traversal at that node.
//!
//! Closure bodies are part of the traversal: a closure's closure-map
//! expressions are visited first, then its body.

use std::rc::Rc;

use crate::expr::Expr;

/// Read-only expression visitor. Default implementation recurses into all children.
pub trait Visitor: Sized {
    fn visit_expr(&mut self, expr: &Expr) -> bool {
        walk_expr(self, expr)
    }
}

/// Visit all children of `expr`. Returns `false` if the visitor stopped.
pub fn walk_expr<V: Visitor>(v: &mut V, expr: &Expr) -> bool {
    match expr {
        Expr::Value(_) | Expr::VarRef(_) | Expr::ContextItem(_) | Expr::Error(_) => true,
        Expr::Let(l) => v.visit_expr(&l.value) && v.visit_expr(&l.body),
        Expr::If(i) => v.visit_expr(&i.cond) && v.visit_expr(&i.then) && v.visit_expr(&i.els),
        Expr::Arith(a) => v.visit_expr(&a.lhs) && v.visit_expr(&a.rhs),
        Expr::Compare(c) => v.visit_expr(&c.lhs) && v.visit_expr(&c.rhs),
        Expr::Seq(items) => items.iter().all(|e| v.visit_expr(e)),
        Expr::TypeCheck(t) => v.visit_expr(&t.expr),
        Expr::Builtin(b) => b.args.iter().all(|e| v.visit_expr(e)),
        Expr::Closure(c) => {
            c.closure_map.iter().all(|(_, e)| v.visit_expr(e)) && v.visit_expr(&c.body)
        }
        Expr::FuncLit(l) => v.visit_expr(&l.closure.body),
        Expr::PartApp(p) => v.visit_expr(&p.target) && p.args.iter().all(|e| v.visit_expr(e)),
        Expr::StaticCall(c) => c.args.iter().all(|e| v.visit_expr(e)),
        Expr::DynCall(c) => v.visit_expr(&c.func) && c.args.iter().all(|e| v.visit_expr(e)),
    }
}

/// Mutable expression visitor. Default implementation recurses into all children.
pub trait VisitMut: Sized {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }
}

pub fn walk_expr_mut<V: VisitMut>(v: &mut V, expr: &mut Expr) {
    match expr {
        Expr::Value(_) | Expr::VarRef(_) | Expr::ContextItem(_) | Expr::Error(_) => {}
        Expr::Let(l) => {
            v.visit_expr_mut(&mut l.value);
            v.visit_expr_mut(&mut l.body);
        }
        Expr::If(i) => {
            v.visit_expr_mut(&mut i.cond);
            v.visit_expr_mut(&mut i.then);
            v.visit_expr_mut(&mut i.els);
        }
        Expr::Arith(a) => {
            v.visit_expr_mut(&mut a.lhs);
            v.visit_expr_mut(&mut a.rhs);
        }
        Expr::Compare(c) => {
            v.visit_expr_mut(&mut c.lhs);
            v.visit_expr_mut(&mut c.rhs);
        }
        Expr::Seq(items) => {
            for e in items {
                v.visit_expr_mut(e);
            }
        }
        Expr::TypeCheck(t) => v.visit_expr_mut(&mut t.expr),
        Expr::Builtin(b) => {
            for e in &mut b.args {
                v.visit_expr_mut(e);
            }
        }
        Expr::Closure(c) => {
            for (_, e) in &mut c.closure_map {
                v.visit_expr_mut(e);
            }
            v.visit_expr_mut(Rc::make_mut(&mut c.body));
        }
        Expr::FuncLit(l) => v.visit_expr_mut(Rc::make_mut(&mut l.closure.body)),
        Expr::PartApp(p) => {
            v.visit_expr_mut(&mut p.target);
            for e in &mut p.args {
                v.visit_expr_mut(e);
            }
        }
        Expr::StaticCall(c) => {
            for e in &mut c.args {
                v.visit_expr_mut(e);
            }
        }
        Expr::DynCall(c) => {
            v.visit_expr_mut(&mut c.func);
            for e in &mut c.args {
                v.visit_expr_mut(e);
            }
        }
    }
}

// ============================================================================
// Common analyses
// ============================================================================

/// Counts expression nodes; used for inlining budgets.
pub struct NodeCounter {
    pub count: usize,
}

impl Visitor for NodeCounter {
    fn visit_expr(&mut self, expr: &Expr) -> bool {
        self.count += 1;
        walk_expr(self, expr)
    }
}

/// Finds a static call to one registry entry (self-recursion detection).
pub struct CallFinder {
    pub func: crate::func::registry::FuncId,
}

impl Visitor for CallFinder {
    fn visit_expr(&mut self, expr: &Expr) -> bool {
        if let Expr::StaticCall(call) = expr && call.func == self.func {
            return false;
        }
        if let Expr::FuncLit(lit) = expr && lit.func == self.func {
            return false;
        }
        walk_expr(self, expr)
    }
}

/// Collects the targets of all static calls.
#[derive(Default)]
pub struct CallCollector {
    pub calls: Vec<crate::func::registry::FuncId>,
}

impl Visitor for CallCollector {
    fn visit_expr(&mut self, expr: &Expr) -> bool {
        if let Expr::StaticCall(call) = expr && !self.calls.contains(&call.func) {
            self.calls.push(call.func);
        }
        walk_expr(self, expr)
    }
}

/// Folds the registry's callee flags into every static call site.
pub struct CallFlagRefresher<'a> {
    /// Indexed by `FuncId`.
    pub flags: &'a [crate::expr::Flags],
}

impl VisitMut for CallFlagRefresher<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if let Expr::StaticCall(call) = expr
            && let Some(flags) = self.flags.get(call.func.0 as usize)
        {
            call.flags.ndt |= flags.ndt;
            call.flags.ctx |= flags.ctx;
        }
        walk_expr_mut(self, expr);
    }
}

/// Finds a reference to a variable.
pub struct VarFinder {
    pub var: crate::scope::VarId,
}

impl Visitor for VarFinder {
    fn visit_expr(&mut self, expr: &Expr) -> bool {
        if let Expr::VarRef(r) = expr && r.var == self.var {
            return false;
        }
        walk_expr(self, expr)
    }
}

/// Extends the inlined-from token set of every dynamic call site.
pub struct DynCallTagger<'a> {
    pub tokens: &'a [u32],
}

impl VisitMut for DynCallTagger<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if let Expr::DynCall(call) = expr {
            for token in self.tokens {
                if !call.inlined.contains(token) {
                    call.inlined.push(*token);
                }
            }
        }
        walk_expr_mut(self, expr);
    }
}
