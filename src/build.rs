//! Construction API for query units.
//!
//! [`QueryBuilder`] is what a parser would drive: it keeps a stack of
//! lexical frames, one per function body, resolves variable names to ids,
//! and turns references to variables of an enclosing function into
//! closure-map entries. Bodies of declared functions do not see the
//! variables of the main expression.

use crate::builtins::BuiltinCall;
use crate::config::CompileOptions;
use crate::diagnostics::QueryError;
use crate::expr::{Arith, ArithOp, CmpOp, Compare, Expr, If, Let, TypeCheck};
use crate::func::Annotations;
use crate::func::call::DynCall;
use crate::func::closure::Closure;
use crate::func::functions;
use crate::func::partial::PartFunc;
use crate::func::registry::{FuncId, StaticFuncs};
use crate::scope::{Ids, VarId, VarScope};
use crate::span::Span;
use crate::types::SeqType;
use crate::unit::QueryUnit;
use crate::value::Value;

/// Name, parameters, return type and annotations of a function under construction.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    name: Option<String>,
    params: Vec<(String, Option<SeqType>)>,
    returns: Option<SeqType>,
    annotations: Annotations,
}

impl Signature {
    pub fn new(name: &str) -> Self {
        Self { name: Some(name.to_string()), ..Self::default() }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: &str) -> Self {
        self.params.push((name.to_string(), None));
        self
    }

    pub fn typed_param(mut self, name: &str, ty: SeqType) -> Self {
        self.params.push((name.to_string(), Some(ty)));
        self
    }

    pub fn returns(mut self, ty: SeqType) -> Self {
        self.returns = Some(ty);
        self
    }

    pub fn updating(mut self) -> Self {
        self.annotations.updating = true;
        self
    }

    pub fn inline_limit(mut self, limit: usize) -> Self {
        self.annotations.inline = Some(limit);
        self
    }
}

struct Frame {
    scope: VarScope,
    /// Visible names, innermost binding last.
    names: Vec<(String, VarId)>,
    /// Captured local of this frame and the variable of the enclosing frame it copies.
    captures: Vec<(VarId, VarId)>,
    capturing: bool,
}

impl Frame {
    fn new(ids: &Ids, capturing: bool) -> Self {
        Self { scope: VarScope::new(ids), names: Vec::new(), captures: Vec::new(), capturing }
    }
}

pub struct QueryBuilder {
    ids: Ids,
    funcs: StaticFuncs,
    options: CompileOptions,
    frames: Vec<Frame>,
    span: Span,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    pub fn with_options(options: CompileOptions) -> Self {
        let ids = Ids::new();
        Self {
            funcs: StaticFuncs::with_ids(&ids),
            frames: vec![Frame::new(&ids, false)],
            ids,
            options,
            span: Span::dummy(),
        }
    }

    pub fn ids(&self) -> &Ids {
        &self.ids
    }

    /// Position attached to the nodes built from now on.
    pub fn at(&mut self, span: Span) -> &mut Self {
        self.span = span;
        self
    }

    fn frame(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    // ---- atoms ----

    pub fn int(&self, i: i64) -> Expr {
        Expr::Value(Value::Int(i))
    }

    pub fn bool(&self, b: bool) -> Expr {
        Expr::Value(Value::Bool(b))
    }

    pub fn string(&self, s: &str) -> Expr {
        Expr::Value(Value::str(s))
    }

    pub fn empty(&self) -> Expr {
        Expr::empty()
    }

    pub fn context_item(&self) -> Expr {
        Expr::ContextItem(self.span)
    }

    pub fn seq(&self, items: Vec<Expr>) -> Expr {
        Expr::Seq(items)
    }

    // ---- variables ----

    /// Reference to the innermost variable called `name`.
    pub fn var(&mut self, name: &str) -> Result<Expr, QueryError> {
        let level = self.frames.len() - 1;
        let span = self.span;
        match self.resolve(level, name) {
            Some(id) => Ok(Expr::var_ref(&self.frames[level].scope, id, span)),
            None => Err(QueryError::UnknownVar { name: name.to_string(), span }),
        }
    }

    fn resolve(&mut self, level: usize, name: &str) -> Option<VarId> {
        let frame = &self.frames[level];
        if let Some((_, id)) = frame.names.iter().rev().find(|(n, _)| n == name) {
            return Some(*id);
        }
        if !frame.capturing || level == 0 {
            return None;
        }
        let outer = self.resolve(level - 1, name)?;
        let frame = &mut self.frames[level];
        let local = frame.scope.new_pinned(name, None);
        // visible for the rest of the body, behind every other binding
        frame.names.insert(0, (name.to_string(), local));
        frame.captures.push((local, outer));
        Some(local)
    }

    /// `let $name := value return body`
    pub fn let_in(
        &mut self,
        name: &str,
        value: Expr,
        body: impl FnOnce(&mut Self) -> Result<Expr, QueryError>,
    ) -> Result<Expr, QueryError> {
        let frame = self.frame();
        let mark = frame.scope.open();
        let var = frame.scope.new_local(name, None);
        let slot = frame.scope.var(var).map_or(0, |v| v.slot);
        frame.names.push((name.to_string(), var));
        let body = body(self);
        let frame = self.frame();
        frame.names.pop();
        frame.scope.close(mark);
        Ok(Expr::Let(Box::new(Let { var, slot, value, body: body? })))
    }

    // ---- operators ----

    pub fn iff(&self, cond: Expr, then: Expr, els: Expr) -> Expr {
        Expr::If(Box::new(If { cond, then, els, span: self.span }))
    }

    pub fn arith(&self, op: ArithOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Arith(Box::new(Arith { op, lhs, rhs, span: self.span }))
    }

    pub fn add(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.arith(ArithOp::Add, lhs, rhs)
    }

    pub fn sub(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.arith(ArithOp::Sub, lhs, rhs)
    }

    pub fn mul(&self, lhs: Expr, rhs: Expr) -> Expr {
        self.arith(ArithOp::Mul, lhs, rhs)
    }

    pub fn compare(&self, op: CmpOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Compare(Box::new(Compare { op, lhs, rhs, span: self.span }))
    }

    /// `expr treat as ty`
    pub fn treat(&self, expr: Expr, ty: SeqType) -> Expr {
        Expr::TypeCheck(Box::new(TypeCheck { expr, ty, span: self.span }))
    }

    // ---- functions ----

    /// Call of a built-in or declared function.
    pub fn call(&mut self, name: &str, args: Vec<Expr>) -> Result<Expr, QueryError> {
        functions::call(&mut self.funcs, name, args, self.span)
    }

    /// Built-in call without name resolution.
    pub fn builtin(&self, call: crate::builtins::Builtin, args: Vec<Expr>) -> Expr {
        Expr::Builtin(BuiltinCall { func: call, args, span: self.span })
    }

    /// `$func(args)`
    pub fn dyn_call(&self, func: Expr, args: Vec<Expr>) -> Expr {
        Expr::DynCall(Box::new(DynCall::new(func, args, false, self.span)))
    }

    /// `invoke updating $func(args)`
    pub fn updating_dyn_call(&self, func: Expr, args: Vec<Expr>) -> Expr {
        Expr::DynCall(Box::new(DynCall::new(func, args, true, self.span)))
    }

    /// `name#arity`
    pub fn literal(&mut self, name: &str, arity: usize) -> Result<Expr, QueryError> {
        functions::literal(&mut self.funcs, &self.ids, name, arity, self.span)
    }

    /// `name(a, ?, b)`: `None` marks a placeholder.
    pub fn partial(&mut self, name: &str, args: Vec<Option<Expr>>) -> Result<Expr, QueryError> {
        let target = self.literal(name, args.len())?;
        Ok(self.partial_dyn(target, args))
    }

    /// `$func(a, ?, b)`
    pub fn partial_dyn(&self, func: Expr, args: Vec<Option<Expr>>) -> Expr {
        let mut supplied = Vec::new();
        let mut holes = Vec::new();
        for (pos, arg) in args.into_iter().enumerate() {
            match arg {
                Some(expr) => supplied.push(expr),
                None => holes.push(pos),
            }
        }
        Expr::PartApp(Box::new(PartFunc::new(func, supplied, holes, self.span)))
    }

    /// Inline function expression. Variables of enclosing functions used
    /// in the body are captured.
    pub fn closure(
        &mut self,
        sig: Signature,
        body: impl FnOnce(&mut Self) -> Result<Expr, QueryError>,
    ) -> Result<Expr, QueryError> {
        let span = self.span;
        let (frame, params, body) = self.function_frame(&sig, true, body);
        let body = body?;
        let outer = &self.frames[self.frames.len() - 1].scope;
        let closure_map = frame
            .captures
            .iter()
            .map(|(local, captured)| (*local, Expr::var_ref(outer, *captured, span)))
            .collect();
        let closure = Closure::new(sig.name, params, body, sig.returns, sig.annotations, frame.scope, closure_map, span);
        Ok(Expr::Closure(Box::new(closure)))
    }

    /// Declare a top-level function. Its body may call functions that are
    /// declared later.
    pub fn declare(
        &mut self,
        sig: Signature,
        body: impl FnOnce(&mut Self) -> Result<Expr, QueryError>,
    ) -> Result<FuncId, QueryError> {
        let span = self.span;
        let Some(name) = sig.name.clone() else {
            return Err(QueryError::config("a declared function needs a name"));
        };
        let (frame, params, body) = self.function_frame(&sig, false, body);
        let body = body?;
        self.funcs.declare(&name, params, sig.returns, sig.annotations, body, frame.scope, span)
    }

    fn function_frame(
        &mut self,
        sig: &Signature,
        capturing: bool,
        body: impl FnOnce(&mut Self) -> Result<Expr, QueryError>,
    ) -> (Frame, Vec<VarId>, Result<Expr, QueryError>) {
        let mut frame = Frame::new(&self.ids, capturing);
        let params: Vec<VarId> = sig
            .params
            .iter()
            .map(|(name, ty)| {
                let id = frame.scope.new_pinned(name, ty.clone());
                frame.names.push((name.clone(), id));
                id
            })
            .collect();
        self.frames.push(frame);
        let body = body(self);
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => Frame::new(&self.ids, capturing),
        };
        (frame, params, body)
    }

    /// Finish the unit with its main expression.
    pub fn finish(mut self, main: Expr) -> QueryUnit {
        let scope = match self.frames.drain(..).next() {
            Some(frame) => frame.scope,
            None => VarScope::new(&self.ids),
        };
        QueryUnit::new(self.options, self.ids, self.funcs, main, scope)
    }
}
