//! Registry of statically declared functions.
//!
//! Entries are keyed by `(name, arity)` and stored in an arena. A call site
//! or literal that names a function which is not declared yet creates a
//! placeholder entry; the later declaration fills it in. Call sites only hold
//! the [`FuncId`], so forward references and mutual recursion need no
//! back-patching.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::config::CompileOptions;
use crate::context::CompileContext;
use crate::diagnostics::QueryError;
use crate::expr::{Expr, Flag, Flags};
use crate::func::item::{FunctionInfo, ParamInfo};
use crate::func::{Annotations, coerce_body};
use crate::scope::{Var, VarId, VarScope};
use crate::span::Span;
use crate::suggest::closest_name;
use crate::types::{FuncType, SeqType};
use crate::visit::{CallCollector, CallFinder, CallFlagRefresher, VisitMut, Visitor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FuncId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum CompileState {
    Pending,
    Compiling,
    Compiled,
    /// Compiling the body failed; every later request raises the same error.
    Failed(QueryError),
}

#[derive(Debug, Clone)]
pub struct StaticFunc {
    pub name: String,
    pub arity: usize,
    pub params: Vec<VarId>,
    /// Declared return type.
    pub declared: Option<SeqType>,
    pub annotations: Annotations,
    /// Taken out while the function is being compiled.
    pub body: Option<Expr>,
    pub scope: VarScope,
    pub span: Span,
    /// Positions of all call sites and literals naming this function.
    pub calls: Vec<Span>,
    pub defined: bool,
    pub state: CompileState,
    /// Static properties of the compiled body.
    pub flags: Flags,
    pub recursive: bool,
}

impl StaticFunc {
    fn placeholder(name: &str, arity: usize, ids: &crate::scope::Ids) -> Self {
        Self {
            name: name.to_string(),
            arity,
            params: Vec::new(),
            declared: None,
            annotations: Annotations::default(),
            body: None,
            scope: VarScope::new(ids),
            span: Span::dummy(),
            calls: Vec::new(),
            defined: false,
            state: CompileState::Pending,
            flags: Flags::default(),
            recursive: false,
        }
    }

    pub fn param_vars(&self) -> Vec<&Var> {
        self.params.iter().filter_map(|p| self.scope.var(*p)).collect()
    }

    pub fn param_types(&self) -> Vec<SeqType> {
        self.param_vars()
            .iter()
            .map(|v| v.declared.clone().unwrap_or(SeqType::Item))
            .collect()
    }

    /// Static result type: the declared one, else the compiled body's type.
    pub fn ret_type(&self) -> SeqType {
        match (&self.declared, &self.body) {
            (Some(ty), _) => ty.clone(),
            (None, Some(body)) if self.state == CompileState::Compiled => body.inferred_type(),
            _ => SeqType::Item,
        }
    }

    pub fn func_type(&self) -> FuncType {
        FuncType { params: self.param_types(), ret: self.ret_type(), updating: self.annotations.updating }
    }

    pub fn info(&self) -> FunctionInfo {
        FunctionInfo {
            name: Some(self.name.clone()),
            arity: self.arity,
            params: self
                .param_vars()
                .iter()
                .map(|v| ParamInfo {
                    name: v.name.clone(),
                    ty: v.declared.clone().unwrap_or(SeqType::Item).to_string(),
                })
                .collect(),
            returns: self.ret_type().to_string(),
            annotations: self.annotations.clone(),
            span: self.span,
        }
    }

    /// Whether call sites may replace a call by the body.
    pub fn inlinable(&self, options: &CompileOptions) -> bool {
        let limit = self.annotations.inline.unwrap_or(options.inline_limit);
        self.state == CompileState::Compiled
            && !self.recursive
            && !self.annotations.updating
            && !self.flags.ndt
            && !self.flags.ctx
            && self.body.as_ref().is_some_and(|b| b.size() <= limit)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticFuncs {
    funcs: Vec<StaticFunc>,
    index: HashMap<(String, usize), FuncId>,
    ids: crate::scope::Ids,
}

impl StaticFuncs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: &crate::scope::Ids) -> Self {
        Self { ids: ids.clone(), ..Self::default() }
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    pub fn get(&self, id: FuncId) -> &StaticFunc {
        &self.funcs[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: FuncId) -> &mut StaticFunc {
        &mut self.funcs[id.0 as usize]
    }

    pub fn lookup(&self, name: &str, arity: usize) -> Option<FuncId> {
        self.index.get(&(name.to_string(), arity)).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FuncId, &StaticFunc)> {
        self.funcs.iter().enumerate().map(|(i, f)| (FuncId(i as u32), f))
    }

    /// Names of all declared functions, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.funcs.iter().filter(|f| f.defined).map(|f| f.name.as_str()).collect()
    }

    fn entry(&mut self, name: &str, arity: usize) -> FuncId {
        if let Some(id) = self.lookup(name, arity) {
            return id;
        }
        let id = FuncId(self.funcs.len() as u32);
        self.funcs.push(StaticFunc::placeholder(name, arity, &self.ids));
        self.index.insert((name.to_string(), arity), id);
        id
    }

    /// Get or create the entry for `name#arity` and record a call site.
    pub fn reference(&mut self, name: &str, arity: usize, span: Span) -> FuncId {
        let id = self.entry(name, arity);
        self.get_mut(id).calls.push(span);
        id
    }

    /// Attach a body to `name#arity`, filling a placeholder if one exists.
    #[allow(clippy::too_many_arguments)]
    pub fn declare(
        &mut self,
        name: &str,
        params: Vec<VarId>,
        declared: Option<SeqType>,
        annotations: Annotations,
        body: Expr,
        scope: VarScope,
        span: Span,
    ) -> Result<FuncId, QueryError> {
        let arity = params.len();
        let id = self.entry(name, arity);
        let func = self.get_mut(id);
        if func.defined {
            return Err(QueryError::Duplicate { name: name.to_string(), arity, span });
        }
        func.params = params;
        func.declared = declared;
        func.annotations = annotations;
        func.body = Some(body);
        func.scope = scope;
        func.span = span;
        func.defined = true;
        debug!(name, arity, forward_refs = func.calls.len(), "declared function");
        Ok(id)
    }

    /// Every referenced function must have been declared.
    pub fn check(&self) -> Result<(), QueryError> {
        for func in self.funcs.iter().filter(|f| !f.defined) {
            let span = func.calls.first().copied().unwrap_or_default();
            let other_arity = self
                .funcs
                .iter()
                .find(|f| f.defined && f.name == func.name)
                .map(|f| f.arity);
            if let Some(expected) = other_arity {
                return Err(QueryError::arity(func.name.clone(), expected, func.arity, span));
            }
            let suggestion = closest_name(&func.name, self.names());
            return Err(QueryError::resolution(func.name.clone(), func.arity, suggestion, span));
        }
        debug!(functions = self.funcs.len(), "function references resolved");
        Ok(())
    }

    /// Carry non-determinism and focus dependence along static call edges.
    /// A callee that was still being compiled when its caller finished
    /// (mutual recursion) had not contributed its flags yet.
    pub fn propagate_flags(&mut self) {
        let edges: Vec<(FuncId, Vec<FuncId>)> = self
            .iter()
            .filter(|(_, f)| f.state == CompileState::Compiled)
            .filter_map(|(id, f)| {
                let mut collector = CallCollector::default();
                collector.visit_expr(f.body.as_ref()?);
                Some((id, collector.calls))
            })
            .collect();
        let mut changed = true;
        while changed {
            changed = false;
            for (id, callees) in &edges {
                let mut flags = self.get(*id).flags;
                for callee in callees {
                    let other = self.get(*callee).flags;
                    flags.ndt |= other.ndt;
                    flags.ctx |= other.ctx;
                }
                if flags != self.get(*id).flags {
                    self.get_mut(*id).flags = flags;
                    changed = true;
                }
            }
        }
        for (id, _) in &edges {
            if let Some(mut body) = self.get_mut(*id).body.take() {
                self.refresh_call_flags(&mut body);
                self.get_mut(*id).body = Some(body);
            }
        }
    }

    /// Update the callee flags cached on the static call sites in `expr`.
    pub fn refresh_call_flags(&self, expr: &mut Expr) {
        let flags: Vec<Flags> = self.funcs.iter().map(|f| f.flags).collect();
        CallFlagRefresher { flags: &flags }.visit_expr_mut(expr);
    }

    /// Updating consistency of all function bodies and the closures inside them.
    pub fn check_up(&self, options: &CompileOptions) -> Result<(), QueryError> {
        for func in &self.funcs {
            let Some(body) = &func.body else { continue };
            let updates = body.updates(self);
            if func.annotations.updating && !updates && !body.is_vacuous() {
                return Err(QueryError::updating_expected(
                    format!("Function {}#{} is declared updating but does not perform updates", func.name, func.arity),
                    func.span,
                ));
            }
            if !func.annotations.updating && updates && !options.mixed_updates {
                return Err(QueryError::not_updating(
                    format!("Function {}#{} performs updates but is not declared updating", func.name, func.arity),
                    func.span,
                ));
            }
            body.check_up(self, options)?;
        }
        Ok(())
    }
}

/// Compile the body of one function unless it is compiled or in progress.
/// A function reached again while it is being compiled is recursive.
pub fn compile_func(cx: &mut CompileContext<'_>, id: FuncId) -> Result<(), QueryError> {
    let func = cx.funcs.get_mut(id);
    match &func.state {
        CompileState::Compiled => return Ok(()),
        CompileState::Compiling => {
            func.recursive = true;
            return Ok(());
        }
        CompileState::Failed(e) => return Err(e.clone()),
        CompileState::Pending => {}
    }
    let Some(body) = func.body.take() else {
        return Err(QueryError::resolution(func.name.clone(), func.arity, None, func.calls.first().copied().unwrap_or_default()));
    };
    func.state = CompileState::Compiling;
    let mut scope = std::mem::take(&mut func.scope);
    let (declared, span) = (func.declared.clone(), func.span);

    let result = body.compile(cx, &mut scope);
    let func = cx.funcs.get_mut(id);
    func.scope = scope;
    let mut body = match result {
        Ok(body) => coerce_body(body, declared.as_ref(), span),
        Err(e) => {
            debug!(name = %func.name, arity = func.arity, error = %e, "function failed to compile");
            func.state = CompileState::Failed(e.clone());
            return Err(e);
        }
    };
    if cx.options.tail_calls {
        body.mark_tail_calls();
    }
    func.recursive |= !CallFinder { func: id }.visit_expr(&body);
    func.flags = Flags {
        upd: func.annotations.updating || body.has(Flag::Upd),
        ndt: body.has(Flag::Ndt),
        ctx: body.has(Flag::Ctx),
    };
    func.body = Some(body);
    func.state = CompileState::Compiled;
    debug!(name = %func.name, arity = func.arity, recursive = func.recursive, "compiled function");
    Ok(())
}

/// Compile every function that is referenced at least once.
pub fn compile_all(cx: &mut CompileContext<'_>) -> Result<(), QueryError> {
    let referenced: Vec<FuncId> = cx
        .funcs
        .iter()
        .filter(|(_, f)| !f.calls.is_empty() && f.defined)
        .map(|(id, _)| id)
        .collect();
    for id in referenced {
        compile_func(cx, id)?;
    }
    cx.funcs.propagate_flags();
    Ok(())
}
