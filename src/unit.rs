//! A query unit: declared functions plus a main expression.

use tracing::debug;

use crate::config::CompileOptions;
use crate::context::{CompileContext, Interrupt, QueryContext};
use crate::diagnostics::QueryError;
use crate::expr::Expr;
use crate::func::item::FunctionInfo;
use crate::func::registry::{StaticFuncs, compile_all};
use crate::scope::{Ids, VarScope};
use crate::value::Value;

/// Result of running a unit: the value of the main expression and the
/// updates it requested, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub value: Value,
    pub updates: Vec<Value>,
}

#[derive(Debug)]
pub struct QueryUnit {
    options: CompileOptions,
    ids: Ids,
    funcs: StaticFuncs,
    main: Expr,
    scope: VarScope,
    compiled: bool,
    /// First compilation error; a failed unit stays failed.
    failure: Option<QueryError>,
}

impl QueryUnit {
    pub(crate) fn new(options: CompileOptions, ids: Ids, funcs: StaticFuncs, main: Expr, scope: VarScope) -> Self {
        Self { options, ids, funcs, main, scope, compiled: false, failure: None }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn funcs(&self) -> &StaticFuncs {
        &self.funcs
    }

    pub fn main(&self) -> &Expr {
        &self.main
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Resolve, check and compile the unit. Compiling twice is a no-op, and
    /// after a failure every further call returns the same error.
    pub fn compile(&mut self) -> Result<(), QueryError> {
        if self.compiled {
            return Ok(());
        }
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        if let Err(e) = self.compile_once() {
            self.failure = Some(e.clone());
            return Err(e);
        }
        self.compiled = true;
        debug!(
            functions = self.funcs.len(),
            frame = self.scope.frame_size(),
            main_size = self.main.size(),
            "compiled query unit"
        );
        Ok(())
    }

    fn compile_once(&mut self) -> Result<(), QueryError> {
        self.options.validate()?;
        self.funcs.check()?;
        self.funcs.check_up(&self.options)?;
        self.main.check_up(&self.funcs, &self.options)?;

        let mut cx = CompileContext::new(&mut self.funcs, &self.options, self.ids.clone());
        let main = self.main.clone().compile(&mut cx, &mut self.scope)?;
        compile_all(&mut cx)?;
        self.main = main;
        self.funcs.refresh_call_flags(&mut self.main);
        Ok(())
    }

    /// Compile if needed and evaluate the main expression.
    pub fn evaluate(&mut self) -> Result<Value, QueryError> {
        self.execute().map(|result| result.value)
    }

    pub fn execute(&mut self) -> Result<QueryResult, QueryError> {
        self.execute_with(Interrupt::new(), None)
    }

    /// Run with a cancellation handle and an optional focus for the main expression.
    pub fn execute_with(&mut self, interrupt: Interrupt, focus: Option<Value>) -> Result<QueryResult, QueryError> {
        self.compile()?;
        let mut qc = QueryContext::new(&self.funcs, &self.options, self.ids.clone()).with_interrupt(interrupt);
        if let Some(focus) = focus {
            qc = qc.with_focus(focus);
        }
        let main = &self.main;
        let value = qc.with_frame(self.scope.frame_size(), |qc| main.evaluate(qc))?;
        Ok(QueryResult { value, updates: qc.take_updates() })
    }

    /// Descriptions of all declared functions.
    pub fn function_info(&self) -> Vec<FunctionInfo> {
        self.funcs.iter().filter(|(_, f)| f.defined).map(|(_, f)| f.info()).collect()
    }

    pub fn functions_json(&self) -> Result<String, QueryError> {
        serde_json::to_string_pretty(&self.function_info())
            .map_err(|e| QueryError::config(format!("cannot serialize function info: {e}")))
    }
}
