use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::CompileOptions;
use crate::diagnostics::QueryError;
use crate::func::registry::StaticFuncs;
use crate::scope::Ids;
use crate::span::Span;
use crate::value::Value;

/// State threaded through compilation of one query unit.
pub struct CompileContext<'a> {
    pub funcs: &'a mut StaticFuncs,
    pub options: &'a CompileOptions,
    pub ids: Ids,
}

impl<'a> CompileContext<'a> {
    pub fn new(funcs: &'a mut StaticFuncs, options: &'a CompileOptions, ids: Ids) -> Self {
        Self { funcs, options, ids }
    }
}

/// Handle a host can use to interrupt a running evaluation from another thread.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Evaluation state: the variable stack, the current frame, the pending
/// update list and the focus.
pub struct QueryContext<'a> {
    pub funcs: &'a StaticFuncs,
    pub options: &'a CompileOptions,
    pub ids: Ids,
    stack: Vec<Value>,
    fp: usize,
    depth: usize,
    /// Native stack position when the context was created.
    stack_base: usize,
    interrupt: Interrupt,
    updates: Vec<Value>,
    focus: Option<Value>,
    rng: u64,
}

impl<'a> QueryContext<'a> {
    pub fn new(funcs: &'a StaticFuncs, options: &'a CompileOptions, ids: Ids) -> Self {
        Self {
            funcs,
            options,
            ids,
            stack: Vec::new(),
            fp: 0,
            depth: 0,
            stack_base: stack_position(),
            interrupt: Interrupt::new(),
            updates: Vec::new(),
            focus: None,
            rng: options.seed.max(1),
        }
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn with_focus(mut self, focus: Value) -> Self {
        self.focus = Some(focus);
        self
    }

    // ---- frames ----

    /// Push a frame of `size` empty slots; returns the previous frame pointer.
    pub fn push_frame(&mut self, size: usize) -> usize {
        let old = self.fp;
        self.fp = self.stack.len();
        self.stack.resize(self.fp + size, Value::empty());
        old
    }

    /// Drop the current frame and restore `old`.
    pub fn pop_frame(&mut self, old: usize) {
        self.stack.truncate(self.fp);
        self.fp = old;
    }

    /// Run `f` inside a fresh frame; the frame is released on every exit path.
    pub fn with_frame<T>(
        &mut self,
        size: usize,
        f: impl FnOnce(&mut Self) -> Result<T, QueryError>,
    ) -> Result<T, QueryError> {
        let old = self.push_frame(size);
        let result = f(self);
        self.pop_frame(old);
        result
    }

    pub fn get(&self, slot: usize) -> Value {
        self.stack[self.fp + slot].clone()
    }

    pub fn set(&mut self, slot: usize, value: Value) {
        self.stack[self.fp + slot] = value;
    }

    /// Number of values currently on the stack.
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    // ---- invocation bookkeeping ----

    pub fn check_interrupt(&self) -> Result<(), QueryError> {
        if self.interrupt.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        Ok(())
    }

    /// Run `f` one nesting level deeper, failing once `max_depth` is exceeded
    /// or the native stack used since creation exceeds `stack_size`.
    pub fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, QueryError>) -> Result<T, QueryError> {
        if self.depth >= self.options.max_depth {
            return Err(QueryError::StackOverflow { depth: self.options.max_depth });
        }
        if stack_position().abs_diff(self.stack_base) > self.options.stack_size {
            return Err(QueryError::StackOverflow { depth: self.depth });
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    // ---- focus, updates, randomness ----

    pub fn focus(&self, span: Span) -> Result<Value, QueryError> {
        self.focus
            .clone()
            .ok_or_else(|| QueryError::dynamic("XPDY0002", "No context value bound", span))
    }

    /// Focus-free evaluation, as required inside function bodies.
    pub fn without_focus<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, QueryError>) -> Result<T, QueryError> {
        let saved = self.focus.take();
        let result = f(self);
        self.focus = saved;
        result
    }

    pub fn add_update(&mut self, value: Value) {
        self.updates.push(value);
    }

    pub fn take_updates(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.updates)
    }

    /// Next pseudo-random number in `0..bound` (xorshift64).
    pub fn random(&mut self, bound: i64) -> i64 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.rng = x;
        if bound <= 0 { 0 } else { (x % bound as u64) as i64 }
    }
}

/// Address of a local in a fresh frame: the current native stack position.
#[inline(never)]
fn stack_position() -> usize {
    let marker = 0u8;
    std::hint::black_box(&marker) as *const u8 as usize
}
