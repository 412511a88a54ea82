//! Function values for an XQuery-style query engine.
//!
//! Closures, named function literals, partial applications and statically
//! declared functions are built with [`QueryBuilder`], compiled into a
//! [`QueryUnit`] (name resolution, updating checks, inlining, tail-call
//! marking) and evaluated to [`Value`]s. Function values at run time are
//! [`FuncItem`]s.

pub mod span;
pub mod diagnostics;
pub mod suggest;
pub mod config;
pub mod types;
pub mod value;
pub mod scope;
pub mod expr;
pub mod visit;
pub mod builtins;
pub mod context;
pub mod func;
pub mod build;
pub mod unit;

pub use build::{QueryBuilder, Signature};
pub use config::CompileOptions;
pub use context::Interrupt;
pub use diagnostics::QueryError;
pub use func::item::{FuncItem, FunctionInfo};
pub use span::Span;
pub use types::{FuncType, SeqType};
pub use unit::{QueryResult, QueryUnit};
pub use value::Value;
