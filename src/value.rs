use std::rc::Rc;

use crate::diagnostics::QueryError;
use crate::func::item::FuncItem;
use crate::span::Span;
use crate::types::SeqType;

/// Runtime value. A sequence of one item is always stored as that item;
/// sequences never nest.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(Rc<str>),
    Seq(Rc<[Value]>),
    Func(FuncItem),
}

impl Value {
    pub fn empty() -> Self {
        Value::Seq(Rc::from(Vec::new()))
    }

    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    /// Build a sequence, flattening nested sequences and unwrapping singletons.
    pub fn from_items(items: Vec<Value>) -> Self {
        let mut flat = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Seq(inner) => flat.extend(inner.iter().cloned()),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.pop().unwrap_or_else(Value::empty)
        } else {
            Value::Seq(Rc::from(flat))
        }
    }

    /// The items of this value: the value itself unless it is a sequence.
    pub fn items(&self) -> &[Value] {
        match self {
            Value::Seq(items) => items,
            other => std::slice::from_ref(other),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Seq(items) if items.is_empty())
    }

    pub fn seq_type(&self) -> SeqType {
        match self {
            Value::Int(_) => SeqType::Integer,
            Value::Bool(_) => SeqType::Boolean,
            Value::Str(_) => SeqType::String,
            Value::Seq(items) if items.is_empty() => SeqType::Empty,
            Value::Seq(_) => SeqType::Item,
            Value::Func(item) => SeqType::function(item.func_type().clone()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "xs:integer",
            Value::Bool(_) => "xs:boolean",
            Value::Str(_) => "xs:string",
            Value::Seq(items) if items.is_empty() => "empty-sequence()",
            Value::Seq(_) => "item()+",
            Value::Func(_) => "function(*)",
        }
    }

    pub fn as_int(&self, span: Span) -> Result<i64, QueryError> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(QueryError::type_err(
                format!("xs:integer expected, {} found", other.type_name()),
                span,
            )),
        }
    }

    pub fn as_func(&self, span: Span) -> Result<&FuncItem, QueryError> {
        match self {
            Value::Func(item) => Ok(item),
            other => Err(QueryError::type_err(
                format!("function(*) expected, {} found", other.type_name()),
                span,
            )),
        }
    }

    /// Effective boolean value.
    pub fn ebv(&self, span: Span) -> Result<bool, QueryError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Str(s) => Ok(!s.is_empty()),
            Value::Seq(items) if items.is_empty() => Ok(false),
            other => Err(QueryError::dynamic(
                "FORG0006",
                format!("Effective boolean value not defined for {}", other.type_name()),
                span,
            )),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Seq(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 { write!(f, " ")?; }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
            Value::Func(item) => write!(f, "{item}"),
        }
    }
}
