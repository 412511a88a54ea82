use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Static type of an expression or variable.
///
/// Only the distinctions the function core needs are modelled: atomic types
/// the host expressions produce, the empty sequence, and function types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeqType {
    /// `item()*`: anything.
    Item,
    /// `empty-sequence()`
    Empty,
    Integer,
    Boolean,
    String,
    /// `function(*)` when `None`, otherwise a typed function test.
    Function(Option<Box<FuncType>>),
}

/// Signature of a function value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuncType {
    pub params: Vec<SeqType>,
    pub ret: SeqType,
    pub updating: bool,
}

impl FuncType {
    pub fn new(params: Vec<SeqType>, ret: SeqType) -> Self {
        Self { params, ret, updating: false }
    }

    /// `function(item()*, ...) as item()*` with `arity` parameters.
    pub fn any(arity: usize) -> Self {
        Self::new(vec![SeqType::Item; arity], SeqType::Item)
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Function subtyping: same arity, contravariant parameters, covariant result.
    pub fn instance_of(&self, other: &FuncType) -> bool {
        self.arity() == other.arity()
            && other.params.iter().zip(&self.params).all(|(o, s)| o.instance_of(s))
            && self.ret.instance_of(&other.ret)
    }
}

impl SeqType {
    pub fn function(ft: FuncType) -> Self {
        SeqType::Function(Some(Box::new(ft)))
    }

    pub fn any_function() -> Self {
        SeqType::Function(None)
    }

    /// The function type, if this is a typed function test.
    pub fn func_type(&self) -> Option<&FuncType> {
        match self {
            SeqType::Function(Some(ft)) => Some(ft),
            _ => None,
        }
    }

    /// Static subtype check.
    pub fn instance_of(&self, other: &SeqType) -> bool {
        match (self, other) {
            (_, SeqType::Item) => true,
            (SeqType::Function(_), SeqType::Function(None)) => true,
            (SeqType::Function(Some(a)), SeqType::Function(Some(b))) => a.instance_of(b),
            (a, b) => a == b,
        }
    }

    /// Least common type of two branches.
    pub fn union(&self, other: &SeqType) -> SeqType {
        if self.instance_of(other) {
            other.clone()
        } else if other.instance_of(self) {
            self.clone()
        } else if matches!((self, other), (SeqType::Function(_), SeqType::Function(_))) {
            SeqType::Function(None)
        } else {
            SeqType::Item
        }
    }

    /// Dynamic type check of a value.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (SeqType::Item, _) => true,
            (SeqType::Empty, v) => v.is_empty(),
            (SeqType::Integer, Value::Int(_)) => true,
            (SeqType::Boolean, Value::Bool(_)) => true,
            (SeqType::String, Value::Str(_)) => true,
            (SeqType::Function(None), Value::Func(_)) => true,
            (SeqType::Function(Some(ft)), Value::Func(item)) => item.arity() == ft.arity(),
            _ => false,
        }
    }
}

impl std::fmt::Display for SeqType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeqType::Item => write!(f, "item()*"),
            SeqType::Empty => write!(f, "empty-sequence()"),
            SeqType::Integer => write!(f, "xs:integer"),
            SeqType::Boolean => write!(f, "xs:boolean"),
            SeqType::String => write!(f, "xs:string"),
            SeqType::Function(None) => write!(f, "function(*)"),
            SeqType::Function(Some(ft)) => write!(f, "{ft}"),
        }
    }
}

impl std::fmt::Display for FuncType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.updating {
            write!(f, "updating ")?;
        }
        write!(f, "function(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 { write!(f, ", ")?; }
            write!(f, "{p}")?;
        }
        write!(f, ") as {}", self.ret)
    }
}
