//! Runtime values carried on the evaluation stack and in variables.

use ink_model::{ListItem, ListValue, Path};
use serde::{Deserialize, Serialize};

/// Where a variable pointer's target lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Global,
    /// Temporaries of the call frame at this depth; `0` is the base frame.
    Frame(usize),
}

/// A by-reference variable, bound to a scope when it was pushed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundPointer {
    pub name: String,
    pub scope: Scope,
}

/// A dynamically typed runtime value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    List(ListValue),
    ListItem(ListItem),
    DivertTarget(Path),
    VariablePointer(BoundPointer),
    Void,
}

impl Value {
    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::ListItem(_) => "list item",
            Value::DivertTarget(_) => "divert target",
            Value::VariablePointer(_) => "variable pointer",
            Value::Void => "void",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::Bool(_))
    }

    /// Truthiness of numbers, booleans and lists.
    ///
    /// Returns `None` for types that have no truth value.
    pub fn truthiness(&self) -> Option<bool> {
        match self {
            Value::Int(value) => Some(*value != 0),
            Value::Float(value) => Some(*value != 0.0),
            Value::Bool(value) => Some(*value),
            Value::List(list) => Some(list.as_bool()),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<ListValue> for Value {
    fn from(value: ListValue) -> Self {
        Value::List(value)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::String(value) => write!(f, "{value}"),
            Value::List(list) => write!(f, "{list}"),
            Value::ListItem(item) => write!(f, "{item}"),
            Value::DivertTarget(path) => write!(f, "{path}"),
            Value::VariablePointer(pointer) => write!(f, "{}", pointer.name),
            Value::Void => Ok(()),
        }
    }
}
