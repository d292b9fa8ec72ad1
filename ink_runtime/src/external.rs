//! Host functions callable from a story.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::StoryError;
use crate::value::Value;

/// A value passed across the host boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExternalValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<bool> for ExternalValue {
    fn from(value: bool) -> Self {
        ExternalValue::Bool(value)
    }
}

impl From<i64> for ExternalValue {
    fn from(value: i64) -> Self {
        ExternalValue::Int(value)
    }
}

impl From<f64> for ExternalValue {
    fn from(value: f64) -> Self {
        ExternalValue::Float(value)
    }
}

impl From<String> for ExternalValue {
    fn from(value: String) -> Self {
        ExternalValue::String(value)
    }
}

impl From<&str> for ExternalValue {
    fn from(value: &str) -> Self {
        ExternalValue::String(value.to_owned())
    }
}

impl TryFrom<Value> for ExternalValue {
    type Error = StoryError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(value) => Ok(ExternalValue::Bool(value)),
            Value::Int(value) => Ok(ExternalValue::Int(value)),
            Value::Float(value) => Ok(ExternalValue::Float(value)),
            Value::String(value) => Ok(ExternalValue::String(value)),
            other => Err(StoryError::UnsupportedExternalValue(
                other.type_name().to_owned(),
            )),
        }
    }
}

impl From<ExternalValue> for Value {
    fn from(value: ExternalValue) -> Self {
        match value {
            ExternalValue::Bool(value) => Value::Bool(value),
            ExternalValue::Int(value) => Value::Int(value),
            ExternalValue::Float(value) => Value::Float(value),
            ExternalValue::String(value) => Value::String(value),
        }
    }
}

/// Host callback: receives the arguments in call order and may return a value.
pub type ExternalFunction = Box<dyn Fn(&[ExternalValue]) -> Option<ExternalValue> + Send>;

/// Registry of host functions, keyed by the name the story calls.
#[derive(Default)]
pub struct ExternalFunctions {
    functions: HashMap<String, ExternalFunction>,
}

impl ExternalFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[ExternalValue]) -> Option<ExternalValue> + Send + 'static,
    {
        self.functions.insert(name.into(), Box::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&ExternalFunction> {
        self.functions.get(name)
    }
}

impl std::fmt::Debug for ExternalFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.functions.keys()).finish()
    }
}
