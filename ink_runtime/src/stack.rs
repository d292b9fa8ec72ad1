//! The evaluation stack and its typed pops.

use ink_model::{ListValue, Path};

use crate::error::StoryError;
use crate::value::Value;

/// LIFO stack of [`Value`]s used by expressions.
#[derive(Debug, Clone, Default)]
pub struct EvaluationStack {
    values: Vec<Value>,
}

impl EvaluationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.values.push(value.into());
    }

    pub fn pop(&mut self) -> Result<Value, StoryError> {
        self.values.pop().ok_or(StoryError::EmptyStack)
    }

    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Pop a value that has a truth value.
    pub fn pop_truthy(&mut self) -> Result<bool, StoryError> {
        let value = self.pop()?;
        value.truthiness().ok_or(StoryError::StackType {
            expected: "truthy value",
            found: value.type_name(),
        })
    }

    /// Pop an integer. Booleans count as 0 or 1.
    pub fn pop_int(&mut self) -> Result<i64, StoryError> {
        match self.pop()? {
            Value::Int(value) => Ok(value),
            Value::Bool(value) => Ok(i64::from(value)),
            other => Err(StoryError::StackType {
                expected: "int",
                found: other.type_name(),
            }),
        }
    }

    pub fn pop_string(&mut self) -> Result<String, StoryError> {
        match self.pop()? {
            Value::String(value) => Ok(value),
            other => Err(StoryError::StackType {
                expected: "string",
                found: other.type_name(),
            }),
        }
    }

    pub fn pop_list(&mut self) -> Result<ListValue, StoryError> {
        match self.pop()? {
            Value::List(list) => Ok(list),
            Value::ListItem(item) => Ok(ListValue::single(item)),
            other => Err(StoryError::StackType {
                expected: "list",
                found: other.type_name(),
            }),
        }
    }

    pub fn pop_divert_target(&mut self) -> Result<Path, StoryError> {
        match self.pop()? {
            Value::DivertTarget(path) => Ok(path),
            other => Err(StoryError::StackType {
                expected: "divert target",
                found: other.type_name(),
            }),
        }
    }

    /// Pop `count` values, returned in the order they were pushed.
    pub fn pop_many(&mut self, count: usize) -> Result<Vec<Value>, StoryError> {
        if count > self.values.len() {
            return Err(StoryError::EmptyStack);
        }
        Ok(self.values.split_off(self.values.len() - count))
    }
}
