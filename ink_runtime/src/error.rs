//! Runtime errors.

use ink_model::{ModelError, Operator};
use thiserror::Error;

use crate::mode::Mode;

/// Broad classification of a [`StoryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The compiled story is inconsistent or uses something unsupported.
    MalformedStory,
    /// The host picked a choice that does not exist.
    InvalidChoice,
    /// A variable was read before anything assigned it.
    UnresolvedVariable,
    /// The host stepped a story that is waiting or finished.
    CannotContinue,
}

/// Errors raised while running a story.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("cannot switch from {from} mode to {to} mode")]
    InvalidModeTransition { from: Mode, to: Mode },

    #[error("evaluation stack is empty")]
    EmptyStack,

    #[error("expected {expected} on the evaluation stack, found {found}")]
    StackType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("operator {operator} is not implemented for {operands}")]
    UnimplementedOperator { operator: Operator, operands: String },

    #[error("variable {0} is not assigned")]
    UnresolvedVariable(String),

    #[error("variable {0} does not hold a divert target")]
    NotADivertTarget(String),

    #[error("choice {index} is out of range ({available} available)")]
    InvalidChoice { index: usize, available: usize },

    #[error("story cannot continue")]
    CannotContinue,

    #[error("return with no call frame")]
    ReturnWithoutCall,

    #[error("call depth exceeded {0}")]
    CallDepthExceeded(usize),

    #[error("integer division by zero")]
    DivideByZero,

    #[error("sequence bound must be at least 2, got {0}")]
    InvalidSequenceBound(i64),

    #[error("random range is empty: {min}..={max}")]
    InvalidRandomRange { min: i64, max: i64 },

    #[error("external functions cannot take a {0}")]
    UnsupportedExternalValue(String),
}

impl StoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoryError::InvalidChoice { .. } => ErrorKind::InvalidChoice,
            StoryError::UnresolvedVariable(_) => ErrorKind::UnresolvedVariable,
            StoryError::CannotContinue => ErrorKind::CannotContinue,
            _ => ErrorKind::MalformedStory,
        }
    }

    /// Whether the story should be abandoned after this error.
    ///
    /// A bad choice index or an extra step leaves the story untouched; the
    /// host can simply try again.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            StoryError::InvalidChoice { .. } | StoryError::CannotContinue
        )
    }
}
