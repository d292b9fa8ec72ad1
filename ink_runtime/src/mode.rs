//! Evaluation modes of the story machine.

use serde::{Deserialize, Serialize};

/// How content items are interpreted.
///
/// Text goes to the output buffer in every mode except [`Mode::Eval`], where
/// it is pushed onto the evaluation stack instead. [`Mode::Str`] and
/// [`Mode::Tag`] capture whatever is written while they are active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    None,
    Eval,
    Str,
    Tag,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::None => "none",
            Mode::Eval => "eval",
            Mode::Str => "string",
            Mode::Tag => "tag",
        };
        write!(f, "{name}")
    }
}
