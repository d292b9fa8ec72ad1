//! Choices offered to the player.

use ink_model::Address;
use serde::{Deserialize, Serialize};

/// A pending choice, generated when a choice point is visited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// Text shared by the choice and the output that follows it.
    pub start_text: String,
    /// Text shown only on the choice itself.
    pub choice_only_text: String,
    /// Where the story continues when this choice is taken.
    pub destination: Address,
    /// Invisible default, taken automatically when nothing else is offered.
    pub is_fallback: bool,
}

impl Choice {
    /// Text to present to the player.
    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.start_text, self.choice_only_text)
    }
}
