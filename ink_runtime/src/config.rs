//! Story runtime configuration.

use serde::{Deserialize, Serialize};

/// Tunables for a running story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    /// Seed for sequences and random operators. `None` seeds from entropy.
    pub rng_seed: Option<u64>,
    /// Maximum number of nested function and tunnel calls.
    pub max_call_depth: usize,
    /// Normalize whitespace in flushed text.
    pub clean_output: bool,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            rng_seed: None,
            max_call_depth: 1024,
            clean_output: true,
        }
    }
}

impl StoryConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Fix the random seed, for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoryConfig::default();
        assert_eq!(config.rng_seed, None);
        assert_eq!(config.max_call_depth, 1024);
        assert!(config.clean_output);
    }

    #[test]
    fn test_from_toml() {
        let config = StoryConfig::from_toml_str(
            r#"
            rng_seed = 17
            clean_output = false
            "#,
        )
        .unwrap();
        assert_eq!(config.rng_seed, Some(17));
        assert_eq!(config.max_call_depth, 1024);
        assert!(!config.clean_output);

        assert_eq!(StoryConfig::from_toml_str("").unwrap(), StoryConfig::default());
        assert!(StoryConfig::from_toml_str("max_call_depth = \"deep\"").is_err());
    }
}
