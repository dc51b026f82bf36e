//! Compiler configuration.
//!
//! ```toml
//! placeholder = "question"
//! quote = "`"
//! lower_fn = "LCASE"
//! false_literal = "1 = 0"
//! max_slice_groups = 256
//! ```

use crate::{
    db::{
        compile::ConfiguredDialect,
        condition::ConditionTree,
        slice::{self, AndGroup, DEFAULT_MAX_GROUPS, SliceError},
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ConfigFileError
///

#[derive(Debug, ThisError)]
pub enum ConfigFileError {
    #[error("invalid compiler config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("compiler config could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid compiler config: {key} {reason}")]
    Invalid { key: &'static str, reason: &'static str },
}

impl From<ConfigFileError> for InternalError {
    fn from(err: ConfigFileError) -> Self {
        Self::new(ErrorClass::Configuration, ErrorOrigin::Config, err.to_string())
    }
}

///
/// PlaceholderStyle
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, …
    #[default]
    Dollar,
    /// Positional `?`.
    Question,
}

///
/// CompilerConfig
///
/// Text conventions for `ConfiguredDialect`. Missing keys take the
/// Postgres defaults.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    pub placeholder: PlaceholderStyle,
    pub quote: char,
    pub lower_fn: String,
    pub false_literal: String,
    /// Upper bound on the AND groups one condition may slice into.
    pub max_slice_groups: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            placeholder: PlaceholderStyle::Dollar,
            quote: '"',
            lower_fn: "LOWER".to_string(),
            false_literal: "FALSE".to_string(),
            max_slice_groups: DEFAULT_MAX_GROUPS,
        }
    }
}

impl CompilerConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigFileError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigFileError> {
        Ok(toml::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn dialect(&self) -> ConfiguredDialect {
        ConfiguredDialect::new(self.clone())
    }

    /// Slice a condition under this config's group cap.
    pub fn slice(&self, tree: &ConditionTree) -> Result<Vec<AndGroup>, SliceError> {
        slice::slice_bounded(tree, self.max_slice_groups)
    }

    fn validate(&self) -> Result<(), ConfigFileError> {
        if self.quote.is_whitespace() || self.quote.is_alphanumeric() {
            return Err(ConfigFileError::Invalid {
                key: "quote",
                reason: "must be a punctuation character",
            });
        }
        if self.lower_fn.trim().is_empty() {
            return Err(ConfigFileError::Invalid {
                key: "lower_fn",
                reason: "must not be empty",
            });
        }
        if self.false_literal.trim().is_empty() {
            return Err(ConfigFileError::Invalid {
                key: "false_literal",
                reason: "must not be empty",
            });
        }
        if self.max_slice_groups == 0 {
            return Err(ConfigFileError::Invalid {
                key: "max_slice_groups",
                reason: "must be at least 1",
            });
        }

        Ok(())
    }
}

///
/// TESTS
///
