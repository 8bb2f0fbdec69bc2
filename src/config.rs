//! The immutable configuration of a single search, built once by the caller.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{encode::window_count, protocol::Role, session::MAX_BIT_WIDTH};

/// The bit width used for character codes unless configured otherwise.
pub const DEFAULT_BIT_WIDTH: usize = 8;

/// The smallest bit width that can hold every character code.
pub const MIN_BIT_WIDTH: usize = 8;

/// An invalid configuration, detected before anything is sent to the other party.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The pattern must contain at least one character.
    #[error("the pattern length must be at least 1")]
    EmptyPattern,
    /// The party did not supply the input that its role requires.
    #[error("the {0} must provide its input")]
    MissingInput(Role),
    /// The supplied input does not have the declared (public) length.
    #[error("the input has length {actual}, but length {declared} was declared")]
    LengthMismatch {
        /// The public length agreed with the other party.
        declared: usize,
        /// The length of the supplied input.
        actual: usize,
    },
    /// The bit width cannot hold all character codes or is not supported.
    #[error("bit width must be between 8 and 32, got {0}")]
    InvalidBitWidth(usize),
}

/// The public, agreed-upon shape of the circuit: both parties must use the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    /// The length `m` of the pattern.
    pub pattern_len: usize,
    /// The length `n` of the text.
    pub text_len: usize,
    /// The bit width of every character code.
    pub bit_width: usize,
}

impl Shape {
    /// The number `n - m + 1` of windows, or 0 if the text is shorter than the pattern.
    pub fn windows(&self) -> usize {
        window_count(self.pattern_len, self.text_len)
    }
}

/// Everything one party needs to take part in a search.
///
/// The `Debug` output only shows the length of the secret input.
#[derive(Clone, PartialEq, Eq)]
pub struct SearchConfig {
    role: Role,
    shape: Shape,
    input: String,
}

impl fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchConfig")
            .field("role", &self.role)
            .field("shape", &self.shape)
            .field("input", &format_args!("<{} bytes>", self.input.len()))
            .finish()
    }
}

impl SearchConfig {
    /// Configures the party that holds the pattern and knows the length of the text.
    pub fn pattern_holder(pattern: impl Into<String>, text_len: usize) -> Result<Self, ConfigError> {
        let pattern = pattern.into();
        Self::new(Role::PatternHolder, pattern.len(), text_len, Some(pattern))
    }

    /// Configures the party that holds the text and knows the length of the pattern.
    pub fn text_holder(text: impl Into<String>, pattern_len: usize) -> Result<Self, ConfigError> {
        let text = text.into();
        Self::new(Role::TextHolder, pattern_len, text.len(), Some(text))
    }

    /// Configures a party with explicitly declared lengths, checking its input against them.
    pub fn new(
        role: Role,
        pattern_len: usize,
        text_len: usize,
        input: Option<String>,
    ) -> Result<Self, ConfigError> {
        if pattern_len == 0 {
            return Err(ConfigError::EmptyPattern);
        }
        let Some(input) = input else {
            return Err(ConfigError::MissingInput(role));
        };
        let declared = match role {
            Role::PatternHolder => pattern_len,
            Role::TextHolder => text_len,
        };
        if input.len() != declared {
            return Err(ConfigError::LengthMismatch {
                declared,
                actual: input.len(),
            });
        }
        Ok(Self {
            role,
            shape: Shape {
                pattern_len,
                text_len,
                bit_width: DEFAULT_BIT_WIDTH,
            },
            input,
        })
    }

    /// Uses a different bit width for the character codes.
    pub fn with_bit_width(mut self, bit_width: usize) -> Result<Self, ConfigError> {
        if !(MIN_BIT_WIDTH..=MAX_BIT_WIDTH).contains(&bit_width) {
            return Err(ConfigError::InvalidBitWidth(bit_width));
        }
        self.shape.bit_width = bit_width;
        Ok(self)
    }

    /// The role of the local party.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The public shape of the search.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// The local secret input: the pattern or the text, depending on the role.
    pub fn input(&self) -> &str {
        &self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_own_length() -> Result<(), ConfigError> {
        let config = SearchConfig::pattern_holder("HEL", 5)?;
        assert_eq!(config.role(), Role::PatternHolder);
        assert_eq!(config.shape().pattern_len, 3);
        assert_eq!(config.shape().text_len, 5);
        assert_eq!(config.shape().windows(), 3);

        let config = SearchConfig::text_holder("HELLO", 3)?.with_bit_width(32)?;
        assert_eq!(config.shape().text_len, 5);
        assert_eq!(config.shape().bit_width, 32);
        assert_eq!(config.input(), "HELLO");
        Ok(())
    }

    #[test]
    fn rejects_invalid_configs() {
        assert_eq!(
            SearchConfig::pattern_holder("", 5),
            Err(ConfigError::EmptyPattern)
        );
        assert_eq!(
            SearchConfig::text_holder("HELLO", 0),
            Err(ConfigError::EmptyPattern)
        );
        assert_eq!(
            SearchConfig::new(Role::TextHolder, 3, 5, None),
            Err(ConfigError::MissingInput(Role::TextHolder))
        );
        assert_eq!(
            SearchConfig::new(Role::PatternHolder, 3, 5, Some("HELLO".into())),
            Err(ConfigError::LengthMismatch {
                declared: 3,
                actual: 5
            })
        );
        let config = SearchConfig::pattern_holder("HEL", 5).unwrap();
        assert_eq!(
            config.clone().with_bit_width(7),
            Err(ConfigError::InvalidBitWidth(7))
        );
        assert_eq!(
            config.with_bit_width(33),
            Err(ConfigError::InvalidBitWidth(33))
        );
    }

    #[test]
    fn debug_output_hides_the_input() -> Result<(), ConfigError> {
        let config = SearchConfig::text_holder("CLASSIFIED", 3)?;
        let debug = format!("{config:?}");
        assert!(!debug.contains("CLASSIFIED"));
        assert!(debug.contains("<10 bytes>"));
        assert!(debug.contains("TextHolder"));
        Ok(())
    }

    #[test]
    fn short_text_has_no_windows() {
        let shape = Shape {
            pattern_len: 5,
            text_len: 3,
            bit_width: DEFAULT_BIT_WIDTH,
        };
        assert_eq!(shape.windows(), 0);
    }
}
