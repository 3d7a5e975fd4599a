//! # Error
//!
//! One error type for the whole pipeline. Every stage reports through the
//! same shape: a kind, a message, and (where one is known) the location of
//! the offending token or statement.

use std::error;
use std::fmt;

use crate::config::Config;

/// Where in a source an error was detected. `medium` names the source
/// (a file name, "stdin", or "3rd argument"); line and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub medium: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(medium: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            medium: medium.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.medium, self.line, self.column)
    }
}

/// An error from lexing, parsing, evaluating, or reading inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Lex {
        message: String,
        location: Option<Location>,
    },
    Parse {
        message: String,
        location: Option<Location>,
    },
    Evaluate {
        message: String,
        location: Option<Location>,
    },
    Io {
        message: String,
    },
}

impl Error {
    pub fn lex(message: impl Into<String>, location: Option<Location>) -> Self {
        Error::Lex {
            message: message.into(),
            location,
        }
    }

    pub fn parse(message: impl Into<String>, location: Option<Location>) -> Self {
        Error::Parse {
            message: message.into(),
            location,
        }
    }

    pub fn evaluate(message: impl Into<String>, location: Option<Location>) -> Self {
        Error::Evaluate {
            message: message.into(),
            location,
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Error::Io {
            message: message.into(),
        }
    }

    /// The reporting stage, as used by the optional message tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Error::Lex { .. } => "Lexer",
            Error::Parse { .. } => "Parser",
            Error::Evaluate { .. } => "Evaluator",
            Error::Io { .. } => "I/O",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Lex { message, .. }
            | Error::Parse { message, .. }
            | Error::Evaluate { message, .. }
            | Error::Io { message } => message,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            Error::Lex { location, .. }
            | Error::Parse { location, .. }
            | Error::Evaluate { location, .. } => location.as_ref(),
            Error::Io { .. } => None,
        }
    }

    /// Render the message honoring the config flags. The plain `Display`
    /// impl is equivalent to rendering with a default config.
    pub fn render(&self, config: &Config) -> String {
        if config.enable_tag_detail {
            format!("[{}] {}", self.tag(), self)
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location() {
            Some(location) => write!(f, "{} ({})", self.message(), location),
            None => f.write_str(self.message()),
        }
    }
}

impl error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_location() {
        let error = Error::parse(
            "unexpected token '}'",
            Some(Location::new("test.viv", 3, 7)),
        );

        assert_eq!(error.to_string(), "unexpected token '}' (test.viv:3:7)");
    }

    #[test]
    fn test_render_with_tag() {
        let config = Config::new().with_tag_detail(true);
        let error = Error::io("cannot read file 'missing.viv'");

        assert_eq!(
            error.render(&config),
            "[I/O] cannot read file 'missing.viv'"
        );
    }
}
