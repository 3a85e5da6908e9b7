//! Error values produced while building parsers, matching tokens, and reading bindings.

use thiserror::Error;

/// How many values an optional expected when it came up short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    One,
    AtLeastOne,
    Exactly(usize),
}

impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One => f.write_str("expected one argument"),
            Self::AtLeastOne => f.write_str("expected at least one argument"),
            Self::Exactly(1) => f.write_str("expected 1 argument"),
            Self::Exactly(n) => write!(f, "expected {n} arguments"),
        }
    }
}

/// Coarse classification of a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    AmbiguousAbbreviation,
    InvalidChoice,
    ExpectedArguments,
    ExplicitArgumentIgnored,
    MissingRequired,
    UnrecognizedTokens,
}

/// A failed parse call.
///
/// Messages carry flag names and values only, so callers can embed them in their own
/// `prog: error: ...` line next to a usage string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The declaration itself is invalid.
    #[error("{0}")]
    Configuration(String),

    #[error("ambiguous option: '{token}' could match {}", candidates.join(", "))]
    AmbiguousAbbreviation {
        token: String,
        candidates: Vec<String>,
    },

    #[error(
        "argument {argument}: invalid choice: '{value}' (choose from {})",
        quoted_list(choices)
    )]
    InvalidChoice {
        argument: String,
        value: String,
        choices: Vec<String>,
    },

    #[error("argument {argument}: {expected}")]
    ExpectedArguments { argument: String, expected: Expected },

    #[error("argument {argument}: ignored explicit argument '{value}'")]
    ExplicitArgumentIgnored { argument: String, value: String },

    /// Every missing name of one call, plus any unrecognized tokens seen in the same call.
    #[error("{}", missing_message(names, unrecognized))]
    MissingRequired {
        names: Vec<String>,
        unrecognized: Vec<String>,
    },

    #[error("unrecognized arguments: {}", tokens.join(" "))]
    UnrecognizedTokens { tokens: Vec<String> },
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::AmbiguousAbbreviation { .. } => ErrorKind::AmbiguousAbbreviation,
            Self::InvalidChoice { .. } => ErrorKind::InvalidChoice,
            Self::ExpectedArguments { .. } => ErrorKind::ExpectedArguments,
            Self::ExplicitArgumentIgnored { .. } => ErrorKind::ExplicitArgumentIgnored,
            Self::MissingRequired { .. } => ErrorKind::MissingRequired,
            Self::UnrecognizedTokens { .. } => ErrorKind::UnrecognizedTokens,
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn missing_message(names: &[String], unrecognized: &[String]) -> String {
    let mut out = format!(
        "the following arguments are required: {}",
        names.join(", ")
    );
    if !unrecognized.is_empty() {
        out.push_str(&format!(
            "; unrecognized arguments: {}",
            unrecognized.join(" ")
        ));
    }
    out
}

/// Reading a value out of [`crate::Bindings`] failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("no argument named '{0}'")]
    NoSuchArgument(String),

    #[error("argument '{0}' holds more than one value")]
    MultipleValues(String),

    #[error("argument '{0}' is a counter; use `count`")]
    CountAsValue(String),

    #[error("argument '{key}': can't convert value '{value}'")]
    Conversion { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_message_lists_unrecognized_after_names() {
        let err = ParseError::MissingRequired {
            names: vec!["files".to_string(), "-o/--out".to_string()],
            unrecognized: vec!["x".to_string(), "y".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "the following arguments are required: files, -o/--out; unrecognized arguments: x y"
        );
        assert_eq!(err.kind(), ErrorKind::MissingRequired);
    }

    #[test]
    fn invalid_choice_quotes_choices() {
        let err = ParseError::InvalidChoice {
            argument: "--mode".to_string(),
            value: "c".to_string(),
            choices: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "argument --mode: invalid choice: 'c' (choose from 'a', 'b')"
        );
    }

    #[test]
    fn expected_renders_counts() {
        let err = ParseError::ExpectedArguments {
            argument: "--pair".to_string(),
            expected: Expected::Exactly(2),
        };
        assert_eq!(err.to_string(), "argument --pair: expected 2 arguments");
    }
}
