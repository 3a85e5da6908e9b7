//! Token classification.

/// Marks the end of optionals; every later token is positional.
pub const SEPARATOR: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Separator,
    Optional,
    Positional,
}

/// Classifies raw tokens for one parser level.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    prefix_chars: &'a str,
    negative_numbers_are_flags: bool,
}

impl<'a> Classifier<'a> {
    pub fn new(prefix_chars: &'a str, negative_numbers_are_flags: bool) -> Self {
        Self {
            prefix_chars,
            negative_numbers_are_flags,
        }
    }

    pub fn classify(&self, token: &str) -> TokenClass {
        if token == SEPARATOR {
            TokenClass::Separator
        } else if self.looks_optional(token) {
            TokenClass::Optional
        } else {
            TokenClass::Positional
        }
    }

    /// Longer than one character, starts with a prefix character, and is not a
    /// negative number unless negative numbers are declared as flags.
    pub fn looks_optional(&self, token: &str) -> bool {
        token.chars().nth(1).is_some()
            && is_prefixed(token, self.prefix_chars)
            && (self.negative_numbers_are_flags || !is_negative_number(token))
    }

    /// One prefix character followed by a non-prefix character (`-abc`, not `--abc`).
    pub fn is_single_prefix(&self, token: &str) -> bool {
        is_prefixed(token, self.prefix_chars)
            && token
                .chars()
                .nth(1)
                .is_some_and(|c| !self.prefix_chars.contains(c))
    }
}

pub fn is_prefixed(token: &str, prefix_chars: &str) -> bool {
    token.chars().next().is_some_and(|c| prefix_chars.contains(c))
}

/// A finite number below zero, such as `-1`, `-2.5` or `-1e3`.
pub fn is_negative_number(token: &str) -> bool {
    token
        .parse::<f64>()
        .is_ok_and(|value| value.is_finite() && value < 0.0)
}

/// Split `--flag=value` at the first `=`.
pub fn split_inline(token: &str) -> (&str, Option<&str>) {
    match token.split_once('=') {
        Some((head, value)) => (head, Some(value)),
        None => (token, None),
    }
}

/// The flag without its leading run of prefix characters.
pub fn flag_name(flag: &str) -> &str {
    match flag.chars().next() {
        Some(prefix) => flag.trim_start_matches(prefix),
        None => flag,
    }
}
