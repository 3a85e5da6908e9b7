//! Argument declarations and their validated, immutable form.
//!
//! [`Arg`] records what a caller asked for. [`ArgumentSpec`] is what the engine matches
//! against; it only exists once [`ArgumentSpec::from_arg`] has checked that the action,
//! arity, constant, default and choices fit together.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::classify::{flag_name, is_prefixed};
use crate::error::{ParseError, ParseResult};

/// What happens when an argument is matched.
///
/// Constants live inside the variant, so a const-like action can't exist without one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Store,
    Append,
    Extend,
    StoreConst(String),
    AppendConst(String),
    StoreTrue,
    StoreFalse,
    Count,
    Help,
    /// Carries the version text printed when the flag is seen.
    Version(String),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Store => ActionKind::Store,
            Self::Append => ActionKind::Append,
            Self::Extend => ActionKind::Extend,
            Self::StoreConst(_) => ActionKind::StoreConst,
            Self::AppendConst(_) => ActionKind::AppendConst,
            Self::StoreTrue => ActionKind::StoreTrue,
            Self::StoreFalse => ActionKind::StoreFalse,
            Self::Count => ActionKind::Count,
            Self::Help => ActionKind::Help,
            Self::Version(_) => ActionKind::Version,
        }
    }

    /// Whether matched tokens are stored as values (store, append, extend).
    pub fn takes_value(&self) -> bool {
        matches!(self, Self::Store | Self::Append | Self::Extend)
    }

    /// Whether the action has a destination in the bindings.
    pub(crate) fn binds(&self) -> bool {
        !matches!(self, Self::Help | Self::Version(_))
    }
}

/// [`Action`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    #[default]
    Store,
    Append,
    Extend,
    StoreConst,
    AppendConst,
    StoreTrue,
    StoreFalse,
    Count,
    Help,
    Version,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Append => "append",
            Self::Extend => "extend",
            Self::StoreConst => "store_const",
            Self::AppendConst => "append_const",
            Self::StoreTrue => "store_true",
            Self::StoreFalse => "store_false",
            Self::Count => "count",
            Self::Help => "help",
            Self::Version => "version",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many tokens an argument consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Arity {
    /// No explicit arity: one token for value actions, none otherwise.
    #[default]
    Single,
    Fixed(usize),
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

impl Arity {
    /// Lower bound of tokens this arity demands.
    pub fn min(self) -> usize {
        match self {
            Self::Single | Self::OneOrMore => 1,
            Self::Fixed(n) => n,
            Self::ZeroOrOne | Self::ZeroOrMore => 0,
        }
    }

    /// Upper bound, `None` when unbounded.
    pub fn max(self) -> Option<usize> {
        match self {
            Self::Single | Self::ZeroOrOne => Some(1),
            Self::Fixed(n) => Some(n),
            Self::ZeroOrMore | Self::OneOrMore => None,
        }
    }

    pub fn is_open_ended(self) -> bool {
        matches!(self, Self::ZeroOrMore | Self::OneOrMore)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => Ok(()),
            Self::Fixed(n) => write!(f, "{n}"),
            Self::ZeroOrOne => f.write_str("?"),
            Self::ZeroOrMore => f.write_str("*"),
            Self::OneOrMore => f.write_str("+"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    Positional,
    Optional,
}

/// Zero-argument hook attached to a `store_true` flag.
#[derive(Clone)]
pub struct Callback(Arc<dyn Fn() + Send + Sync>);

impl Callback {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self) {
        (self.0)()
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// Flag or name collection accepted by [`Arg::new`].
pub trait IntoFlags {
    fn into_flags(self) -> Vec<String>;
}

impl IntoFlags for &str {
    fn into_flags(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoFlags for String {
    fn into_flags(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoFlags for &[&str] {
    fn into_flags(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoFlags for [&str; N] {
    fn into_flags(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoFlags for Vec<String> {
    fn into_flags(self) -> Vec<String> {
        self
    }
}

/// An argument as declared; checked when the owning parser is built.
#[derive(Debug, Clone, Default)]
pub struct Arg {
    flags: Vec<String>,
    action: Action,
    arity: Option<Arity>,
    const_value: Option<String>,
    default: Option<String>,
    choices: Vec<String>,
    required: Option<bool>,
    dest: Option<String>,
    help: Option<String>,
    metavar: Option<String>,
    hidden: bool,
    callback: Option<Callback>,
}

impl Arg {
    /// Declare an argument. Flags starting with a prefix character make it optional,
    /// a single bare name makes it positional.
    pub fn new(flags: impl IntoFlags) -> Self {
        Self {
            flags: flags.into_flags(),
            ..Default::default()
        }
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn nargs(mut self, arity: Arity) -> Self {
        self.arity = Some(arity);
        self
    }

    /// Value stored by a `?` optional that appears without a value.
    pub fn const_value(mut self, value: impl Into<String>) -> Self {
        self.const_value = Some(value.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    /// Keep the argument out of usage and help text.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Run `f` each time this `store_true` flag is matched.
    pub fn on_match(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.callback = Some(Callback::new(f));
        self
    }
}

/// A validated argument.
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    flags: Vec<String>,
    kind: ArgumentKind,
    action: Action,
    arity: Arity,
    const_value: Option<String>,
    default: Option<String>,
    choices: Vec<String>,
    required: bool,
    dest: String,
    help: Option<String>,
    metavar: Option<String>,
    hidden: bool,
    callback: Option<Callback>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

impl ArgumentSpec {
    /// Validate `arg` against the parser's prefix characters.
    pub fn from_arg(arg: Arg, prefix_chars: &str) -> ParseResult<Self> {
        let flags: Vec<String> = arg.flags.iter().map(|f| f.trim().to_string()).collect();
        let Some(first) = flags.first() else {
            return Err(ParseError::config("empty options"));
        };
        if flags.iter().any(|f| f.is_empty()) {
            return Err(ParseError::config("empty option string"));
        }

        let kind = if is_prefixed(first, prefix_chars) {
            ArgumentKind::Optional
        } else {
            ArgumentKind::Positional
        };
        let bad_flag = match kind {
            ArgumentKind::Positional => flags.get(1),
            ArgumentKind::Optional => flags.iter().find(|f| !is_prefixed(f, prefix_chars)),
        };
        if let Some(flag) = bad_flag {
            return Err(ParseError::config(format!(
                "invalid option string {flag}: must start with a character '{prefix_chars}'"
            )));
        }

        let name = match kind {
            ArgumentKind::Positional => first.clone(),
            ArgumentKind::Optional => derive_name(&flags),
        };
        let label = flags.join("/");

        let mut action = arg.action;
        let kind_name = action.kind();
        match &mut action {
            Action::Help | Action::Version(_) if kind == ArgumentKind::Positional => {
                return Err(ParseError::config(format!(
                    "argument {label}: the {kind_name} action cannot be positional"
                )));
            }
            Action::Version(text) => {
                *text = text.trim().to_string();
                if text.is_empty() {
                    return Err(ParseError::config(format!(
                        "argument {label}: the version action requires version text"
                    )));
                }
            }
            Action::StoreConst(c) | Action::AppendConst(c) => {
                *c = c.trim().to_string();
                if c.is_empty() {
                    return Err(ParseError::config(format!(
                        "argument {label}: missing required const for the {kind_name} action"
                    )));
                }
            }
            _ => {}
        }

        let arity = match (action.takes_value(), arg.arity) {
            (true, None) => Arity::Single,
            (true, Some(Arity::Fixed(0))) => {
                return Err(ParseError::config(format!(
                    "argument {label}: nargs for {kind_name} actions must be != 0; \
                     if you have nothing to store, actions such as store_true or \
                     store_const may be more appropriate"
                )));
            }
            (true, Some(arity)) => arity,
            (false, None | Some(Arity::Fixed(0))) => Arity::Fixed(0),
            (false, Some(_)) => {
                return Err(ParseError::config(format!(
                    "argument {label}: nargs is not allowed with the {kind_name} action"
                )));
            }
        };

        let const_value = match (&action, trimmed(arg.const_value)) {
            (Action::StoreTrue, _) => Some("true".to_string()),
            (Action::StoreFalse, _) => Some("false".to_string()),
            (Action::StoreConst(c) | Action::AppendConst(c), _) => Some(c.clone()),
            (_, None) => None,
            (a, Some(c)) if a.takes_value() => {
                if kind == ArgumentKind::Optional && arity == Arity::ZeroOrOne {
                    Some(c)
                } else {
                    return Err(ParseError::config(format!(
                        "argument {label}: nargs must be '?' to supply const"
                    )));
                }
            }
            (_, Some(_)) => {
                return Err(ParseError::config(format!(
                    "argument {label}: const is not allowed with the {kind_name} action"
                )));
            }
        };

        let default = match (&action, trimmed(arg.default)) {
            (Action::StoreTrue, None) => Some("false".to_string()),
            (Action::StoreFalse, None) => Some("true".to_string()),
            (Action::AppendConst(_), Some(d)) => {
                return Err(ParseError::config(format!(
                    "argument {label}: ignored default value '{d}'"
                )));
            }
            (a, Some(_)) if !a.takes_value() && !matches!(a, Action::StoreConst(_)) => {
                return Err(ParseError::config(format!(
                    "argument {label}: default is not allowed with the {kind_name} action"
                )));
            }
            (_, d) => d,
        };

        let choices: Vec<String> = arg
            .choices
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        if !choices.is_empty() && !action.takes_value() {
            return Err(ParseError::config(format!(
                "argument {label}: choices are not allowed with the {kind_name} action"
            )));
        }

        if kind == ArgumentKind::Positional && arg.required.is_some() {
            return Err(ParseError::config(format!(
                "argument {label}: 'required' is an invalid argument for positionals"
            )));
        }

        let dest = match (kind, trimmed(arg.dest)) {
            (ArgumentKind::Positional, Some(_)) => {
                return Err(ParseError::config(format!(
                    "argument {label}: dest supplied twice for positional argument"
                )));
            }
            (ArgumentKind::Optional, Some(d)) if !d.is_empty() => d,
            _ => name,
        };

        if arg.callback.is_some() && action != Action::StoreTrue {
            return Err(ParseError::config(format!(
                "argument {label}: a callback is only allowed with the store_true action"
            )));
        }

        Ok(Self {
            flags,
            kind,
            action,
            arity,
            const_value,
            default,
            choices,
            required: arg.required.unwrap_or(false),
            dest,
            help: trimmed(arg.help).filter(|h| !h.is_empty()),
            metavar: trimmed(arg.metavar).filter(|m| !m.is_empty()),
            hidden: arg.hidden,
            callback: arg.callback,
        })
    }

    /// The implicit `-h/--help` flag.
    pub(crate) fn help_flag(prefix_chars: &str) -> Self {
        let prefix = if prefix_chars.contains('-') {
            '-'
        } else {
            prefix_chars.chars().next().unwrap_or('-')
        };
        Self {
            flags: vec![format!("{prefix}h"), format!("{prefix}{prefix}help")],
            kind: ArgumentKind::Optional,
            action: Action::Help,
            arity: Arity::Fixed(0),
            const_value: None,
            default: None,
            choices: Vec::new(),
            required: false,
            dest: "help".to_string(),
            help: Some("show this help message and exit".to_string()),
            metavar: None,
            hidden: false,
            callback: None,
        }
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn kind(&self) -> ArgumentKind {
        self.kind
    }

    pub fn is_positional(&self) -> bool {
        self.kind == ArgumentKind::Positional
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn const_value(&self) -> Option<&str> {
        self.const_value.as_deref()
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn metavar(&self) -> Option<&str> {
        self.metavar.as_deref()
    }

    pub fn hidden(&self) -> bool {
        self.hidden
    }

    pub(crate) fn fire_callback(&self) {
        if let Some(callback) = &self.callback {
            callback.call();
        }
    }

    /// Name used in error messages: `-o/--out` for optionals, the name for positionals.
    pub fn display_name(&self) -> String {
        match self.kind {
            ArgumentKind::Positional => self.dest.clone(),
            ArgumentKind::Optional => self.flags.join("/"),
        }
    }
}

/// The flag with the most prefix characters wins; the first one on ties.
fn derive_name(flags: &[String]) -> String {
    let mut best = flag_name(&flags[0]);
    let mut prefixes = flags[0].len() - best.len();
    for flag in &flags[1..] {
        let name = flag_name(flag);
        let count = flag.len() - name.len();
        if count > prefixes {
            prefixes = count;
            best = name;
        }
    }
    best.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn build(arg: Arg) -> ParseResult<ArgumentSpec> {
        ArgumentSpec::from_arg(arg, "-")
    }

    #[test]
    fn dest_prefers_the_longest_prefix() {
        let spec = build(Arg::new(["-o", "--out", "-x"])).unwrap();
        assert_eq!(spec.dest(), "out");
        assert_eq!(spec.kind(), ArgumentKind::Optional);
        assert_eq!(spec.display_name(), "-o/--out/-x");
    }

    #[test]
    fn store_true_normalizes_arity_and_constants() {
        let spec = build(Arg::new("--verbose").action(Action::StoreTrue)).unwrap();
        assert_eq!(spec.arity(), Arity::Fixed(0));
        assert_eq!(spec.const_value(), Some("true"));
        assert_eq!(spec.default_value(), Some("false"));
    }

    #[test]
    fn rejects_incompatible_combinations() {
        let cases = vec![
            Arg::new("--flag").action(Action::StoreTrue).nargs(Arity::OneOrMore),
            Arg::new("--flag").action(Action::StoreTrue).default_value("yes"),
            Arg::new("--x").nargs(Arity::Fixed(0)),
            Arg::new("--x").const_value("c"),
            Arg::new("--x").action(Action::AppendConst("c".into())).default_value("d"),
            Arg::new("--x").action(Action::StoreConst("  ".into())),
            Arg::new("--x").action(Action::Count).choices(["a"]),
            Arg::new("--x").action(Action::Version(String::new())),
            Arg::new("--x").on_match(|| {}),
            Arg::new("file").required(true),
            Arg::new("file").dest("other"),
            Arg::new("file").action(Action::Help),
            Arg::new(["file", "--file"]),
            Arg::new(["--file", "file"]),
            Arg::new(Vec::new()),
        ];
        for arg in cases {
            let err = build(arg.clone()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{arg:?}");
        }
    }

    #[test]
    fn const_is_accepted_for_optional_zero_or_one() {
        let spec = build(
            Arg::new("--level")
                .nargs(Arity::ZeroOrOne)
                .const_value(" max ")
                .choices([" low", "", "max "]),
        )
        .unwrap();
        assert_eq!(spec.const_value(), Some("max"));
        assert_eq!(spec.choices(), ["low".to_string(), "max".to_string()]);
    }

    #[test]
    fn positional_keeps_its_name() {
        let spec = build(Arg::new("files").nargs(Arity::OneOrMore)).unwrap();
        assert!(spec.is_positional());
        assert_eq!(spec.dest(), "files");
        assert_eq!(spec.display_name(), "files");
    }

    #[test]
    fn help_flag_follows_prefix_chars() {
        let spec = ArgumentSpec::help_flag("+");
        assert_eq!(spec.flags(), ["+h".to_string(), "++help".to_string()]);
        let spec = ArgumentSpec::help_flag("+-");
        assert_eq!(spec.flags(), ["-h".to_string(), "--help".to_string()]);
    }
}
