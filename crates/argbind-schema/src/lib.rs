//! JSON declaration model for argbind parsers.
//!
//! A declaration file describes one parser: its settings, its arguments in
//! declaration order, and an optional subcommand group whose commands are
//! declarations themselves. [`ParserSchema::build`] turns it into a
//! [`argbind::Parser`], so every rule the builder enforces applies here too.

use argbind::{Action, ActionKind, Arg, Arity, ParseError, Parser, ParserBuilder, Subcommands};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default file name looked up by the CLI.
pub const DEFAULT_SCHEMA_NAME: &str = "argbind.json";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid declaration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("argument {argument}: unknown nargs '{value}' (expected '?', '*', '+' or a count)")]
    UnknownNargs { argument: String, value: String },

    #[error("command {command}: {source}")]
    Command {
        command: String,
        #[source]
        source: Box<SchemaError>,
    },

    #[error(transparent)]
    Invalid(#[from] ParseError),
}

fn yes() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_store(action: &ActionKind) -> bool {
    *action == ActionKind::Store
}

/// `nargs` as written in JSON: a symbol or a fixed count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nargs {
    Count(usize),
    Symbol(String),
}

impl Nargs {
    fn to_arity(&self, argument: &str) -> Result<Arity, SchemaError> {
        match self {
            Self::Count(n) => Ok(Arity::Fixed(*n)),
            Self::Symbol(s) => match s.trim() {
                "?" => Ok(Arity::ZeroOrOne),
                "*" => Ok(Arity::ZeroOrMore),
                "+" => Ok(Arity::OneOrMore),
                other => other
                    .parse()
                    .map(Arity::Fixed)
                    .map_err(|_| SchemaError::UnknownNargs {
                        argument: argument.to_string(),
                        value: s.clone(),
                    }),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArgSchema {
    /// One positional name, or one or more prefixed flags.
    pub flags: Vec<String>,
    #[serde(default, skip_serializing_if = "is_store")]
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nargs: Option<Nargs>,
    #[serde(default, rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metavar: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    /// Text printed by the `version` action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ArgSchema {
    pub fn new<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags: flags.into_iter().map(Into::into).collect(),
            action: ActionKind::Store,
            nargs: None,
            const_value: None,
            default: None,
            choices: Vec::new(),
            required: None,
            dest: None,
            help: None,
            metavar: None,
            hidden: false,
            version: None,
        }
    }

    fn label(&self) -> String {
        self.flags.join("/")
    }

    fn action(&self) -> Action {
        let payload = || self.const_value.clone().unwrap_or_default();
        match self.action {
            ActionKind::Store => Action::Store,
            ActionKind::Append => Action::Append,
            ActionKind::Extend => Action::Extend,
            ActionKind::StoreConst => Action::StoreConst(payload()),
            ActionKind::AppendConst => Action::AppendConst(payload()),
            ActionKind::StoreTrue => Action::StoreTrue,
            ActionKind::StoreFalse => Action::StoreFalse,
            ActionKind::Count => Action::Count,
            ActionKind::Help => Action::Help,
            ActionKind::Version => Action::Version(self.version.clone().unwrap_or_default()),
        }
    }

    /// The builder form of this declaration.
    pub fn to_arg(&self) -> Result<Arg, SchemaError> {
        let mut arg = Arg::new(self.flags.clone()).action(self.action());
        if let Some(nargs) = &self.nargs {
            arg = arg.nargs(nargs.to_arity(&self.label())?);
        }
        if let Some(value) = &self.const_value
            && !matches!(self.action, ActionKind::StoreConst | ActionKind::AppendConst)
        {
            arg = arg.const_value(value);
        }
        if let Some(value) = &self.default {
            arg = arg.default_value(value);
        }
        if !self.choices.is_empty() {
            arg = arg.choices(self.choices.iter().cloned());
        }
        if let Some(required) = self.required {
            arg = arg.required(required);
        }
        if let Some(dest) = &self.dest {
            arg = arg.dest(dest);
        }
        if let Some(help) = &self.help {
            arg = arg.help(help);
        }
        if let Some(metavar) = &self.metavar {
            arg = arg.metavar(metavar);
        }
        Ok(arg.hidden(self.hidden))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(flatten)]
    pub parser: ParserSchema,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubcommandsSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metavar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub commands: Vec<CommandSchema>,
}

impl SubcommandsSchema {
    fn to_subcommands(&self) -> Result<Subcommands, SchemaError> {
        let mut group = Subcommands::new().required(self.required);
        if let Some(dest) = &self.dest {
            group = group.dest(dest);
        }
        if let Some(help) = &self.help {
            group = group.help(help);
        }
        if let Some(metavar) = &self.metavar {
            group = group.metavar(metavar);
        }
        if let Some(title) = &self.title {
            group = group.title(title);
        }
        if let Some(description) = &self.description {
            group = group.description(description);
        }
        for command in &self.commands {
            let builder = command.parser.to_builder().map_err(|source| SchemaError::Command {
                command: command.name.clone(),
                source: Box::new(source),
            })?;
            group = match &command.help {
                Some(help) => group.command_with_help(&command.name, help, builder),
                None => group.command(&command.name, builder),
            };
        }
        Ok(group)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParserSchema {
    /// Program name; subcommands default to `"<parent> <name>"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epilog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_chars: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fromfile_prefix_chars: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument_default: Option<String>,
    #[serde(default = "yes", skip_serializing_if = "is_true")]
    pub add_help: bool,
    #[serde(default = "yes", skip_serializing_if = "is_true")]
    pub allow_abbrev: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcommands: Option<SubcommandsSchema>,
}

impl Default for ParserSchema {
    fn default() -> Self {
        Self {
            prog: None,
            usage: None,
            description: None,
            epilog: None,
            prefix_chars: None,
            fromfile_prefix_chars: None,
            argument_default: None,
            add_help: true,
            allow_abbrev: true,
            args: Vec::new(),
            subcommands: None,
        }
    }
}

impl ParserSchema {
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// A small declaration used by `argbind init`.
    pub fn starter(prog: impl Into<String>) -> Self {
        let mut verbose = ArgSchema::new(["-v", "--verbose"]);
        verbose.action = ActionKind::Count;
        verbose.help = Some("increase verbosity".to_string());

        let mut output = ArgSchema::new(["-o", "--output"]);
        output.metavar = Some("FILE".to_string());
        output.help = Some("where to write results".to_string());

        let mut inputs = ArgSchema::new(["inputs"]);
        inputs.nargs = Some(Nargs::Symbol("+".to_string()));
        inputs.help = Some("files to process".to_string());

        Self {
            prog: Some(prog.into()),
            description: Some("Describe what the program does.".to_string()),
            args: vec![verbose, output, inputs],
            ..Self::default()
        }
    }

    /// The builder form of this declaration, subcommands included.
    pub fn to_builder(&self) -> Result<ParserBuilder, SchemaError> {
        let mut builder = ParserBuilder::default()
            .add_help(self.add_help)
            .allow_abbrev(self.allow_abbrev);
        if let Some(prog) = &self.prog {
            builder = builder.prog(prog);
        }
        if let Some(usage) = &self.usage {
            builder = builder.usage(usage);
        }
        if let Some(description) = &self.description {
            builder = builder.description(description);
        }
        if let Some(epilog) = &self.epilog {
            builder = builder.epilog(epilog);
        }
        if let Some(chars) = &self.prefix_chars {
            builder = builder.prefix_chars(chars);
        }
        if let Some(chars) = &self.fromfile_prefix_chars {
            builder = builder.fromfile_prefix_chars(chars);
        }
        if let Some(value) = &self.argument_default {
            builder = builder.argument_default(value);
        }
        for arg in &self.args {
            builder = builder.arg(arg.to_arg()?);
        }
        if let Some(group) = &self.subcommands {
            builder = builder.subcommands(group.to_subcommands()?);
        }
        Ok(builder)
    }

    pub fn build(&self) -> Result<Parser, SchemaError> {
        Ok(self.to_builder()?.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argbind::{ErrorKind, ParseOutcome};

    const GIT: &str = r#"{
        "prog": "git",
        "description": "the stupid content tracker",
        "args": [
            { "flags": ["-C"], "metavar": "PATH", "help": "run as if started in PATH" },
            { "flags": ["-v", "--verbose"], "action": "count" }
        ],
        "subcommands": {
            "dest": "command",
            "required": true,
            "commands": [
                {
                    "name": "add",
                    "help": "add file contents to the index",
                    "args": [
                        { "flags": ["-n", "--dry-run"], "action": "store_true" },
                        { "flags": ["pathspec"], "nargs": "*" }
                    ]
                },
                {
                    "name": "commit",
                    "args": [
                        { "flags": ["-m", "--message"], "action": "append" },
                        {
                            "flags": ["--cleanup"],
                            "choices": ["strip", "verbatim"],
                            "default": "strip"
                        }
                    ]
                }
            ]
        }
    }"#;

    fn matches(parser: &Parser, tokens: &[&str]) -> argbind::Bindings {
        match parser.parse(tokens.iter().copied()).unwrap() {
            ParseOutcome::Matches(bindings) => bindings,
            other => panic!("expected matches, got {other:?}"),
        }
    }

    #[test]
    fn builds_nested_declaration() {
        let parser = ParserSchema::from_json_str(GIT).unwrap().build().unwrap();
        assert_eq!(parser.prog(), "git");

        let b = matches(&parser, &["-vv", "add", "-n", "a.txt", "b.txt"]);
        assert_eq!(b.count("verbose").unwrap(), 2);
        assert_eq!(b.get("command").unwrap(), Some("add"));
        assert!(b.flag("dry-run").unwrap());
        assert_eq!(b.get_all("pathspec").unwrap(), ["a.txt", "b.txt"]);

        let b = matches(&parser, &["commit", "-m", "one", "-m", "two"]);
        assert_eq!(b.get_all("message").unwrap(), ["one", "two"]);
        assert_eq!(b.get("cleanup").unwrap(), Some("strip"));
    }

    #[test]
    fn subcommand_prog_is_derived() {
        let parser = ParserSchema::from_json_str(GIT).unwrap().build().unwrap();
        let group = parser.subcommands().unwrap();
        assert_eq!(group.command("add").unwrap().parser().prog(), "git add");
        assert_eq!(
            group.command("add").unwrap().help(),
            Some("add file contents to the index")
        );
    }

    #[test]
    fn nargs_forms() {
        let json = r#"{ "prog": "p", "args": [
            { "flags": ["pair"], "nargs": 2 },
            { "flags": ["rest"], "nargs": "*" },
            { "flags": ["--opt"], "nargs": "?", "const": "c" }
        ] }"#;
        let parser = ParserSchema::from_json_str(json).unwrap().build().unwrap();
        assert_eq!(parser.positionals()[0].arity(), Arity::Fixed(2));
        assert_eq!(parser.positionals()[1].arity(), Arity::ZeroOrMore);
        assert_eq!(parser.optionals()[1].const_value(), Some("c"));
    }

    #[test]
    fn unknown_nargs_is_reported() {
        let json = r#"{ "args": [ { "flags": ["--x"], "nargs": "many" } ] }"#;
        let err = ParserSchema::from_json_str(json).unwrap().build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument --x: unknown nargs 'many' (expected '?', '*', '+' or a count)"
        );
    }

    #[test]
    fn builder_rules_surface_as_invalid() {
        let json = r#"{ "args": [ { "flags": ["--mode"], "action": "store_const" } ] }"#;
        let err = ParserSchema::from_json_str(json).unwrap().build().unwrap_err();
        let SchemaError::Invalid(inner) = err else {
            panic!("expected a configuration error, got {err:?}");
        };
        assert_eq!(inner.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn errors_in_commands_name_the_command() {
        let json = r#"{ "subcommands": { "commands": [
            { "name": "run", "args": [ { "flags": ["--jobs"], "nargs": "lots" } ] }
        ] } }"#;
        let err = ParserSchema::from_json_str(json).unwrap().build().unwrap_err();
        assert!(err.to_string().starts_with("command run: "), "{err}");
    }

    #[test]
    fn malformed_json() {
        let err = ParserSchema::from_json_str("{ \"args\": 3 }").unwrap_err();
        assert!(matches!(err, SchemaError::Json(_)));
    }

    #[test]
    fn starter_builds_and_round_trips() {
        let starter = ParserSchema::starter("demo");
        let json = starter.to_json_pretty().unwrap();
        assert!(!json.contains("add-help"));
        let parser = ParserSchema::from_json_str(&json).unwrap().build().unwrap();
        let b = matches(&parser, &["-vv", "in.txt"]);
        assert_eq!(b.count("verbose").unwrap(), 2);
        assert_eq!(b.get_all("inputs").unwrap(), ["in.txt"]);
    }
}
