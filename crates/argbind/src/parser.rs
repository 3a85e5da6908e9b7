//! Parser declarations, the validating builder, and the parse driver.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

use crate::bindings::Bindings;
use crate::classify::{Classifier, is_negative_number};
use crate::error::{ParseError, ParseResult};
use crate::help;
use crate::matcher::{self, Scan};
use crate::spec::{Arg, ArgumentSpec};

/// Result of a successful parse call.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Matches(Bindings),
    /// `-h/--help` was seen; carries the help text of the level that saw it.
    Help(String),
    Version(String),
}

/// A failed parse call together with the parser level, top level or subcommand,
/// whose tokens failed to match.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct LevelError<'p> {
    level: &'p Parser,
    error: ParseError,
}

impl<'p> LevelError<'p> {
    pub fn level(&self) -> &'p Parser {
        self.level
    }

    pub fn error(&self) -> &ParseError {
        &self.error
    }

    pub fn into_error(self) -> ParseError {
        self.error
    }
}

#[derive(Debug, Clone)]
struct Settings {
    prog: String,
    usage: Option<String>,
    description: Option<String>,
    epilog: Option<String>,
    prefix_chars: String,
    fromfile_prefix_chars: Option<String>,
    argument_default: Option<String>,
    add_help: bool,
    allow_abbrev: bool,
}

/// A subcommand group declaration.
#[derive(Debug, Clone, Default)]
pub struct Subcommands {
    dest: Option<String>,
    required: bool,
    help: Option<String>,
    metavar: Option<String>,
    title: Option<String>,
    description: Option<String>,
    commands: Vec<(String, Option<String>, ParserBuilder)>,
}

impl Subcommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destination that receives the chosen command name.
    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
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

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn command(mut self, name: impl Into<String>, parser: ParserBuilder) -> Self {
        self.commands.push((name.into(), None, parser));
        self
    }

    pub fn command_with_help(
        mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        parser: ParserBuilder,
    ) -> Self {
        self.commands.push((name.into(), Some(help.into()), parser));
        self
    }
}

/// One named subcommand of a built parser.
#[derive(Debug, Clone)]
pub struct Command {
    help: Option<String>,
    parser: Parser,
}

impl Command {
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }
}

/// A built subcommand group.
#[derive(Debug, Clone)]
pub struct SubcommandGroup {
    dest: Option<String>,
    required: bool,
    help: Option<String>,
    metavar: Option<String>,
    title: Option<String>,
    description: Option<String>,
    commands: IndexMap<String, Command>,
}

impl SubcommandGroup {
    pub fn dest(&self) -> Option<&str> {
        self.dest.as_deref()
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn metavar(&self) -> Option<&str> {
        self.metavar.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn command(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn commands(&self) -> impl Iterator<Item = (&str, &Command)> {
        self.commands.iter().map(|(name, cmd)| (name.as_str(), cmd))
    }

    pub fn names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }

    /// The metavar, or `{a,b}` built from the command names.
    pub fn display_name(&self) -> String {
        match &self.metavar {
            Some(metavar) => metavar.clone(),
            None => format!(
                "{{{}}}",
                self.commands.keys().cloned().collect::<Vec<_>>().join(",")
            ),
        }
    }
}

/// Declares a parser. Nothing is checked until [`ParserBuilder::build`].
#[derive(Debug, Clone)]
pub struct ParserBuilder {
    prog: Option<String>,
    usage: Option<String>,
    description: Option<String>,
    epilog: Option<String>,
    prefix_chars: Option<String>,
    fromfile_prefix_chars: Option<String>,
    argument_default: Option<String>,
    add_help: bool,
    allow_abbrev: bool,
    args: Vec<Arg>,
    parents: Vec<Parser>,
    subcommands: Vec<(usize, Subcommands)>,
}

impl Default for ParserBuilder {
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
            parents: Vec::new(),
            subcommands: Vec::new(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_prog() -> String {
    std::env::args_os()
        .next()
        .and_then(|arg0| {
            std::path::Path::new(&arg0)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "prog".to_string())
}

impl ParserBuilder {
    pub fn new(prog: impl Into<String>) -> Self {
        Self {
            prog: Some(prog.into()),
            ..Self::default()
        }
    }

    pub fn prog(mut self, prog: impl Into<String>) -> Self {
        self.prog = Some(prog.into());
        self
    }

    /// Replace the generated usage line.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn epilog(mut self, epilog: impl Into<String>) -> Self {
        self.epilog = Some(epilog.into());
        self
    }

    /// Characters that introduce optional flags (default `-`).
    pub fn prefix_chars(mut self, chars: impl Into<String>) -> Self {
        self.prefix_chars = Some(chars.into());
        self
    }

    /// Characters that mark a token as a file of extra arguments (`@args.txt`).
    pub fn fromfile_prefix_chars(mut self, chars: impl Into<String>) -> Self {
        self.fromfile_prefix_chars = Some(chars.into());
        self
    }

    /// Default used for arguments that declare none.
    pub fn argument_default(mut self, value: impl Into<String>) -> Self {
        self.argument_default = Some(value.into());
        self
    }

    pub fn add_help(mut self, add_help: bool) -> Self {
        self.add_help = add_help;
        self
    }

    pub fn allow_abbrev(mut self, allow_abbrev: bool) -> Self {
        self.allow_abbrev = allow_abbrev;
        self
    }

    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    /// Inherit every argument of an already built parser.
    pub fn parent(mut self, parent: &Parser) -> Self {
        self.parents.push(parent.clone());
        self
    }

    /// Declare the subcommand group. Positionals may not be declared after it.
    pub fn subcommands(mut self, group: Subcommands) -> Self {
        self.subcommands.push((self.args.len(), group));
        self
    }

    /// Validate the declaration and freeze it.
    pub fn build(self) -> ParseResult<Parser> {
        self.build_level(None)
    }

    fn build_level(self, inherited_prefix: Option<&str>) -> ParseResult<Parser> {
        let prefix_chars = match self.prefix_chars {
            Some(chars) => chars.trim().to_string(),
            None => inherited_prefix.unwrap_or("-").to_string(),
        };
        if prefix_chars.is_empty() {
            return Err(ParseError::config("prefix_chars must not be empty"));
        }
        if self.subcommands.len() > 1 {
            return Err(ParseError::config("cannot have multiple subcommand groups"));
        }

        let settings = Settings {
            prog: non_empty(self.prog).unwrap_or_else(default_prog),
            usage: non_empty(self.usage),
            description: non_empty(self.description),
            epilog: non_empty(self.epilog),
            fromfile_prefix_chars: non_empty(self.fromfile_prefix_chars),
            argument_default: non_empty(self.argument_default),
            add_help: self.add_help,
            allow_abbrev: self.allow_abbrev,
            prefix_chars,
        };

        let mut positionals = Vec::new();
        let mut optionals = Vec::new();
        let mut declared = Vec::new();
        if settings.add_help {
            declared.push(Declared::Optional(optionals.len()));
            optionals.push(ArgumentSpec::help_flag(&settings.prefix_chars));
        }
        for parent in &self.parents {
            let skip = usize::from(parent.settings.add_help);
            let (positional_base, optional_base) = (positionals.len(), optionals.len());
            for entry in &parent.declared {
                match *entry {
                    Declared::Positional(i) => {
                        declared.push(Declared::Positional(positional_base + i));
                    }
                    Declared::Optional(i) if i >= skip => {
                        declared.push(Declared::Optional(optional_base + i - skip));
                    }
                    Declared::Optional(_) | Declared::Commands => {}
                }
            }
            positionals.extend(parent.positionals.iter().cloned());
            optionals.extend(parent.optionals.iter().skip(skip).cloned());
        }

        let group_at = self.subcommands.first().map(|(at, _)| *at);
        let arg_count = self.args.len();
        for (i, arg) in self.args.into_iter().enumerate() {
            if group_at == Some(i) {
                declared.push(Declared::Commands);
            }
            let spec = ArgumentSpec::from_arg(arg, &settings.prefix_chars)?;
            if spec.is_positional() {
                if group_at.is_some_and(|at| at <= i) {
                    return Err(ParseError::config(format!(
                        "argument {}: positional arguments cannot follow the subcommand group",
                        spec.display_name()
                    )));
                }
                declared.push(Declared::Positional(positionals.len()));
                positionals.push(spec);
            } else {
                declared.push(Declared::Optional(optionals.len()));
                optionals.push(spec);
            }
        }
        if group_at.is_some_and(|at| at >= arg_count) {
            declared.push(Declared::Commands);
        }

        let mut flag_index = HashMap::new();
        for (index, spec) in optionals.iter().enumerate() {
            for flag in spec.flags() {
                if flag_index.insert(flag.clone(), index).is_some() {
                    return Err(ParseError::config(format!(
                        "argument {}: conflicting option string: {flag}",
                        spec.display_name()
                    )));
                }
            }
        }

        let mut dests = HashSet::new();
        for spec in positionals.iter().chain(&optionals) {
            if spec.action().binds() && !dests.insert(spec.dest().to_string()) {
                return Err(ParseError::config(format!(
                    "argument {}: conflicting destination: {}",
                    spec.display_name(),
                    spec.dest()
                )));
            }
        }

        let negative_numbers_are_flags = settings.prefix_chars.contains('-')
            && optionals
                .iter()
                .flat_map(|spec| spec.flags())
                .any(|flag| is_negative_number(flag));

        let subcommands = match self.subcommands.into_iter().next() {
            Some((_, group)) => Some(build_group(group, &settings, &mut dests)?),
            None => None,
        };

        Ok(Parser {
            settings,
            positionals,
            optionals,
            declared,
            flag_index,
            negative_numbers_are_flags,
            subcommands,
        })
    }
}

fn build_group(
    group: Subcommands,
    settings: &Settings,
    dests: &mut HashSet<String>,
) -> ParseResult<SubcommandGroup> {
    let dest = non_empty(group.dest);
    if let Some(dest) = &dest
        && !dests.insert(dest.clone())
    {
        return Err(ParseError::config(format!(
            "subcommand group: conflicting destination: {dest}"
        )));
    }
    if group.commands.is_empty() {
        return Err(ParseError::config("subcommand group declares no commands"));
    }

    let mut commands = IndexMap::new();
    for (name, help, mut builder) in group.commands {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ParseError::config("subcommand name must not be empty"));
        }
        if commands.contains_key(&name) {
            return Err(ParseError::config(format!(
                "conflicting subcommand name: {name}"
            )));
        }
        if non_empty(builder.prog.clone()).is_none() {
            builder.prog = Some(format!("{} {name}", settings.prog));
        }
        let parser = builder.build_level(Some(&settings.prefix_chars))?;
        commands.insert(
            name,
            Command {
                help: non_empty(help),
                parser,
            },
        );
    }

    Ok(SubcommandGroup {
        dest,
        required: group.required,
        help: non_empty(group.help),
        metavar: non_empty(group.metavar),
        title: non_empty(group.title),
        description: non_empty(group.description),
        commands,
    })
}

/// Where a declaration landed, in the order it was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Declared {
    Positional(usize),
    Optional(usize),
    Commands,
}

/// A frozen parser. Cheap to share; parsing never mutates it.
#[derive(Debug, Clone)]
pub struct Parser {
    settings: Settings,
    positionals: Vec<ArgumentSpec>,
    optionals: Vec<ArgumentSpec>,
    declared: Vec<Declared>,
    flag_index: HashMap<String, usize>,
    negative_numbers_are_flags: bool,
    subcommands: Option<SubcommandGroup>,
}

impl Parser {
    /// Match `tokens` against this parser and any subcommand they select.
    pub fn parse<I, S>(&self, tokens: I) -> ParseResult<ParseOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parse_with_level(tokens).map_err(LevelError::into_error)
    }

    /// Like [`Parser::parse`], but a failure also names the level that raised it, so
    /// callers can report it with that level's prog and usage.
    pub fn parse_with_level<I, S>(&self, tokens: I) -> Result<ParseOutcome, LevelError<'_>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let mut level = self;
        let mut merged: Option<Bindings> = None;
        let mut carried = Vec::new();

        loop {
            let scanned =
                matcher::scan(level, tokens, carried).map_err(|error| LevelError { level, error })?;
            match scanned {
                Scan::Finished(bindings) => {
                    let bindings = match merged {
                        Some(mut outer) => {
                            outer.merge(bindings);
                            outer
                        }
                        None => bindings,
                    };
                    return Ok(ParseOutcome::Matches(bindings));
                }
                Scan::Help => return Ok(ParseOutcome::Help(help::render(level))),
                Scan::Version(text) => return Ok(ParseOutcome::Version(text)),
                Scan::Delegated {
                    bindings,
                    command,
                    rest,
                    unrecognized,
                } => {
                    let Some(next) = level
                        .subcommands
                        .as_ref()
                        .and_then(|group| group.command(&command))
                    else {
                        return Err(LevelError {
                            level,
                            error: ParseError::config(format!("no subcommand named {command}")),
                        });
                    };
                    debug!(
                        command = command.as_str(),
                        remaining = rest.len(),
                        "delegating to subcommand"
                    );
                    match &mut merged {
                        Some(outer) => outer.merge(bindings),
                        None => merged = Some(bindings),
                    }
                    level = &next.parser;
                    tokens = rest;
                    carried = unrecognized;
                }
            }
        }
    }

    pub fn prog(&self) -> &str {
        &self.settings.prog
    }

    pub fn usage(&self) -> Option<&str> {
        self.settings.usage.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.settings.description.as_deref()
    }

    pub fn epilog(&self) -> Option<&str> {
        self.settings.epilog.as_deref()
    }

    pub fn prefix_chars(&self) -> &str {
        &self.settings.prefix_chars
    }

    pub fn fromfile_prefix_chars(&self) -> Option<&str> {
        self.settings.fromfile_prefix_chars.as_deref()
    }

    pub fn argument_default(&self) -> Option<&str> {
        self.settings.argument_default.as_deref()
    }

    pub fn add_help(&self) -> bool {
        self.settings.add_help
    }

    pub fn allow_abbrev(&self) -> bool {
        self.settings.allow_abbrev
    }

    pub fn positionals(&self) -> &[ArgumentSpec] {
        &self.positionals
    }

    /// Optional specs; the implicit help flag comes first when enabled.
    pub fn optionals(&self) -> &[ArgumentSpec] {
        &self.optionals
    }

    pub fn subcommands(&self) -> Option<&SubcommandGroup> {
        self.subcommands.as_ref()
    }

    /// Help flag, parents' arguments, then own arguments and the subcommand group, in
    /// the order they were declared.
    pub(crate) fn declared(&self) -> &[Declared] {
        &self.declared
    }

    /// Whether declared flags such as `-1` make negative numbers look like flags.
    pub fn negative_numbers_are_flags(&self) -> bool {
        self.negative_numbers_are_flags
    }

    /// The default of the argument with this destination or flag, falling back to the
    /// parser-wide default.
    pub fn get_default(&self, key: &str) -> Option<&str> {
        let spec = self
            .positionals
            .iter()
            .chain(&self.optionals)
            .filter(|spec| spec.action().binds())
            .find(|spec| spec.dest() == key || spec.flags().iter().any(|f| f == key));
        match spec {
            Some(spec) => spec
                .default_value()
                .filter(|d| !d.is_empty())
                .or(self.argument_default()),
            None => self.argument_default(),
        }
    }

    pub fn format_usage(&self) -> String {
        help::usage(self)
    }

    pub fn format_help(&self) -> String {
        help::render(self)
    }

    pub(crate) fn find_flag(&self, flag: &str) -> Option<usize> {
        self.flag_index.get(flag).copied()
    }

    pub(crate) fn classifier(&self) -> Classifier<'_> {
        Classifier::new(&self.settings.prefix_chars, self.negative_numbers_are_flags)
    }
}
