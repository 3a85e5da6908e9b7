//! The left-to-right scan over one parser level.
//!
//! Optional-looking tokens are resolved and dispatched as they are reached. Positional
//! tokens are buffered into runs. When a run ends its slots are fixed right away, which
//! is also where a subcommand name is recognized and the scan hands off to the next
//! level, but its values are bound only once the scan is done. A help or version flag
//! and errors raised by optionals therefore win over a bad positional value seen earlier.

use std::collections::VecDeque;
use tracing::{debug, trace};

use crate::abbrev::{self, Resolution};
use crate::allocate::{self, Fill};
use crate::bindings::Bindings;
use crate::classify::{Classifier, SEPARATOR, TokenClass};
use crate::dispatch::{self, Flow};
use crate::error::{ParseError, ParseResult};
use crate::finalize;
use crate::parser::{Declared, Parser, SubcommandGroup};

/// How the scan of one level ended.
#[derive(Debug)]
pub(crate) enum Scan {
    Finished(Bindings),
    Help,
    Version(String),
    /// A subcommand was selected; `rest` is handed to its parser.
    Delegated {
        bindings: Bindings,
        command: String,
        rest: Vec<String>,
        unrecognized: Vec<String>,
    },
}

struct MatchState<'p> {
    parser: &'p Parser,
    classifier: Classifier<'p>,
    bindings: Bindings,
    pending: VecDeque<String>,
    run: Vec<String>,
    /// Position in `run` where `--` was seen.
    separator_at: Option<usize>,
    /// Ended runs whose slots are fixed but whose values are not bound yet.
    planned: Vec<PlannedRun>,
    cursor: usize,
    unrecognized: Vec<String>,
}

struct PlannedRun {
    /// First slot the run fills.
    cursor: usize,
    tokens: Vec<String>,
    fills: Vec<Fill>,
}

/// Scan `tokens` against `parser`. `unrecognized` holds tokens outer levels left over.
pub(crate) fn scan(
    parser: &Parser,
    tokens: Vec<String>,
    unrecognized: Vec<String>,
) -> ParseResult<Scan> {
    let mut state = MatchState::new(parser, tokens, unrecognized);

    while let Some(token) = state.pending.pop_front() {
        trace!(token = token.as_str(), "scan token");
        if state.separator_at.is_some() {
            state.run.push(token);
            continue;
        }
        match state.classifier.classify(&token) {
            TokenClass::Separator => state.separator_at = Some(state.run.len()),
            TokenClass::Positional => state.run.push(token),
            TokenClass::Optional => {
                if !state.run.is_empty() {
                    state.pending.push_front(token);
                    if let Some(delegated) = state.end_run()? {
                        return Ok(delegated);
                    }
                    continue;
                }
                match state.optional(token)? {
                    Flow::Continue => {}
                    Flow::Help => return Ok(Scan::Help),
                    Flow::Version(text) => return Ok(Scan::Version(text)),
                }
            }
        }
    }

    if let Some(delegated) = state.end_run()? {
        return Ok(delegated);
    }
    state.bind_planned()?;
    let MatchState {
        mut bindings,
        cursor,
        unrecognized,
        ..
    } = state;
    finalize::finalize(parser, &mut bindings, cursor, &unrecognized, false)?;
    Ok(Scan::Finished(bindings))
}

impl<'p> MatchState<'p> {
    fn new(parser: &'p Parser, tokens: Vec<String>, unrecognized: Vec<String>) -> Self {
        let mut bindings = Bindings::default();
        for declared in parser.declared() {
            let spec = match *declared {
                Declared::Positional(i) => &parser.positionals()[i],
                Declared::Optional(i) => &parser.optionals()[i],
                Declared::Commands => {
                    if let Some(dest) = parser.subcommands().and_then(SubcommandGroup::dest) {
                        bindings.values_mut(dest);
                    }
                    continue;
                }
            };
            if spec.action().binds() {
                bindings.declare(spec);
            }
        }
        Self {
            parser,
            classifier: parser.classifier(),
            bindings,
            pending: tokens.into(),
            run: Vec::new(),
            separator_at: None,
            planned: Vec::new(),
            cursor: 0,
            unrecognized,
        }
    }

    fn optional(&mut self, token: String) -> ParseResult<Flow> {
        match abbrev::resolve(self.parser, &token)? {
            Resolution::Flag { index, inline } => self.dispatch(index, inline),
            Resolution::Cluster(flags) => {
                for (index, inline) in flags {
                    let flow = self.dispatch(index, inline)?;
                    if flow != Flow::Continue {
                        return Ok(flow);
                    }
                }
                Ok(Flow::Continue)
            }
            Resolution::Unknown => {
                debug!(token = token.as_str(), "unrecognized option");
                self.unrecognized.push(token);
                Ok(Flow::Continue)
            }
        }
    }

    fn dispatch(&mut self, index: usize, inline: Option<String>) -> ParseResult<Flow> {
        let parser = self.parser;
        let spec = &parser.optionals()[index];
        if spec.action().takes_value() {
            dispatch::consume(
                &mut self.bindings,
                spec,
                inline,
                &mut self.pending,
                &self.classifier,
            )?;
            return Ok(Flow::Continue);
        }
        if let Some(value) = inline {
            return Err(ParseError::ExplicitArgumentIgnored {
                argument: spec.display_name(),
                value,
            });
        }
        Ok(dispatch::fire(&mut self.bindings, spec))
    }

    /// Fix the slots of the buffered run. Returns the delegation when it selects a
    /// subcommand.
    fn end_run(&mut self) -> ParseResult<Option<Scan>> {
        if self.run.is_empty() {
            return Ok(None);
        }
        let run = std::mem::take(&mut self.run);
        let parser = self.parser;

        if let Some(group) = parser.subcommands() {
            let slots = &parser.positionals()[self.cursor..];
            let min_rest: usize = slots.iter().map(|s| s.arity().min()).sum();
            let max_take = slots
                .iter()
                .try_fold(0usize, |acc, s| s.arity().max().map(|max| acc + max));
            let limit = run.len() - 1;
            let take = max_take.map_or(limit, |max| max.min(limit));
            if min_rest <= take {
                if !slots.is_empty() {
                    self.plan(run[..take].to_vec());
                }
                return self.delegate(group, run, take).map(Some);
            }
        }

        self.plan(run);
        Ok(None)
    }

    fn plan(&mut self, mut tokens: Vec<String>) {
        let slots = &self.parser.positionals()[self.cursor..];
        let plan = allocate::plan(slots, tokens.len());
        debug!(
            cursor = self.cursor,
            tokens = tokens.len(),
            fills = ?plan.fills,
            leftover = plan.leftover,
            "planned positional run"
        );

        self.unrecognized.extend(tokens.drain(plan.taken()..));
        let cursor = self.cursor;
        self.cursor += plan.fills.len();
        self.planned.push(PlannedRun {
            cursor,
            tokens,
            fills: plan.fills,
        });
    }

    /// Bind the values of every planned run, in scan order.
    fn bind_planned(&mut self) -> ParseResult<()> {
        let parser = self.parser;
        for run in std::mem::take(&mut self.planned) {
            let slots = &parser.positionals()[run.cursor..];
            let mut offset = 0;
            for (spec, fill) in slots.iter().zip(&run.fills) {
                match *fill {
                    Fill::Take(n) => {
                        let taken = &run.tokens[offset..offset + n];
                        dispatch::bind_positional(&mut self.bindings, spec, taken)?;
                        offset += n;
                    }
                    Fill::Default => {
                        dispatch::bind_positional_default(
                            &mut self.bindings,
                            spec,
                            parser.argument_default(),
                        );
                    }
                    Fill::Fire => {
                        dispatch::fire(&mut self.bindings, spec);
                    }
                }
            }
        }
        Ok(())
    }

    /// `run[at]` names the subcommand; everything after it belongs to that subcommand.
    fn delegate(
        &mut self,
        group: &SubcommandGroup,
        run: Vec<String>,
        at: usize,
    ) -> ParseResult<Scan> {
        let command = run[at].clone();
        if group.command(&command).is_none() {
            return Err(ParseError::InvalidChoice {
                argument: group.display_name(),
                value: command,
                choices: group.names(),
            });
        }

        let run_len = run.len();
        let split = self.separator_at.map(|s| s.max(at + 1));
        let mut rest = Vec::with_capacity(run_len - at + self.pending.len());
        for (i, token) in run.into_iter().enumerate().skip(at + 1) {
            if split == Some(i) {
                rest.push(SEPARATOR.to_string());
            }
            rest.push(token);
        }
        if split.is_some_and(|s| s >= run_len) {
            rest.push(SEPARATOR.to_string());
        }
        rest.extend(self.pending.drain(..));

        self.bind_planned()?;
        let mut bindings = std::mem::take(&mut self.bindings);
        finalize::finalize(
            self.parser,
            &mut bindings,
            self.cursor,
            &self.unrecognized,
            true,
        )?;
        bindings.record_command(group.dest(), &command);
        debug!(command = command.as_str(), rest = ?rest, "subcommand selected");

        Ok(Scan::Delegated {
            bindings,
            command,
            rest,
            unrecognized: std::mem::take(&mut self.unrecognized),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ParserBuilder, Subcommands};
    use crate::spec::{Action, Arg, Arity};

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn runs_end_when_an_optional_interrupts() {
        let parser = ParserBuilder::new("p")
            .arg(Arg::new("first").nargs(Arity::OneOrMore))
            .arg(Arg::new("second"))
            .arg(Arg::new("--flag").action(Action::StoreTrue))
            .build()
            .unwrap();
        let Scan::Finished(b) = scan(&parser, tokens(&["a", "b", "--flag"]), vec![]).unwrap() else {
            panic!("expected bindings");
        };
        assert_eq!(b.get_all("first").unwrap(), tokens(&["a"]));
        assert_eq!(b.get("second").unwrap(), Some("b"));
        assert_eq!(b.positionals_consumed(), 2);
    }

    #[test]
    fn positional_values_are_bound_after_the_scan() {
        let parser = ParserBuilder::new("git")
            .arg(Arg::new("mode").choices(["a", "b"]))
            .subcommands(Subcommands::new().command("add", ParserBuilder::default()))
            .build()
            .unwrap();
        assert!(matches!(
            scan(&parser, tokens(&["c", "-h"]), vec![]).unwrap(),
            Scan::Help
        ));
        let err = scan(&parser, tokens(&["c", "add"]), vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument mode: invalid choice: 'c' (choose from 'a', 'b')"
        );
    }

    #[test]
    fn delegation_splits_the_run() {
        let parser = ParserBuilder::new("git")
            .arg(Arg::new("repo"))
            .subcommands(
                Subcommands::new()
                    .dest("cmd")
                    .command("add", ParserBuilder::default()),
            )
            .build()
            .unwrap();
        let scan = scan(&parser, tokens(&["here", "add", "x", "--", "-y"]), vec![]).unwrap();
        let Scan::Delegated {
            bindings,
            command,
            rest,
            ..
        } = scan
        else {
            panic!("expected delegation");
        };
        assert_eq!(command, "add");
        assert_eq!(rest, tokens(&["x", "--", "-y"]));
        assert_eq!(bindings.get("repo").unwrap(), Some("here"));
        assert_eq!(bindings.get("cmd").unwrap(), Some("add"));
    }

    #[test]
    fn unknown_command_is_an_invalid_choice() {
        let parser = ParserBuilder::new("git")
            .subcommands(
                Subcommands::new()
                    .command("add", ParserBuilder::default())
                    .command("rm", ParserBuilder::default()),
            )
            .build()
            .unwrap();
        let err = scan(&parser, tokens(&["commit"]), vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument {add,rm}: invalid choice: 'commit' (choose from 'add', 'rm')"
        );
    }

    #[test]
    fn unknown_options_are_unrecognized() {
        let parser = ParserBuilder::new("p")
            .arg(Arg::new("files").nargs(Arity::ZeroOrMore))
            .build()
            .unwrap();
        let err = scan(&parser, tokens(&["a", "--what", "b"]), vec![]).unwrap_err();
        assert_eq!(err.to_string(), "unrecognized arguments: --what b");
    }
}
