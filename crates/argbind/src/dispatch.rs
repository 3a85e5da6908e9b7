//! Action effects on bindings.

use std::collections::VecDeque;
use tracing::trace;

use crate::bindings::{Bindings, strip_quotes};
use crate::classify::{Classifier, TokenClass};
use crate::error::{Expected, ParseError, ParseResult};
use crate::spec::{Action, ArgumentSpec, Arity};

/// Whether the scan goes on after an action ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Help,
    Version(String),
}

pub(crate) fn check_choice(spec: &ArgumentSpec, value: &str) -> ParseResult<()> {
    if spec.choices().is_empty() {
        return Ok(());
    }
    let unquoted = strip_quotes(value);
    if spec.choices().iter().any(|c| c == unquoted) {
        Ok(())
    } else {
        Err(ParseError::InvalidChoice {
            argument: spec.display_name(),
            value: unquoted.to_string(),
            choices: spec.choices().to_vec(),
        })
    }
}

/// The spec's own default, or the parser-wide one; empty values count as absent.
pub(crate) fn default_for<'a>(
    spec: &'a ArgumentSpec,
    parser_default: Option<&'a str>,
) -> Option<&'a str> {
    spec.default_value()
        .filter(|d| !d.is_empty())
        .or(parser_default)
        .filter(|d| !d.is_empty())
}

/// Bind tokens the allocator assigned to a positional slot.
pub(crate) fn bind_positional(
    bindings: &mut Bindings,
    spec: &ArgumentSpec,
    tokens: &[String],
) -> ParseResult<()> {
    for token in tokens {
        check_choice(spec, token)?;
    }
    bindings.values_mut(spec.dest()).extend_from_slice(tokens);
    Ok(())
}

/// Positional slots left without tokens get a default only for `store`.
pub(crate) fn bind_positional_default(
    bindings: &mut Bindings,
    spec: &ArgumentSpec,
    parser_default: Option<&str>,
) {
    if *spec.action() != Action::Store {
        return;
    }
    let slot = bindings.values_mut(spec.dest());
    if slot.is_empty()
        && let Some(value) = default_for(spec, parser_default)
    {
        slot.push(value.to_string());
    }
}

/// Run a no-value action.
pub(crate) fn fire(bindings: &mut Bindings, spec: &ArgumentSpec) -> Flow {
    match spec.action() {
        Action::StoreConst(_) | Action::StoreTrue | Action::StoreFalse => {
            let slot = bindings.values_mut(spec.dest());
            if slot.is_empty()
                && let Some(value) = spec.const_value()
            {
                slot.push(value.to_string());
            }
            if *spec.action() == Action::StoreTrue {
                spec.fire_callback();
            }
            Flow::Continue
        }
        Action::AppendConst(value) => {
            bindings.values_mut(spec.dest()).push(value.clone());
            Flow::Continue
        }
        Action::Count => {
            bindings.values_mut(spec.dest()).push(String::new());
            Flow::Continue
        }
        Action::Help => Flow::Help,
        Action::Version(text) => Flow::Version(text.clone()),
        Action::Store | Action::Append | Action::Extend => Flow::Continue,
    }
}

/// Collect the values of a value-taking optional and bind them.
///
/// An inline value counts as exactly one value. Otherwise positional-looking tokens are
/// taken from the front of `pending` up to the arity limit.
pub(crate) fn consume(
    bindings: &mut Bindings,
    spec: &ArgumentSpec,
    inline: Option<String>,
    pending: &mut VecDeque<String>,
    classifier: &Classifier<'_>,
) -> ParseResult<()> {
    let arity = spec.arity();
    let values = match inline {
        Some(value) => {
            if let Arity::Fixed(n) = arity
                && n > 1
            {
                return Err(expected(spec, Expected::Exactly(n)));
            }
            if value.is_empty() {
                return Err(expected(spec, Expected::One));
            }
            vec![value]
        }
        None => {
            let limit = arity.max();
            let mut values = Vec::new();
            while limit.is_none_or(|l| values.len() < l) {
                match pending.front() {
                    Some(next) if classifier.classify(next) == TokenClass::Positional => {
                        if let Some(next) = pending.pop_front() {
                            values.push(next);
                        }
                    }
                    _ => break,
                }
            }
            match arity {
                Arity::Single if values.is_empty() => {
                    return Err(expected(spec, Expected::One));
                }
                Arity::OneOrMore if values.is_empty() => {
                    return Err(expected(spec, Expected::AtLeastOne));
                }
                Arity::Fixed(n) if values.len() < n => {
                    return Err(expected(spec, Expected::Exactly(n)));
                }
                _ => {}
            }
            values
        }
    };

    for value in &values {
        check_choice(spec, value)?;
    }
    trace!(dest = spec.dest(), count = values.len(), "bind optional values");

    let slot = bindings.values_mut(spec.dest());
    if *spec.action() == Action::Store {
        slot.clear();
    }
    if values.is_empty() && arity == Arity::ZeroOrOne {
        slot.extend(spec.const_value().map(str::to_string));
    } else {
        slot.extend(values);
    }
    Ok(())
}

fn expected(spec: &ArgumentSpec, expected: Expected) -> ParseError {
    ParseError::ExpectedArguments {
        argument: spec.display_name(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn spec(arg: crate::spec::Arg) -> ArgumentSpec {
        ArgumentSpec::from_arg(arg, "-").unwrap()
    }

    fn queue(tokens: &[&str]) -> VecDeque<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn run(
        spec: &ArgumentSpec,
        inline: Option<&str>,
        tokens: &[&str],
    ) -> (ParseResult<()>, Bindings, VecDeque<String>) {
        let mut bindings = Bindings::default();
        bindings.declare(spec);
        let mut pending = queue(tokens);
        let classifier = Classifier::new("-", false);
        let res = consume(
            &mut bindings,
            spec,
            inline.map(str::to_string),
            &mut pending,
            &classifier,
        );
        (res, bindings, pending)
    }

    #[test]
    fn store_takes_one_and_replaces() {
        let s = spec(crate::spec::Arg::new(["-o", "--out"]));
        let (res, mut b, pending) = run(&s, None, &["a", "b"]);
        res.unwrap();
        assert_eq!(b.get_all("out").unwrap(), ["a".to_string()]);
        assert_eq!(pending, queue(&["b"]));

        let mut rest = queue(&["c"]);
        consume(&mut b, &s, None, &mut rest, &Classifier::new("-", false)).unwrap();
        assert_eq!(b.get_all("out").unwrap(), ["c".to_string()]);
    }

    #[test]
    fn open_ended_stops_at_optional_or_separator() {
        let s = spec(crate::spec::Arg::new("--files").nargs(Arity::OneOrMore));
        let (res, b, pending) = run(&s, None, &["a", "-1", "--", "c"]);
        res.unwrap();
        assert_eq!(b.get_all("files").unwrap(), ["a".to_string(), "-1".to_string()]);
        assert_eq!(pending, queue(&["--", "c"]));

        let (res, _, _) = run(&s, None, &["--x"]);
        assert_eq!(
            res.unwrap_err().to_string(),
            "argument --files: expected at least one argument"
        );
    }

    #[test]
    fn inline_value_rules() {
        let pair = spec(crate::spec::Arg::new("--pair").nargs(Arity::Fixed(2)));
        let (res, _, _) = run(&pair, Some("a"), &[]);
        assert_eq!(res.unwrap_err().to_string(), "argument --pair: expected 2 arguments");

        let single = spec(crate::spec::Arg::new(["-o", "--out"]));
        let (res, _, _) = run(&single, Some(""), &[]);
        assert_eq!(
            res.unwrap_err().to_string(),
            "argument -o/--out: expected one argument"
        );

        let (res, b, pending) = run(&single, Some("x"), &["y"]);
        res.unwrap();
        assert_eq!(b.get("out").unwrap(), Some("x"));
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn zero_or_one_stores_const_without_value() {
        let s = spec(
            crate::spec::Arg::new("--level")
                .nargs(Arity::ZeroOrOne)
                .const_value("max"),
        );
        let (res, b, _) = run(&s, None, &["--next"]);
        res.unwrap();
        assert_eq!(b.get("level").unwrap(), Some("max"));
    }

    #[test]
    fn choices_are_checked_unquoted() {
        let s = spec(crate::spec::Arg::new("--mode").choices(["fast", "slow"]));
        let (res, _, _) = run(&s, None, &["'fast'"]);
        res.unwrap();
        let (res, _, _) = run(&s, None, &["medium"]);
        let err = res.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidChoice);
        assert_eq!(
            err.to_string(),
            "argument --mode: invalid choice: 'medium' (choose from 'fast', 'slow')"
        );
    }

    #[test]
    fn fire_effects() {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let verbose = spec(
            crate::spec::Arg::new("--verbose")
                .action(Action::StoreTrue)
                .on_match(move || {
                    seen.fetch_add(1, Ordering::SeqCst);
                }),
        );
        let count = spec(crate::spec::Arg::new("-v").action(Action::Count));
        let tag = spec(crate::spec::Arg::new("--tag").action(Action::AppendConst("x".into())));
        let mut b = Bindings::default();
        for s in [&verbose, &count, &tag] {
            b.declare(s);
        }

        for _ in 0..2 {
            assert_eq!(fire(&mut b, &verbose), Flow::Continue);
            fire(&mut b, &count);
            fire(&mut b, &tag);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(b.get_all("verbose").unwrap(), ["true".to_string()]);
        assert_eq!(b.count("v").unwrap(), 2);
        assert_eq!(b.get_all("tag").unwrap().len(), 2);

        let version = spec(crate::spec::Arg::new("-V").action(Action::Version("1.0".into())));
        assert_eq!(fire(&mut b, &version), Flow::Version("1.0".to_string()));
    }

    #[test]
    fn defaults_fall_back_to_parser_default() {
        let s = spec(crate::spec::Arg::new("name").nargs(Arity::ZeroOrOne));
        let mut b = Bindings::default();
        b.declare(&s);
        bind_positional_default(&mut b, &s, Some("anon"));
        assert_eq!(b.get("name").unwrap(), Some("anon"));

        let appended = spec(
            crate::spec::Arg::new("items")
                .nargs(Arity::ZeroOrMore)
                .action(Action::Append)
                .default_value("x"),
        );
        b.declare(&appended);
        bind_positional_default(&mut b, &appended, None);
        assert!(!b.is_present("items"));
    }
}
