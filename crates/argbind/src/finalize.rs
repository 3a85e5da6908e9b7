//! End-of-level checks: unreached positionals, required arguments, leftovers, defaults.

use crate::bindings::Bindings;
use crate::dispatch;
use crate::error::{ParseError, ParseResult};
use crate::parser::Parser;
use crate::spec::Action;

/// Complete the bindings of one parser level.
///
/// `cursor` is the first positional slot the scan never reached. A level that handed
/// off to a subcommand passes `delegated`: its group counts as satisfied, and its
/// unrecognized tokens are reported by the innermost level instead.
pub(crate) fn finalize(
    parser: &Parser,
    bindings: &mut Bindings,
    cursor: usize,
    unrecognized: &[String],
    delegated: bool,
) -> ParseResult<()> {
    bindings.set_positionals_consumed(cursor);
    let mut missing = Vec::new();

    for spec in &parser.positionals()[cursor..] {
        if !spec.action().takes_value() {
            dispatch::fire(bindings, spec);
        } else if spec.arity().min() == 0 {
            dispatch::bind_positional_default(bindings, spec, parser.argument_default());
        } else {
            missing.push(spec.display_name());
        }
    }

    if let Some(group) = parser.subcommands()
        && group.required()
        && !delegated
    {
        missing.push(group.display_name());
    }

    for spec in parser.optionals() {
        if spec.required() && !bindings.is_present(spec.dest()) {
            missing.push(spec.display_name());
        }
    }

    if !missing.is_empty() {
        return Err(ParseError::MissingRequired {
            names: missing,
            unrecognized: unrecognized.to_vec(),
        });
    }
    if !delegated && !unrecognized.is_empty() {
        return Err(ParseError::UnrecognizedTokens {
            tokens: unrecognized.to_vec(),
        });
    }

    for spec in parser.optionals() {
        if !spec.action().binds() || *spec.action() == Action::Count {
            continue;
        }
        let slot = bindings.values_mut(spec.dest());
        if slot.is_empty()
            && let Some(value) = dispatch::default_for(spec, parser.argument_default())
        {
            slot.push(value.to_string());
        }
    }
    Ok(())
}
