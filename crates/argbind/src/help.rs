//! Usage and help rendering.

use crate::parser::{Parser, SubcommandGroup};
use crate::spec::{Action, ArgumentSpec, Arity};

/// Left column width before help text moves to its own line.
const MAX_LEFT_WIDTH: usize = 22;

fn metavar(spec: &ArgumentSpec) -> String {
    if let Some(metavar) = spec.metavar() {
        return metavar.to_string();
    }
    if !spec.choices().is_empty() {
        return format!("{{{}}}", spec.choices().join(","));
    }
    if spec.is_positional() {
        spec.dest().to_string()
    } else {
        spec.dest().to_uppercase()
    }
}

/// `M`, `[M]`, `[M ...]`, `M [M ...]` or `M M` depending on arity.
fn format_values(spec: &ArgumentSpec) -> String {
    if !spec.action().takes_value() {
        return String::new();
    }
    let m = metavar(spec);
    match spec.arity() {
        Arity::Single => m,
        Arity::ZeroOrOne => format!("[{m}]"),
        Arity::ZeroOrMore => format!("[{m} ...]"),
        Arity::OneOrMore => format!("{m} [{m} ...]"),
        Arity::Fixed(n) => vec![m; n].join(" "),
    }
}

fn usage_item(spec: &ArgumentSpec) -> String {
    if spec.is_positional() {
        return format_values(spec);
    }
    let values = format_values(spec);
    let item = if values.is_empty() {
        spec.flags()[0].clone()
    } else {
        format!("{} {values}", spec.flags()[0])
    };
    if spec.required() {
        item
    } else {
        format!("[{item}]")
    }
}

fn group_usage(group: &SubcommandGroup) -> String {
    format!("{} ...", group.display_name())
}

/// The `usage: ...` line, without a trailing newline.
pub fn usage(parser: &Parser) -> String {
    if let Some(custom) = parser.usage() {
        return format!("usage: {custom}");
    }
    let mut parts = vec![parser.prog().to_string()];
    parts.extend(
        parser
            .optionals()
            .iter()
            .filter(|spec| !spec.hidden())
            .map(usage_item),
    );
    parts.extend(
        parser
            .positionals()
            .iter()
            .filter(|spec| !spec.hidden())
            .map(usage_item)
            .filter(|item| !item.is_empty()),
    );
    if let Some(group) = parser.subcommands() {
        parts.push(group_usage(group));
    }
    format!("usage: {}", parts.join(" "))
}

fn optional_left(spec: &ArgumentSpec) -> String {
    let values = format_values(spec);
    spec.flags()
        .iter()
        .map(|flag| {
            if values.is_empty() {
                flag.clone()
            } else {
                format!("{flag} {values}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_rows(out: &mut String, rows: &[(String, String)], indent: usize) {
    let width = rows
        .iter()
        .map(|(left, _)| left.len())
        .filter(|len| *len <= MAX_LEFT_WIDTH)
        .max()
        .unwrap_or(0);
    let pad = " ".repeat(indent);
    for (left, help) in rows {
        if help.is_empty() {
            out.push_str(&format!("{pad}{left}\n"));
        } else if left.len() <= width {
            out.push_str(&format!("{pad}{left:width$}  {help}\n"));
        } else {
            out.push_str(&format!("{pad}{left}\n"));
            out.push_str(&format!("{pad}{:width$}  {help}\n", ""));
        }
    }
}

fn command_rows(group: &SubcommandGroup) -> Vec<(String, String)> {
    group
        .commands()
        .map(|(name, cmd)| (format!("  {name}"), cmd.help().unwrap_or_default().to_string()))
        .collect()
}

/// Full help text: usage, description, argument sections, subcommands and epilog.
pub fn render(parser: &Parser) -> String {
    let mut out = usage(parser);
    out.push('\n');

    if let Some(description) = parser.description() {
        out.push('\n');
        out.push_str(description);
        out.push('\n');
    }

    let mut positional_rows: Vec<(String, String)> = parser
        .positionals()
        .iter()
        .filter(|spec| !spec.hidden())
        .map(|spec| (metavar(spec), spec.help().unwrap_or_default().to_string()))
        .collect();
    let group = parser.subcommands();
    if let Some(group) = group.filter(|g| g.title().is_none()) {
        positional_rows.push((
            group.display_name(),
            group.help().unwrap_or_default().to_string(),
        ));
        positional_rows.extend(command_rows(group));
    }
    if !positional_rows.is_empty() {
        out.push_str("\npositional arguments:\n");
        push_rows(&mut out, &positional_rows, 2);
    }

    let optional_rows: Vec<(String, String)> = parser
        .optionals()
        .iter()
        .filter(|spec| !spec.hidden())
        .map(|spec| (optional_left(spec), spec.help().unwrap_or_default().to_string()))
        .collect();
    if !optional_rows.is_empty() {
        out.push_str("\noptional arguments:\n");
        push_rows(&mut out, &optional_rows, 2);
    }

    if let Some(group) = group
        && let Some(title) = group.title()
    {
        out.push_str(&format!("\n{title}:\n"));
        if let Some(description) = group.description() {
            out.push_str(&format!("  {description}\n\n"));
        }
        let mut rows = vec![(
            group.display_name(),
            group.help().unwrap_or_default().to_string(),
        )];
        rows.extend(command_rows(group));
        push_rows(&mut out, &rows, 2);
    }

    if let Some(epilog) = parser.epilog() {
        out.push('\n');
        out.push_str(epilog);
        out.push('\n');
    }
    out
}

/// Text of the parser's version flag, if it declares one.
pub fn version(parser: &Parser) -> Option<&str> {
    parser.optionals().iter().find_map(|spec| match spec.action() {
        Action::Version(text) => Some(text.as_str()),
        _ => None,
    })
}
