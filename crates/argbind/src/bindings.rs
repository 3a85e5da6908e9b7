//! Parse results.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::AccessError;
use crate::spec::{ActionKind, ArgumentSpec};

/// Values bound to one destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    action: ActionKind,
    values: Vec<String>,
}

impl Binding {
    pub fn action(&self) -> ActionKind {
        self.action
    }

    /// Raw values in the order they were bound.
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Destination keys mapped to their bound values, in declaration order.
///
/// Every declared destination has an entry, even when nothing was bound to it. Keys can
/// be looked up by destination or by any of the argument's flags.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Bindings {
    entries: IndexMap<String, Binding>,
    #[serde(skip)]
    aliases: HashMap<String, String>,
    subcommands: Vec<String>,
    positionals_consumed: usize,
}

impl Bindings {
    pub(crate) fn declare(&mut self, spec: &ArgumentSpec) {
        let dest = spec.dest().to_string();
        if !spec.is_positional() {
            for flag in spec.flags() {
                self.aliases.insert(flag.clone(), dest.clone());
            }
        }
        self.entries.insert(
            dest,
            Binding {
                action: spec.action().kind(),
                values: Vec::new(),
            },
        );
    }

    pub(crate) fn values_mut(&mut self, dest: &str) -> &mut Vec<String> {
        &mut self
            .entries
            .entry(dest.to_string())
            .or_insert_with(|| Binding {
                action: ActionKind::Store,
                values: Vec::new(),
            })
            .values
    }

    pub(crate) fn record_command(&mut self, dest: Option<&str>, command: &str) {
        if let Some(dest) = dest {
            self.entries.insert(
                dest.to_string(),
                Binding {
                    action: ActionKind::Store,
                    values: vec![command.to_string()],
                },
            );
        }
        self.subcommands.push(command.to_string());
    }

    pub(crate) fn set_positionals_consumed(&mut self, n: usize) {
        self.positionals_consumed = n;
    }

    /// Fold a nested level in; its keys win on collision.
    pub(crate) fn merge(&mut self, child: Bindings) {
        self.entries.extend(child.entries);
        self.aliases.extend(child.aliases);
        self.subcommands.extend(child.subcommands);
    }

    fn lookup(&self, key: &str) -> Result<&Binding, AccessError> {
        self.entries
            .get(key)
            .or_else(|| self.aliases.get(key).and_then(|dest| self.entries.get(dest)))
            .ok_or_else(|| AccessError::NoSuchArgument(key.to_string()))
    }

    pub fn binding(&self, key: &str) -> Option<&Binding> {
        self.lookup(key).ok()
    }

    /// The single value of `key`, with surrounding quotes removed.
    pub fn get(&self, key: &str) -> Result<Option<&str>, AccessError> {
        let binding = self.lookup(key)?;
        if binding.action == ActionKind::Count {
            return Err(AccessError::CountAsValue(key.to_string()));
        }
        match binding.values.as_slice() {
            [] => Ok(None),
            [value] => Ok(Some(strip_quotes(value))),
            _ => Err(AccessError::MultipleValues(key.to_string())),
        }
    }

    /// Every value of `key`, unmodified.
    pub fn get_all(&self, key: &str) -> Result<&[String], AccessError> {
        Ok(self.lookup(key)?.values.as_slice())
    }

    /// The single value of `key` converted with [`FromStr`]. Empty values read as `None`.
    pub fn get_as<T: FromStr>(&self, key: &str) -> Result<Option<T>, AccessError> {
        match self.get(key)? {
            None | Some("") => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| AccessError::Conversion {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn get_many<T: FromStr>(&self, key: &str) -> Result<Vec<T>, AccessError> {
        self.get_all(key)?
            .iter()
            .map(|raw| {
                let value = strip_quotes(raw);
                value.parse().map_err(|_| AccessError::Conversion {
                    key: key.to_string(),
                    value: value.to_string(),
                })
            })
            .collect()
    }

    /// Occurrences of a `count` argument; number of values for anything else.
    pub fn count(&self, key: &str) -> Result<usize, AccessError> {
        Ok(self.lookup(key)?.values.len())
    }

    /// Boolean view: the stored toggle for `store_true`/`store_false`, presence otherwise.
    pub fn flag(&self, key: &str) -> Result<bool, AccessError> {
        let binding = self.lookup(key)?;
        Ok(match binding.action {
            ActionKind::StoreTrue | ActionKind::StoreFalse => {
                binding.values.last().is_some_and(|v| v == "true")
            }
            _ => !binding.values.is_empty(),
        })
    }

    /// Whether `key` is declared and holds at least one value.
    pub fn is_present(&self, key: &str) -> bool {
        self.lookup(key).is_ok_and(|b| !b.values.is_empty())
    }

    /// Whether `key` names a declared destination or flag.
    pub fn exists(&self, key: &str) -> bool {
        self.lookup(key).is_ok()
    }

    /// String form of a binding: the value for const-like actions, the count for
    /// `count`, and `[a, b]` otherwise.
    pub fn display(&self, key: &str) -> Result<String, AccessError> {
        let binding = self.lookup(key)?;
        Ok(match binding.action {
            ActionKind::StoreConst | ActionKind::StoreTrue | ActionKind::StoreFalse => {
                match binding.values.as_slice() {
                    [] => "None".to_string(),
                    [value] => value.clone(),
                    _ => return Err(AccessError::MultipleValues(key.to_string())),
                }
            }
            ActionKind::Count => binding.values.len().to_string(),
            _ => format!(
                "[{}]",
                binding
                    .values
                    .iter()
                    .map(|v| if v.is_empty() { "None" } else { v.as_str() })
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subcommands chosen, outermost first.
    pub fn subcommands(&self) -> &[String] {
        &self.subcommands
    }

    /// Positional slots filled at the top level.
    pub fn positionals_consumed(&self) -> usize {
        self.positionals_consumed
    }
}

pub(crate) fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(&first), Some(&last))
            if bytes.len() > 1 && first == last && (first == b'\'' || first == b'"') =>
        {
            &value[1..value.len() - 1]
        }
        _ => value,
    }
}
