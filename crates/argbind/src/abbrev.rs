//! Flag resolution: exact matches, unambiguous prefixes and single-character clusters.

use tracing::debug;

use crate::classify::split_inline;
use crate::error::{ParseError, ParseResult};
use crate::parser::Parser;

/// What an optional-looking token refers to. Indices point into [`Parser::optionals`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    Flag {
        index: usize,
        inline: Option<String>,
    },
    /// `-abc` split into `-a -b -c`; a value-taking flag ends the cluster.
    Cluster(Vec<(usize, Option<String>)>),
    Unknown,
}

enum Candidate<'p> {
    Full { index: usize, flag: &'p str },
    Cluster { flag: &'p str },
}

impl Candidate<'_> {
    fn flag(&self) -> &str {
        match self {
            Self::Full { flag, .. } | Self::Cluster { flag } => flag,
        }
    }
}

pub(crate) fn resolve(parser: &Parser, token: &str) -> ParseResult<Resolution> {
    if let Some(index) = parser.find_flag(token) {
        return Ok(Resolution::Flag {
            index,
            inline: None,
        });
    }
    let (head, inline) = split_inline(token);
    if inline.is_some()
        && let Some(index) = parser.find_flag(head)
    {
        return Ok(Resolution::Flag {
            index,
            inline: inline.map(str::to_string),
        });
    }
    if !parser.allow_abbrev() {
        return Ok(Resolution::Unknown);
    }

    let single = parser.classifier().is_single_prefix(token);
    let probe = if single { token } else { head };
    let mut candidates = Vec::new();
    for (index, spec) in parser.optionals().iter().enumerate() {
        for flag in spec.flags() {
            if flag.starts_with(probe) {
                candidates.push(Candidate::Full { index, flag });
                break;
            }
            if single && flag.chars().count() == 2 && probe.starts_with(flag.as_str()) {
                candidates.push(Candidate::Cluster { flag });
                break;
            }
        }
    }

    match candidates.as_slice() {
        [_, _, ..] => Err(ParseError::AmbiguousAbbreviation {
            token: token.to_string(),
            candidates: candidates.iter().map(|c| c.flag().to_string()).collect(),
        }),
        [Candidate::Full { index, flag }] => {
            debug!(token, flag, "expanded abbreviation");
            Ok(Resolution::Flag {
                index: *index,
                inline: if single { None } else { inline.map(str::to_string) },
            })
        }
        _ if single => Ok(split_cluster(parser, token)),
        _ => Ok(Resolution::Unknown),
    }
}

/// Split `-abc` into single-character flags.
///
/// The first value-taking flag absorbs the rest of the token. An unknown later letter
/// starts the inline value of the flag before it; an unknown first letter leaves the
/// token unresolved.
fn split_cluster(parser: &Parser, token: &str) -> Resolution {
    let mut chars = token.chars();
    let Some(prefix) = chars.next() else {
        return Resolution::Unknown;
    };
    let body = chars.as_str();
    let mut flags: Vec<(usize, Option<String>)> = Vec::new();

    for (pos, c) in body.char_indices() {
        let rest = &body[pos + c.len_utf8()..];
        let Some(index) = parser.find_flag(&format!("{prefix}{c}")) else {
            let Some((_, inline)) = flags.last_mut() else {
                return Resolution::Unknown;
            };
            let tail = &body[pos..];
            *inline = Some(tail.strip_prefix('=').unwrap_or(tail).to_string());
            break;
        };
        if parser.optionals()[index].action().takes_value() {
            let inline = (!rest.is_empty())
                .then(|| rest.strip_prefix('=').unwrap_or(rest).to_string());
            flags.push((index, inline));
            break;
        }
        flags.push((index, None));
    }

    debug!(token, count = flags.len(), "split flag cluster");
    Resolution::Cluster(flags)
}
