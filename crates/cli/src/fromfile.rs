//! `@file` expansion for tokens handed to `argbind parse`.

use anyhow::{Context, Result};
use std::fs;

/// Replace every token starting with one of `prefix_chars` by the lines of the file it
/// names, one argument per line. Expanded arguments are not expanded again.
pub fn expand(tokens: Vec<String>, prefix_chars: Option<&str>) -> Result<Vec<String>> {
    let Some(prefixes) = prefix_chars.filter(|p| !p.is_empty()) else {
        return Ok(tokens);
    };

    let mut expanded = Vec::with_capacity(tokens.len());
    for token in tokens {
        let Some(first) = token.chars().next().filter(|c| prefixes.contains(*c)) else {
            expanded.push(token);
            continue;
        };
        let path = &token[first.len_utf8()..];
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read argument file '{path}'"))?;
        let before = expanded.len();
        expanded.extend(text.lines().map(str::to_string));
        tracing::debug!(path, count = expanded.len() - before, "expanded argument file");
    }
    Ok(expanded)
}
