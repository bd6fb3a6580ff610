//! Glob pattern compilation and matching.
//!
//! Patterns follow shell-glob syntax: `*` matches any run of characters
//! (including `/`), `?` matches exactly one character and `[...]` / `[!...]`
//! match a character class. On top of what `glob` accepts:
//!
//! - `{a,b}` alternation, expanded into one `glob::Pattern` per alternative
//!   (groups may nest);
//! - `\x` matches `x` literally;
//! - runs of `*` collapse to one, so `/api**` is a plain wildcard.
//!
//! Braces and backslashes inside a `[...]` class are not interpreted.
//! Compilation is the fallible, load-time step; matching never fails.

use glob::MatchOptions;
use std::borrow::Cow;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

#[derive(Debug, thiserror::Error)]
#[error("invalid pattern '{pattern}': {message}")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    alternatives: Vec<glob::Pattern>,
    case_sensitive: bool,
}

impl Pattern {
    /// Compile a pattern. Case-insensitive patterns are normalized to lower case
    /// here; values are normalized the same way when matched.
    pub fn compile(pattern: &str, case_sensitive: bool) -> Result<Self, PatternError> {
        let normalized = if case_sensitive {
            pattern.to_string()
        } else {
            pattern.to_lowercase()
        };

        let alternatives = expand_alternatives(&normalized)
            .iter()
            .map(|alternative| glob::Pattern::new(&to_glob_syntax(alternative)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PatternError {
                pattern: pattern.to_string(),
                message: e.msg.to_string(),
            })?;

        Ok(Self {
            source: pattern.to_string(),
            alternatives,
            case_sensitive,
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        let value = if self.case_sensitive {
            Cow::Borrowed(value)
        } else {
            Cow::Owned(value.to_lowercase())
        };
        self.alternatives
            .iter()
            .any(|p| p.matches_with(&value, MATCH_OPTIONS))
    }

    /// The pattern as written in the configuration
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }
}

/// Compile `pattern` and match it against `value` in one step.
///
/// Request paths use precompiled [`Pattern`]s; this is for one-off checks.
pub fn matches(pattern: &str, value: &str, case_sensitive: bool) -> Result<bool, PatternError> {
    Ok(Pattern::compile(pattern, case_sensitive)?.matches(value))
}

/// Expand the first `{...}` group, recursing until no group is left. An
/// unbalanced `{` is literal.
fn expand_alternatives(pattern: &str) -> Vec<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let Some((open, close, commas)) = find_group(&chars) else {
        return vec![pattern.to_string()];
    };

    let prefix: String = chars[..open].iter().collect();
    let suffix: String = chars[close + 1..].iter().collect();
    let mut expanded = Vec::new();
    let mut start = open + 1;
    for end in commas.into_iter().chain(std::iter::once(close)) {
        let alternative: String = chars[start..end].iter().collect();
        expanded.extend(expand_alternatives(&format!(
            "{prefix}{alternative}{suffix}"
        )));
        start = end + 1;
    }
    expanded
}

/// Position of the first unescaped `{`, its matching `}` and the top-level
/// commas between them.
fn find_group(chars: &[char]) -> Option<(usize, usize, Vec<usize>)> {
    let mut open = None;
    let mut depth = 0usize;
    let mut commas = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '{' => {
                if open.is_none() {
                    open = Some(i);
                }
                depth += 1;
            }
            ',' if depth == 1 => commas.push(i),
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return open.map(|o| (o, i, commas));
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Rewrite one alternative into `glob` syntax: escaped metacharacters become
/// single-character classes and runs of `*` collapse.
fn to_glob_syntax(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    let mut in_class = false;

    while let Some(c) = chars.next() {
        if in_class {
            out.push(c);
            in_class = c != ']';
            continue;
        }
        match c {
            '\\' => match chars.next() {
                Some(escaped @ ('*' | '?' | '[' | ']')) => {
                    out.push('[');
                    out.push(escaped);
                    out.push(']');
                }
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            '*' if out.ends_with('*') => {}
            '[' => {
                in_class = true;
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out
}
