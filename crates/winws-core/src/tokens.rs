//! Argument token helpers
//!
//! winws accepts `--flag=value`, `--flag value`, bare `--flag` and the
//! `--new` block separator. Strategy documents store arguments as text, so
//! everything entering the pipeline is split here first.

use std::path::Path;

/// Separator between independent filter+action blocks
pub const SEPARATOR: &str = "--new";

/// Split an argument string into tokens.
///
/// Whitespace separates tokens; double quotes group text and are removed,
/// `\"` inside quotes yields a literal quote.
pub fn split_args(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            '\\' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        tokens.push(current);
    }
    tokens
}

/// Split a `--flag=value` token into its flag (including `=`) and value
pub fn split_flag(token: &str) -> Option<(&str, &str)> {
    token.find('=').map(|pos| (&token[..=pos], &token[pos + 1..]))
}

/// Check whether a token starts with any of the given prefixes
pub fn has_any_prefix(token: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|p| token.starts_with(p))
}

/// Whether a path value is absolute.
///
/// Windows drive (`C:\`, `C:/`) and UNC (`\\server`) forms count as absolute
/// on every host so that command lines built elsewhere resolve identically.
pub fn is_absolute_value(value: &str) -> bool {
    if Path::new(value).is_absolute() {
        return true;
    }
    let bytes = value.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
    {
        return true;
    }
    value.starts_with("\\\\")
}
