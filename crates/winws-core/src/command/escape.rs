//! Escaping for the places a command line ends up in

use std::borrow::Cow;

const QUOTE_TRIGGERS: &[char] = &[' ', '\t', '&', '|', '<', '>'];

/// Quote a token for a Windows command line.
///
/// Tokens containing whitespace or shell metacharacters are wrapped in
/// double quotes with inner quotes escaped as `\"`; anything else is
/// returned unchanged.
pub fn quote_token(token: &str) -> Cow<'_, str> {
    if !token.is_empty() && !token.contains(QUOTE_TRIGGERS) {
        return Cow::Borrowed(token);
    }
    Cow::Owned(format!("\"{}\"", token.replace('"', "\\\"")))
}

/// Quoted tokens joined by single spaces
pub fn render_arguments(tokens: &[String]) -> String {
    tokens.iter().map(|t| quote_token(t)).collect::<Vec<_>>().join(" ")
}

/// `"<exe>" tok tok ...`
pub fn render_command_line(exe: &str, tokens: &[String]) -> String {
    if tokens.is_empty() {
        return format!("\"{exe}\"");
    }
    format!("\"{exe}\" {}", render_arguments(tokens))
}

/// Make a command line safe inside a `.bat` file.
///
/// `%` is doubled everywhere. Outside double-quoted spans cmd also treats
/// `^ & | < >` as syntax, so those get a `^` in front. Every `"` toggles the
/// quoted state, as it does for cmd.
pub fn escape_batch(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 8);
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                out.push(c);
            }
            '%' => out.push_str("%%"),
            '^' | '&' | '|' | '<' | '>' if !quoted => {
                out.push('^');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Entity-escape text for task scheduler XML
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
