//! Auto-numbering for the orchestra strategy set
//!
//! In orchestra mode several lua-desync bodies run side by side and winws2
//! tells them apart by a `:strategy=N` suffix. Numbers are handed out per
//! source line: every `--lua-desync=` token on one line shares the same N.

const LUA_DESYNC: &str = "--lua-desync=";
const STRATEGY_TAG: &str = ":strategy=";

/// Whether a lua-desync token takes part in numbering.
///
/// `circular...` and `pass` are control payloads, and tokens that already
/// carry a number keep it.
fn is_numberable(token: &str) -> bool {
    let Some(payload) = token.strip_prefix(LUA_DESYNC) else {
        return false;
    };
    !(payload.starts_with("circular") || payload == "pass" || token.contains(STRATEGY_TAG))
}

/// Number the lua-desync tokens of each line. Lines without a numberable
/// token are returned unchanged and do not consume a number.
pub fn auto_number(lines: &[String]) -> Vec<String> {
    let mut counter = 0u32;
    lines
        .iter()
        .map(|line| {
            if !line.split_whitespace().any(is_numberable) {
                return line.clone();
            }
            counter += 1;
            line.split_whitespace()
                .map(|token| {
                    if is_numberable(token) {
                        format!("{token}{STRATEGY_TAG}{counter}")
                    } else {
                        token.to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}
