//! Lexical analysis for the shell: turns one raw input line into argument tokens.
//!
//! Tokenization is deliberately naive. There is no quoting, escaping or substitution,
//! so `echo "a b"` yields the tokens `echo`, `"a` and `b"`.

/// Characters that separate tokens: space, tab, carriage return, newline and bell.
pub const DELIMITERS: [char; 5] = [' ', '\t', '\r', '\n', '\x07'];

/// Returns true if `ch` separates tokens.
pub fn is_delimiter(ch: char) -> bool {
    DELIMITERS.contains(&ch)
}

/// Splits `line` into tokens.
///
/// Any maximal run of [`DELIMITERS`] separates two tokens; delimiters never appear in
/// the output and empty segments are dropped. A line made only of delimiters gives an
/// empty vector. The first token, if any, is the command name.
pub fn split_into_tokens(line: &str) -> Vec<String> {
    line.split(is_delimiter)
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
        .collect()
}
