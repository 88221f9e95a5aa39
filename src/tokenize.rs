//! Tokenizer: one command-line string → argv-style tokens.
//!
//! Whitespace outside quotes separates tokens. A quoted span opened by `"`,
//! `'` or `` ` `` runs to the next unescaped occurrence of the same
//! character; inside it only `\` followed by that character is special.
//! Spans may start mid-token and are spliced into the surrounding text.

use std::iter::Peekable;
use std::str::Chars;

const QUOTES: [char; 3] = ['"', '\'', '`'];

/// Split a command line into tokens.
///
/// An unterminated quote is not an error: its content runs to the end of
/// the input.
pub fn split_line(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if QUOTES.contains(&c) {
            in_token = true;
            read_quoted(c, &mut chars, &mut current);
        } else if c.is_whitespace() {
            if in_token {
                tokens.push(std::mem::take(&mut current));
                in_token = false;
            }
        } else {
            in_token = true;
            current.push(c);
        }
    }

    if in_token {
        tokens.push(current);
    }

    tracing::trace!(count = tokens.len(), "Split command line");
    tokens
}

/// Decode a quoted span whose opening `quote` was already consumed.
fn read_quoted(quote: char, chars: &mut Peekable<Chars<'_>>, out: &mut String) {
    while let Some(c) = chars.next() {
        if c == quote {
            return;
        }
        if c == '\\' && chars.peek() == Some(&quote) {
            chars.next();
            out.push(quote);
            continue;
        }
        out.push(c);
    }
}
