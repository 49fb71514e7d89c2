//! Defensive parser for list-of-strings literals such as `['a', "b"]`.
//!
//! Planner output is free text written by a language model. The first `[` in
//! the input opens the literal and its closing `]` ends it; text around the
//! literal is ignored. Inside, only quoted strings, commas and whitespace are
//! accepted.

use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    #[error("no list literal found")]
    NoList,
    #[error("list literal is not terminated")]
    Unterminated,
    #[error("string starting at byte {0} is not terminated")]
    UnterminatedString(usize),
    #[error("unexpected {found:?} at byte {at}")]
    Unexpected { found: char, at: usize },
}

/// Parse the first list-of-strings literal found in `text`.
pub fn parse_string_list(text: &str) -> Result<Vec<String>, LiteralError> {
    let start = text.find('[').ok_or(LiteralError::NoList)?;
    let mut chars = text[start + 1..].char_indices().peekable();
    let offset = start + 1;

    let mut items = Vec::new();
    // True right after `[` or `,`: a string or `]` may follow.
    let mut expect_value = true;

    loop {
        skip_whitespace(&mut chars);
        let Some((idx, ch)) = chars.next() else {
            return Err(LiteralError::Unterminated);
        };
        match ch {
            ']' => return Ok(items),
            '\'' | '"' if expect_value => {
                items.push(read_string(&mut chars, ch, offset + idx)?);
                expect_value = false;
            }
            ',' if !expect_value => expect_value = true,
            found => {
                return Err(LiteralError::Unexpected {
                    found,
                    at: offset + idx,
                });
            }
        }
    }
}

fn skip_whitespace(chars: &mut Peekable<CharIndices<'_>>) {
    while chars.next_if(|(_, ch)| ch.is_whitespace()).is_some() {}
}

fn read_string(
    chars: &mut Peekable<CharIndices<'_>>,
    quote: char,
    start: usize,
) -> Result<String, LiteralError> {
    let mut out = String::new();
    while let Some((_, ch)) = chars.next() {
        match ch {
            '\\' => {
                let (_, escaped) = chars
                    .next()
                    .ok_or(LiteralError::UnterminatedString(start))?;
                match escaped {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '\\' | '\'' | '"' => out.push(escaped),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            }
            '\n' => return Err(LiteralError::UnterminatedString(start)),
            c if c == quote => return Ok(out),
            c => out.push(c),
        }
    }
    Err(LiteralError::UnterminatedString(start))
}
