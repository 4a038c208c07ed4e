// src/task/tokenize.rs

//! Quote-aware splitting of a `cmdLine` string into argv tokens.
//!
//! Words are separated by whitespace. Text between matching single or double
//! quotes is taken verbatim (whitespace included) and joined to the current
//! word with the quotes removed, so `a"b c"d` is the single word `ab cd` and
//! `""` is an empty word. There is no backslash escaping.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unterminated {quote} quote at offset {offset}")]
pub struct TokenizeError {
    pub quote: char,
    /// Byte offset of the opening quote.
    pub offset: usize,
}

pub fn split(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.char_indices();

    while let Some((offset, c)) = chars.next() {
        match c {
            '\'' | '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some((_, q)) if q == c => break,
                        Some((_, other)) => current.push(other),
                        None => return Err(TokenizeError { quote: c, offset }),
                    }
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    tokens.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            other => {
                current.push(other);
                in_word = true;
            }
        }
    }

    if in_word {
        tokens.push(current);
    }

    Ok(tokens)
}
