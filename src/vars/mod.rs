// src/vars/mod.rs

//! Runtime variable resolution and `%NAME%` substitution.
//!
//! Lookup order for a name:
//! 1. the query-string variable `QS_<name>`
//! 2. the ambient environment variable `<name>`
//! 3. the empty string
//!
//! Substitution is a single left-to-right scan; no regex is involved.

use crate::context::{QUERY_VAR_PREFIX, RuntimeContext};

/// Character that opens and closes a variable reference.
pub const MARKER: char = '%';

/// How a resolved value is inserted into the surrounding text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// Insert the value as-is (environment values, direct argv tokens).
    None,
    /// Insert the value as one double-quoted shell word.
    Shell,
}

/// Resolves variable names against a [`RuntimeContext`].
#[derive(Debug, Clone, Copy)]
pub struct VarResolver<'a> {
    ctx: &'a RuntimeContext,
}

impl<'a> VarResolver<'a> {
    pub fn new(ctx: &'a RuntimeContext) -> Self {
        Self { ctx }
    }

    pub fn resolve(&self, name: &str) -> String {
        self.ctx
            .query_vars()
            .get(&format!("{QUERY_VAR_PREFIX}{name}"))
            .or_else(|| self.ctx.env().get(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Replace every `%NAME%` reference in `text`.
    pub fn substitute(&self, text: &str, escape: Escape) -> String {
        substitute(text, self, escape)
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

/// Replace every `%NAME%` reference in `text`, `NAME` matching
/// `[A-Za-z_0-9.]+`.
///
/// A marker that does not open a well-formed reference is copied through,
/// so `100%`, `%%` and `%a b%` are left untouched.
pub fn substitute(text: &str, resolver: &VarResolver<'_>, escape: Escape) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(MARKER) {
        out.push_str(&rest[..start]);
        let after = &rest[start + MARKER.len_utf8()..];
        let ident_len = after.bytes().take_while(|b| is_ident_byte(*b)).count();

        if ident_len > 0 && after[ident_len..].starts_with(MARKER) {
            let value = resolver.resolve(&after[..ident_len]);
            match escape {
                Escape::None => out.push_str(&value),
                Escape::Shell => out.push_str(&shell_quote(&value)),
            }
            rest = &after[ident_len + MARKER.len_utf8()..];
        } else {
            out.push(MARKER);
            rest = after;
        }
    }

    out.push_str(rest);
    out
}

/// Quote `value` as a single double-quoted POSIX shell word.
pub fn shell_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
