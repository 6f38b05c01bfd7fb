//! Canonical text form of values.
//!
//! String literals are printed with the same escape table the grammar accepts,
//! so printed data reads back as an equal value. Functions print in a form
//! that is informative but not guaranteed to read back: builtins have no
//! literal syntax at all.

use std::fmt;

use crate::ast::Value;

/// Escape table shared with the reader: (raw character, escape letter)
const ESCAPES: [(char, char); 11] = [
    ('\u{7}', 'a'),
    ('\u{8}', 'b'),
    ('\u{c}', 'f'),
    ('\n', 'n'),
    ('\r', 'r'),
    ('\t', 't'),
    ('\u{b}', 'v'),
    ('\\', '\\'),
    ('\'', '\''),
    ('"', '"'),
    ('\0', '0'),
];

/// Replace control, quote and backslash characters with backslash escapes
pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ESCAPES.iter().find(|(plain, _)| *plain == ch) {
            Some((_, letter)) => {
                escaped.push('\\');
                escaped.push(*letter);
            }
            None => escaped.push(ch),
        }
    }
    escaped
}

/// Inverse of [`escape`]. Unknown escape sequences are kept verbatim.
pub fn unescape(escaped: &str) -> String {
    let mut raw = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            raw.push(ch);
            continue;
        }
        match chars.next() {
            Some(next) => match ESCAPES.iter().find(|(_, letter)| *letter == next) {
                Some((plain, _)) => raw.push(*plain),
                None => {
                    raw.push('\\');
                    raw.push(next);
                }
            },
            None => raw.push('\\'),
        }
    }
    raw
}

fn write_cells(f: &mut fmt::Formatter<'_>, open: char, cells: &[Value], close: char) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{cell}")?;
    }
    write!(f, "{close}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Error(e) => write!(f, "Error: {e}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::String(s) => write!(f, "\"{}\"", escape(s)),
            Value::Builtin { .. } => write!(f, "<builtin>"),
            Value::Lambda { formals, body, .. } => {
                write!(f, "(\\ {{{}}} ", formals.join(" "))?;
                write_cells(f, '{', body, '}')?;
                write!(f, ")")
            }
            Value::Sexpr(cells) => write_cells(f, '(', cells, ')'),
            Value::Qexpr(cells) => write_cells(f, '{', cells, '}'),
        }
    }
}
