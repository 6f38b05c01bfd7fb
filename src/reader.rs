//! Parse tree to values.
//!
//! Reading never fails outright: a number that does not fit, or a node the
//! reader does not recognise, becomes an error value inside the tree and is
//! reported when evaluation reaches it.

use crate::ast::{NumberType, Value};
use crate::grammar::{ParseNode, TAG_ANCHOR, TAG_PROGRAM};
use crate::printer::unescape;
use crate::Error;

fn read_number(node: &ParseNode) -> Value {
    node.contents
        .parse::<NumberType>()
        .map_or_else(|_| Value::Error(Error::MalformedNumber(node.contents.clone())), Value::Number)
}

fn read_string(node: &ParseNode) -> Value {
    let quoted = node.contents.as_str();
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(quoted);
    Value::String(unescape(inner))
}

/// Delimiters, anchors and comments carry no value
fn is_skipped(node: &ParseNode) -> bool {
    matches!(node.contents.as_str(), "(" | ")" | "{" | "}")
        || node.tag == TAG_ANCHOR
        || node.tag.contains("comment")
}

fn read_children(node: &ParseNode) -> Vec<Value> {
    node.children
        .iter()
        .filter(|child| !is_skipped(child))
        .map(read)
        .collect()
}

/// Convert a parse tree node, and everything below it, into a value.
///
/// The top-level node reads as an s-expression holding every form.
pub fn read(node: &ParseNode) -> Value {
    let tag = node.tag.as_str();
    if tag.contains("number") {
        read_number(node)
    } else if tag.contains("symbol") {
        Value::Symbol(node.contents.clone())
    } else if tag.contains("string") {
        read_string(node)
    } else if tag == TAG_PROGRAM || tag.contains("sexpr") {
        Value::Sexpr(read_children(node))
    } else if tag.contains("qexpr") {
        Value::Qexpr(read_children(node))
    } else {
        Value::Error(Error::ParseFailure(format!("unknown parse node '{tag}'")))
    }
}
