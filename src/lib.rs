//! Quipu - a small Lisp with quoted expressions and curried closures
//!
//! The language has two kinds of list: s-expressions, written `( ... )`, which
//! evaluate by applying their first element to the rest, and q-expressions,
//! written `{ ... }`, which are inert data until something asks for them to be
//! evaluated.
//!
//! ```text
//! (+ 1 2 3)                          ; 6
//! (head {1 2 3})                     ; {1}
//! (eval (tail {+ - 10 4}))           ; 6
//! (def {add} (\ {x y} {+ x y}))      ; ()
//! (def {inc} (add 1))                ; () - partial application
//! (inc 41)                           ; 42
//! ```
//!
//! ## Strict Typing
//!
//! Numbers are signed 64-bit integers and arithmetic overflow is reported
//! rather than wrapped. Booleans are their own type: `if`, `&&`, `||` and `!`
//! require them and only `bool` converts a number into one.
//!
//! ## Errors Are Values
//!
//! Every failure during evaluation produces a [`ast::Value::Error`] which
//! short-circuits the enclosing expression and travels upwards until it is
//! printed. Nothing in the evaluator panics on user input.
//!
//! ## Scoping
//!
//! A closure's free variables are resolved through the environment of its
//! *caller*, not the environment in which it was written. `def` always binds
//! in the root environment; `=` binds in the current one.
//!
//! ## Modules
//!
//! - `grammar`: source text to a generic parse tree
//! - `reader`: parse tree to values
//! - `ast`: the value model
//! - `printer`: canonical text form of values
//! - `evaluator`: environments, evaluation and the call protocol
//! - `builtinops`: the native library
//! - `interpreter`: the explicit interpreter context and host I/O seam
//! - `repl`: interactive loop (feature `repl`)

use std::fmt;

use crate::builtinops::Arity;

/// Maximum nesting depth accepted by the grammar.
/// Parsing and reading both recurse once per nested list.
pub const MAX_PARSE_DEPTH: usize = 128;

/// Maximum evaluation depth, counted in nested s-expression reductions.
/// Each closure call adds at least one level, so this also bounds recursion.
pub const MAX_EVAL_DEPTH: usize = 1024;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (stray closing bracket, unknown character)
    InvalidSyntax,
    /// Input ended before the expression was complete (unterminated string, unclosed bracket)
    Incomplete,
    /// Expression nesting exceeded [`MAX_PARSE_DEPTH`]
    TooDeeplyNested,
}

/// A structured error describing where and why source text failed to parse.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Name of the input, a file path or `<stdin>`
    pub origin: String,
    /// 1-based line of the offending character
    pub line: usize,
    /// 1-based column of the offending character
    pub column: usize,
}

impl ParseError {
    /// Create a ParseError located at a byte offset into `input`
    pub fn at_offset(
        kind: ParseErrorKind,
        message: impl Into<String>,
        origin: &str,
        input: &str,
        offset: usize,
    ) -> Self {
        let consumed = &input[..offset.min(input.len())];
        let line = consumed.matches('\n').count() + 1;
        let column = match consumed.rfind('\n') {
            Some(newline) => consumed[newline + 1..].chars().count() + 1,
            None => consumed.chars().count() + 1,
        };

        ParseError {
            kind,
            message: message.into(),
            origin: origin.to_owned(),
            line,
            column,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: error: {}",
            self.origin, self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Evaluation errors. These travel through the interpreter inside
/// [`ast::Value::Error`] rather than unwinding the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    UnboundSymbol(String),
    /// The head of an s-expression was not a function; carries its type name
    NotCallable(&'static str),
    /// A closure was given more arguments than it has formals
    TooManyArguments { expected: usize, got: usize },
    ArityMismatch {
        func: &'static str,
        expected: Arity,
        got: usize,
    },
    TypeMismatch {
        func: &'static str,
        index: usize,
        expected: &'static str,
        got: &'static str,
    },
    /// `head`, `tail` or `init` applied to `{}`
    EmptyListAccess(&'static str),
    DivisionByZero,
    IntegerOverflow(&'static str),
    MalformedNumber(String),
    ParseFailure(String),
    /// Raised by the `error` builtin
    UserError(String),
    /// Evaluation nested deeper than [`MAX_EVAL_DEPTH`]
    RecursionLimit(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnboundSymbol(name) => write!(f, "unbound symbol '{name}'"),
            Error::NotCallable(type_name) => {
                write!(f, "S-Expression starts with incorrect type ({type_name})")
            }
            Error::TooManyArguments { expected, got } => write!(
                f,
                "function received too many arguments, expected {expected}, got {got}"
            ),
            Error::ArityMismatch {
                func,
                expected,
                got,
            } => write!(f, "'{func}' expected {expected} arguments, got {got}"),
            Error::TypeMismatch {
                func,
                index,
                expected,
                got,
            } => write!(
                f,
                "'{func}' incorrect type for arg {index}, expected {expected}, got {got}"
            ),
            Error::EmptyListAccess(func) => write!(f, "'{func}' passed {{}}"),
            Error::DivisionByZero => write!(f, "division by zero"),
            Error::IntegerOverflow(func) => write!(f, "'{func}' integer overflow"),
            Error::MalformedNumber(text) => write!(f, "invalid number '{text}'"),
            Error::ParseFailure(msg) | Error::UserError(msg) => write!(f, "{msg}"),
            Error::RecursionLimit(max) => {
                write!(f, "evaluation depth limit exceeded (max: {max})")
            }
        }
    }
}

impl std::error::Error for Error {}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod grammar;
pub mod interpreter;
pub mod printer;
pub mod reader;

#[cfg(feature = "repl")]
pub mod repl;

pub use ast::Value;
pub use evaluator::{eval, Environment};
pub use interpreter::{Host, Interpreter, StdHost};
